//! Unit-interval scores

use serde::{Deserialize, Serialize};
use std::fmt;

/// A value clamped to `[0.0, 1.0]`.
///
/// Clamping happens on every construction path (including deserialization),
/// so a stored `Score` is always in range. NaN collapses to `0.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Score(f64);

impl Score {
    pub const ZERO: Score = Score(0.0);
    pub const ONE: Score = Score(1.0);

    /// Create a score, clamping the input into range
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            Self(0.0)
        } else {
            Self(value.clamp(0.0, 1.0))
        }
    }

    /// The stored value
    pub fn get(self) -> f64 {
        self.0
    }

    /// Replace the stored value, clamping it
    pub fn set(&mut self, value: f64) {
        *self = Self::new(value);
    }
}

impl From<f64> for Score {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<Score> for f64 {
    fn from(score: Score) -> Self {
        score.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}
