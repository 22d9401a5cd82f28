//! Cooperative cancellation for analysis runs
//!
//! The caller holds a clone of the token and flips it; algorithms poll it per
//! node or per pair and bail out with `AlgorithmError::Cancelled`. Work
//! finished before the check stays in place.

use super::types::AlgorithmError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A shared, poll-able cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Request cancellation; every clone observes it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// `Err(Cancelled)` once cancellation has been requested.
    pub fn check(&self) -> Result<(), AlgorithmError> {
        if self.is_cancelled() {
            Err(AlgorithmError::Cancelled)
        } else {
            Ok(())
        }
    }
}
