//! The algorithm interface and its registry

use super::cancel::CancellationToken;
use super::progress::{NullProgress, ProgressEvent, ProgressSink};
use super::types::{AlgorithmConfig, AlgorithmError, AlgorithmResult, ValidationReport};
use crate::graph::FaqNode;
use async_trait::async_trait;
use std::sync::Arc;

/// Cancellation and progress handles shared by every stage of a run
#[derive(Clone)]
pub struct ExecutionContext {
    pub cancel: CancellationToken,
    progress: Arc<dyn ProgressSink>,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl ExecutionContext {
    /// Fresh token, progress discarded
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            progress: Arc::new(NullProgress),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// `Err(Cancelled)` once the token has fired
    pub fn checkpoint(&self) -> Result<(), AlgorithmError> {
        self.cancel.check()
    }

    pub fn report(&self, percentage: u8, message: impl Into<String>, processed: usize, total: usize) {
        self.progress
            .report(ProgressEvent::new(percentage, message, processed, total));
    }
}

/// One analysis pass over a node collection
///
/// Implementations read their parameters from [`AlgorithmConfig`], mutate
/// nodes in place and return what they found. They poll
/// [`ExecutionContext::checkpoint`] inside their loops and return
/// `AlgorithmError::Cancelled` when it fires.
///
/// # Example
///
/// ```ignore
/// struct CountWords { config: AlgorithmConfig }
///
/// #[async_trait]
/// impl FaqAlgorithm for CountWords {
///     fn name(&self) -> &str { "count_words" }
///     fn description(&self) -> &str { "Counts response words" }
///     fn configuration(&self) -> &AlgorithmConfig { &self.config }
///     fn update_configuration(&mut self, overrides: &AlgorithmConfig) {
///         self.config = self.config.merged(overrides);
///     }
///     fn validate(&self, _nodes: &[FaqNode]) -> ValidationReport { ValidationReport::new() }
///
///     async fn execute(
///         &self,
///         nodes: &mut [FaqNode],
///         ctx: &ExecutionContext,
///     ) -> Result<AlgorithmResult, AlgorithmError> {
///         let mut result = AlgorithmResult::new(self.name());
///         for node in nodes.iter() {
///             ctx.checkpoint()?;
///             result.set_metric("words", node.response.split_whitespace().count() as f64);
///         }
///         Ok(result)
///     }
/// }
/// ```
#[async_trait]
pub trait FaqAlgorithm: Send + Sync {
    /// Stable identifier used for configuration and `run_one`
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn configuration(&self) -> &AlgorithmConfig;

    /// Merge `overrides` onto the current configuration
    fn update_configuration(&mut self, overrides: &AlgorithmConfig);

    fn is_enabled(&self) -> bool {
        self.configuration().is_enabled()
    }

    /// Check input and configuration without running
    fn validate(&self, nodes: &[FaqNode]) -> ValidationReport;

    /// Run over `nodes`, mutating them in place
    async fn execute(
        &self,
        nodes: &mut [FaqNode],
        ctx: &ExecutionContext,
    ) -> Result<AlgorithmResult, AlgorithmError>;
}

/// Ordered list of algorithms; registration order is execution order
pub struct AlgorithmRegistry {
    algorithms: Vec<Box<dyn FaqAlgorithm>>,
}

impl Default for AlgorithmRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AlgorithmRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            algorithms: Vec::new(),
        }
    }

    /// Append an algorithm
    pub fn register<A: FaqAlgorithm + 'static>(&mut self, algorithm: A) {
        self.algorithms.push(Box::new(algorithm));
    }

    /// All algorithms in registration order
    pub fn algorithms(&self) -> Vec<&dyn FaqAlgorithm> {
        self.algorithms.iter().map(|a| a.as_ref()).collect()
    }

    /// Enabled algorithms in registration order
    pub fn enabled(&self) -> Vec<&dyn FaqAlgorithm> {
        self.algorithms()
            .into_iter()
            .filter(|a| a.is_enabled())
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&dyn FaqAlgorithm> {
        self.algorithms
            .iter()
            .find(|a| a.name() == name)
            .map(|a| a.as_ref())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Box<dyn FaqAlgorithm>> {
        self.algorithms.iter_mut().find(|a| a.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.algorithms.iter().map(|a| a.name()).collect()
    }

    /// Number of registered algorithms
    pub fn len(&self) -> usize {
        self.algorithms.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.algorithms.is_empty()
    }
}
