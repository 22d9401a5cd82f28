//! faqweave: analysis engine for FAQ knowledge bases
//!
//! Takes a collection of question/answer records and works out how they
//! relate: which are duplicates, which cluster around a topic, which should
//! be read first, which contradict each other, and which answers are weak.
//!
//! # Core Concepts
//!
//! - **Nodes**: a query, its answer, variations, resources and derived features
//! - **Connections**: typed, weighted edges produced by the algorithms
//! - **Groups**: clusters of semantically close nodes
//! - **Pipeline**: algorithms run in sequence by the orchestrator, each
//!   isolated from the others' failures
//!
//! # Example
//!
//! ```no_run
//! use faqweave::{AlgorithmOrchestrator, ExecutionContext, FaqNode};
//!
//! # async fn run() {
//! let mut nodes = vec![
//!     FaqNode::new("How do I reset my password?", "Use the reset link on the login page."),
//!     FaqNode::new("I forgot my password", "Use the reset link on the login page."),
//! ];
//! let orchestrator = AlgorithmOrchestrator::with_default_algorithms();
//! let report = orchestrator.run_all(&mut nodes, &ExecutionContext::new()).await;
//! println!("{} connections", report.connections.len());
//! # }
//! ```

pub mod analysis;
pub mod config;
pub mod graph;
pub mod scoring;
pub mod search;
pub mod storage;
pub mod text;

pub use analysis::{
    AlgorithmConfig, AlgorithmError, AlgorithmOrchestrator, AlgorithmResult, CancellationToken,
    ExecutionContext, ExecutionReport, FaqAlgorithm, OptimizationSuggestion, ProgressEvent,
    ProgressSink, RunStatus, SuggestionType,
};
pub use config::{ConfigError, PipelineConfig};
pub use graph::{Connection, ConnectionType, FaqGroup, FaqNode, NodeId, PropertyValue, Resource, Score};
pub use search::{FaqSearcher, SearchConfig, SearchHit};
pub use storage::{
    import_faq_file, ImportStats, JsonFileStore, NodeStore, OpenStore, SqliteStore, StorageError,
    StorageResult,
};
pub use text::{HashedBagOfWords, Vectorizer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
