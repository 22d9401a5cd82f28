//! YAML pipeline configuration
//!
//! ```yaml
//! algorithms:
//!   semantic_clustering:
//!     parameters:
//!       group_similarity_threshold: 0.8
//!   response_quality:
//!     enabled: false
//! search:
//!   top_k: 5
//!   threshold: 0.6
//! ```
//!
//! Parameters not listed keep the algorithm's defaults.

use crate::analysis::{AlgorithmConfig, AlgorithmError, AlgorithmOrchestrator};
use crate::search::SearchConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Errors loading or applying a pipeline configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Unknown algorithm in configuration: {0}")]
    UnknownAlgorithm(String),

    #[error("Algorithm error: {0}")]
    Algorithm(#[from] AlgorithmError),
}

/// Settings for a whole analysis run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Per-algorithm overrides keyed by algorithm name
    #[serde(default)]
    pub algorithms: BTreeMap<String, AlgorithmConfig>,
    #[serde(default)]
    pub search: SearchConfig,
}

impl PipelineConfig {
    /// Read a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_yaml(&content)?;
        debug!(path = %path.as_ref().display(), algorithms = config.algorithms.len(), "Loaded pipeline config");
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Snapshot of the orchestrator's current configuration
    pub fn from_orchestrator(orchestrator: &AlgorithmOrchestrator) -> Self {
        let algorithms = orchestrator
            .algorithm_names()
            .into_iter()
            .filter_map(|name| {
                orchestrator
                    .configuration(name)
                    .map(|config| (name.to_string(), config.clone()))
            })
            .collect();
        Self {
            algorithms,
            search: SearchConfig::default(),
        }
    }

    /// Merge the overrides onto the orchestrator's algorithms.
    ///
    /// Every name is checked before anything is changed, so an unknown name
    /// leaves the orchestrator untouched.
    pub fn apply(&self, orchestrator: &mut AlgorithmOrchestrator) -> Result<(), ConfigError> {
        let known = orchestrator.algorithm_names();
        if let Some(unknown) = self.algorithms.keys().find(|name| !known.contains(&name.as_str())) {
            return Err(ConfigError::UnknownAlgorithm(unknown.clone()));
        }
        for (name, overrides) in &self.algorithms {
            orchestrator.configure(name, overrides)?;
            info!(
                algorithm = %name,
                enabled = ?overrides.enabled,
                overrides = overrides.parameters.len(),
                "Applied algorithm configuration"
            );
        }
        Ok(())
    }
}
