//! # Configuration Loading
//!
//! Analysis thresholds come from three layers, later ones winning:
//! built-in defaults, an optional TOML file, then command-line flags.
//!
//! ```toml
//! [analysis]
//! min_similarity = 0.45
//! min_cluster_size = 3
//! max_depth = 2
//! analysis_timeout_ms = 5000
//! ```

use caselink_core::{AnalysisConfig, CaseGraphError};
use serde::Deserialize;
use std::path::Path;

/// Maximum config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// On-disk configuration layout.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    analysis: AnalysisConfig,
}

/// Per-invocation overrides taken from command-line flags.
#[derive(Debug, Default, Clone, Copy)]
pub struct Overrides {
    pub min_similarity: Option<f64>,
    pub min_cluster_size: Option<usize>,
    pub max_depth: Option<usize>,
    pub timeout_ms: Option<u64>,
}

impl Overrides {
    /// Apply every set override onto `config`.
    #[must_use]
    pub fn apply(&self, mut config: AnalysisConfig) -> AnalysisConfig {
        if let Some(v) = self.min_similarity {
            config.min_similarity = v;
        }
        if let Some(v) = self.min_cluster_size {
            config.min_cluster_size = v;
        }
        if let Some(v) = self.max_depth {
            config.max_depth = v;
        }
        if let Some(v) = self.timeout_ms {
            config.analysis_timeout_ms = Some(v);
        }
        config
    }
}

/// Parse an analysis config from TOML text.
pub fn parse_config(text: &str) -> Result<AnalysisConfig, CaseGraphError> {
    let file: ConfigFile =
        toml::from_str(text).map_err(|e| CaseGraphError::ConfigError(e.to_string()))?;
    file.analysis.validate()?;
    Ok(file.analysis)
}

/// Load the config file at `path`, or defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<AnalysisConfig, CaseGraphError> {
    let Some(path) = path else {
        return Ok(AnalysisConfig::default());
    };

    let metadata = std::fs::metadata(path).map_err(|e| {
        CaseGraphError::ConfigError(format!("Cannot read config '{}': {}", path.display(), e))
    })?;
    if metadata.len() > MAX_CONFIG_FILE_SIZE {
        return Err(CaseGraphError::ConfigError(format!(
            "Config file size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            MAX_CONFIG_FILE_SIZE
        )));
    }

    let text = std::fs::read_to_string(path)
        .map_err(|e| CaseGraphError::IoError(format!("Read config: {}", e)))?;
    let config = parse_config(&text)?;
    tracing::debug!(path = %path.display(), ?config, "configuration loaded");
    Ok(config)
}

/// Load, override and validate in one step.
pub fn resolve(path: Option<&Path>, overrides: Overrides) -> Result<AnalysisConfig, CaseGraphError> {
    let config = overrides.apply(load_config(path)?);
    config.validate()?;
    Ok(config)
}

// =============================================================================
// TESTS
// =============================================================================
