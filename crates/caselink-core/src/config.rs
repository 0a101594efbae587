//! # Analysis Configuration
//!
//! Tunable thresholds for linking, clustering and traversal. The similarity
//! coefficients themselves are not configurable; see `primitives`.

use crate::primitives::MAX_TRAVERSAL_DEPTH;
use crate::types::CaseGraphError;
use serde::{Deserialize, Serialize};

/// Default minimum overall similarity for a link.
pub const DEFAULT_MIN_SIMILARITY: f64 = 0.5;

/// Default minimum number of cases in a reported cluster.
pub const DEFAULT_MIN_CLUSTER_SIZE: usize = 2;

/// Default traversal depth for neighborhood queries.
pub const DEFAULT_MAX_DEPTH: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub min_similarity: f64,
    pub min_cluster_size: usize,
    pub max_depth: usize,
    /// Optional budget for pairwise analysis, in milliseconds.
    pub analysis_timeout_ms: Option<u64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_similarity: DEFAULT_MIN_SIMILARITY,
            min_cluster_size: DEFAULT_MIN_CLUSTER_SIZE,
            max_depth: DEFAULT_MAX_DEPTH,
            analysis_timeout_ms: None,
        }
    }
}

impl AnalysisConfig {
    /// Reject values outside their meaningful ranges.
    pub fn validate(&self) -> Result<(), CaseGraphError> {
        if !(0.0..=1.0).contains(&self.min_similarity) {
            return Err(CaseGraphError::ConfigError(format!(
                "min_similarity must be within [0, 1], got {}",
                self.min_similarity
            )));
        }
        if self.min_cluster_size == 0 {
            return Err(CaseGraphError::ConfigError(
                "min_cluster_size must be at least 1".to_string(),
            ));
        }
        if self.max_depth > MAX_TRAVERSAL_DEPTH {
            return Err(CaseGraphError::ConfigError(format!(
                "max_depth must be at most {}, got {}",
                MAX_TRAVERSAL_DEPTH, self.max_depth
            )));
        }
        Ok(())
    }
}
