//! # Primitives
//!
//! Compiled-in constants for the caselink CORE.
//!
//! The similarity coefficients are a contract: ranking and clustering callers
//! depend on their exact values. Changing any of them changes which cases link.

// =============================================================================
// SIMILARITY WEIGHTS
// =============================================================================

/// Weight of the behavioral Jaccard factor in the overall score.
pub const BEHAVIORAL_WEIGHT: f64 = 0.30;

/// Weight of the temporal factor in the overall score.
pub const TEMPORAL_WEIGHT: f64 = 0.15;

/// Weight of the geographic factor in the overall score.
pub const GEOGRAPHIC_WEIGHT: f64 = 0.20;

/// Weight of the MO Jaccard factor in the overall score.
pub const MO_WEIGHT: f64 = 0.35;

/// Bonus added per entity shared by two cases in the graph.
pub const ENTITY_BONUS_PER_SHARED: f64 = 0.05;

/// Upper bound on the shared-entity bonus.
pub const MAX_ENTITY_BONUS: f64 = 0.20;

// =============================================================================
// TEMPORAL HEURISTIC
// =============================================================================

/// Score when both cases carry the same `time_of_day` label.
pub const SAME_TIME_OF_DAY_SCORE: f64 = 0.8;

/// Score when both cases carry the same `day_of_week` label.
pub const SAME_DAY_OF_WEEK_SCORE: f64 = 0.5;

/// Baseline temporal score when neither label matches.
pub const TEMPORAL_BASELINE_SCORE: f64 = 0.2;

// =============================================================================
// GEOGRAPHY
// =============================================================================

/// Mean Earth radius used by the haversine distance.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Distance at which geographic similarity reaches zero.
pub const GEOGRAPHIC_RADIUS_KM: f64 = 50.0;

// =============================================================================
// LINK CLASSIFICATION
// =============================================================================

/// `mo_similarity` above this classifies a link as `strong_mo_match`.
pub const STRONG_MO_THRESHOLD: f64 = 0.7;

/// `behavioral_similarity` above this classifies a link as `behavioral_pattern`.
pub const BEHAVIORAL_PATTERN_THRESHOLD: f64 = 0.7;

/// `geographic_similarity` above this classifies a link as `geographic_cluster`.
pub const GEOGRAPHIC_CLUSTER_THRESHOLD: f64 = 0.8;

// =============================================================================
// BOUNDS
// =============================================================================

/// Maximum traversal depth for graph queries.
///
/// Requested depths above this are clamped so every BFS stays bounded.
pub const MAX_TRAVERSAL_DEPTH: usize = 16;

/// Maximum length of a case identifier.
pub const MAX_CASE_ID_LENGTH: usize = 128;

/// Maximum length of a node label. Longer payload entries are skipped.
pub const MAX_LABEL_LENGTH: usize = 512;

/// Property key under which the case identifier is stored on `Case` nodes.
pub const CASE_ID_PROPERTY: &str = "case_id";
