//! # Similarity Module
//!
//! Multi-factor similarity between two case payloads.
//!
//! | Factor | Weight | Score |
//! |--------|--------|-------|
//! | behavioral | 0.30 | Jaccard of behaviors |
//! | temporal | 0.15 | 0.8 same time of day, 0.5 same day of week, else 0.2 |
//! | geographic | 0.20 | `1 - haversine_km / 50`, floored at 0 |
//! | MO | 0.35 | Jaccard of MO patterns |
//!
//! Each shared graph entity adds 0.05 (capped at 0.20) and the total is
//! clamped to `[0, 1]`. Every factor is exactly symmetric, so swapping the
//! two cases yields bit-identical scores.

use crate::graph::{GraphStore, normalize_label};
use crate::payload::{CasePayload, CaseRecord, Location};
use crate::primitives::{
    BEHAVIORAL_WEIGHT, EARTH_RADIUS_KM, ENTITY_BONUS_PER_SHARED, GEOGRAPHIC_RADIUS_KM,
    GEOGRAPHIC_WEIGHT, MAX_ENTITY_BONUS, MO_WEIGHT, SAME_DAY_OF_WEEK_SCORE,
    SAME_TIME_OF_DAY_SCORE, TEMPORAL_BASELINE_SCORE, TEMPORAL_WEIGHT,
};
use crate::types::clamp01;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Scored comparison of two cases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    pub source_case: String,
    pub target_case: String,
    pub overall: f64,
    pub behavioral: f64,
    pub temporal: f64,
    pub geographic: f64,
    pub mo: f64,
    /// Labels of non-case graph entities both cases reference.
    pub common_entities: Vec<String>,
    /// MO patterns and behaviors both cases share.
    pub matching_patterns: Vec<String>,
}

// =============================================================================
// FACTORS
// =============================================================================

fn label_set<S: AsRef<str>>(items: &[S]) -> BTreeSet<String> {
    items
        .iter()
        .map(|s| normalize_label(s.as_ref()))
        .filter(|s| !s.is_empty())
        .collect()
}

/// `|A ∩ B| / |A ∪ B|`; 0 if either set is empty.
///
/// Labels are trimmed and lowercased before comparison, so `"Night"` and
/// `" night "` count as the same element. Blank labels are dropped.
#[must_use]
pub fn jaccard<S: AsRef<str>>(a: &[S], b: &[S]) -> f64 {
    let (a, b) = (label_set(a), label_set(b));
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(&b).count();
    let union = a.union(&b).count();
    shared as f64 / union as f64
}

/// Great-circle distance in kilometres between two `(lat, lng)` points.
#[must_use]
pub fn haversine_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    // Fixed argument order keeps the result bit-identical under swapping.
    let ((lat1, lng1), (lat2, lng2)) = if a > b { (b, a) } else { (a, b) };

    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

#[must_use]
pub fn mo_similarity(a: &CasePayload, b: &CasePayload) -> f64 {
    jaccard(&a.mo_patterns, &b.mo_patterns)
}

#[must_use]
pub fn behavioral_similarity(a: &CasePayload, b: &CasePayload) -> f64 {
    jaccard(&a.behaviors, &b.behaviors)
}

fn same_label(a: Option<&str>, b: Option<&str>) -> bool {
    match (a.map(normalize_label), b.map(normalize_label)) {
        (Some(a), Some(b)) => !a.is_empty() && a == b,
        _ => false,
    }
}

/// Coarse categorical temporal score. A label only matches when both cases carry it.
#[must_use]
pub fn temporal_similarity(a: &CasePayload, b: &CasePayload) -> f64 {
    if same_label(a.time_of_day.as_deref(), b.time_of_day.as_deref()) {
        SAME_TIME_OF_DAY_SCORE
    } else if same_label(a.day_of_week.as_deref(), b.day_of_week.as_deref()) {
        SAME_DAY_OF_WEEK_SCORE
    } else {
        TEMPORAL_BASELINE_SCORE
    }
}

/// Linear decay to zero at 50 km; 0 if either side lacks coordinates.
#[must_use]
pub fn geographic_similarity(a: Option<&Location>, b: Option<&Location>) -> f64 {
    let (Some(a), Some(b)) = (
        a.and_then(Location::coordinates),
        b.and_then(Location::coordinates),
    ) else {
        return 0.0;
    };
    clamp01(1.0 - haversine_km(a, b) / GEOGRAPHIC_RADIUS_KM)
}

/// `min(0.20, 0.05 × shared)`.
#[must_use]
pub fn entity_bonus(shared: usize) -> f64 {
    (ENTITY_BONUS_PER_SHARED * shared as f64).min(MAX_ENTITY_BONUS)
}

// =============================================================================
// SCORER
// =============================================================================

/// Computes [`SimilarityResult`]s, optionally consulting a graph for shared entities.
///
/// The scorer never mutates the graph.
#[derive(Clone, Copy, Default)]
pub struct SimilarityScorer<'g> {
    graph: Option<&'g dyn GraphStore>,
}

impl<'g> SimilarityScorer<'g> {
    /// Payload-only scorer; the entity bonus is always 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scorer that adds the shared-entity bonus from `graph`.
    #[must_use]
    pub fn with_graph(graph: &'g dyn GraphStore) -> Self {
        Self { graph: Some(graph) }
    }

    /// Score case `a` against case `b`.
    #[must_use]
    pub fn score(&self, a: &CaseRecord, b: &CaseRecord) -> SimilarityResult {
        let (pa, pb) = (&a.payload, &b.payload);

        let behavioral = behavioral_similarity(pa, pb);
        let temporal = temporal_similarity(pa, pb);
        let geographic = geographic_similarity(pa.location.as_ref(), pb.location.as_ref());
        let mo = mo_similarity(pa, pb);

        let shared = match self.graph {
            Some(graph) if a.case_id != b.case_id => {
                graph.find_shared_entities(&a.case_id, &b.case_id)
            }
            _ => Vec::new(),
        };
        // One step per shared node; labels repeat across node types.
        let bonus = entity_bonus(shared.len());
        let common_entities: Vec<String> = shared
            .iter()
            .map(|n| n.label.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let overall = clamp01(
            BEHAVIORAL_WEIGHT * behavioral
                + TEMPORAL_WEIGHT * temporal
                + GEOGRAPHIC_WEIGHT * geographic
                + MO_WEIGHT * mo
                + bonus,
        );

        let mut matching: BTreeSet<String> = label_set(&pa.mo_patterns)
            .intersection(&label_set(&pb.mo_patterns))
            .cloned()
            .collect();
        matching.extend(
            label_set(&pa.behaviors)
                .intersection(&label_set(&pb.behaviors))
                .cloned(),
        );

        SimilarityResult {
            source_case: a.case_id.clone(),
            target_case: b.case_id.clone(),
            overall,
            behavioral,
            temporal,
            geographic,
            mo,
            common_entities,
            matching_patterns: matching.into_iter().collect(),
        }
    }

    /// Candidates scoring at least `min_similarity` against `case`, best first.
    ///
    /// The candidate carrying `case`'s own id is skipped. The sort is stable,
    /// so equal scores keep their input order.
    #[must_use]
    pub fn find_similar_cases(
        &self,
        case: &CaseRecord,
        candidates: &[CaseRecord],
        min_similarity: f64,
    ) -> Vec<SimilarityResult> {
        let mut results: Vec<SimilarityResult> = candidates
            .iter()
            .filter(|c| c.case_id != case.case_id)
            .map(|c| self.score(case, c))
            .filter(|r| r.overall >= min_similarity)
            .collect();
        results.sort_by(|x, y| y.overall.total_cmp(&x.overall));
        results
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::types::{NodeType, Properties};

    const EPS: f64 = 1e-9;

    fn record(id: &str, mo: &[&str], behaviors: &[&str]) -> CaseRecord {
        CaseRecord::new(
            id,
            CasePayload {
                mo_patterns: mo.iter().map(|s| s.to_string()).collect(),
                behaviors: behaviors.iter().map(|s| s.to_string()).collect(),
                ..CasePayload::default()
            },
        )
    }

    #[test]
    fn mo_jaccard_two_of_three() {
        let a = record("A", &["forced_entry", "night"], &[]);
        let b = record("B", &["forced_entry", "night", "weapon"], &[]);
        assert!((mo_similarity(&a.payload, &b.payload) - 2.0 / 3.0).abs() < EPS);
    }

    #[test]
    fn jaccard_edges() {
        let empty: [&str; 0] = [];
        assert_eq!(jaccard(&empty, &["a"]), 0.0);
        assert_eq!(jaccard(&empty, &empty), 0.0);
        assert_eq!(jaccard(&["a", "B"], &["b", " A "]), 1.0);
        assert_eq!(jaccard(&["a"], &["b"]), 0.0);
        assert_eq!(jaccard(&["Night"], &["night"]), 1.0);
        assert_eq!(jaccard(&["  ", "x"], &["x"]), 1.0);
    }

    #[test]
    fn geographic_five_km_is_point_nine() {
        let origin = Location::at(26.7753, -80.0583);
        // One degree of latitude spans EARTH_RADIUS_KM * PI / 180 km.
        let five_km_north = Location::at(
            26.7753 + 5.0 / (EARTH_RADIUS_KM * std::f64::consts::PI / 180.0),
            -80.0583,
        );
        let score = geographic_similarity(Some(&origin), Some(&five_km_north));
        assert!((score - 0.90).abs() < 1e-6, "got {score}");
    }

    #[test]
    fn geographic_floor_and_missing() {
        let west_palm = Location::at(26.7153, -80.0534);
        let miami = Location::at(25.7617, -80.1918);
        assert_eq!(geographic_similarity(Some(&west_palm), Some(&miami)), 0.0);
        assert_eq!(geographic_similarity(Some(&west_palm), None), 0.0);
        let no_coords = Location {
            address: Some("somewhere".to_string()),
            ..Location::default()
        };
        assert_eq!(geographic_similarity(Some(&west_palm), Some(&no_coords)), 0.0);
        assert_eq!(geographic_similarity(Some(&west_palm), Some(&west_palm)), 1.0);
    }

    #[test]
    fn temporal_precedence() {
        let mut a = CasePayload {
            time_of_day: Some("Night".to_string()),
            day_of_week: Some("friday".to_string()),
            ..CasePayload::default()
        };
        let mut b = CasePayload {
            time_of_day: Some("night".to_string()),
            day_of_week: Some("monday".to_string()),
            ..CasePayload::default()
        };
        assert_eq!(temporal_similarity(&a, &b), SAME_TIME_OF_DAY_SCORE);

        b.time_of_day = Some("morning".to_string());
        b.day_of_week = Some("Friday".to_string());
        assert_eq!(temporal_similarity(&a, &b), SAME_DAY_OF_WEEK_SCORE);

        b.day_of_week = None;
        assert_eq!(temporal_similarity(&a, &b), TEMPORAL_BASELINE_SCORE);

        a.time_of_day = None;
        b.time_of_day = None;
        assert_eq!(temporal_similarity(&a, &b), TEMPORAL_BASELINE_SCORE);
    }

    #[test]
    fn overall_uses_contract_weights() {
        let a = record("A", &["forced_entry", "night"], &["bound_victim"]);
        let b = record("B", &["forced_entry", "night", "weapon"], &["bound_victim"]);
        let result = SimilarityScorer::new().score(&a, &b);

        let expected = 0.30 * 1.0 + 0.15 * 0.2 + 0.20 * 0.0 + 0.35 * (2.0 / 3.0);
        assert!((result.overall - expected).abs() < EPS);
        assert_eq!(
            result.matching_patterns,
            vec!["bound_victim".to_string(), "forced_entry".to_string(), "night".to_string()]
        );
        assert!(result.common_entities.is_empty());
    }

    #[test]
    fn entity_bonus_is_capped_and_overall_clamped() {
        assert_eq!(entity_bonus(0), 0.0);
        assert!((entity_bonus(2) - 0.10).abs() < EPS);
        assert_eq!(entity_bonus(9), MAX_ENTITY_BONUS);

        let mut graph = Graph::new();
        for label in ["van", "glove", "knife", "rope", "mask"] {
            for case in ["A", "B"] {
                graph.find_or_create_node(NodeType::Evidence, label, Properties::new(), None, Some(case));
            }
        }
        let mut a = record("A", &["x"], &["y"]);
        a.payload.location = Some(Location::at(10.0, 10.0));
        a.payload.time_of_day = Some("night".to_string());
        let mut b = a.clone();
        b.case_id = "B".to_string();

        let result = SimilarityScorer::with_graph(&graph).score(&a, &b);
        assert_eq!(result.common_entities.len(), 5);
        assert_eq!(result.overall, 1.0);
    }

    #[test]
    fn entity_bonus_counts_nodes_not_labels() {
        let mut graph = Graph::new();
        for case in ["A", "B"] {
            graph.find_or_create_node(NodeType::Suspect, "Smith", Properties::new(), None, Some(case));
            graph.find_or_create_node(NodeType::Victim, "Smith", Properties::new(), None, Some(case));
        }
        assert_eq!(graph.find_shared_entities("A", "B").len(), 2);

        let a = record("A", &[], &[]);
        let b = record("B", &[], &[]);
        let result = SimilarityScorer::with_graph(&graph).score(&a, &b);

        assert_eq!(result.common_entities, vec!["Smith".to_string()]);
        let expected = TEMPORAL_WEIGHT * TEMPORAL_BASELINE_SCORE + 2.0 * ENTITY_BONUS_PER_SHARED;
        assert!((result.overall - expected).abs() < EPS, "got {}", result.overall);
        assert!((result.overall - 0.13).abs() < EPS);
    }

    #[test]
    fn same_case_gets_no_entity_bonus() {
        let mut graph = Graph::new();
        graph.find_or_create_node(NodeType::Suspect, "Smith", Properties::new(), None, Some("A"));
        let a = record("A", &[], &[]);

        let result = SimilarityScorer::with_graph(&graph).score(&a, &a);
        assert!(result.common_entities.is_empty());
        assert!((result.overall - TEMPORAL_WEIGHT * TEMPORAL_BASELINE_SCORE).abs() < EPS);
    }

    #[test]
    fn find_similar_is_sorted_stable_and_excludes_self() {
        let query = record("P", &["a", "b"], &[]);
        let candidates = vec![
            record("P", &["a", "b"], &[]),
            record("low", &["a", "z"], &[]),
            record("tie1", &["a", "b"], &[]),
            record("none", &[], &[]),
            record("tie2", &["b", "a"], &[]),
        ];

        let results = SimilarityScorer::new().find_similar_cases(&query, &candidates, 0.1);
        let order: Vec<&str> = results.iter().map(|r| r.target_case.as_str()).collect();
        assert_eq!(order, vec!["tie1", "tie2", "low"]);
        assert!(results.iter().all(|r| r.source_case == "P"));
    }
}
