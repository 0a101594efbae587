//! # Case Linker
//!
//! Pairwise link creation, link lifecycle and cluster discovery.
//!
//! ```text
//!            confirm_link
//!  Pending ───────────────▶ Confirmed
//!     │
//!     │ reject_link
//!     ▼
//!  Rejected   (dropped from the case index)
//! ```
//!
//! Both end states are terminal. Clusters are connected components of the
//! case index, so two cases can share a cluster without a direct link.

use crate::payload::CaseRecord;
use crate::primitives::{
    BEHAVIORAL_PATTERN_THRESHOLD, GEOGRAPHIC_CLUSTER_THRESHOLD, STRONG_MO_THRESHOLD,
};
use crate::similarity::{SimilarityResult, SimilarityScorer};
use crate::types::{CaseGraphError, LinkId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::time::Instant;
use tracing::{debug, info};

// =============================================================================
// LINK TYPES
// =============================================================================

/// Why two cases were linked. Chosen by first match, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    StrongMoMatch,
    BehavioralPattern,
    GeographicCluster,
    GeneralSimilarity,
}

impl LinkType {
    /// Classify a similarity result: MO > 0.7, then behavioral > 0.7,
    /// then geographic > 0.8, otherwise general.
    #[must_use]
    pub fn classify(result: &SimilarityResult) -> Self {
        if result.mo > STRONG_MO_THRESHOLD {
            LinkType::StrongMoMatch
        } else if result.behavioral > BEHAVIORAL_PATTERN_THRESHOLD {
            LinkType::BehavioralPattern
        } else if result.geographic > GEOGRAPHIC_CLUSTER_THRESHOLD {
            LinkType::GeographicCluster
        } else {
            LinkType::GeneralSimilarity
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::StrongMoMatch => "strong_mo_match",
            LinkType::BehavioralPattern => "behavioral_pattern",
            LinkType::GeographicCluster => "geographic_cluster",
            LinkType::GeneralSimilarity => "general_similarity",
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review state of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    Pending,
    Confirmed,
    Rejected,
}

// =============================================================================
// CASE LINK
// =============================================================================

/// A proposed relationship between two cases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseLink {
    pub id: LinkId,
    pub case_a: String,
    pub case_b: String,
    pub link_type: LinkType,
    /// Overall similarity at creation. Never recomputed.
    pub strength: f64,
    /// Graph entities both cases reference.
    pub evidence_basis: Vec<String>,
    /// MO patterns and behaviors both cases share.
    pub behavioral_basis: Vec<String>,
    pub state: LinkState,
    pub confirmed_by: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<String>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CaseLink {
    /// Whether `case_id` is either end of the link.
    #[must_use]
    pub fn involves(&self, case_id: &str) -> bool {
        self.case_a == case_id || self.case_b == case_id
    }

    /// The case at the other end from `case_id`.
    #[must_use]
    pub fn other_case(&self, case_id: &str) -> Option<&str> {
        if self.case_a == case_id {
            Some(&self.case_b)
        } else if self.case_b == case_id {
            Some(&self.case_a)
        } else {
            None
        }
    }
}

fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

// =============================================================================
// LINKER
// =============================================================================

/// Owns every link record and the per-case index of active links.
#[derive(Debug, Clone, Default)]
pub struct CaseLinker {
    /// Every link ever created, rejected ones included.
    links: BTreeMap<LinkId, CaseLink>,

    /// Active (pending or confirmed) links per case.
    case_index: BTreeMap<String, BTreeSet<LinkId>>,

    /// Unordered case pair -> link, for every link ever created.
    pair_index: BTreeMap<(String, String), LinkId>,

    next_link_id: u64,
}

impl CaseLinker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Score every unordered pair and link those at or above `min_similarity`.
    ///
    /// Pairs that already have a link record, in any state, are skipped.
    /// Returns only the links created by this call.
    pub fn analyze_and_link(
        &mut self,
        cases: &[CaseRecord],
        scorer: &SimilarityScorer<'_>,
        min_similarity: f64,
    ) -> Vec<CaseLink> {
        // Without a deadline planning cannot fail.
        let planned = self
            .plan(cases, scorer, min_similarity, None)
            .unwrap_or_default();
        self.commit(planned)
    }

    /// As [`analyze_and_link`](Self::analyze_and_link), aborting with
    /// `DeadlineExceeded` before any link is written once `deadline` passes.
    pub fn analyze_and_link_within(
        &mut self,
        cases: &[CaseRecord],
        scorer: &SimilarityScorer<'_>,
        min_similarity: f64,
        deadline: Instant,
    ) -> Result<Vec<CaseLink>, CaseGraphError> {
        let planned = self.plan(cases, scorer, min_similarity, Some(deadline))?;
        Ok(self.commit(planned))
    }

    fn plan(
        &self,
        cases: &[CaseRecord],
        scorer: &SimilarityScorer<'_>,
        min_similarity: f64,
        deadline: Option<Instant>,
    ) -> Result<Vec<SimilarityResult>, CaseGraphError> {
        let mut planned = Vec::new();
        let mut seen = BTreeSet::new();

        for (i, a) in cases.iter().enumerate() {
            if deadline.is_some_and(|limit| Instant::now() >= limit) {
                return Err(CaseGraphError::DeadlineExceeded);
            }
            for b in &cases[i.saturating_add(1)..] {
                if a.case_id == b.case_id {
                    continue;
                }
                let key = pair_key(&a.case_id, &b.case_id);
                if self.pair_index.contains_key(&key) || seen.contains(&key) {
                    continue;
                }
                let result = scorer.score(a, b);
                debug!(
                    case_a = %a.case_id,
                    case_b = %b.case_id,
                    overall = result.overall,
                    "pair scored"
                );
                if result.overall >= min_similarity {
                    seen.insert(key);
                    planned.push(result);
                }
            }
        }

        Ok(planned)
    }

    fn commit(&mut self, planned: Vec<SimilarityResult>) -> Vec<CaseLink> {
        let mut created = Vec::with_capacity(planned.len());
        for result in planned {
            let id = LinkId(self.next_link_id);
            self.next_link_id = self.next_link_id.saturating_add(1);

            let link = CaseLink {
                id,
                link_type: LinkType::classify(&result),
                strength: result.overall,
                evidence_basis: result.common_entities,
                behavioral_basis: result.matching_patterns,
                case_a: result.source_case,
                case_b: result.target_case,
                state: LinkState::Pending,
                confirmed_by: None,
                confirmed_at: None,
                rejected_by: None,
                rejected_at: None,
                rejection_reason: None,
                created_at: Utc::now(),
            };

            for case in [&link.case_a, &link.case_b] {
                self.case_index.entry(case.clone()).or_default().insert(id);
            }
            self.pair_index
                .insert(pair_key(&link.case_a, &link.case_b), id);
            info!(
                link = %id,
                case_a = %link.case_a,
                case_b = %link.case_b,
                link_type = %link.link_type,
                strength = link.strength,
                "case link created"
            );
            self.links.insert(id, link.clone());
            created.push(link);
        }
        created
    }

    fn pending_mut(&mut self, id: LinkId) -> Result<&mut CaseLink, CaseGraphError> {
        match self.links.get_mut(&id) {
            Some(link) if link.state == LinkState::Pending => Ok(link),
            _ => Err(CaseGraphError::LinkNotFound(id)),
        }
    }

    /// `Pending -> Confirmed`. Fails without mutation for unknown or non-pending links.
    pub fn confirm_link(&mut self, id: LinkId, confirmed_by: &str) -> Result<CaseLink, CaseGraphError> {
        let link = self.pending_mut(id)?;
        link.state = LinkState::Confirmed;
        link.confirmed_by = Some(confirmed_by.to_string());
        link.confirmed_at = Some(Utc::now());
        info!(link = %id, confirmed_by, "case link confirmed");
        Ok(link.clone())
    }

    /// `Pending -> Rejected`, removing the link from both cases' index.
    ///
    /// The record stays readable through [`get_link`](Self::get_link).
    pub fn reject_link(
        &mut self,
        id: LinkId,
        rejected_by: &str,
        reason: &str,
    ) -> Result<CaseLink, CaseGraphError> {
        let link = self.pending_mut(id)?;
        link.state = LinkState::Rejected;
        link.rejected_by = Some(rejected_by.to_string());
        link.rejected_at = Some(Utc::now());
        link.rejection_reason = Some(reason.to_string());
        let link = link.clone();

        for case in [&link.case_a, &link.case_b] {
            if let Some(ids) = self.case_index.get_mut(case.as_str()) {
                ids.remove(&id);
                if ids.is_empty() {
                    self.case_index.remove(case.as_str());
                }
            }
        }
        info!(link = %id, rejected_by, reason, "case link rejected");
        Ok(link)
    }

    /// Lookup a link record by id, whatever its state.
    #[must_use]
    pub fn get_link(&self, id: LinkId) -> Option<&CaseLink> {
        self.links.get(&id)
    }

    /// Active links touching `case_id`, ordered by id.
    pub fn links_for_case(&self, case_id: &str) -> Vec<&CaseLink> {
        self.case_index
            .get(case_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.links.get(id))
            .collect()
    }

    /// All link records, ordered by id.
    pub fn links(&self) -> impl Iterator<Item = &CaseLink> {
        self.links.values()
    }

    /// Number of pending plus confirmed links.
    #[must_use]
    pub fn active_link_count(&self) -> usize {
        self.links
            .values()
            .filter(|l| l.state != LinkState::Rejected)
            .count()
    }

    /// Connected components of the active link graph with at least `min_size` cases.
    ///
    /// Components are disjoint and ordered by their smallest case id.
    pub fn find_case_clusters(&self, min_size: usize) -> Vec<BTreeSet<String>> {
        let mut adjacency: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (case, ids) in &self.case_index {
            let neighbors = adjacency.entry(case.as_str()).or_default();
            for link in ids.iter().filter_map(|id| self.links.get(id)) {
                if let Some(other) = link.other_case(case) {
                    neighbors.push(other);
                }
            }
        }

        let mut visited: BTreeSet<&str> = BTreeSet::new();
        let mut clusters = Vec::new();

        for &start in adjacency.keys() {
            if !visited.insert(start) {
                continue;
            }
            let mut component = BTreeSet::from([start.to_string()]);
            let mut queue = VecDeque::from([start]);
            while let Some(current) = queue.pop_front() {
                for &next in adjacency.get(current).into_iter().flatten() {
                    if visited.insert(next) {
                        component.insert(next.to_string());
                        queue.push_back(next);
                    }
                }
            }
            if component.len() >= min_size {
                clusters.push(component);
            }
        }

        clusters
    }
}

// =============================================================================
// TESTS
// =============================================================================
