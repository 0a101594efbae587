//! # Investigation Engine
//!
//! `Investigation` combines the case graph, the link index and the registry
//! of ingested payloads behind one explicit instance. Callers receive it by
//! reference; there is no global state.
//!
//! `SharedInvestigation` puts an `Investigation` behind a single
//! reader-writer lock. Every mutation takes the write lock, which also closes
//! the check-then-act window in `find_or_create_node`. Traversal, scoring and
//! clustering take the read lock and may run concurrently.

use crate::config::AnalysisConfig;
use crate::expander::CaseExpander;
use crate::graph::{Graph, GraphStore};
use crate::linker::{CaseLink, CaseLinker};
use crate::metrics::GraphMetrics;
use crate::payload::CaseRecord;
use crate::similarity::{SimilarityResult, SimilarityScorer};
use crate::traversal::{RelatedCase, Traversal};
use crate::types::{CaseGraphError, LinkId, Node};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// One in-process investigation: graph, links and case payloads.
#[derive(Debug, Default)]
pub struct Investigation {
    graph: Graph,
    linker: CaseLinker,
    /// Latest payload per case id.
    cases: BTreeMap<String, CaseRecord>,
    /// Case ids in first-ingestion order.
    order: Vec<String>,
    config: AnalysisConfig,
}

impl Investigation {
    /// Create an empty investigation with default thresholds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty investigation with the given thresholds.
    pub fn with_config(config: AnalysisConfig) -> Result<Self, CaseGraphError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    #[must_use]
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    #[must_use]
    pub fn linker(&self) -> &CaseLinker {
        &self.linker
    }

    // =========================================================================
    // INGESTION
    // =========================================================================

    /// Expand a case into the graph and remember its payload.
    ///
    /// Re-ingesting a case id replaces the stored payload; graph nodes are
    /// reused and relationship edges are added again.
    pub fn ingest_case(&mut self, record: CaseRecord) -> Result<Vec<Node>, CaseGraphError> {
        let nodes = CaseExpander::expand_from_case(&mut self.graph, &record.case_id, &record.payload)?;
        if !self.cases.contains_key(&record.case_id) {
            self.order.push(record.case_id.clone());
        }
        info!(case_id = %record.case_id, nodes = nodes.len(), "case ingested");
        self.cases.insert(record.case_id.clone(), record);
        Ok(nodes)
    }

    /// Ingest several cases, stopping at the first invalid one.
    pub fn ingest_cases(
        &mut self,
        records: impl IntoIterator<Item = CaseRecord>,
    ) -> Result<usize, CaseGraphError> {
        let mut count = 0usize;
        for record in records {
            self.ingest_case(record)?;
            count = count.saturating_add(1);
        }
        Ok(count)
    }

    /// The stored payload for `case_id`.
    #[must_use]
    pub fn case(&self, case_id: &str) -> Option<&CaseRecord> {
        self.cases.get(case_id)
    }

    /// Every stored case, in first-ingestion order.
    pub fn cases(&self) -> impl Iterator<Item = &CaseRecord> {
        self.order.iter().filter_map(|id| self.cases.get(id))
    }

    fn require_case(&self, case_id: &str) -> Result<&CaseRecord, CaseGraphError> {
        self.case(case_id)
            .ok_or_else(|| CaseGraphError::UnknownCase(case_id.to_string()))
    }

    // =========================================================================
    // SIMILARITY & LINKING
    // =========================================================================

    /// Cases similar to `case_id`, best first, with the graph's entity bonus.
    pub fn similar_to(
        &self,
        case_id: &str,
        min_similarity: f64,
    ) -> Result<Vec<SimilarityResult>, CaseGraphError> {
        let query = self.require_case(case_id)?;
        let candidates: Vec<CaseRecord> = self.cases().cloned().collect();
        Ok(SimilarityScorer::with_graph(&self.graph).find_similar_cases(
            query,
            &candidates,
            min_similarity,
        ))
    }

    /// Link every stored pair scoring at least `min_similarity`.
    ///
    /// Honors `analysis_timeout_ms` from the config; on timeout nothing is linked.
    pub fn link_all(&mut self, min_similarity: f64) -> Result<Vec<CaseLink>, CaseGraphError> {
        let records: Vec<CaseRecord> = self
            .order
            .iter()
            .filter_map(|id| self.cases.get(id))
            .cloned()
            .collect();
        let scorer = SimilarityScorer::with_graph(&self.graph);

        let deadline = self
            .config
            .analysis_timeout_ms
            .and_then(|ms| Instant::now().checked_add(Duration::from_millis(ms)));
        let links = match deadline {
            Some(deadline) => self
                .linker
                .analyze_and_link_within(&records, &scorer, min_similarity, deadline)?,
            None => self.linker.analyze_and_link(&records, &scorer, min_similarity),
        };
        info!(cases = records.len(), created = links.len(), "pairwise analysis complete");
        Ok(links)
    }

    pub fn confirm_link(&mut self, id: LinkId, confirmed_by: &str) -> Result<CaseLink, CaseGraphError> {
        self.linker.confirm_link(id, confirmed_by)
    }

    pub fn reject_link(
        &mut self,
        id: LinkId,
        rejected_by: &str,
        reason: &str,
    ) -> Result<CaseLink, CaseGraphError> {
        self.linker.reject_link(id, rejected_by, reason)
    }

    /// Connected case clusters of at least `min_size` cases.
    pub fn clusters(&self, min_size: usize) -> Vec<BTreeSet<String>> {
        self.linker.find_case_clusters(min_size)
    }

    // =========================================================================
    // GRAPH QUERIES
    // =========================================================================

    /// Cases reachable from `case_id` through shared entities within `max_depth` hops.
    pub fn related_cases(
        &self,
        case_id: &str,
        max_depth: usize,
    ) -> Result<Vec<RelatedCase>, CaseGraphError> {
        let start = self
            .graph
            .case_node(case_id)
            .ok_or_else(|| CaseGraphError::UnknownCase(case_id.to_string()))?;
        Traversal::new(max_depth).related_cases(&self.graph, start.id)
    }

    /// Non-case entities referenced by both cases.
    pub fn shared_entities(&self, case_a: &str, case_b: &str) -> Vec<&Node> {
        self.graph.find_shared_entities(case_a, case_b)
    }

    /// Summary of the current state, clusters counted at the configured size.
    #[must_use]
    pub fn metrics(&self) -> GraphMetrics {
        GraphMetrics::collect(&self.graph, &self.linker, self.config.min_cluster_size)
    }
}

// =============================================================================
// SHARED INVESTIGATION
// =============================================================================

/// Thread-safe handle to an [`Investigation`].
#[derive(Debug, Clone, Default)]
pub struct SharedInvestigation {
    inner: Arc<RwLock<Investigation>>,
}

impl SharedInvestigation {
    #[must_use]
    pub fn new(investigation: Investigation) -> Self {
        Self {
            inner: Arc::new(RwLock::new(investigation)),
        }
    }

    /// Run `f` under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&Investigation) -> R) -> Result<R, CaseGraphError> {
        let guard = self.inner.read().map_err(|_| CaseGraphError::LockPoisoned)?;
        Ok(f(&guard))
    }

    /// Run `f` under the write lock.
    pub fn write<R>(&self, f: impl FnOnce(&mut Investigation) -> R) -> Result<R, CaseGraphError> {
        let mut guard = self.inner.write().map_err(|_| CaseGraphError::LockPoisoned)?;
        Ok(f(&mut guard))
    }

    pub fn ingest_case(&self, record: CaseRecord) -> Result<Vec<Node>, CaseGraphError> {
        self.write(|inv| inv.ingest_case(record))?
    }

    pub fn link_all(&self, min_similarity: f64) -> Result<Vec<CaseLink>, CaseGraphError> {
        self.write(|inv| inv.link_all(min_similarity))?
    }

    pub fn clusters(&self, min_size: usize) -> Result<Vec<BTreeSet<String>>, CaseGraphError> {
        self.read(|inv| inv.clusters(min_size))
    }
}

// =============================================================================
// TESTS
// =============================================================================
