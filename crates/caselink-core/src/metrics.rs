//! # Graph Metrics
//!
//! Read-only summary of graph and link state, for status reporting.

use crate::graph::{Graph, GraphStore};
use crate::linker::{CaseLinker, LinkState};
use crate::types::NodeType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metrics extracted from a graph and its link index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphMetrics {
    pub node_count: usize,
    /// Edges including parallel duplicates.
    pub edge_count: usize,
    /// Distinct `(type, source, target)` triples.
    pub unique_edge_count: usize,
    /// `edge_count - unique_edge_count`.
    pub duplicate_edge_count: usize,
    /// Node count per type; types with no nodes are omitted.
    pub nodes_by_type: BTreeMap<NodeType, usize>,
    pub case_count: usize,
    pub pending_links: usize,
    pub confirmed_links: usize,
    pub rejected_links: usize,
    /// Clusters of at least the requested minimum size.
    pub cluster_count: usize,
}

impl GraphMetrics {
    /// Collect metrics; clusters are counted at `min_cluster_size`.
    #[must_use]
    pub fn collect(graph: &Graph, linker: &CaseLinker, min_cluster_size: usize) -> Self {
        let nodes_by_type: BTreeMap<NodeType, usize> = NodeType::ALL
            .into_iter()
            .map(|t| (t, graph.nodes_of_type(t).len()))
            .filter(|(_, n)| *n > 0)
            .collect();

        let unique_edge_count = graph.unique_edges().len();
        let edge_count = graph.edge_count();

        let mut by_state: BTreeMap<LinkState, usize> = BTreeMap::new();
        for link in linker.links() {
            *by_state.entry(link.state).or_default() += 1;
        }

        Self {
            node_count: graph.node_count(),
            edge_count,
            unique_edge_count,
            duplicate_edge_count: edge_count.saturating_sub(unique_edge_count),
            case_count: nodes_by_type.get(&NodeType::Case).copied().unwrap_or(0),
            nodes_by_type,
            pending_links: by_state.get(&LinkState::Pending).copied().unwrap_or(0),
            confirmed_links: by_state.get(&LinkState::Confirmed).copied().unwrap_or(0),
            rejected_links: by_state.get(&LinkState::Rejected).copied().unwrap_or(0),
            cluster_count: linker.find_case_clusters(min_cluster_size).len(),
        }
    }

    /// Links that are still part of the case index.
    #[must_use]
    pub fn active_links(&self) -> usize {
        self.pending_links.saturating_add(self.confirmed_links)
    }
}
