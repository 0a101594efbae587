//! # Graph Engine
//!
//! Typed node/edge storage for the caselink CORE.
//!
//! Nodes and edges live in contiguous arenas and are addressed by integer
//! handles, never by reference. Secondary indices are kept in `BTreeMap`s so
//! every iteration order is deterministic:
//!
//! - `type_index`: `NodeType -> [NodeId]`
//! - `label_index`: `(NodeType, normalized label) -> [NodeId]`
//! - `case_index`: `case_id -> {NodeId}`
//! - `adjacency`: `NodeId -> [EdgeId]` (incoming and outgoing)
//!
//! The graph is a multigraph: `add_edge` never merges parallel edges.
//! Consumers that want one edge per `(type, source, target)` read
//! [`Graph::unique_edges`].

use crate::traversal::{self, Reached};
use crate::types::{CaseGraphError, Edge, EdgeId, EdgeType, Node, NodeId, NodeType, Properties, clamp01};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Normalize a label for dedup comparisons: trimmed and lowercased.
#[must_use]
pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

// =============================================================================
// GRAPHSTORE TRAIT
// =============================================================================

/// The GraphStore trait defines the core graph operations.
///
/// All traversals are bounded by `MAX_TRAVERSAL_DEPTH`. Mutations are atomic
/// per call: they either apply in full or return an error with the store
/// untouched.
pub trait GraphStore {
    /// Create a new node. Never deduplicates.
    fn add_node(
        &mut self,
        node_type: NodeType,
        label: &str,
        properties: Properties,
        case_ids: &[String],
    ) -> Node;

    /// Create a directed edge. Fails with `NodeNotFound` if either endpoint is unknown.
    ///
    /// Weight and confidence are clamped into `[0, 1]`.
    fn add_edge(
        &mut self,
        edge_type: EdgeType,
        source_id: NodeId,
        target_id: NodeId,
        weight: f64,
        confidence: f64,
        properties: Properties,
    ) -> Result<Edge, CaseGraphError>;

    /// Return the node matching `(node_type, normalized label)` or create it.
    ///
    /// When `match_properties` is given, a candidate must also carry equal
    /// values for each listed key of `properties`. On reuse `case_id` is
    /// appended if new. On creation the node stores `properties`.
    fn find_or_create_node(
        &mut self,
        node_type: NodeType,
        label: &str,
        properties: Properties,
        match_properties: Option<&[&str]>,
        case_id: Option<&str>,
    ) -> Node;

    /// Lookup a node by handle.
    fn get_node(&self, id: NodeId) -> Option<&Node>;

    /// Lookup an edge by handle.
    fn get_edge(&self, id: EdgeId) -> Option<&Edge>;

    /// Every edge touching `node`, in either direction, in creation order.
    fn incident_edges(&self, node: NodeId) -> Vec<&Edge>;

    /// Nodes ever associated with `case_id`, ordered by handle.
    fn get_case_nodes(&self, case_id: &str) -> Vec<&Node>;

    /// Get the total number of nodes.
    fn node_count(&self) -> usize;

    /// Get the total number of edges, parallel edges included.
    fn edge_count(&self) -> usize;

    /// Bounded BFS from `start` over edges in either direction.
    ///
    /// Only the set of reached nodes and their minimum depth are part of the
    /// contract; emission order is not.
    fn get_connected_nodes(
        &self,
        start: NodeId,
        edge_types: Option<&[EdgeType]>,
        max_depth: usize,
    ) -> Result<Vec<Reached<'_>>, CaseGraphError>
    where
        Self: Sized,
    {
        traversal::bounded_bfs(self, start, edge_types, max_depth, None)
    }

    /// Non-`Case` nodes associated with both cases, ordered by handle.
    fn find_shared_entities(&self, case_a: &str, case_b: &str) -> Vec<&Node> {
        let b_ids: BTreeSet<NodeId> = self.get_case_nodes(case_b).iter().map(|n| n.id).collect();
        self.get_case_nodes(case_a)
            .into_iter()
            .filter(|n| n.node_type != NodeType::Case && b_ids.contains(&n.id))
            .collect()
    }
}

// =============================================================================
// GRAPH IMPLEMENTATION
// =============================================================================

/// One `(type, source, target)` group of parallel edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedEdge {
    pub edge_type: EdgeType,
    pub source_id: NodeId,
    pub target_id: NodeId,
    /// Strongest weight among the parallel edges.
    pub weight: f64,
    /// Highest confidence among the parallel edges.
    pub confidence: f64,
    /// Parallel edges in creation order.
    pub edge_ids: Vec<EdgeId>,
}

impl MergedEdge {
    /// How many parallel edges were merged.
    #[must_use]
    pub fn multiplicity(&self) -> usize {
        self.edge_ids.len()
    }
}

/// The in-memory case graph.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    /// Node arena, indexed by `NodeId`.
    nodes: Vec<Node>,

    /// Edge arena, indexed by `EdgeId`.
    edges: Vec<Edge>,

    /// Incident edges per node, indexed by `NodeId`.
    adjacency: Vec<Vec<EdgeId>>,

    type_index: BTreeMap<NodeType, Vec<NodeId>>,

    label_index: BTreeMap<(NodeType, String), Vec<NodeId>>,

    case_index: BTreeMap<String, BTreeSet<NodeId>>,
}

fn slot(raw: u64) -> Option<usize> {
    usize::try_from(raw).ok()
}

impl Graph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a graph, with all indices, from a snapshot.
    ///
    /// Handles are taken from arena positions, so a snapshot taken from a
    /// graph restores to identical handles. Edges with unknown endpoints are
    /// dropped.
    #[must_use]
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Self {
        let mut graph = Self::new();
        let mut remap = BTreeMap::new();

        for node in snapshot.nodes {
            let old_id = node.id;
            let created = graph.add_node(node.node_type, &node.label, node.properties, &node.case_ids);
            if let Some(stored) = slot(created.id.0).and_then(|i| graph.nodes.get_mut(i)) {
                stored.created_at = node.created_at;
                stored.updated_at = node.updated_at;
            }
            remap.insert(old_id, created.id);
        }

        for edge in snapshot.edges {
            let (Some(&source), Some(&target)) = (remap.get(&edge.source_id), remap.get(&edge.target_id)) else {
                continue;
            };
            if let Ok(created) = graph.add_edge(
                edge.edge_type,
                source,
                target,
                edge.weight,
                edge.confidence,
                edge.properties,
            ) && let Some(stored) = slot(created.id.0).and_then(|i| graph.edges.get_mut(i))
            {
                stored.created_at = edge.created_at;
            }
        }

        graph
    }

    /// Get all nodes in handle order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Get all edges in handle order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    /// All nodes of one type, in handle order.
    pub fn nodes_of_type(&self, node_type: NodeType) -> Vec<&Node> {
        self.type_index
            .get(&node_type)
            .into_iter()
            .flatten()
            .filter_map(|id| self.get_node(*id))
            .collect()
    }

    /// Case ids known to the case index.
    pub fn case_ids(&self) -> impl Iterator<Item = &str> {
        self.case_index.keys().map(String::as_str)
    }

    /// The `Case` node for `case_id`, if the case has been expanded.
    #[must_use]
    pub fn case_node(&self, case_id: &str) -> Option<&Node> {
        self.label_index
            .get(&(NodeType::Case, normalize_label(case_id)))
            .into_iter()
            .flatten()
            .filter_map(|id| self.get_node(*id))
            .find(|n| n.belongs_to(case_id))
    }

    /// Edges connecting `a` and `b` in either direction.
    pub fn edges_between(&self, a: NodeId, b: NodeId) -> Vec<&Edge> {
        self.incident_edges(a)
            .into_iter()
            .filter(|e| e.other_end(a) == Some(b))
            .collect()
    }

    /// Merge-on-read view: one entry per `(type, source, target)`.
    pub fn unique_edges(&self) -> Vec<MergedEdge> {
        let mut groups: BTreeMap<(EdgeType, NodeId, NodeId), MergedEdge> = BTreeMap::new();
        for edge in &self.edges {
            groups
                .entry((edge.edge_type, edge.source_id, edge.target_id))
                .and_modify(|m| {
                    m.weight = m.weight.max(edge.weight);
                    m.confidence = m.confidence.max(edge.confidence);
                    m.edge_ids.push(edge.id);
                })
                .or_insert_with(|| MergedEdge {
                    edge_type: edge.edge_type,
                    source_id: edge.source_id,
                    target_id: edge.target_id,
                    weight: edge.weight,
                    confidence: edge.confidence,
                    edge_ids: vec![edge.id],
                });
        }
        groups.into_values().collect()
    }

    /// Serializable copy of the whole graph.
    #[must_use]
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }

    fn find_match(
        &self,
        node_type: NodeType,
        normalized: &str,
        properties: &Properties,
        match_properties: Option<&[&str]>,
    ) -> Option<NodeId> {
        let bucket = self.label_index.get(&(node_type, normalized.to_string()))?;
        bucket.iter().copied().find(|id| {
            let Some(node) = self.get_node(*id) else {
                return false;
            };
            match_properties.is_none_or(|keys| {
                keys.iter()
                    .all(|k| node.properties.get(*k) == properties.get(*k))
            })
        })
    }

    fn index_case(&mut self, case_id: &str, node: NodeId) {
        self.case_index
            .entry(case_id.to_string())
            .or_default()
            .insert(node);
    }
}

impl GraphStore for Graph {
    fn add_node(
        &mut self,
        node_type: NodeType,
        label: &str,
        properties: Properties,
        case_ids: &[String],
    ) -> Node {
        let id = NodeId(self.nodes.len() as u64);
        let now = Utc::now();

        let mut node = Node {
            id,
            node_type,
            label: label.trim().to_string(),
            properties,
            case_ids: Vec::with_capacity(case_ids.len()),
            created_at: now,
            updated_at: now,
        };
        for case_id in case_ids {
            node.add_case_id(case_id);
        }

        self.type_index.entry(node_type).or_default().push(id);
        self.label_index
            .entry((node_type, normalize_label(label)))
            .or_default()
            .push(id);
        for case_id in &node.case_ids {
            self.case_index
                .entry(case_id.clone())
                .or_default()
                .insert(id);
        }
        self.adjacency.push(Vec::new());
        self.nodes.push(node.clone());

        debug!(node = %id, node_type = %node_type, label = %node.label, "node created");
        node
    }

    fn add_edge(
        &mut self,
        edge_type: EdgeType,
        source_id: NodeId,
        target_id: NodeId,
        weight: f64,
        confidence: f64,
        properties: Properties,
    ) -> Result<Edge, CaseGraphError> {
        if self.get_node(source_id).is_none() {
            return Err(CaseGraphError::NodeNotFound(source_id));
        }
        if self.get_node(target_id).is_none() {
            return Err(CaseGraphError::NodeNotFound(target_id));
        }

        let id = EdgeId(self.edges.len() as u64);
        let edge = Edge {
            id,
            edge_type,
            source_id,
            target_id,
            weight: clamp01(weight),
            confidence: clamp01(confidence),
            properties,
            created_at: Utc::now(),
        };

        // Both endpoints were checked above, so the adjacency slots exist.
        if let Some(out) = slot(source_id.0).and_then(|i| self.adjacency.get_mut(i)) {
            out.push(id);
        }
        if source_id != target_id
            && let Some(inc) = slot(target_id.0).and_then(|i| self.adjacency.get_mut(i))
        {
            inc.push(id);
        }
        self.edges.push(edge.clone());

        debug!(edge = %id, edge_type = %edge_type, source = %source_id, target = %target_id, "edge created");
        Ok(edge)
    }

    fn find_or_create_node(
        &mut self,
        node_type: NodeType,
        label: &str,
        properties: Properties,
        match_properties: Option<&[&str]>,
        case_id: Option<&str>,
    ) -> Node {
        let normalized = normalize_label(label);

        let Some(existing) = self.find_match(node_type, &normalized, &properties, match_properties)
        else {
            let case_ids: Vec<String> = case_id.map(str::to_string).into_iter().collect();
            return self.add_node(node_type, label, properties, &case_ids);
        };

        if let Some(case_id) = case_id {
            self.index_case(case_id, existing);
        }
        match slot(existing.0).and_then(|i| self.nodes.get_mut(i)) {
            Some(node) => {
                if let Some(case_id) = case_id {
                    node.add_case_id(case_id);
                }
                node.updated_at = Utc::now();
                node.clone()
            }
            // The label index only holds handles of stored nodes.
            None => {
                let case_ids: Vec<String> = case_id.map(str::to_string).into_iter().collect();
                self.add_node(node_type, label, properties, &case_ids)
            }
        }
    }

    fn get_node(&self, id: NodeId) -> Option<&Node> {
        slot(id.0).and_then(|i| self.nodes.get(i))
    }

    fn get_edge(&self, id: EdgeId) -> Option<&Edge> {
        slot(id.0).and_then(|i| self.edges.get(i))
    }

    fn incident_edges(&self, node: NodeId) -> Vec<&Edge> {
        slot(node.0)
            .and_then(|i| self.adjacency.get(i))
            .into_iter()
            .flatten()
            .filter_map(|e| self.get_edge(*e))
            .collect()
    }

    fn get_case_nodes(&self, case_id: &str) -> Vec<&Node> {
        self.case_index
            .get(case_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.get_node(*id))
            .collect()
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

// =============================================================================
// SERIALIZATION SUPPORT
// =============================================================================

/// Serializable representation of the graph for consumers and CLI export.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl From<&Graph> for GraphSnapshot {
    fn from(graph: &Graph) -> Self {
        graph.snapshot()
    }
}

impl From<GraphSnapshot> for Graph {
    fn from(snapshot: GraphSnapshot) -> Self {
        Graph::from_snapshot(snapshot)
    }
}

// =============================================================================
// TESTS
// =============================================================================
