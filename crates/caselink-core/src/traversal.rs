//! # Traversal Module
//!
//! Bounded multi-hop neighbor discovery over the graph's adjacency.
//!
//! Edges are followed in both directions. Every traversal is capped at
//! `MAX_TRAVERSAL_DEPTH` and can optionally carry a deadline so very large
//! graphs cannot stall a caller.

use crate::graph::GraphStore;
use crate::primitives::{CASE_ID_PROPERTY, MAX_TRAVERSAL_DEPTH};
use crate::types::{CaseGraphError, Edge, EdgeType, Node, NodeId, NodeType};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::time::{Duration, Instant};
use tracing::debug;

/// A node reached by a traversal, with the edge it was first reached over.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reached<'a> {
    pub node: &'a Node,
    pub edge: &'a Edge,
    /// Hop count from the start node (start itself is depth 0 and not emitted).
    pub depth: usize,
}

/// A case reachable from another case through shared entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelatedCase {
    pub case_id: String,
    pub node: NodeId,
    pub depth: usize,
}

/// Clamp a requested depth to `MAX_TRAVERSAL_DEPTH`.
fn capped_depth(requested: usize) -> usize {
    if requested > MAX_TRAVERSAL_DEPTH {
        debug!(requested, cap = MAX_TRAVERSAL_DEPTH, "traversal depth capped");
    }
    requested.min(MAX_TRAVERSAL_DEPTH)
}

fn check_deadline(deadline: Option<Instant>) -> Result<(), CaseGraphError> {
    match deadline {
        Some(limit) if Instant::now() >= limit => Err(CaseGraphError::DeadlineExceeded),
        _ => Ok(()),
    }
}

/// Level-synchronous BFS from `start`.
///
/// Each node is emitted once, at its minimum depth, paired with the first
/// edge that reached it.
pub fn bounded_bfs<'g, G: GraphStore>(
    graph: &'g G,
    start: NodeId,
    edge_types: Option<&[EdgeType]>,
    max_depth: usize,
    deadline: Option<Instant>,
) -> Result<Vec<Reached<'g>>, CaseGraphError> {
    if graph.get_node(start).is_none() {
        return Err(CaseGraphError::NodeNotFound(start));
    }
    let max_depth = capped_depth(max_depth);

    let mut visited = BTreeSet::from([start]);
    let mut frontier = vec![start];
    let mut depth = 0usize;
    let mut reached = Vec::new();

    while !frontier.is_empty() && depth < max_depth {
        let mut next = Vec::new();
        for &current in &frontier {
            check_deadline(deadline)?;
            for edge in graph.incident_edges(current) {
                if edge_types.is_some_and(|types| !types.contains(&edge.edge_type)) {
                    continue;
                }
                let Some(other) = edge.other_end(current) else {
                    continue;
                };
                if !visited.insert(other) {
                    continue;
                }
                if let Some(node) = graph.get_node(other) {
                    reached.push(Reached {
                        node,
                        edge,
                        depth: depth.saturating_add(1),
                    });
                    next.push(other);
                }
            }
        }
        frontier = next;
        depth = depth.saturating_add(1);
    }

    Ok(reached)
}

// =============================================================================
// TRAVERSAL QUERY
// =============================================================================

/// A structured traversal with optional edge filter and timeout.
#[derive(Debug, Clone, Default)]
pub struct Traversal {
    pub max_depth: usize,
    pub edge_types: Option<Vec<EdgeType>>,
    pub timeout: Option<Duration>,
}

impl Traversal {
    /// Traverse every edge type up to `max_depth` hops.
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            ..Self::default()
        }
    }

    /// Restrict the traversal to the given edge types.
    #[must_use]
    pub fn with_edge_types(mut self, edge_types: Vec<EdgeType>) -> Self {
        self.edge_types = Some(edge_types);
        self
    }

    /// Abort with `DeadlineExceeded` once `timeout` has elapsed.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn deadline(&self) -> Option<Instant> {
        self.timeout.and_then(|t| Instant::now().checked_add(t))
    }

    /// Run the traversal from `start`.
    pub fn run<'g, G: GraphStore>(
        &self,
        graph: &'g G,
        start: NodeId,
    ) -> Result<Vec<Reached<'g>>, CaseGraphError> {
        bounded_bfs(
            graph,
            start,
            self.edge_types.as_deref(),
            self.max_depth,
            self.deadline(),
        )
    }

    /// Cases reachable from the `Case` node `start`, nearest first.
    pub fn related_cases<G: GraphStore>(
        &self,
        graph: &G,
        start: NodeId,
    ) -> Result<Vec<RelatedCase>, CaseGraphError> {
        let mut related: Vec<RelatedCase> = self
            .run(graph, start)?
            .into_iter()
            .filter(|r| r.node.node_type == NodeType::Case)
            .map(|r| RelatedCase {
                case_id: case_id_of(r.node),
                node: r.node.id,
                depth: r.depth,
            })
            .collect();
        related.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.case_id.cmp(&b.case_id)));
        Ok(related)
    }

    /// Shortest hop path from `from` to `to`, inclusive of both ends.
    ///
    /// Returns `Ok(None)` when `to` is not reachable within `max_depth`.
    pub fn hop_path<G: GraphStore>(
        &self,
        graph: &G,
        from: NodeId,
        to: NodeId,
    ) -> Result<Option<Vec<NodeId>>, CaseGraphError> {
        if graph.get_node(from).is_none() {
            return Err(CaseGraphError::NodeNotFound(from));
        }
        if graph.get_node(to).is_none() {
            return Err(CaseGraphError::NodeNotFound(to));
        }
        if from == to {
            return Ok(Some(vec![from]));
        }

        let max_depth = capped_depth(self.max_depth);
        let deadline = self.deadline();
        let mut prev: BTreeMap<NodeId, NodeId> = BTreeMap::new();
        let mut visited = BTreeSet::from([from]);
        let mut queue = VecDeque::from([(from, 0usize)]);

        while let Some((current, depth)) = queue.pop_front() {
            check_deadline(deadline)?;
            if depth >= max_depth {
                continue;
            }
            for edge in graph.incident_edges(current) {
                if self
                    .edge_types
                    .as_ref()
                    .is_some_and(|types| !types.contains(&edge.edge_type))
                {
                    continue;
                }
                let Some(other) = edge.other_end(current) else {
                    continue;
                };
                if !visited.insert(other) {
                    continue;
                }
                prev.insert(other, current);
                if other == to {
                    return Ok(Some(rebuild_path(&prev, from, to)));
                }
                queue.push_back((other, depth.saturating_add(1)));
            }
        }

        Ok(None)
    }
}

fn rebuild_path(prev: &BTreeMap<NodeId, NodeId>, from: NodeId, to: NodeId) -> Vec<NodeId> {
    let mut path = vec![to];
    let mut current = to;
    while current != from {
        match prev.get(&current) {
            Some(&p) => {
                path.push(p);
                current = p;
            }
            None => break,
        }
    }
    path.reverse();
    path
}

/// Case identifier carried by a `Case` node.
fn case_id_of(node: &Node) -> String {
    node.properties
        .get(CASE_ID_PROPERTY)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .or_else(|| node.case_ids.first().cloned())
        .unwrap_or_else(|| node.label.clone())
}

// =============================================================================
// TESTS
// =============================================================================
