//! # Case Expander
//!
//! Turns a raw case payload into graph nodes and edges.
//!
//! | Payload field | Node type | Edge |
//! |---------------|-----------|------|
//! | suspects | Suspect | `SuspectOf(suspect → case)` |
//! | victims | Victim | `VictimOf(victim → case)` |
//! | witnesses | Witness | `Witnessed(witness → case)` |
//! | location | Location | `FoundAt(case → location)` |
//! | evidence | Evidence | `LinkedTo(evidence → case)` |
//! | mo_patterns | MOPattern | `MOMatch(case → pattern)` |
//! | behaviors | Behavior | `BehavioralMatch(case → behavior)` |
//! | vehicles | Vehicle | `AssociatedWith(case → vehicle)` |
//! | weapons | Weapon | `AssociatedWith(case → weapon)` |
//!
//! Expansion is idempotent for nodes (find-or-create) but not for edges:
//! expanding the same payload twice adds a second set of parallel edges.

use crate::graph::GraphStore;
use crate::payload::{CasePayload, EntityEntry};
use crate::primitives::{CASE_ID_PROPERTY, MAX_CASE_ID_LENGTH, MAX_LABEL_LENGTH};
use crate::types::{CaseGraphError, EdgeType, Node, NodeId, NodeType, Properties};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Which way the relationship edge points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    EntityToCase,
    CaseToEntity,
}

/// Collects touched nodes once each, in first-touch order.
struct Touched {
    seen: BTreeSet<NodeId>,
    nodes: Vec<Node>,
}

impl Touched {
    fn push(&mut self, node: Node) {
        if self.seen.insert(node.id) {
            self.nodes.push(node);
        }
    }
}

/// Converts case payloads into graph structure.
pub struct CaseExpander;

impl CaseExpander {
    /// A case id must be non-blank and at most `MAX_CASE_ID_LENGTH` bytes.
    pub fn validate_case_id(case_id: &str) -> Result<(), CaseGraphError> {
        if case_id.trim().is_empty() {
            return Err(CaseGraphError::InvalidCase("case id is blank".to_string()));
        }
        if case_id.len() > MAX_CASE_ID_LENGTH {
            return Err(CaseGraphError::InvalidCase(format!(
                "case id exceeds {} bytes",
                MAX_CASE_ID_LENGTH
            )));
        }
        Ok(())
    }

    /// Expand `payload` into `graph` under `case_id`.
    ///
    /// Returns the case node followed by every entity node the payload
    /// touched, each once. Blank or over-long entity labels are skipped.
    pub fn expand_from_case<G: GraphStore>(
        graph: &mut G,
        case_id: &str,
        payload: &CasePayload,
    ) -> Result<Vec<Node>, CaseGraphError> {
        Self::validate_case_id(case_id)?;

        let mut case_props = Properties::new();
        case_props.insert(CASE_ID_PROPERTY.to_string(), case_id.into());
        for (key, value) in [
            ("date", &payload.date),
            ("time_of_day", &payload.time_of_day),
            ("day_of_week", &payload.day_of_week),
        ] {
            if let Some(value) = value {
                case_props.insert(key.to_string(), value.as_str().into());
            }
        }
        let case_node = graph.find_or_create_node(
            NodeType::Case,
            case_id,
            case_props,
            Some(&[CASE_ID_PROPERTY]),
            Some(case_id),
        );
        let case = case_node.id;

        let mut touched = Touched {
            seen: BTreeSet::new(),
            nodes: Vec::new(),
        };
        touched.push(case_node);

        let entity_groups: [(&[EntityEntry], NodeType, EdgeType, Direction); 6] = [
            (payload.suspects.as_slice(), NodeType::Suspect, EdgeType::SuspectOf, Direction::EntityToCase),
            (payload.victims.as_slice(), NodeType::Victim, EdgeType::VictimOf, Direction::EntityToCase),
            (payload.witnesses.as_slice(), NodeType::Witness, EdgeType::Witnessed, Direction::EntityToCase),
            (payload.evidence.as_slice(), NodeType::Evidence, EdgeType::LinkedTo, Direction::EntityToCase),
            (payload.vehicles.as_slice(), NodeType::Vehicle, EdgeType::AssociatedWith, Direction::CaseToEntity),
            (payload.weapons.as_slice(), NodeType::Weapon, EdgeType::AssociatedWith, Direction::CaseToEntity),
        ];
        for (entries, node_type, edge_type, direction) in entity_groups {
            for entry in entries {
                let node = Self::attach(
                    graph,
                    case_id,
                    case,
                    node_type,
                    entry.label(),
                    entry.properties(),
                    edge_type,
                    direction,
                )?;
                touched.extend(node);
            }
        }

        if let Some(location) = &payload.location
            && let Some(label) = location.label()
        {
            let mut props = Properties::new();
            if let Some((lat, lng)) = location.coordinates() {
                props.insert("lat".to_string(), lat.into());
                props.insert("lng".to_string(), lng.into());
            }
            if let Some(address) = &location.address {
                props.insert("address".to_string(), address.as_str().into());
            }
            let node = Self::attach(
                graph,
                case_id,
                case,
                NodeType::Location,
                &label,
                props,
                EdgeType::FoundAt,
                Direction::CaseToEntity,
            )?;
            touched.extend(node);
        }

        let tag_groups: [(&[String], NodeType, EdgeType); 2] = [
            (payload.mo_patterns.as_slice(), NodeType::MOPattern, EdgeType::MOMatch),
            (payload.behaviors.as_slice(), NodeType::Behavior, EdgeType::BehavioralMatch),
        ];
        for (tags, node_type, edge_type) in tag_groups {
            for tag in tags {
                let node = Self::attach(
                    graph,
                    case_id,
                    case,
                    node_type,
                    tag,
                    Properties::new(),
                    edge_type,
                    Direction::CaseToEntity,
                )?;
                touched.extend(node);
            }
        }

        debug!(case_id, nodes = touched.nodes.len(), "case expanded");
        Ok(touched.nodes)
    }

    #[allow(clippy::too_many_arguments)]
    fn attach<G: GraphStore>(
        graph: &mut G,
        case_id: &str,
        case: NodeId,
        node_type: NodeType,
        label: &str,
        properties: Properties,
        edge_type: EdgeType,
        direction: Direction,
    ) -> Result<Option<Node>, CaseGraphError> {
        let label = label.trim();
        if label.is_empty() {
            return Ok(None);
        }
        if label.len() > MAX_LABEL_LENGTH {
            warn!(case_id, node_type = %node_type, "skipping entity with over-long label");
            return Ok(None);
        }

        let node = graph.find_or_create_node(node_type, label, properties, None, Some(case_id));
        let (source, target) = match direction {
            Direction::EntityToCase => (node.id, case),
            Direction::CaseToEntity => (case, node.id),
        };
        graph.add_edge(edge_type, source, target, 1.0, 1.0, Properties::new())?;
        Ok(Some(node))
    }
}

impl Extend<Node> for Touched {
    fn extend<I: IntoIterator<Item = Node>>(&mut self, iter: I) {
        for node in iter {
            self.push(node);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::payload::Location;

    fn payload() -> CasePayload {
        CasePayload {
            suspects: vec!["J. Doe".into()],
            victims: vec!["A. Smith".into()],
            location: Some(Location::at(26.7753, -80.0583)),
            evidence: vec!["shoe print".into(), "".into()],
            mo_patterns: vec!["forced_entry".to_string(), "night".to_string()],
            behaviors: vec!["took_trophy".to_string()],
            ..CasePayload::default()
        }
    }

    #[test]
    fn expansion_creates_documented_edges() {
        let mut graph = Graph::new();
        let nodes = CaseExpander::expand_from_case(&mut graph, "PB-1", &payload()).expect("expand");

        // case, suspect, victim, evidence, location, 2 MO, 1 behavior
        assert_eq!(nodes.len(), 8);
        assert_eq!(nodes[0].node_type, NodeType::Case);
        assert_eq!(graph.node_count(), 8);
        assert_eq!(graph.edge_count(), 7);

        let case = nodes[0].id;
        let suspect = graph.nodes_of_type(NodeType::Suspect)[0].id;
        let location = graph.nodes_of_type(NodeType::Location)[0].id;

        let suspect_edges = graph.edges_between(suspect, case);
        assert_eq!(suspect_edges.len(), 1);
        assert_eq!(suspect_edges[0].edge_type, EdgeType::SuspectOf);
        assert_eq!(suspect_edges[0].source_id, suspect);

        let location_edges = graph.edges_between(case, location);
        assert_eq!(location_edges[0].edge_type, EdgeType::FoundAt);
        assert_eq!(location_edges[0].source_id, case);
    }

    #[test]
    fn re_expansion_reuses_nodes_but_adds_edges() {
        let mut graph = Graph::new();
        CaseExpander::expand_from_case(&mut graph, "PB-1", &payload()).expect("expand");
        CaseExpander::expand_from_case(&mut graph, "PB-1", &payload()).expect("expand");

        assert_eq!(graph.node_count(), 8);
        assert_eq!(graph.edge_count(), 14);
        assert_eq!(graph.unique_edges().len(), 7);
    }

    #[test]
    fn shared_entities_across_cases() {
        let mut graph = Graph::new();
        CaseExpander::expand_from_case(&mut graph, "PB-1", &payload()).expect("expand");
        let other = CasePayload {
            suspects: vec!["j. doe".into()],
            mo_patterns: vec!["Night".to_string()],
            ..CasePayload::default()
        };
        CaseExpander::expand_from_case(&mut graph, "PB-2", &other).expect("expand");

        let shared: Vec<&str> = graph
            .find_shared_entities("PB-1", "PB-2")
            .iter()
            .map(|n| n.label.as_str())
            .collect();
        assert_eq!(shared, vec!["J. Doe", "night"]);
    }

    #[test]
    fn invalid_case_id_leaves_graph_untouched() {
        let mut graph = Graph::new();
        let result = CaseExpander::expand_from_case(&mut graph, "   ", &payload());
        assert!(matches!(result, Err(CaseGraphError::InvalidCase(_))));

        let long_id = "x".repeat(MAX_CASE_ID_LENGTH + 1);
        assert!(CaseExpander::expand_from_case(&mut graph, &long_id, &payload()).is_err());
        assert_eq!(graph.node_count(), 0);
    }

    #[test]
    fn empty_payload_yields_only_case_node() {
        let mut graph = Graph::new();
        let nodes =
            CaseExpander::expand_from_case(&mut graph, "PB-9", &CasePayload::default()).expect("expand");
        assert_eq!(nodes.len(), 1);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.case_node("PB-9").map(|n| n.id), Some(nodes[0].id));
    }
}
