//! # Validation Tier Tests (T0-T5)
//!
//! If ANY tier fails, the engine is INVALID.
//!
//! ## Tiers
//! - T0: Case Ingestion
//! - T1: Entity Deduplication
//! - T2: Edge Atomicity
//! - T3: Bounded Traversal
//! - T4: Similarity Scoring
//! - T5: Linking and Clustering

use caselink_core::{
    CaseExpander, CaseGraphError, CaseLinker, CasePayload, CaseRecord, EdgeType, Graph, GraphStore,
    Investigation, LinkState, Location, NodeId, NodeType, Properties, SimilarityScorer, Traversal,
};
use std::collections::BTreeSet;

fn mo_case(id: &str, mo: &[&str]) -> CaseRecord {
    CaseRecord::new(
        id,
        CasePayload {
            mo_patterns: mo.iter().map(|s| s.to_string()).collect(),
            ..CasePayload::default()
        },
    )
}

// =============================================================================
// TIER T0: CASE INGESTION
// =============================================================================

mod t0_case_ingestion {
    use super::*;

    /// T0.1: A JSON case record expands into the documented node set.
    #[test]
    fn json_record_expands() {
        let record: CaseRecord = serde_json::from_str(
            r#"{
                "case_id": "PB-2024-001",
                "suspects": ["J. Doe", {"name": "R. Roe", "alias": "Ghost"}],
                "victims": ["A. Smith"],
                "location": {"lat": 26.7753, "lng": -80.0583, "address": "100 Clematis St"},
                "mo_patterns": ["forced_entry", "night"],
                "time_of_day": "night"
            }"#,
        )
        .expect("parse");

        let mut graph = Graph::new();
        let nodes =
            CaseExpander::expand_from_case(&mut graph, &record.case_id, &record.payload).expect("expand");

        assert_eq!(nodes.len(), 7);
        assert_eq!(graph.nodes_of_type(NodeType::Suspect).len(), 2);
        let ghost = graph
            .nodes_of_type(NodeType::Suspect)
            .into_iter()
            .find(|n| n.label == "R. Roe")
            .expect("R. Roe");
        assert_eq!(ghost.properties.get("alias"), Some(&"Ghost".into()));

        let location = &graph.nodes_of_type(NodeType::Location)[0];
        assert_eq!(location.label, "100 Clematis St");
        assert_eq!(location.properties.get("lat"), Some(&26.7753.into()));
    }

    /// T0.2: Blank case ids are rejected before any mutation.
    #[test]
    fn blank_case_id_rejected() {
        let mut inv = Investigation::new();
        let result = inv.ingest_case(mo_case("", &["night"]));
        assert!(matches!(result, Err(CaseGraphError::InvalidCase(_))));
        assert_eq!(inv.graph().node_count(), 0);
        assert_eq!(inv.cases().count(), 0);
    }

    /// T0.3: Every node created for a case is indexed under that case.
    #[test]
    fn case_nodes_are_indexed() {
        let mut graph = Graph::new();
        let payload = CasePayload {
            suspects: vec!["J. Doe".into()],
            weapons: vec!["crowbar".into()],
            ..CasePayload::default()
        };
        let nodes = CaseExpander::expand_from_case(&mut graph, "A", &payload).expect("expand");
        let indexed: BTreeSet<NodeId> = graph.get_case_nodes("A").iter().map(|n| n.id).collect();
        let created: BTreeSet<NodeId> = nodes.iter().map(|n| n.id).collect();
        assert_eq!(indexed, created);
    }
}

// =============================================================================
// TIER T1: ENTITY DEDUPLICATION
// =============================================================================

mod t1_entity_dedup {
    use super::*;

    /// T1.1: The same suspect named in two cases is one node in both cases.
    #[test]
    fn suspect_shared_across_cases() {
        let mut graph = Graph::new();
        for (case, name) in [("A", "John Smith"), ("B", "  john smith ")] {
            let payload = CasePayload {
                suspects: vec![name.into()],
                ..CasePayload::default()
            };
            CaseExpander::expand_from_case(&mut graph, case, &payload).expect("expand");
        }

        let suspects = graph.nodes_of_type(NodeType::Suspect);
        assert_eq!(suspects.len(), 1);
        assert_eq!(suspects[0].label, "John Smith");
        assert_eq!(suspects[0].case_ids, vec!["A".to_string(), "B".to_string()]);
    }

    /// T1.2: Equal labels of different types stay distinct.
    #[test]
    fn type_is_part_of_identity() {
        let mut graph = Graph::new();
        let a = graph.find_or_create_node(NodeType::Suspect, "Pat", Properties::new(), None, None);
        let b = graph.find_or_create_node(NodeType::Witness, "Pat", Properties::new(), None, None);
        assert_ne!(a.id, b.id);
    }

    /// T1.3: Case nodes are matched by their case id property.
    #[test]
    fn case_node_is_unique_per_case_id() {
        let mut graph = Graph::new();
        CaseExpander::expand_from_case(&mut graph, "A", &CasePayload::default()).expect("expand");
        CaseExpander::expand_from_case(&mut graph, "A", &CasePayload::default()).expect("expand");
        CaseExpander::expand_from_case(&mut graph, "B", &CasePayload::default()).expect("expand");
        assert_eq!(graph.nodes_of_type(NodeType::Case).len(), 2);
    }
}

// =============================================================================
// TIER T2: EDGE ATOMICITY
// =============================================================================

mod t2_edge_atomicity {
    use super::*;

    /// T2.1: An edge from an unknown source fails and changes nothing.
    #[test]
    fn unknown_source_is_rejected() {
        let mut graph = Graph::new();
        let target = graph.add_node(NodeType::Case, "A", Properties::new(), &[]);
        let (nodes, edges) = (graph.node_count(), graph.edge_count());

        let result = graph.add_edge(
            EdgeType::SuspectOf,
            NodeId(999),
            target.id,
            1.0,
            1.0,
            Properties::new(),
        );

        assert!(matches!(result, Err(CaseGraphError::NodeNotFound(NodeId(999)))));
        assert_eq!(graph.node_count(), nodes);
        assert_eq!(graph.edge_count(), edges);
        assert!(graph.incident_edges(target.id).is_empty());
    }

    /// T2.2: Adjacency sees every edge from both ends.
    #[test]
    fn adjacency_is_bidirectional() {
        let mut graph = Graph::new();
        let a = graph.add_node(NodeType::Suspect, "x", Properties::new(), &[]);
        let b = graph.add_node(NodeType::Case, "y", Properties::new(), &[]);
        let edge = graph
            .add_edge(EdgeType::SuspectOf, a.id, b.id, 0.5, 0.9, Properties::new())
            .expect("edge");

        assert_eq!(graph.incident_edges(a.id)[0].id, edge.id);
        assert_eq!(graph.incident_edges(b.id)[0].id, edge.id);
    }
}

// =============================================================================
// TIER T3: BOUNDED TRAVERSAL
// =============================================================================

mod t3_traversal {
    use super::*;

    fn two_linked_cases() -> (Graph, NodeId, NodeId) {
        let mut graph = Graph::new();
        for case in ["A", "B"] {
            let payload = CasePayload {
                vehicles: vec!["white van".into()],
                ..CasePayload::default()
            };
            CaseExpander::expand_from_case(&mut graph, case, &payload).expect("expand");
        }
        let a = graph.case_node("A").expect("A").id;
        let b = graph.case_node("B").expect("B").id;
        (graph, a, b)
    }

    /// T3.1: The other case is two hops away through the shared vehicle.
    #[test]
    fn case_to_case_through_entity() {
        let (graph, a, b) = two_linked_cases();
        let reached = graph.get_connected_nodes(a, None, 2).expect("bfs");
        let depth_of_b = reached.iter().find(|r| r.node.id == b).map(|r| r.depth);
        assert_eq!(depth_of_b, Some(2));

        let one_hop = graph.get_connected_nodes(a, None, 1).expect("bfs");
        assert!(one_hop.iter().all(|r| r.node.id != b));
    }

    /// T3.2: An edge type filter that excludes the shared edge blocks the path.
    #[test]
    fn edge_filter_blocks_path() {
        let (graph, a, _) = two_linked_cases();
        let reached = graph
            .get_connected_nodes(a, Some(&[EdgeType::SuspectOf]), 4)
            .expect("bfs");
        assert!(reached.is_empty());
    }

    /// T3.3: The hop path runs case, vehicle, case.
    #[test]
    fn hop_path_through_entity() {
        let (graph, a, b) = two_linked_cases();
        let path = Traversal::new(4).hop_path(&graph, a, b).expect("path").expect("reachable");
        assert_eq!(path.len(), 3);
        assert_eq!(
            graph.get_node(path[1]).map(|n| n.node_type),
            Some(NodeType::Vehicle)
        );
    }
}

// =============================================================================
// TIER T4: SIMILARITY SCORING
// =============================================================================

mod t4_similarity {
    use super::*;
    use caselink_core::primitives::EARTH_RADIUS_KM;

    /// T4.1: Two of three shared MO patterns give 2/3.
    #[test]
    fn mo_two_of_three() {
        let a = mo_case("A", &["forced_entry", "night"]);
        let b = mo_case("B", &["forced_entry", "night", "weapon"]);
        let result = SimilarityScorer::new().score(&a, &b);
        assert!((result.mo - 2.0 / 3.0).abs() < 1e-9);
    }

    /// T4.2: Five kilometres apart scores 0.90.
    #[test]
    fn five_km_is_point_nine() {
        let km_per_degree = EARTH_RADIUS_KM * std::f64::consts::PI / 180.0;
        let mut a = mo_case("A", &[]);
        a.payload.location = Some(Location::at(26.7753, -80.0583));
        let mut b = mo_case("B", &[]);
        b.payload.location = Some(Location::at(26.7753 + 5.0 / km_per_degree, -80.0583));

        let result = SimilarityScorer::new().score(&a, &b);
        assert!((result.geographic - 0.90).abs() < 1e-6);
    }

    /// T4.3: Scores are symmetric and within bounds.
    #[test]
    fn symmetric_and_bounded() {
        let mut a = mo_case("A", &["forced_entry", "night"]);
        a.payload.behaviors = vec!["bound_victim".to_string()];
        a.payload.location = Some(Location::at(40.0, -74.0));
        let mut b = mo_case("B", &["night"]);
        b.payload.location = Some(Location::at(40.1, -74.2));

        let scorer = SimilarityScorer::new();
        let (ab, ba) = (scorer.score(&a, &b), scorer.score(&b, &a));
        assert_eq!(ab.overall, ba.overall);
        assert_eq!(ab.geographic, ba.geographic);
        assert!((0.0..=1.0).contains(&ab.overall));
    }
}

// =============================================================================
// TIER T5: LINKING AND CLUSTERING
// =============================================================================

mod t5_linking {
    use super::*;

    /// T5.1: A-B and B-C link, A-C do not, and the cluster holds all three.
    #[test]
    fn transitive_cluster() {
        let cases = vec![
            mo_case("A", &["a", "b"]),
            mo_case("B", &["a", "b", "c", "d"]),
            mo_case("C", &["c", "d"]),
        ];
        let mut linker = CaseLinker::new();
        let links = linker.analyze_and_link(&cases, &SimilarityScorer::new(), 0.15);

        assert_eq!(links.len(), 2);
        assert!(links.iter().all(|l| l.state == LinkState::Pending));
        assert!(!links.iter().any(|l| l.involves("A") && l.involves("C")));

        let expected: BTreeSet<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
        assert_eq!(linker.find_case_clusters(3), vec![expected]);
    }

    /// T5.2: Confirmation then rejection of the same link fails.
    #[test]
    fn lifecycle_is_one_way() {
        let mut inv = Investigation::new();
        inv.ingest_cases([mo_case("A", &["x", "y"]), mo_case("B", &["x", "y"])])
            .expect("ingest");
        let links = inv.link_all(0.3).expect("link");
        assert_eq!(links.len(), 1);

        inv.confirm_link(links[0].id, "det. ramos").expect("confirm");
        assert!(inv.reject_link(links[0].id, "sgt. lee", "late").is_err());
        assert_eq!(inv.metrics().confirmed_links, 1);
    }
}
