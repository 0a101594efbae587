//! # caselink-core
//!
//! Cross-case entity graph and linking engine.
//!
//! Case payloads are expanded into a typed multigraph of people, places,
//! objects and behaviors. Cases that reference the same real-world entity
//! share a node, so investigators can traverse from one case to another.
//! On top of the graph sits a multi-factor similarity scorer and a linker
//! that proposes, confirms and rejects links and groups linked cases into
//! clusters.
//!
//! ## Architectural Constraints
//!
//! - Pure Rust: no async, no network, no persistence format
//! - Deterministic: every index iterates in key order
//! - Explicit instances: the caller owns the [`Investigation`]; nothing is global
//! - Integer handles: nodes, edges and links are addressed by id, never by pointer

// =============================================================================
// MODULES
// =============================================================================

pub mod config;
pub mod engine;
pub mod expander;
pub mod graph;
pub mod linker;
pub mod metrics;
pub mod payload;
pub mod primitives;
pub mod similarity;
pub mod traversal;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{
    CaseGraphError, Edge, EdgeId, EdgeType, LinkId, Node, NodeId, NodeType, Properties, clamp01,
};

// =============================================================================
// RE-EXPORTS: Graph Engine
// =============================================================================

pub use expander::CaseExpander;
pub use graph::{Graph, GraphSnapshot, GraphStore, MergedEdge, normalize_label};
pub use payload::{CasePayload, CaseRecord, EntityDetail, EntityEntry, Location};
pub use traversal::{Reached, RelatedCase, Traversal, bounded_bfs};

// =============================================================================
// RE-EXPORTS: Analysis
// =============================================================================

pub use config::AnalysisConfig;
pub use engine::{Investigation, SharedInvestigation};
pub use linker::{CaseLink, CaseLinker, LinkState, LinkType};
pub use metrics::GraphMetrics;
pub use similarity::{SimilarityResult, SimilarityScorer};
