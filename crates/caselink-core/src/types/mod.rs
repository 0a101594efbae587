//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the caselink CORE:
//! - Arena handles (`NodeId`, `EdgeId`, `LinkId`)
//! - Typed node and edge kinds (`NodeType`, `EdgeType`)
//! - Stored records (`Node`, `Edge`)
//! - Error types (`CaseGraphError`)
//!
//! Handles are plain integers assigned from monotonically increasing counters.
//! They are never reused, so a handle held by a caller can only go stale by
//! pointing at a record that was never created.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Free-form node and edge properties.
pub type Properties = BTreeMap<String, serde_json::Value>;

// =============================================================================
// HANDLES
// =============================================================================

/// Handle of a node in the graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

/// Handle of an edge in the graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub u64);

/// Handle of a case link record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link-{}", self.0)
    }
}

// =============================================================================
// NODE & EDGE KINDS
// =============================================================================

/// Kind of real-world entity a node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Case,
    Suspect,
    Victim,
    Witness,
    Evidence,
    Location,
    Vehicle,
    Weapon,
    Organization,
    Phone,
    Address,
    Behavior,
    #[serde(rename = "mo_pattern")]
    MOPattern,
}

impl NodeType {
    /// Every node type, in declaration order.
    pub const ALL: [NodeType; 13] = [
        NodeType::Case,
        NodeType::Suspect,
        NodeType::Victim,
        NodeType::Witness,
        NodeType::Evidence,
        NodeType::Location,
        NodeType::Vehicle,
        NodeType::Weapon,
        NodeType::Organization,
        NodeType::Phone,
        NodeType::Address,
        NodeType::Behavior,
        NodeType::MOPattern,
    ];

    /// Stable snake_case name, identical to the serde representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Case => "case",
            NodeType::Suspect => "suspect",
            NodeType::Victim => "victim",
            NodeType::Witness => "witness",
            NodeType::Evidence => "evidence",
            NodeType::Location => "location",
            NodeType::Vehicle => "vehicle",
            NodeType::Weapon => "weapon",
            NodeType::Organization => "organization",
            NodeType::Phone => "phone",
            NodeType::Address => "address",
            NodeType::Behavior => "behavior",
            NodeType::MOPattern => "mo_pattern",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of relationship an edge records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    InvolvedIn,
    LinkedTo,
    FoundAt,
    Owns,
    AssociatedWith,
    Witnessed,
    Contacted,
    SimilarTo,
    TemporalProximity,
    GeographicProximity,
    BehavioralMatch,
    #[serde(rename = "mo_match")]
    MOMatch,
    SuspectOf,
    VictimOf,
}

impl EdgeType {
    /// Every edge type, in declaration order.
    pub const ALL: [EdgeType; 14] = [
        EdgeType::InvolvedIn,
        EdgeType::LinkedTo,
        EdgeType::FoundAt,
        EdgeType::Owns,
        EdgeType::AssociatedWith,
        EdgeType::Witnessed,
        EdgeType::Contacted,
        EdgeType::SimilarTo,
        EdgeType::TemporalProximity,
        EdgeType::GeographicProximity,
        EdgeType::BehavioralMatch,
        EdgeType::MOMatch,
        EdgeType::SuspectOf,
        EdgeType::VictimOf,
    ];

    /// Stable snake_case name, identical to the serde representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::InvolvedIn => "involved_in",
            EdgeType::LinkedTo => "linked_to",
            EdgeType::FoundAt => "found_at",
            EdgeType::Owns => "owns",
            EdgeType::AssociatedWith => "associated_with",
            EdgeType::Witnessed => "witnessed",
            EdgeType::Contacted => "contacted",
            EdgeType::SimilarTo => "similar_to",
            EdgeType::TemporalProximity => "temporal_proximity",
            EdgeType::GeographicProximity => "geographic_proximity",
            EdgeType::BehavioralMatch => "behavioral_match",
            EdgeType::MOMatch => "mo_match",
            EdgeType::SuspectOf => "suspect_of",
            EdgeType::VictimOf => "victim_of",
        }
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EdgeType {
    type Err = CaseGraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        EdgeType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| CaseGraphError::ConfigError(format!("unknown edge type '{}'", s)))
    }
}

// =============================================================================
// NODE
// =============================================================================

/// A typed entity in the case graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub label: String,
    pub properties: Properties,
    /// Cases this node has been referenced by, in first-seen order. Only grows.
    pub case_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Node {
    /// Whether the node has ever been associated with `case_id`.
    #[must_use]
    pub fn belongs_to(&self, case_id: &str) -> bool {
        self.case_ids.iter().any(|c| c == case_id)
    }

    /// Append a case id if it is not already present. Returns true when appended.
    pub(crate) fn add_case_id(&mut self, case_id: &str) -> bool {
        if self.belongs_to(case_id) {
            return false;
        }
        self.case_ids.push(case_id.to_string());
        true
    }
}

// =============================================================================
// EDGE
// =============================================================================

/// A directed, typed relationship between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    pub source_id: NodeId,
    pub target_id: NodeId,
    /// Association strength in `[0, 1]`.
    pub weight: f64,
    /// Confidence in the association in `[0, 1]`.
    pub confidence: f64,
    pub properties: Properties,
    pub created_at: DateTime<Utc>,
}

impl Edge {
    /// Whether `node` is either endpoint.
    #[must_use]
    pub fn touches(&self, node: NodeId) -> bool {
        self.source_id == node || self.target_id == node
    }

    /// The endpoint opposite to `node`, or `None` if the edge does not touch it.
    #[must_use]
    pub fn other_end(&self, node: NodeId) -> Option<NodeId> {
        if self.source_id == node {
            Some(self.target_id)
        } else if self.target_id == node {
            Some(self.source_id)
        } else {
            None
        }
    }
}

/// Clamp a score into `[0, 1]`, mapping NaN to 0.
#[must_use]
pub fn clamp01(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the caselink system.
///
/// Every mutating operation either applies in full or returns one of these
/// without touching state.
#[derive(Debug, Error)]
pub enum CaseGraphError {
    /// A referenced node does not exist in the graph.
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// A link does not exist or is not in a state that allows the transition.
    #[error("Link not found or not pending: {0}")]
    LinkNotFound(LinkId),

    /// The case identifier is blank or too long.
    #[error("Invalid case: {0}")]
    InvalidCase(String),

    /// The case was never ingested.
    #[error("Unknown case: {0}")]
    UnknownCase(String),

    /// A bounded operation ran past its deadline.
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// A writer panicked while holding the shared lock.
    #[error("Shared state lock poisoned")]
    LockPoisoned,

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),

    /// Configuration could not be loaded or is out of range.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

// =============================================================================
// TESTS
// =============================================================================
