//! # Case Payloads
//!
//! The raw case shape supplied by the external case-management collaborator.
//!
//! Every field is optional. Missing data never fails deserialization or
//! scoring; it only lowers the sub-scores that depend on it.

use crate::types::Properties;
use serde::{Deserialize, Serialize};

/// A person, object or item mentioned by a case.
///
/// Accepts either a bare string (`"J. Doe"`) or an object with a `name`
/// (also read from `label` or `description`) plus arbitrary extra properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityEntry {
    Name(String),
    Detailed(EntityDetail),
}

/// Object form of an [`EntityEntry`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityDetail {
    #[serde(default, alias = "label", alias = "description")]
    pub name: String,
    #[serde(flatten)]
    pub properties: Properties,
}

impl EntityEntry {
    /// The label this entry is keyed by in the graph.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            EntityEntry::Name(name) => name,
            EntityEntry::Detailed(detail) => &detail.name,
        }
    }

    /// Extra properties carried by the object form.
    #[must_use]
    pub fn properties(&self) -> Properties {
        match self {
            EntityEntry::Name(_) => Properties::new(),
            EntityEntry::Detailed(detail) => detail.properties.clone(),
        }
    }
}

impl From<&str> for EntityEntry {
    fn from(name: &str) -> Self {
        EntityEntry::Name(name.to_string())
    }
}

/// Where a case happened.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub address: Option<String>,
}

impl Location {
    /// A location with coordinates only.
    #[must_use]
    pub fn at(lat: f64, lng: f64) -> Self {
        Self {
            lat: Some(lat),
            lng: Some(lng),
            address: None,
        }
    }

    /// Coordinates, if both are present and within valid lat/lng ranges.
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let (lat, lng) = (self.lat?, self.lng?);
        let valid = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);
        valid.then_some((lat, lng))
    }

    /// Graph label: the address when present, otherwise the rounded coordinates.
    #[must_use]
    pub fn label(&self) -> Option<String> {
        if let Some(address) = self.address.as_deref().map(str::trim)
            && !address.is_empty()
        {
            return Some(address.to_string());
        }
        self.coordinates()
            .map(|(lat, lng)| format!("{:.4},{:.4}", lat, lng))
    }
}

/// Raw case payload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CasePayload {
    #[serde(default)]
    pub suspects: Vec<EntityEntry>,
    #[serde(default)]
    pub victims: Vec<EntityEntry>,
    #[serde(default)]
    pub witnesses: Vec<EntityEntry>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub evidence: Vec<EntityEntry>,
    #[serde(default)]
    pub mo_patterns: Vec<String>,
    #[serde(default)]
    pub behaviors: Vec<String>,
    #[serde(default)]
    pub vehicles: Vec<EntityEntry>,
    #[serde(default)]
    pub weapons: Vec<EntityEntry>,
    #[serde(default)]
    pub time_of_day: Option<String>,
    #[serde(default)]
    pub day_of_week: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

/// A payload paired with the identifier of the case it describes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub case_id: String,
    #[serde(flatten)]
    pub payload: CasePayload,
}

impl CaseRecord {
    #[must_use]
    pub fn new(case_id: impl Into<String>, payload: CasePayload) -> Self {
        Self {
            case_id: case_id.into(),
            payload,
        }
    }
}
