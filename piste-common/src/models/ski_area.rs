//! Ski-area records

use geo::Geometry;
use serde::{Deserialize, Serialize};

use super::{Activity, SkiAreaRef, SourceType};

/// Provenance entry recording which source feature contributed to a ski area
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkiAreaSource {
    pub source_type: SourceType,
    pub id: String,
}

/// Ski-area properties: the named payload plus anything the source carried
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkiAreaProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Provenance list; merge targets accumulate the sources of every ski
    /// area merged into them
    #[serde(default)]
    pub sources: Vec<SkiAreaSource>,

    /// Remaining opaque source fields, carried through unchanged
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A single ski area
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkiAreaObject {
    /// Stable identifier, immutable
    pub key: String,

    /// Source-provided polygon, synthesized point, or None until one of the
    /// two exists. Ski areas still lacking geometry at the end of the
    /// pipeline are deleted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry<f64>>,

    pub source: SourceType,

    pub is_polygon: bool,

    #[serde(default)]
    pub activities: Vec<Activity>,

    /// Nested memberships: a ski area discovered by another ski area's
    /// flood fill becomes its member
    #[serde(default)]
    pub ski_areas: Vec<SkiAreaRef>,

    #[serde(default)]
    pub properties: SkiAreaProperties,
}

/// Partial, key-addressed update of a ski area
#[derive(Debug, Clone, Default)]
pub struct SkiAreaPatch {
    pub activities: Option<Vec<Activity>>,
    pub geometry: Option<Geometry<f64>>,
    pub is_polygon: Option<bool>,
    pub properties: Option<SkiAreaProperties>,
}
