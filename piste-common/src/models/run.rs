//! Run (piste) records

use geo::{Geometry, Point};
use serde::{Deserialize, Serialize};

use super::{Activity, SkiAreaRef};

/// Difficulty rating declared by the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Novice,
    Easy,
    Intermediate,
    Advanced,
    Expert,
    Freeride,
    Extreme,
}

/// A single run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunObject {
    /// Stable content-derived identifier, immutable
    pub key: String,

    pub geometry: Geometry<f64>,

    /// Elevation per geometry vertex, filled by the external elevation
    /// enrichment stage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation_profile: Option<Vec<f64>>,

    #[serde(default)]
    pub activities: Vec<Activity>,

    #[serde(default)]
    pub ski_areas: Vec<SkiAreaRef>,

    /// Eligible seed for ski-area generation
    pub is_basis_for_new_ski_area: bool,

    pub is_in_ski_area_polygon: bool,

    pub is_in_ski_area_site: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,

    /// Per-geometry sample points consumed by the external snow-cover
    /// statistics collaborator
    #[serde(default)]
    pub sample_points: Vec<Point<f64>>,

    /// Opaque source payload, carried through unchanged
    #[serde(default)]
    pub properties: serde_json::Value,
}

/// Partial, key-addressed update of a run
#[derive(Debug, Clone, Default)]
pub struct RunPatch {
    pub is_basis_for_new_ski_area: Option<bool>,
}
