//! Lift records

use geo::Geometry;
use serde::{Deserialize, Serialize};

use super::{Activity, SkiAreaRef};

/// Lift type tag declared by the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiftType {
    CableCar,
    Gondola,
    MixedLift,
    ChairLift,
    DragLift,
    TBar,
    JBar,
    Platter,
    RopeTow,
    MagicCarpet,
    Funicular,
}

/// A single lift
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiftObject {
    /// Stable content-derived identifier, immutable
    pub key: String,

    pub geometry: Geometry<f64>,

    /// Elevation per geometry vertex, filled by the external elevation
    /// enrichment stage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation_profile: Option<Vec<f64>>,

    pub lift_type: LiftType,

    #[serde(default)]
    pub activities: Vec<Activity>,

    #[serde(default)]
    pub ski_areas: Vec<SkiAreaRef>,

    pub is_in_ski_area_polygon: bool,

    pub is_in_ski_area_site: bool,

    /// Opaque source payload, carried through unchanged
    #[serde(default)]
    pub properties: serde_json::Value,
}
