//! Common object shapes: kinds, sources, memberships, and the `MapObject`
//! sum type the engines match on.

use geo::Geometry;
use serde::{Deserialize, Serialize};

use super::{Activity, LiftObject, RunObject, SkiAreaObject};

/// Kind of a map object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObjectKind {
    Run,
    Lift,
    SkiArea,
}

impl ObjectKind {
    /// Short tag used in key derivation.
    pub fn tag(&self) -> &'static str {
        match self {
            ObjectKind::Run => "run",
            ObjectKind::Lift => "lift",
            ObjectKind::SkiArea => "skiArea",
        }
    }
}

/// Which upstream source a ski area was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceType {
    /// Crowd-sourced map data (drawn outlines, site relations, runs, lifts)
    OpenStreetMap,
    /// Curated ski-area registry (point entries)
    Registry,
}

/// How an object came to belong to a ski area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssignedFrom {
    /// Contained in the ski area's drawn polygon
    Polygon,
    /// Pre-assigned by a curated site grouping
    Site,
    /// Linked by the proximity flood fill
    Proximity,
}

/// A single ski-area membership carried on a run, lift or nested ski area
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkiAreaRef {
    pub ski_area_id: String,
    pub assigned_from: AssignedFrom,
}

/// A map object of any kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MapObject {
    Run(RunObject),
    Lift(LiftObject),
    SkiArea(SkiAreaObject),
}

impl MapObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            MapObject::Run(_) => ObjectKind::Run,
            MapObject::Lift(_) => ObjectKind::Lift,
            MapObject::SkiArea(_) => ObjectKind::SkiArea,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            MapObject::Run(run) => &run.key,
            MapObject::Lift(lift) => &lift.key,
            MapObject::SkiArea(area) => &area.key,
        }
    }

    pub fn activities(&self) -> &[Activity] {
        match self {
            MapObject::Run(run) => &run.activities,
            MapObject::Lift(lift) => &lift.activities,
            MapObject::SkiArea(area) => &area.activities,
        }
    }

    /// Object geometry. Ski areas may not have one until it is synthesized
    /// from their members.
    pub fn geometry(&self) -> Option<&Geometry<f64>> {
        match self {
            MapObject::Run(run) => Some(&run.geometry),
            MapObject::Lift(lift) => Some(&lift.geometry),
            MapObject::SkiArea(area) => area.geometry.as_ref(),
        }
    }

    pub fn ski_areas(&self) -> &[SkiAreaRef] {
        match self {
            MapObject::Run(run) => &run.ski_areas,
            MapObject::Lift(lift) => &lift.ski_areas,
            MapObject::SkiArea(area) => &area.ski_areas,
        }
    }

    pub fn ski_areas_mut(&mut self) -> &mut Vec<SkiAreaRef> {
        match self {
            MapObject::Run(run) => &mut run.ski_areas,
            MapObject::Lift(lift) => &mut lift.ski_areas,
            MapObject::SkiArea(area) => &mut area.ski_areas,
        }
    }

    pub fn is_assigned(&self) -> bool {
        !self.ski_areas().is_empty()
    }

    /// Whether clustering itself placed the object in a ski area. Curated
    /// site pre-assignments do not count; a later spatial pass must still be
    /// able to see those objects to detect conflicting groupings.
    pub fn is_spatially_assigned(&self) -> bool {
        self.ski_areas()
            .iter()
            .any(|r| r.assigned_from != AssignedFrom::Site)
    }

    pub fn references_ski_area(&self, ski_area_id: &str) -> bool {
        self.ski_areas().iter().any(|r| r.ski_area_id == ski_area_id)
    }

    /// Whether the object was pre-assigned by a curated site grouping.
    /// Always false for ski areas themselves.
    pub fn is_in_ski_area_site(&self) -> bool {
        match self {
            MapObject::Run(run) => run.is_in_ski_area_site,
            MapObject::Lift(lift) => lift.is_in_ski_area_site,
            MapObject::SkiArea(_) => false,
        }
    }
}
