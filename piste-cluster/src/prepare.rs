//! Feature preparation
//!
//! Pure mapping from raw source features to draft objects. No I/O and no
//! dependency on the store: the rules here decide activity eligibility and
//! whether a run may seed a new ski area, nothing else.

use geo::Geometry;
use piste_common::geometry;
use piste_common::keys::object_key;
use piste_common::models::{
    Activity, AssignedFrom, Difficulty, LiftObject, LiftType, ObjectKind, RunObject,
    SkiAreaObject, SkiAreaProperties, SkiAreaRef, SkiAreaSource, SourceType,
};
use serde::{Deserialize, Serialize};

use crate::config::ClusteringConfig;

/// Declared use of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunUse {
    Downhill,
    Nordic,
    Skitour,
    SnowPark,
    Sled,
    Hike,
    Connection,
    Fatbike,
}

/// Grooming classification of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunGrooming {
    Classic,
    Skating,
    ClassicAndSkating,
    Mogul,
    Scooter,
    Backcountry,
}

/// Operational status of a lift
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiftStatus {
    Operating,
    Closed,
    Disused,
    Abandoned,
    Proposed,
    UnderConstruction,
}

/// Raw run feature as parsed from a source file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRunFeature {
    pub id: String,
    #[serde(default)]
    pub uses: Vec<RunUse>,
    #[serde(default)]
    pub grooming: Option<RunGrooming>,
    #[serde(default)]
    pub patrolled: Option<bool>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    /// Source identifiers of ski areas this run is grouped into by a
    /// curated site relation
    #[serde(default)]
    pub ski_area_ids: Vec<String>,
    pub geometry: Geometry<f64>,
    #[serde(default)]
    pub elevation_profile: Option<Vec<f64>>,
    #[serde(default)]
    pub properties: serde_json::Value,
}

/// Raw lift feature as parsed from a source file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLiftFeature {
    pub id: String,
    pub lift_type: LiftType,
    pub status: LiftStatus,
    #[serde(default)]
    pub ski_area_ids: Vec<String>,
    pub geometry: Geometry<f64>,
    #[serde(default)]
    pub elevation_profile: Option<Vec<f64>>,
    #[serde(default)]
    pub properties: serde_json::Value,
}

/// Raw ski-area feature as parsed from a source file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSkiAreaFeature {
    pub id: String,
    pub source: SourceType,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub activities: Vec<Activity>,
    /// Polygon for drawn outlines, point for registry entries, absent for
    /// site relations (their geometry is synthesized from members later)
    #[serde(default)]
    pub geometry: Option<Geometry<f64>>,
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

/// Map a raw run feature to a draft run object.
pub fn prepare_run(raw: &RawRunFeature, config: &ClusteringConfig) -> RunObject {
    let mut activities = Vec::new();
    for declared_use in &raw.uses {
        let activity = match declared_use {
            RunUse::Downhill | RunUse::SnowPark => Some(Activity::Downhill),
            RunUse::Nordic => Some(Activity::Nordic),
            // Ski touring routes are not part of any ski area
            _ => None,
        };
        if let Some(activity) = activity {
            if !activities.contains(&activity) {
                activities.push(activity);
            }
        }
    }

    // Ungroomed backcountry terrain that nobody patrols and no curated site
    // claims gets no activities at all, excluding it from clustering.
    let unmanaged_backcountry = raw.grooming == Some(RunGrooming::Backcountry)
        && raw.patrolled != Some(true)
        && raw.ski_area_ids.is_empty();
    if unmanaged_backcountry {
        activities.clear();
    }

    let ski_areas: Vec<SkiAreaRef> = raw
        .ski_area_ids
        .iter()
        .map(|id| SkiAreaRef {
            ski_area_id: object_key(ObjectKind::SkiArea, id),
            assigned_from: AssignedFrom::Site,
        })
        .collect();

    let has_ski_use = raw
        .uses
        .iter()
        .any(|u| matches!(u, RunUse::Downhill | RunUse::Nordic | RunUse::SnowPark));
    let is_basis_for_new_ski_area = has_ski_use
        && !piste_common::models::activity::intersect(&activities, &config.ski_relevant_activities)
            .is_empty()
        && ski_areas.is_empty();

    RunObject {
        key: object_key(ObjectKind::Run, &raw.id),
        sample_points: geometry::geometry_points(&raw.geometry),
        geometry: raw.geometry.clone(),
        elevation_profile: raw.elevation_profile.clone(),
        activities,
        is_in_ski_area_site: !ski_areas.is_empty(),
        ski_areas,
        is_basis_for_new_ski_area,
        is_in_ski_area_polygon: false,
        difficulty: raw.difficulty,
        properties: raw.properties.clone(),
    }
}

/// Map a raw lift feature to a draft lift object.
pub fn prepare_lift(raw: &RawLiftFeature) -> LiftObject {
    // A lift only carries skiers while it actually runs
    let activities = if raw.status == LiftStatus::Operating {
        vec![Activity::Downhill]
    } else {
        Vec::new()
    };

    let ski_areas: Vec<SkiAreaRef> = raw
        .ski_area_ids
        .iter()
        .map(|id| SkiAreaRef {
            ski_area_id: object_key(ObjectKind::SkiArea, id),
            assigned_from: AssignedFrom::Site,
        })
        .collect();

    LiftObject {
        key: object_key(ObjectKind::Lift, &raw.id),
        geometry: raw.geometry.clone(),
        elevation_profile: raw.elevation_profile.clone(),
        lift_type: raw.lift_type,
        activities,
        is_in_ski_area_site: !ski_areas.is_empty(),
        ski_areas,
        is_in_ski_area_polygon: false,
        properties: raw.properties.clone(),
    }
}

/// Map a raw ski-area feature to a draft ski-area object.
pub fn prepare_ski_area(raw: &RawSkiAreaFeature, config: &ClusteringConfig) -> SkiAreaObject {
    let is_polygon = matches!(
        raw.geometry,
        Some(Geometry::Polygon(_)) | Some(Geometry::MultiPolygon(_))
    );
    let activities = piste_common::models::activity::intersect(
        &raw.activities,
        &config.ski_relevant_activities,
    );

    SkiAreaObject {
        key: object_key(ObjectKind::SkiArea, &raw.id),
        geometry: raw.geometry.clone(),
        source: raw.source,
        is_polygon,
        activities,
        ski_areas: Vec::new(),
        properties: SkiAreaProperties {
            name: raw.name.clone(),
            sources: vec![SkiAreaSource {
                source_type: raw.source,
                id: raw.id.clone(),
            }],
            extra: raw.properties.clone(),
        },
    }
}
