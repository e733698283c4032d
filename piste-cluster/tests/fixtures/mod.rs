//! Shared object builders for integration tests.
#![allow(dead_code)]
//!
//! Coordinates are degrees near the origin, where 0.001 degrees is roughly
//! 111 meters. Scenarios pick offsets against the default search radii
//! (500 m proximity, 250 m merge).

use geo::{Geometry, LineString, Point, Polygon};
use piste_cluster::ClusteringConfig;
use piste_common::models::{
    Activity, AssignedFrom, LiftObject, LiftType, RunObject, SkiAreaObject, SkiAreaProperties,
    SkiAreaRef, SkiAreaSource, SourceType,
};

pub fn test_config() -> ClusteringConfig {
    ClusteringConfig::default()
}

/// Route stage logs through the test harness; `RUST_LOG` controls verbosity.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn line(coords: &[(f64, f64)]) -> Geometry<f64> {
    Geometry::LineString(LineString::from(coords.to_vec()))
}

pub fn point(x: f64, y: f64) -> Geometry<f64> {
    Geometry::Point(Point::new(x, y))
}

/// Axis-aligned square polygon from (min, min) to (max, max).
pub fn square(min: f64, max: f64) -> Geometry<f64> {
    Geometry::Polygon(Polygon::new(
        LineString::from(vec![(min, min), (max, min), (max, max), (min, max), (min, min)]),
        vec![],
    ))
}

pub fn run(key: &str, geometry: Geometry<f64>, activities: Vec<Activity>) -> RunObject {
    RunObject {
        key: key.to_string(),
        geometry,
        elevation_profile: None,
        activities,
        ski_areas: Vec::new(),
        is_basis_for_new_ski_area: false,
        is_in_ski_area_polygon: false,
        is_in_ski_area_site: false,
        difficulty: None,
        sample_points: Vec::new(),
        properties: serde_json::Value::Null,
    }
}

pub fn seed_run(key: &str, geometry: Geometry<f64>, activities: Vec<Activity>) -> RunObject {
    RunObject {
        is_basis_for_new_ski_area: true,
        ..run(key, geometry, activities)
    }
}

pub fn site_assigned_run(
    key: &str,
    geometry: Geometry<f64>,
    activities: Vec<Activity>,
    site_area_id: &str,
) -> RunObject {
    RunObject {
        ski_areas: vec![SkiAreaRef {
            ski_area_id: site_area_id.to_string(),
            assigned_from: AssignedFrom::Site,
        }],
        is_in_ski_area_site: true,
        ..run(key, geometry, activities)
    }
}

pub fn lift(key: &str, geometry: Geometry<f64>) -> LiftObject {
    LiftObject {
        key: key.to_string(),
        geometry,
        elevation_profile: None,
        lift_type: LiftType::ChairLift,
        activities: vec![Activity::Downhill],
        ski_areas: Vec::new(),
        is_in_ski_area_polygon: false,
        is_in_ski_area_site: false,
        properties: serde_json::Value::Null,
    }
}

pub fn ski_area(
    key: &str,
    source: SourceType,
    geometry: Option<Geometry<f64>>,
    activities: Vec<Activity>,
) -> SkiAreaObject {
    let is_polygon = matches!(
        geometry,
        Some(Geometry::Polygon(_)) | Some(Geometry::MultiPolygon(_))
    );
    SkiAreaObject {
        key: key.to_string(),
        geometry,
        source,
        is_polygon,
        activities,
        ski_areas: Vec::new(),
        properties: SkiAreaProperties {
            name: None,
            sources: vec![SkiAreaSource {
                source_type: source,
                id: format!("src/{key}"),
            }],
            extra: serde_json::Map::new(),
        },
    }
}
