//! Spatial object store abstraction
//!
//! The clustering engine only depends on the operations defined here; the
//! storage and indexing technology behind them is a deployment concern. A
//! database-backed implementation can replace [`MemoryStore`] as long as it
//! honors the same semantics: key-addressed upserts, idempotent partial
//! updates, and the filter contract of `find_nearby_objects`.

pub mod memory;

pub use memory::MemoryStore;

use std::collections::HashSet;

use async_trait::async_trait;
use geo::{Geometry, MultiPolygon};
use piste_common::models::{
    Activity, AssignedFrom, LiftObject, MapObject, RunObject, RunPatch, SkiAreaObject,
    SkiAreaPatch, SourceType,
};
use piste_common::Result;

/// Filter for ski-area scans
#[derive(Debug, Clone, Default)]
pub struct SkiAreaFilter {
    pub source: Option<SourceType>,
    pub polygon_only: bool,
    /// Restrict to ski areas whose geometry lies within this polygonal
    /// geometry. Non-polygonal values are a contract violation.
    pub within: Option<Geometry<f64>>,
}

impl SkiAreaFilter {
    pub fn for_source(source: SourceType) -> Self {
        Self {
            source: Some(source),
            ..Default::default()
        }
    }
}

/// Spatial predicate of a nearby-object search
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchKind {
    /// Fixed search area: candidates contained in the query polygon.
    /// The query geometry must be polygonal.
    Contains,
    /// Expanding search: candidates within a metric buffer of the query
    /// geometry.
    Intersects { buffer_m: f64 },
}

/// Context threaded through a ski-area search
#[derive(Debug, Clone)]
pub struct SearchContext {
    /// The ski area being populated. Seeded into `visited` so a search
    /// never returns its own subject.
    pub ski_area_id: String,
    /// Target activities; candidates must share at least one
    pub activities: Vec<Activity>,
    pub search_kind: SearchKind,
    /// Keys already seen by this search
    pub visited: HashSet<String>,
    /// Exclude objects already placed in a ski area by clustering (polygon
    /// or proximity provenance). Site pre-assignments never exclude: the
    /// conflict policy needs to see them.
    pub exclude_assigned: bool,
}

impl SearchContext {
    pub fn new(ski_area_id: impl Into<String>, activities: Vec<Activity>, search_kind: SearchKind) -> Self {
        let ski_area_id = ski_area_id.into();
        let visited = HashSet::from([ski_area_id.clone()]);
        Self {
            ski_area_id,
            activities,
            search_kind,
            visited,
            exclude_assigned: false,
        }
    }
}

/// Operations the clustering engine requires of the object store
#[async_trait]
pub trait SpatialObjectStore: Send + Sync {
    /// Upsert a single object by key.
    async fn save_object(&self, object: MapObject) -> Result<()>;

    /// Upsert a batch of objects.
    async fn save_objects(&self, objects: Vec<MapObject>) -> Result<()>;

    /// Apply a partial update to a ski area.
    async fn update_ski_area(&self, key: &str, patch: SkiAreaPatch) -> Result<()>;

    /// Apply a partial update to a run.
    async fn update_run(&self, key: &str, patch: RunPatch) -> Result<()>;

    /// Remove a ski area outright. Removing an absent key is a no-op.
    async fn remove_ski_area(&self, key: &str) -> Result<()>;

    /// Build spatial indexes. Called once by the loader after all objects
    /// are persisted.
    async fn build_indexes(&self) -> Result<()>;

    /// Materialized filtered scan over ski areas, in stable key order.
    async fn ski_areas(&self, filter: &SkiAreaFilter) -> Result<Vec<SkiAreaObject>>;

    /// Materialized scan over all runs, in stable key order.
    async fn runs(&self) -> Result<Vec<RunObject>>;

    /// Materialized scan over all lifts, in stable key order.
    async fn lifts(&self) -> Result<Vec<LiftObject>>;

    /// Objects matching the search context around a query geometry:
    /// spatial predicate per `ctx.search_kind`, sharing at least one
    /// context activity, not yet visited, and (if requested) not already
    /// assigned to any ski area.
    async fn find_nearby_objects(
        &self,
        geometry: &Geometry<f64>,
        ctx: &SearchContext,
    ) -> Result<Vec<MapObject>>;

    /// Current members of a ski area.
    async fn objects_for_ski_area(&self, ski_area_id: &str) -> Result<Vec<MapObject>>;

    /// Record membership for a set of objects. Adds a reference with the
    /// given provenance unless the object already references the ski area;
    /// polygon/site provenance also sets the matching run/lift flag.
    async fn mark_objects_as_part_of_ski_area(
        &self,
        ski_area_id: &str,
        keys: &[String],
        assigned_from: AssignedFrom,
    ) -> Result<()>;

    /// Next run flagged as a basis for a new ski area and not yet assigned
    /// to one, if any.
    async fn next_unassigned_run(&self) -> Result<Option<RunObject>>;

    /// Combined geometry of the ski area's current members, if it has any.
    async fn derived_ski_area_geometry(&self, ski_area_id: &str) -> Result<Option<Geometry<f64>>>;

    /// Buffered coverage of all runs and lifts, consumed by the external
    /// highway-association stage. Not used by clustering itself.
    async fn ski_feature_buffer(&self, buffer_m: f64) -> Result<MultiPolygon<f64>>;
}
