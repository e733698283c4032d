//! In-memory reference implementation of the spatial object store
//!
//! A key-ordered object map plus an R-tree of geometry envelopes as a
//! coarse prefilter; exact predicates are evaluated against the live
//! objects, so stale index entries only cost a lookup, never correctness.

use std::collections::BTreeMap;

use async_trait::async_trait;
use geo::{Contains, Geometry, MultiPolygon, Point};
use piste_common::geometry;
use piste_common::models::{
    self, AssignedFrom, LiftObject, MapObject, RunObject, RunPatch, SkiAreaObject, SkiAreaPatch,
};
use piste_common::{Error, Result};
use rstar::{RTree, RTreeObject, AABB};
use tokio::sync::RwLock;

use super::{SearchContext, SearchKind, SkiAreaFilter, SpatialObjectStore};

#[derive(Clone, Debug)]
struct IndexEntry {
    key: String,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

fn index_entry(key: &str, geometry: &Geometry<f64>) -> Option<IndexEntry> {
    let rect = geometry::buffered_bounds(geometry, 0.0)?;
    Some(IndexEntry {
        key: key.to_string(),
        envelope: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    })
}

/// In-memory spatial object store
#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, MapObject>>,
    index: RwLock<Option<RTree<IndexEntry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a single object, mainly for tests and diagnostics.
    pub async fn get(&self, key: &str) -> Option<MapObject> {
        self.objects.read().await.get(key).cloned()
    }

    /// Total object count.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

/// True when every vertex of `candidate` lies within the polygonal query
/// geometry. Errors when the query geometry is not polygonal: fixed-area
/// searches are only defined for polygons.
fn contained_in(query: &Geometry<f64>, candidate: &Geometry<f64>) -> Result<bool> {
    let points = geometry::geometry_points(candidate);
    if points.is_empty() {
        return Ok(false);
    }
    let contains = |point: &Point<f64>| match query {
        Geometry::Polygon(polygon) => Ok(polygon.contains(point)),
        Geometry::MultiPolygon(multi) => Ok(multi.contains(point)),
        other => Err(Error::Contract(format!(
            "fixed search area must be polygonal, got {}",
            geometry_kind(other)
        ))),
    };
    for point in &points {
        if !contains(point)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn geometry_kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

fn matches_search(
    query: &Geometry<f64>,
    candidate: &Geometry<f64>,
    kind: SearchKind,
) -> Result<bool> {
    match kind {
        SearchKind::Contains => contained_in(query, candidate),
        SearchKind::Intersects { buffer_m } => {
            Ok(geometry::min_distance_m(query, candidate) <= buffer_m)
        }
    }
}

#[async_trait]
impl SpatialObjectStore for MemoryStore {
    async fn save_object(&self, object: MapObject) -> Result<()> {
        let key = object.key().to_string();
        let entry = object.geometry().and_then(|g| index_entry(&key, g));
        self.objects.write().await.insert(key, object);
        // Keep the index usable for objects created after the bulk build
        // (e.g. generated ski areas); duplicates are deduplicated at query
        // time.
        if let Some(entry) = entry {
            if let Some(tree) = self.index.write().await.as_mut() {
                tree.insert(entry);
            }
        }
        Ok(())
    }

    async fn save_objects(&self, objects: Vec<MapObject>) -> Result<()> {
        for object in objects {
            self.save_object(object).await?;
        }
        Ok(())
    }

    async fn update_ski_area(&self, key: &str, patch: SkiAreaPatch) -> Result<()> {
        let new_entry;
        {
            let mut objects = self.objects.write().await;
            let Some(MapObject::SkiArea(area)) = objects.get_mut(key) else {
                return Err(Error::NotFound(format!("ski area {key}")));
            };
            if let Some(activities) = patch.activities {
                area.activities = activities;
            }
            if let Some(geometry) = patch.geometry {
                area.geometry = Some(geometry);
            }
            if let Some(is_polygon) = patch.is_polygon {
                area.is_polygon = is_polygon;
            }
            if let Some(properties) = patch.properties {
                area.properties = properties;
            }
            new_entry = area.geometry.as_ref().and_then(|g| index_entry(key, g));
        }
        if let Some(entry) = new_entry {
            if let Some(tree) = self.index.write().await.as_mut() {
                tree.insert(entry);
            }
        }
        Ok(())
    }

    async fn update_run(&self, key: &str, patch: RunPatch) -> Result<()> {
        let mut objects = self.objects.write().await;
        let Some(MapObject::Run(run)) = objects.get_mut(key) else {
            return Err(Error::NotFound(format!("run {key}")));
        };
        if let Some(flag) = patch.is_basis_for_new_ski_area {
            run.is_basis_for_new_ski_area = flag;
        }
        Ok(())
    }

    async fn remove_ski_area(&self, key: &str) -> Result<()> {
        let mut objects = self.objects.write().await;
        match objects.get(key) {
            Some(MapObject::SkiArea(_)) => {
                objects.remove(key);
                Ok(())
            }
            Some(_) => Err(Error::Contract(format!("{key} is not a ski area"))),
            None => Ok(()),
        }
    }

    async fn build_indexes(&self) -> Result<()> {
        let objects = self.objects.read().await;
        let entries: Vec<IndexEntry> = objects
            .iter()
            .filter_map(|(key, object)| object.geometry().and_then(|g| index_entry(key, g)))
            .collect();
        let count = entries.len();
        *self.index.write().await = Some(RTree::bulk_load(entries));
        tracing::debug!(indexed = count, "spatial index built");
        Ok(())
    }

    async fn ski_areas(&self, filter: &SkiAreaFilter) -> Result<Vec<SkiAreaObject>> {
        let objects = self.objects.read().await;
        let mut out = Vec::new();
        for object in objects.values() {
            let MapObject::SkiArea(area) = object else {
                continue;
            };
            if let Some(source) = filter.source {
                if area.source != source {
                    continue;
                }
            }
            if filter.polygon_only && !area.is_polygon {
                continue;
            }
            if let Some(within) = &filter.within {
                let Some(area_geometry) = &area.geometry else {
                    continue;
                };
                if !contained_in(within, area_geometry)? {
                    continue;
                }
            }
            out.push(area.clone());
        }
        Ok(out)
    }

    async fn runs(&self) -> Result<Vec<RunObject>> {
        let objects = self.objects.read().await;
        Ok(objects
            .values()
            .filter_map(|o| match o {
                MapObject::Run(run) => Some(run.clone()),
                _ => None,
            })
            .collect())
    }

    async fn lifts(&self) -> Result<Vec<LiftObject>> {
        let objects = self.objects.read().await;
        Ok(objects
            .values()
            .filter_map(|o| match o {
                MapObject::Lift(lift) => Some(lift.clone()),
                _ => None,
            })
            .collect())
    }

    async fn find_nearby_objects(
        &self,
        query: &Geometry<f64>,
        ctx: &SearchContext,
    ) -> Result<Vec<MapObject>> {
        let objects = self.objects.read().await;
        let index = self.index.read().await;

        // Coarse prefilter via the envelope index when available; a full
        // scan otherwise (e.g. in tests that skip the loader).
        let candidate_keys: Vec<String> = match index.as_ref() {
            Some(tree) => {
                let buffer_m = match ctx.search_kind {
                    SearchKind::Contains => 0.0,
                    SearchKind::Intersects { buffer_m } => buffer_m,
                };
                let Some(bounds) = geometry::buffered_bounds(query, buffer_m) else {
                    return Ok(Vec::new());
                };
                let envelope = AABB::from_corners(
                    [bounds.min().x, bounds.min().y],
                    [bounds.max().x, bounds.max().y],
                );
                let mut keys: Vec<String> = tree
                    .locate_in_envelope_intersecting(&envelope)
                    .map(|e| e.key.clone())
                    .collect();
                keys.sort();
                keys.dedup();
                keys
            }
            None => objects.keys().cloned().collect(),
        };

        let mut found = Vec::new();
        for key in candidate_keys {
            if ctx.visited.contains(&key) {
                continue;
            }
            let Some(object) = objects.get(&key) else {
                continue; // stale index entry
            };
            if !models::activity::shares_any(object.activities(), &ctx.activities) {
                continue;
            }
            if ctx.exclude_assigned && object.is_spatially_assigned() {
                continue;
            }
            let Some(object_geometry) = object.geometry() else {
                continue;
            };
            if matches_search(query, object_geometry, ctx.search_kind)? {
                found.push(object.clone());
            }
        }
        Ok(found)
    }

    async fn objects_for_ski_area(&self, ski_area_id: &str) -> Result<Vec<MapObject>> {
        let objects = self.objects.read().await;
        Ok(objects
            .values()
            .filter(|o| o.references_ski_area(ski_area_id))
            .cloned()
            .collect())
    }

    async fn mark_objects_as_part_of_ski_area(
        &self,
        ski_area_id: &str,
        keys: &[String],
        assigned_from: AssignedFrom,
    ) -> Result<()> {
        let mut objects = self.objects.write().await;
        for key in keys {
            let Some(object) = objects.get_mut(key) else {
                // Tolerated: a member list observed mid-pipeline may be stale
                tracing::debug!(key = %key, "cannot mark missing object, skipping");
                continue;
            };
            if !object.references_ski_area(ski_area_id) {
                object.ski_areas_mut().push(models::SkiAreaRef {
                    ski_area_id: ski_area_id.to_string(),
                    assigned_from,
                });
            }
            match (assigned_from, &mut *object) {
                (AssignedFrom::Polygon, MapObject::Run(run)) => run.is_in_ski_area_polygon = true,
                (AssignedFrom::Polygon, MapObject::Lift(lift)) => lift.is_in_ski_area_polygon = true,
                (AssignedFrom::Site, MapObject::Run(run)) => run.is_in_ski_area_site = true,
                (AssignedFrom::Site, MapObject::Lift(lift)) => lift.is_in_ski_area_site = true,
                _ => {}
            }
        }
        Ok(())
    }

    async fn next_unassigned_run(&self) -> Result<Option<RunObject>> {
        let objects = self.objects.read().await;
        Ok(objects.values().find_map(|o| match o {
            MapObject::Run(run) if run.is_basis_for_new_ski_area && run.ski_areas.is_empty() => {
                Some(run.clone())
            }
            _ => None,
        }))
    }

    async fn derived_ski_area_geometry(&self, ski_area_id: &str) -> Result<Option<Geometry<f64>>> {
        let objects = self.objects.read().await;
        let geometries: Vec<Geometry<f64>> = objects
            .values()
            .filter(|o| o.references_ski_area(ski_area_id))
            .filter_map(|o| o.geometry().cloned())
            .collect();
        if geometries.is_empty() {
            return Ok(None);
        }
        Ok(Some(Geometry::GeometryCollection(geo::GeometryCollection(
            geometries,
        ))))
    }

    async fn ski_feature_buffer(&self, buffer_m: f64) -> Result<MultiPolygon<f64>> {
        let objects = self.objects.read().await;
        let polygons = objects
            .values()
            .filter(|o| !matches!(o, MapObject::SkiArea(_)))
            .filter_map(|o| o.geometry())
            .filter_map(|g| geometry::buffered_bounds(g, buffer_m))
            .map(|rect| rect.to_polygon())
            .collect();
        Ok(MultiPolygon(polygons))
    }
}
