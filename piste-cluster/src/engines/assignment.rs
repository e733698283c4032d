//! Assignment engine
//!
//! Groups runs, lifts and ski areas that belong together into a ski area,
//! either by exact polygon containment or by a proximity flood fill. The
//! flood fill is an explicit worklist (frontier queue plus visited key set)
//! so traversal depth is bounded by memory, not the call stack.

use std::collections::VecDeque;
use std::sync::Arc;

use geo::Geometry;
use piste_common::geometry;
use piste_common::models::{
    activity, Activity, AssignedFrom, MapObject, SkiAreaObject, SkiAreaPatch, SourceType,
};
use piste_common::{Error, Result};
use tokio::task::JoinSet;

use crate::config::ClusteringConfig;
use crate::store::{SearchContext, SearchKind, SkiAreaFilter, SpatialObjectStore};

/// How a ski area's members are searched for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPolicy {
    /// Query the ski area's own drawn polygon once
    FixedPolygon,
    /// Expanding flood fill from the ski area outward
    Proximity,
}

/// Options for one assignment pass
#[derive(Debug, Clone)]
pub struct AssignmentOptions {
    /// Which source of ski areas to scan
    pub source: SourceType,
    /// Only consider candidate objects not yet assigned to any ski area
    pub unassigned_only: bool,
    pub search: SearchPolicy,
    /// Delete the ski area when the search finds no run/lift members
    pub remove_if_no_objects_found: bool,
    /// Delete the ski area when most of its discovered members are
    /// site-assigned to somewhere else
    pub remove_on_site_conflict: bool,
}

/// Outcome counters of one assignment pass
#[derive(Debug, Clone, Copy, Default)]
pub struct AssignmentOutcome {
    pub scanned: usize,
    pub assigned_objects: usize,
    pub removed_ski_areas: usize,
}

/// Spatial grouping of objects into ski areas
pub struct AssignmentEngine {
    store: Arc<dyn SpatialObjectStore>,
    config: ClusteringConfig,
}

impl AssignmentEngine {
    pub fn new(store: Arc<dyn SpatialObjectStore>, config: ClusteringConfig) -> Self {
        Self { store, config }
    }

    /// For every ski area still lacking activities: derive activities and a
    /// representative point from its current members. Covers site-relation
    /// ski areas, whose members were pre-assigned during preparation and
    /// which carry no geometry of their own.
    pub async fn assign_activities_and_geometry_from_members(&self) -> Result<usize> {
        // Materialize before mutating the set being iterated
        let areas: Vec<SkiAreaObject> = self
            .store
            .ski_areas(&SkiAreaFilter::default())
            .await?
            .into_iter()
            .filter(|a| a.activities.is_empty())
            .collect();

        let mut join_set: JoinSet<Result<usize>> = JoinSet::new();
        let mut updated = 0;
        for area in areas {
            while join_set.len() >= self.config.max_concurrency {
                updated += join_next(&mut join_set).await?;
            }
            let store = Arc::clone(&self.store);
            let config = self.config.clone();
            join_set.spawn(async move {
                let members = store.objects_for_ski_area(&area.key).await?;
                if members.is_empty() {
                    tracing::debug!(ski_area = %area.key, "no members, leaving activities unset");
                    return Ok(0);
                }
                let activities = member_activities(&members, &config.ski_relevant_activities);
                let geometries: Vec<Geometry<f64>> =
                    members.iter().filter_map(|m| m.geometry().cloned()).collect();
                let geometry = geometry::representative_point(
                    &geometries,
                    config.representative_point_offset_m,
                )
                .map(Geometry::Point);
                store
                    .update_ski_area(
                        &area.key,
                        SkiAreaPatch {
                            activities: Some(activities),
                            geometry,
                            is_polygon: Some(false),
                            properties: None,
                        },
                    )
                    .await?;
                Ok(1)
            });
        }
        while !join_set.is_empty() {
            updated += join_next(&mut join_set).await?;
        }
        tracing::info!(updated, "derived ski area activities and geometry from members");
        Ok(updated)
    }

    /// Delete drawn polygon ski areas that contain two or more registry
    /// entries: such a polygon cannot be matched to a single registry ski
    /// area, so the ambiguous polygon goes and the contained entries stay.
    pub async fn remove_ambiguous_duplicate_ski_areas(&self) -> Result<usize> {
        let polygon_areas = self
            .store
            .ski_areas(&SkiAreaFilter {
                source: Some(SourceType::OpenStreetMap),
                polygon_only: true,
                within: None,
            })
            .await?;

        let mut removed = 0;
        for area in polygon_areas {
            let Some(polygon) = area.geometry.clone() else {
                continue;
            };
            let contained = self
                .store
                .ski_areas(&SkiAreaFilter {
                    source: Some(SourceType::Registry),
                    polygon_only: false,
                    within: Some(polygon),
                })
                .await?;
            if contained.len() >= 2 {
                tracing::info!(
                    ski_area = %area.key,
                    contained = contained.len(),
                    "polygon matches multiple registry ski areas, removing as ambiguous"
                );
                self.store.remove_ski_area(&area.key).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// The core traversal: for each ski area of the selected source, search
    /// for member objects (polygon containment or proximity flood fill),
    /// apply the removal policies, and record membership.
    pub async fn assign_objects_to_ski_areas(
        &self,
        options: AssignmentOptions,
    ) -> Result<AssignmentOutcome> {
        // Materialize: removal policies mutate the set being iterated
        let areas = self
            .store
            .ski_areas(&SkiAreaFilter {
                source: Some(options.source),
                polygon_only: options.search == SearchPolicy::FixedPolygon,
                within: None,
            })
            .await?;

        let mut outcome = AssignmentOutcome {
            scanned: areas.len(),
            ..Default::default()
        };
        let mut join_set: JoinSet<Result<(usize, usize)>> = JoinSet::new();
        for area in areas {
            while join_set.len() >= self.config.max_concurrency {
                let (assigned, removed) = join_next(&mut join_set).await?;
                outcome.assigned_objects += assigned;
                outcome.removed_ski_areas += removed;
            }
            let store = Arc::clone(&self.store);
            let config = self.config.clone();
            let options = options.clone();
            join_set.spawn(process_ski_area(store, config, options, area));
        }
        while !join_set.is_empty() {
            let (assigned, removed) = join_next(&mut join_set).await?;
            outcome.assigned_objects += assigned;
            outcome.removed_ski_areas += removed;
        }
        Ok(outcome)
    }
}

async fn join_next<T>(join_set: &mut JoinSet<Result<T>>) -> Result<T>
where
    T: 'static,
{
    match join_set.join_next().await {
        Some(Ok(result)) => result,
        Some(Err(join_error)) => Err(Error::Store(format!("worker task failed: {join_error}"))),
        None => Err(Error::Store("joined an empty worker set".to_string())),
    }
}

/// Assign members to a single ski area. Returns (objects assigned,
/// ski areas removed).
async fn process_ski_area(
    store: Arc<dyn SpatialObjectStore>,
    config: ClusteringConfig,
    options: AssignmentOptions,
    area: SkiAreaObject,
) -> Result<(usize, usize)> {
    // Unknown activities widen the search to the full ski-relevant set
    let target_activities = if area.activities.is_empty() {
        config.ski_relevant_activities.clone()
    } else {
        area.activities.clone()
    };

    let search_kind = match options.search {
        SearchPolicy::FixedPolygon => SearchKind::Contains,
        SearchPolicy::Proximity => SearchKind::Intersects {
            buffer_m: config.proximity_search_radius_km * 1000.0,
        },
    };
    let mut ctx = SearchContext::new(area.key.clone(), target_activities, search_kind);
    ctx.exclude_assigned = options.unassigned_only;

    let members = match options.search {
        SearchPolicy::FixedPolygon => {
            let Some(polygon) = area.geometry.clone() else {
                return Ok((0, 0));
            };
            // A fixed search never recurses: one query over the polygon
            let found = store.find_nearby_objects(&polygon, &ctx).await?;
            for member in &found {
                ctx.visited.insert(member.key().to_string());
            }
            found
        }
        SearchPolicy::Proximity => {
            let seed = match store.derived_ski_area_geometry(&area.key).await? {
                Some(derived) => Some(derived),
                None => area.geometry.clone(),
            };
            match seed {
                Some(seed) => flood_fill(&store, seed, &mut ctx).await?,
                None => Vec::new(),
            }
        }
    };

    let run_lift_members: Vec<&MapObject> = members
        .iter()
        .filter(|m| !matches!(m, MapObject::SkiArea(_)))
        .collect();

    if options.remove_if_no_objects_found && run_lift_members.is_empty() {
        tracing::info!(ski_area = %area.key, "no member objects found, removing ski area");
        store.remove_ski_area(&area.key).await?;
        return Ok((0, 1));
    }

    if options.remove_on_site_conflict && !run_lift_members.is_empty() {
        let conflicting = run_lift_members
            .iter()
            .filter(|m| m.is_in_ski_area_site() && !m.references_ski_area(&area.key))
            .count();
        let fraction = conflicting as f64 / run_lift_members.len() as f64;
        if fraction > config.site_conflict_threshold {
            tracing::info!(
                ski_area = %area.key,
                conflicting,
                members = run_lift_members.len(),
                "membership conflicts with curated site groupings, removing ski area"
            );
            store.remove_ski_area(&area.key).await?;
            return Ok((0, 1));
        }
    }

    if members.is_empty() {
        return Ok((0, 0));
    }

    let assigned_from = match options.search {
        SearchPolicy::FixedPolygon => AssignedFrom::Polygon,
        SearchPolicy::Proximity => AssignedFrom::Proximity,
    };
    let keys: Vec<String> = members.iter().map(|m| m.key().to_string()).collect();
    store
        .mark_objects_as_part_of_ski_area(&area.key, &keys, assigned_from)
        .await?;

    if area.activities.is_empty() {
        let discovered = member_activities(&members, &config.ski_relevant_activities);
        if !discovered.is_empty() {
            store
                .update_ski_area(
                    &area.key,
                    SkiAreaPatch {
                        activities: Some(discovered),
                        ..Default::default()
                    },
                )
                .await?;
        }
    }

    Ok((keys.len(), 0))
}

/// Proximity flood fill: visit objects outward from the seed geometry,
/// using each newly found object's own geometry as the next query origin.
/// For ski areas the derived union-of-members geometry is used instead of
/// their placeholder point. The activity filter narrows to the intersection
/// with each found object unless that would empty it, which keeps one
/// outlier from collapsing the whole search.
pub(crate) async fn flood_fill(
    store: &Arc<dyn SpatialObjectStore>,
    seed: Geometry<f64>,
    ctx: &mut SearchContext,
) -> Result<Vec<MapObject>> {
    let mut found = Vec::new();
    let mut frontier: VecDeque<(Geometry<f64>, Vec<Activity>)> = VecDeque::new();
    frontier.push_back((seed, ctx.activities.clone()));

    while let Some((origin, activities)) = frontier.pop_front() {
        ctx.activities = activities.clone();
        let candidates = store.find_nearby_objects(&origin, ctx).await?;
        for candidate in candidates {
            if !ctx.visited.insert(candidate.key().to_string()) {
                continue;
            }
            let narrowed = activity::intersect(&activities, candidate.activities());
            let next_activities = if narrowed.is_empty() {
                activities.clone()
            } else {
                narrowed
            };
            let next_origin = match &candidate {
                MapObject::SkiArea(ski_area) => {
                    match store.derived_ski_area_geometry(&ski_area.key).await? {
                        Some(derived) => Some(derived),
                        None => ski_area.geometry.clone(),
                    }
                }
                other => other.geometry().cloned(),
            };
            if let Some(next_origin) = next_origin {
                frontier.push_back((next_origin, next_activities));
            }
            found.push(candidate);
        }
    }
    Ok(found)
}

/// Union of run/lift member activities, restricted to the ski-relevant
/// set. Nested ski-area members do not contribute.
pub(crate) fn member_activities(
    members: &[MapObject],
    ski_relevant: &[Activity],
) -> Vec<Activity> {
    let mut out = Vec::new();
    for member in members {
        if matches!(member, MapObject::SkiArea(_)) {
            continue;
        }
        out = activity::union(&out, member.activities());
    }
    activity::intersect(&out, ski_relevant)
}
