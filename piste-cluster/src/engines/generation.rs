//! Generation engine
//!
//! Many real ski areas were never drawn in either source: their runs and
//! lifts exist, the enclosing area does not. This engine synthesizes a ski
//! area around each orphan run flagged as a seed, reusing the assignment
//! engine's proximity flood fill.

use std::collections::HashSet;
use std::sync::Arc;

use geo::Geometry;
use piste_common::geometry;
use piste_common::models::{
    activity, Activity, AssignedFrom, MapObject, RunObject, RunPatch, SkiAreaObject,
    SkiAreaProperties, SourceType,
};
use piste_common::Result;
use uuid::Uuid;

use crate::config::ClusteringConfig;
use crate::engines::assignment::{flood_fill, member_activities};
use crate::store::{SearchContext, SearchKind, SpatialObjectStore};

/// Synthesizes ski areas for orphan runs
pub struct GenerationEngine {
    store: Arc<dyn SpatialObjectStore>,
    config: ClusteringConfig,
}

impl GenerationEngine {
    pub fn new(store: Arc<dyn SpatialObjectStore>, config: ClusteringConfig) -> Self {
        Self { store, config }
    }

    /// Generate ski areas until no eligible seed run remains. Returns the
    /// number of ski areas created.
    pub async fn generate_ski_areas_for_unassigned_runs(&self) -> Result<usize> {
        let mut generated = 0;
        let mut last_key: Option<String> = None;

        while let Some(run) = self.store.next_unassigned_run().await? {
            // The "next" query is not guaranteed deterministic for every
            // backend. Seeing the same run twice in a row means its state
            // did not change last round; force-clear the seed flag instead
            // of looping forever.
            if last_key.as_deref() == Some(run.key.as_str()) {
                tracing::warn!(
                    run = %run.key,
                    "store returned the same unassigned run twice, clearing its seed flag"
                );
                self.clear_seed_flag(&run.key).await?;
                last_key = None;
                continue;
            }
            last_key = Some(run.key.clone());

            if self.generate_for_run(&run).await? {
                generated += 1;
            }
        }
        Ok(generated)
    }

    async fn generate_for_run(&self, run: &RunObject) -> Result<bool> {
        let target_activities =
            activity::intersect(&run.activities, &self.config.ski_relevant_activities);
        if target_activities.is_empty() {
            tracing::debug!(run = %run.key, "seed run has no ski-relevant activities");
            self.clear_seed_flag(&run.key).await?;
            return Ok(false);
        }

        let ski_area_id = Uuid::new_v4().to_string();
        let mut ctx = SearchContext {
            ski_area_id: ski_area_id.clone(),
            activities: target_activities,
            search_kind: SearchKind::Intersects {
                buffer_m: self.config.proximity_search_radius_km * 1000.0,
            },
            visited: HashSet::from([ski_area_id.clone(), run.key.clone()]),
            exclude_assigned: true,
        };

        let mut members = vec![MapObject::Run(run.clone())];
        members.extend(flood_fill(&self.store, run.geometry.clone(), &mut ctx).await?);

        let mut activities = member_activities(&members, &self.config.ski_relevant_activities);

        // A downhill area without a single lift is not a ski area, it is a
        // hill. Demote: drop downhill and everything that only qualified
        // through it.
        let has_lift = members.iter().any(|m| matches!(m, MapObject::Lift(_)));
        if activities.contains(&Activity::Downhill) && !has_lift {
            activities.retain(|a| *a != Activity::Downhill);
            members.retain(|m| {
                let qualifying =
                    activity::intersect(m.activities(), &self.config.ski_relevant_activities);
                qualifying != vec![Activity::Downhill]
            });
        }

        if activities.is_empty() || members.is_empty() {
            tracing::debug!(run = %run.key, "nothing to build a ski area from");
            self.clear_seed_flag(&run.key).await?;
            return Ok(false);
        }

        let geometries: Vec<Geometry<f64>> =
            members.iter().filter_map(|m| m.geometry().cloned()).collect();
        let geometry = geometry::representative_point(
            &geometries,
            self.config.representative_point_offset_m,
        )
        .map(Geometry::Point);

        let ski_area = SkiAreaObject {
            key: ski_area_id.clone(),
            geometry,
            source: SourceType::OpenStreetMap,
            is_polygon: false,
            activities: activities.clone(),
            ski_areas: Vec::new(),
            properties: SkiAreaProperties::default(),
        };
        self.store.save_object(MapObject::SkiArea(ski_area)).await?;

        let keys: Vec<String> = members.iter().map(|m| m.key().to_string()).collect();
        self.store
            .mark_objects_as_part_of_ski_area(&ski_area_id, &keys, AssignedFrom::Proximity)
            .await?;

        tracing::info!(
            ski_area = %ski_area_id,
            members = keys.len(),
            activities = ?activities,
            "generated ski area for orphan run"
        );
        Ok(true)
    }

    async fn clear_seed_flag(&self, run_key: &str) -> Result<()> {
        self.store
            .update_run(
                run_key,
                RunPatch {
                    is_basis_for_new_ski_area: Some(false),
                },
            )
            .await
    }
}
