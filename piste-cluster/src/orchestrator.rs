//! Pipeline orchestrator
//!
//! Runs the clustering stages in a fixed, strictly sequential order. The
//! ordering is a correctness property, not a convenience: merging assumes
//! duplicate ambiguity was already resolved, proximity assignment assumes
//! polygon assignment already claimed what it could, and the final cleanup
//! assumes every surviving ski area had its chance to get a geometry.

use std::sync::Arc;
use std::time::Instant;

use piste_common::models::{MapObject, SourceType};
use piste_common::Result;

use crate::config::ClusteringConfig;
use crate::engines::{
    AssignmentEngine, AssignmentOptions, GenerationEngine, MergeEngine, SearchPolicy,
};
use crate::loader::DataLoader;
use crate::store::{SkiAreaFilter, SpatialObjectStore};

/// Outcome counts of a full pipeline run
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineReport {
    pub loaded: usize,
    pub load_skipped: usize,
    pub activities_derived: usize,
    pub removed_ambiguous: usize,
    pub polygon_assigned: usize,
    pub proximity_assigned_primary: usize,
    pub merged: usize,
    pub proximity_assigned_secondary: usize,
    pub removed_in_assignment: usize,
    pub generated: usize,
    pub removed_without_geometry: usize,
}

/// Drives the clustering engines in pipeline order
pub struct ClusterPipeline {
    store: Arc<dyn SpatialObjectStore>,
    loader: DataLoader,
    assignment: AssignmentEngine,
    merge: MergeEngine,
    generation: GenerationEngine,
}

impl ClusterPipeline {
    pub fn new(store: Arc<dyn SpatialObjectStore>, config: ClusteringConfig) -> Self {
        Self {
            loader: DataLoader::new(Arc::clone(&store)),
            assignment: AssignmentEngine::new(Arc::clone(&store), config.clone()),
            merge: MergeEngine::new(Arc::clone(&store), config.clone()),
            generation: GenerationEngine::new(Arc::clone(&store), config),
            store,
        }
    }

    /// Run the full clustering pipeline over a batch of prepared objects.
    pub async fn run(&self, objects: Vec<MapObject>) -> Result<PipelineReport> {
        let pipeline_start = Instant::now();
        let mut report = PipelineReport::default();

        let started = Instant::now();
        let stats = self.loader.load(objects).await?;
        report.loaded = stats.saved;
        report.load_skipped = stats.skipped;
        stage_done("load", started, stats.saved);

        let started = Instant::now();
        report.activities_derived = self
            .assignment
            .assign_activities_and_geometry_from_members()
            .await?;
        stage_done("derive-from-members", started, report.activities_derived);

        let started = Instant::now();
        report.removed_ambiguous = self
            .assignment
            .remove_ambiguous_duplicate_ski_areas()
            .await?;
        stage_done("remove-ambiguous", started, report.removed_ambiguous);

        let started = Instant::now();
        let outcome = self
            .assignment
            .assign_objects_to_ski_areas(AssignmentOptions {
                source: SourceType::OpenStreetMap,
                unassigned_only: false,
                search: SearchPolicy::FixedPolygon,
                remove_if_no_objects_found: false,
                remove_on_site_conflict: false,
            })
            .await?;
        report.polygon_assigned = outcome.assigned_objects;
        stage_done("assign-in-polygon", started, outcome.assigned_objects);

        let started = Instant::now();
        let outcome = self
            .assignment
            .assign_objects_to_ski_areas(AssignmentOptions {
                source: SourceType::OpenStreetMap,
                unassigned_only: true,
                search: SearchPolicy::Proximity,
                remove_if_no_objects_found: false,
                remove_on_site_conflict: false,
            })
            .await?;
        report.proximity_assigned_primary = outcome.assigned_objects;
        stage_done("assign-nearby-unassigned", started, outcome.assigned_objects);

        let started = Instant::now();
        report.merged = self.merge.merge_into_primary_source().await?;
        stage_done("merge", started, report.merged);

        let started = Instant::now();
        let outcome = self
            .assignment
            .assign_objects_to_ski_areas(AssignmentOptions {
                source: SourceType::Registry,
                unassigned_only: true,
                search: SearchPolicy::Proximity,
                remove_if_no_objects_found: true,
                remove_on_site_conflict: true,
            })
            .await?;
        report.proximity_assigned_secondary = outcome.assigned_objects;
        report.removed_in_assignment = outcome.removed_ski_areas;
        stage_done("assign-nearby-registry", started, outcome.assigned_objects);

        let started = Instant::now();
        report.generated = self
            .generation
            .generate_ski_areas_for_unassigned_runs()
            .await?;
        stage_done("generate", started, report.generated);

        // Geocoding and snow-cover statistics run here in the full system;
        // both are external collaborators of this crate.

        let started = Instant::now();
        report.removed_without_geometry = self.remove_ski_areas_without_geometry().await?;
        stage_done("remove-without-geometry", started, report.removed_without_geometry);

        tracing::info!(
            duration_ms = pipeline_start.elapsed().as_millis() as u64,
            loaded = report.loaded,
            removed_ambiguous = report.removed_ambiguous,
            merged = report.merged,
            generated = report.generated,
            removed_without_geometry = report.removed_without_geometry,
            "clustering pipeline completed"
        );
        Ok(report)
    }

    /// A ski area that never got a polygon or a synthesized point cannot be
    /// placed on a map; drop it.
    async fn remove_ski_areas_without_geometry(&self) -> Result<usize> {
        // Materialize: we remove from the set being iterated
        let areas = self.store.ski_areas(&SkiAreaFilter::default()).await?;
        let mut removed = 0;
        for area in areas {
            if area.geometry.is_none() {
                tracing::info!(ski_area = %area.key, "removing ski area without geometry");
                self.store.remove_ski_area(&area.key).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn stage_done(stage: &str, started: Instant, count: usize) {
    tracing::info!(
        stage,
        duration_ms = started.elapsed().as_millis() as u64,
        count,
        "pipeline stage completed"
    );
}
