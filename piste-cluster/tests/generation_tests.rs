//! Ski-area generation behavior, including the defensive guard against a
//! store whose "next unassigned run" query does not converge.

mod fixtures;

use std::sync::Arc;

use async_trait::async_trait;
use fixtures::*;
use geo::{Geometry, MultiPolygon};
use piste_cluster::engines::GenerationEngine;
use piste_cluster::store::{SearchContext, SkiAreaFilter};
use piste_cluster::{MemoryStore, SpatialObjectStore};
use piste_common::models::{
    Activity, AssignedFrom, LiftObject, MapObject, RunObject, RunPatch, SkiAreaObject,
    SkiAreaPatch, SourceType,
};
use piste_common::Result;

async fn seeded_store(objects: Vec<MapObject>) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for object in objects {
        store.save_object(object).await.unwrap();
    }
    store.build_indexes().await.unwrap();
    store
}

#[tokio::test]
async fn downhill_seed_without_lift_yields_no_ski_area() {
    let store = seeded_store(vec![MapObject::Run(seed_run(
        "solo",
        line(&[(0.0, 0.0), (0.001, 0.0)]),
        vec![Activity::Downhill],
    ))])
    .await;

    let engine = GenerationEngine::new(store.clone(), test_config());
    assert_eq!(engine.generate_ski_areas_for_unassigned_runs().await.unwrap(), 0);

    let MapObject::Run(solo) = store.get("solo").await.unwrap() else {
        panic!("expected run");
    };
    assert!(!solo.is_basis_for_new_ski_area);
    assert!(solo.ski_areas.is_empty());
    assert!(store.ski_areas(&SkiAreaFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn nordic_seed_needs_no_lift() {
    let store = seeded_store(vec![
        MapObject::Run(seed_run(
            "trail",
            line(&[(0.0, 0.0), (0.001, 0.0)]),
            vec![Activity::Nordic],
        )),
        MapObject::Run(run(
            "loop",
            line(&[(0.002, 0.0), (0.003, 0.0)]),
            vec![Activity::Nordic],
        )),
    ])
    .await;

    let engine = GenerationEngine::new(store.clone(), test_config());
    assert_eq!(engine.generate_ski_areas_for_unassigned_runs().await.unwrap(), 1);

    let areas = store.ski_areas(&SkiAreaFilter::default()).await.unwrap();
    assert_eq!(areas.len(), 1);
    assert_eq!(areas[0].activities, vec![Activity::Nordic]);
    assert_eq!(areas[0].source, SourceType::OpenStreetMap);

    let MapObject::Run(member) = store.get("loop").await.unwrap() else {
        panic!("expected run");
    };
    assert_eq!(member.ski_areas.len(), 1);
    assert_eq!(member.ski_areas[0].assigned_from, AssignedFrom::Proximity);
}

#[tokio::test]
async fn demotion_drops_downhill_only_members() {
    // Mixed cluster, no lift: the nordic part survives, downhill is dropped
    let store = seeded_store(vec![
        MapObject::Run(seed_run(
            "mixed",
            line(&[(0.0, 0.0), (0.001, 0.0)]),
            vec![Activity::Downhill, Activity::Nordic],
        )),
        MapObject::Run(run(
            "steep",
            line(&[(0.002, 0.0), (0.003, 0.0)]),
            vec![Activity::Downhill],
        )),
    ])
    .await;

    let engine = GenerationEngine::new(store.clone(), test_config());
    assert_eq!(engine.generate_ski_areas_for_unassigned_runs().await.unwrap(), 1);

    let areas = store.ski_areas(&SkiAreaFilter::default()).await.unwrap();
    assert_eq!(areas.len(), 1);
    assert_eq!(areas[0].activities, vec![Activity::Nordic]);

    let MapObject::Run(steep) = store.get("steep").await.unwrap() else {
        panic!("expected run");
    };
    assert!(steep.ski_areas.is_empty());
}

#[tokio::test]
async fn downhill_seed_with_lift_generates_ski_area() {
    let store = seeded_store(vec![
        MapObject::Run(seed_run(
            "piste",
            line(&[(0.0, 0.0), (0.001, 0.0)]),
            vec![Activity::Downhill],
        )),
        MapObject::Lift(lift("chair", line(&[(0.001, 0.001), (0.002, 0.001)]))),
    ])
    .await;

    let engine = GenerationEngine::new(store.clone(), test_config());
    assert_eq!(engine.generate_ski_areas_for_unassigned_runs().await.unwrap(), 1);

    let areas = store.ski_areas(&SkiAreaFilter::default()).await.unwrap();
    assert_eq!(areas.len(), 1);
    assert_eq!(areas[0].activities, vec![Activity::Downhill]);
    assert!(matches!(areas[0].geometry, Some(Geometry::Point(_))));
    assert!(!areas[0].is_polygon);
}

/// Delegates to a [`MemoryStore`] but keeps returning any flagged run from
/// `next_unassigned_run`, ignoring assignment state. Models a backend whose
/// "next" query does not observe the writes of the previous round.
struct NonConvergingStore {
    inner: MemoryStore,
}

#[async_trait]
impl SpatialObjectStore for NonConvergingStore {
    async fn save_object(&self, object: MapObject) -> Result<()> {
        self.inner.save_object(object).await
    }

    async fn save_objects(&self, objects: Vec<MapObject>) -> Result<()> {
        self.inner.save_objects(objects).await
    }

    async fn update_ski_area(&self, key: &str, patch: SkiAreaPatch) -> Result<()> {
        self.inner.update_ski_area(key, patch).await
    }

    async fn update_run(&self, key: &str, patch: RunPatch) -> Result<()> {
        self.inner.update_run(key, patch).await
    }

    async fn remove_ski_area(&self, key: &str) -> Result<()> {
        self.inner.remove_ski_area(key).await
    }

    async fn build_indexes(&self) -> Result<()> {
        self.inner.build_indexes().await
    }

    async fn ski_areas(&self, filter: &SkiAreaFilter) -> Result<Vec<SkiAreaObject>> {
        self.inner.ski_areas(filter).await
    }

    async fn runs(&self) -> Result<Vec<RunObject>> {
        self.inner.runs().await
    }

    async fn lifts(&self) -> Result<Vec<LiftObject>> {
        self.inner.lifts().await
    }

    async fn find_nearby_objects(
        &self,
        geometry: &Geometry<f64>,
        ctx: &SearchContext,
    ) -> Result<Vec<MapObject>> {
        self.inner.find_nearby_objects(geometry, ctx).await
    }

    async fn objects_for_ski_area(&self, ski_area_id: &str) -> Result<Vec<MapObject>> {
        self.inner.objects_for_ski_area(ski_area_id).await
    }

    async fn mark_objects_as_part_of_ski_area(
        &self,
        ski_area_id: &str,
        keys: &[String],
        assigned_from: AssignedFrom,
    ) -> Result<()> {
        self.inner
            .mark_objects_as_part_of_ski_area(ski_area_id, keys, assigned_from)
            .await
    }

    async fn next_unassigned_run(&self) -> Result<Option<RunObject>> {
        Ok(self
            .inner
            .runs()
            .await?
            .into_iter()
            .find(|run| run.is_basis_for_new_ski_area))
    }

    async fn derived_ski_area_geometry(&self, ski_area_id: &str) -> Result<Option<Geometry<f64>>> {
        self.inner.derived_ski_area_geometry(ski_area_id).await
    }

    async fn ski_feature_buffer(&self, buffer_m: f64) -> Result<MultiPolygon<f64>> {
        self.inner.ski_feature_buffer(buffer_m).await
    }
}

#[tokio::test]
async fn same_run_returned_twice_gets_its_flag_cleared() {
    let store = Arc::new(NonConvergingStore {
        inner: MemoryStore::new(),
    });
    store
        .save_object(MapObject::Run(seed_run(
            "trail",
            line(&[(0.0, 0.0), (0.001, 0.0)]),
            vec![Activity::Nordic],
        )))
        .await
        .unwrap();
    store.build_indexes().await.unwrap();

    let engine = GenerationEngine::new(store.clone(), test_config());
    // Generation succeeds once; the repeated "next" answer trips the guard
    // instead of looping forever.
    assert_eq!(engine.generate_ski_areas_for_unassigned_runs().await.unwrap(), 1);

    let MapObject::Run(trail) = store.inner.get("trail").await.unwrap() else {
        panic!("expected run");
    };
    assert!(!trail.is_basis_for_new_ski_area);
    assert_eq!(store.ski_areas(&SkiAreaFilter::default()).await.unwrap().len(), 1);
}
