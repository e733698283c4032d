//! Merge engine
//!
//! The same real-world ski area is frequently reported by both sources: a
//! drawn OpenStreetMap area and a registry point entry. This engine folds
//! each registry ski area into its nearby OpenStreetMap counterpart(s) and
//! deletes the registry one, accumulating provenance on the target.

use std::collections::HashSet;
use std::sync::Arc;

use piste_common::models::{
    activity, MapObject, SkiAreaObject, SkiAreaPatch, SourceType,
};
use piste_common::Result;

use crate::config::ClusteringConfig;
use crate::store::{SearchContext, SearchKind, SkiAreaFilter, SpatialObjectStore};

/// Pure merge function: target ski area plus the sources folded into it,
/// producing a partial update for the target.
pub type PropertyMerger = fn(&SkiAreaObject, &[SkiAreaObject]) -> SkiAreaPatch;

/// Default property merger. Provenance accumulates, the target's own values
/// win for everything else, activities become the union.
pub fn merge_ski_area_properties(
    target: &SkiAreaObject,
    sources: &[SkiAreaObject],
) -> SkiAreaPatch {
    let mut properties = target.properties.clone();
    let mut activities = target.activities.clone();
    for source in sources {
        for provenance in &source.properties.sources {
            if !properties.sources.contains(provenance) {
                properties.sources.push(provenance.clone());
            }
        }
        if properties.name.is_none() {
            properties.name = source.properties.name.clone();
        }
        for (key, value) in &source.properties.extra {
            properties
                .extra
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        activities = activity::union(&activities, &source.activities);
    }
    SkiAreaPatch {
        activities: Some(activities),
        properties: Some(properties),
        ..Default::default()
    }
}

/// Cross-source ski-area deduplication
pub struct MergeEngine {
    store: Arc<dyn SpatialObjectStore>,
    config: ClusteringConfig,
    merger: PropertyMerger,
}

impl MergeEngine {
    pub fn new(store: Arc<dyn SpatialObjectStore>, config: ClusteringConfig) -> Self {
        Self::with_merger(store, config, merge_ski_area_properties)
    }

    pub fn with_merger(
        store: Arc<dyn SpatialObjectStore>,
        config: ClusteringConfig,
        merger: PropertyMerger,
    ) -> Self {
        Self { store, config, merger }
    }

    /// Merge registry ski areas into nearby OpenStreetMap ones.
    ///
    /// Targets are ski areas from the other source within the merge radius
    /// that share an activity. When this registry area's already-assigned
    /// members reference other-source ski areas, those references pick the
    /// targets (the members have already told us which area they belong
    /// to); a registry area with no such references merges into any nearby
    /// candidate. After a merge, every registry identifier in any target's
    /// provenance list is marked processed so a many-to-one or many-to-many
    /// merge is never revisited piecewise.
    pub async fn merge_into_primary_source(&self) -> Result<usize> {
        // Materialize: the scan set shrinks as areas are merged away
        let registry_areas = self
            .store
            .ski_areas(&SkiAreaFilter::for_source(SourceType::Registry))
            .await?;

        let mut processed: HashSet<String> = HashSet::new();
        let mut merged = 0;

        for area in registry_areas {
            let own_source_ids: Vec<String> = area
                .properties
                .sources
                .iter()
                .filter(|s| s.source_type == SourceType::Registry)
                .map(|s| s.id.clone())
                .collect();
            if own_source_ids.iter().any(|id| processed.contains(id)) {
                continue;
            }
            processed.extend(own_source_ids);

            let targets = self.find_merge_targets(&area).await?;
            if targets.is_empty() {
                continue;
            }

            for target in &targets {
                let patch = (self.merger)(target, std::slice::from_ref(&area));
                if let Some(properties) = &patch.properties {
                    for provenance in &properties.sources {
                        if provenance.source_type == SourceType::Registry {
                            processed.insert(provenance.id.clone());
                        }
                    }
                }
                self.store.update_ski_area(&target.key, patch).await?;
            }
            self.store.remove_ski_area(&area.key).await?;
            merged += 1;
            tracing::info!(
                ski_area = %area.key,
                targets = targets.len(),
                "merged registry ski area into primary source"
            );
        }
        Ok(merged)
    }

    async fn find_merge_targets(&self, area: &SkiAreaObject) -> Result<Vec<SkiAreaObject>> {
        let origin = match area.geometry.clone() {
            Some(geometry) => geometry,
            None => match self.store.derived_ski_area_geometry(&area.key).await? {
                Some(derived) => derived,
                None => return Ok(Vec::new()),
            },
        };

        let activities = if area.activities.is_empty() {
            self.config.ski_relevant_activities.clone()
        } else {
            area.activities.clone()
        };
        let ctx = SearchContext::new(
            area.key.clone(),
            activities,
            SearchKind::Intersects {
                buffer_m: self.config.merge_search_radius_km * 1000.0,
            },
        );

        let nearby = self.store.find_nearby_objects(&origin, &ctx).await?;
        let mut targets: Vec<SkiAreaObject> = nearby
            .into_iter()
            .filter_map(|o| match o {
                MapObject::SkiArea(candidate)
                    if candidate.source == SourceType::OpenStreetMap =>
                {
                    Some(candidate)
                }
                _ => None,
            })
            .collect();

        // Inverse lookup: which other-source ski areas do my members point to
        let members = self.store.objects_for_ski_area(&area.key).await?;
        let referenced: HashSet<String> = members
            .iter()
            .filter(|m| !matches!(m, MapObject::SkiArea(_)))
            .flat_map(|m| m.ski_areas())
            .map(|r| r.ski_area_id.clone())
            .filter(|id| id != &area.key)
            .collect();
        if !referenced.is_empty() {
            targets.retain(|t| referenced.contains(&t.key));
        }
        Ok(targets)
    }
}
