//! Data loader
//!
//! Persists prepared draft objects into the spatial object store and
//! triggers index creation once everything is in. A bad object is logged
//! and skipped; it must not take the rest of the batch down with it.

use std::sync::Arc;

use anyhow::Context;
use piste_common::models::MapObject;
use piste_common::Result;

use crate::store::SpatialObjectStore;

/// Outcome counters of a load
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadStats {
    pub saved: usize,
    pub skipped: usize,
}

/// Persists prepared objects into the store
pub struct DataLoader {
    store: Arc<dyn SpatialObjectStore>,
}

impl DataLoader {
    pub fn new(store: Arc<dyn SpatialObjectStore>) -> Self {
        Self { store }
    }

    /// Load a batch of prepared objects, then build the store's indexes.
    pub async fn load(&self, objects: Vec<MapObject>) -> Result<LoadStats> {
        let mut stats = LoadStats::default();
        for object in objects {
            let key = object.key().to_string();
            match self
                .store
                .save_object(object)
                .await
                .context("saving prepared object")
            {
                Ok(()) => stats.saved += 1,
                Err(error) => {
                    tracing::warn!(
                        key = %key,
                        error = %format!("{error:#}"),
                        "failed to save object, skipping"
                    );
                    stats.skipped += 1;
                }
            }
        }
        self.store.build_indexes().await?;
        tracing::info!(saved = stats.saved, skipped = stats.skipped, "objects loaded into store");
        Ok(stats)
    }
}
