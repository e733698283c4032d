//! Ski-area clustering engine
//!
//! Groups raw run/lift/ski-area features from inconsistent geospatial
//! sources into coherent ski areas: spatial assignment (polygon containment
//! and proximity flood fill), cross-source deduplication, and synthesis of
//! ski areas for orphan runs. Downstream stages (geocoding, statistics,
//! export) consume the finalized records; this crate exposes no network or
//! CLI surface of its own.

pub mod config;
pub mod engines;
pub mod loader;
pub mod orchestrator;
pub mod prepare;
pub mod store;

pub use crate::config::ClusteringConfig;
pub use crate::loader::{DataLoader, LoadStats};
pub use crate::orchestrator::{ClusterPipeline, PipelineReport};
pub use crate::store::{MemoryStore, SpatialObjectStore};
