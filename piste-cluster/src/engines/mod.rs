//! Clustering engines
//!
//! Three cooperating engines over the shared object store: assignment
//! (spatial grouping of objects into ski areas), merge (cross-source
//! deduplication) and generation (synthesizing ski areas for orphan runs).

pub mod assignment;
pub mod generation;
pub mod merge;

pub use assignment::{AssignmentEngine, AssignmentOptions, AssignmentOutcome, SearchPolicy};
pub use generation::GenerationEngine;
pub use merge::{merge_ski_area_properties, MergeEngine, PropertyMerger};
