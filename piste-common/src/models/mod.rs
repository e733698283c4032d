//! Object model for the ski-area catalog
//!
//! Runs, lifts and ski areas share a small set of common fields (stable
//! key, geometry, activities, ski-area memberships, opaque properties) and
//! are modeled as one sum type with exhaustive matching on kind.

pub mod activity;
mod lift;
mod object;
mod run;
mod ski_area;

pub use activity::Activity;
pub use lift::{LiftObject, LiftType};
pub use object::{AssignedFrom, MapObject, ObjectKind, SkiAreaRef, SourceType};
pub use run::{Difficulty, RunObject, RunPatch};
pub use ski_area::{SkiAreaObject, SkiAreaPatch, SkiAreaProperties, SkiAreaSource};
