//! Shared types for the piste ski-area catalog
//!
//! Object model (runs, lifts, ski areas), activity algebra, stable object
//! keys, and the geometry helpers used by the clustering engine.

pub mod error;
pub mod geometry;
pub mod keys;
pub mod models;

pub use crate::error::{Error, Result};
