//! Stable, content-derived object keys
//!
//! A key uniquely and permanently identifies a map object: re-saving with
//! the same key overwrites in place, never duplicates. Keys are derived
//! from the object kind and the source-provided identifier so that repeated
//! imports of the same feature land on the same record.

use sha2::{Digest, Sha256};

use crate::models::ObjectKind;

/// Hex length of a derived key. Long enough that collisions are not a
/// practical concern for planet-scale feature counts.
const KEY_LEN: usize = 24;

/// Derive the stable key for a source feature.
pub fn object_key(kind: ObjectKind, source_id: &str) -> String {
    let digest = Sha256::digest(format!("{}:{}", kind.tag(), source_id).as_bytes());
    let mut hex = format!("{digest:x}");
    hex.truncate(KEY_LEN);
    hex
}
