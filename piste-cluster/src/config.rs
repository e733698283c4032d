//! Clustering configuration
//!
//! Carries the heuristic constants as named values. The numbers reflect
//! observed real-world behavior; changing them changes which resorts end up
//! clustered together, so treat them as tuned.
//!
//! Resolution order for configuration:
//! 1. Explicit path (highest priority)
//! 2. `PISTE_CONFIG` environment variable
//! 3. Compiled defaults

use piste_common::models::Activity;
use piste_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the clustering engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ClusteringConfig {
    /// Buffer radius for the proximity flood fill, in kilometers
    pub proximity_search_radius_km: f64,

    /// Buffer radius for cross-source merge candidates, in kilometers
    pub merge_search_radius_km: f64,

    /// How far a synthesized representative point is nudged from the
    /// nearest member vertex toward the cluster centroid, in meters
    pub representative_point_offset_m: f64,

    /// A ski area is removed as ambiguous when more than this fraction of
    /// its discovered run/lift members is site-assigned to somewhere else
    pub site_conflict_threshold: f64,

    /// Worker budget for bounded-parallel ski-area batches
    pub max_concurrency: usize,

    /// Activities eligible for clustering. Objects whose activities fall
    /// entirely outside this set never join a ski area.
    pub ski_relevant_activities: Vec<Activity>,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            proximity_search_radius_km: 0.5,
            merge_search_radius_km: 0.25,
            representative_point_offset_m: 100.0,
            site_conflict_threshold: 0.5,
            max_concurrency: default_concurrency(),
            ski_relevant_activities: vec![Activity::Downhill, Activity::Nordic],
        }
    }
}

impl ClusteringConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(Error::Config("max_concurrency must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.site_conflict_threshold) {
            return Err(Error::Config(
                "site_conflict_threshold must be between 0 and 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Worker budget: small fixed cap, never exceeding available cores.
fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .min(4)
}

/// Load configuration following the resolution priority order.
pub fn load_config(explicit_path: Option<&Path>) -> Result<ClusteringConfig> {
    if let Some(path) = explicit_path {
        return read_config_file(path);
    }
    if let Ok(path) = std::env::var("PISTE_CONFIG") {
        return read_config_file(Path::new(&path));
    }
    Ok(ClusteringConfig::default())
}

fn read_config_file(path: &Path) -> Result<ClusteringConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: ClusteringConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_observed_constants() {
        let config = ClusteringConfig::default();
        assert_eq!(config.proximity_search_radius_km, 0.5);
        assert_eq!(config.merge_search_radius_km, 0.25);
        assert_eq!(config.representative_point_offset_m, 100.0);
        assert_eq!(config.site_conflict_threshold, 0.5);
        assert!(config.max_concurrency >= 1 && config.max_concurrency <= 4);
        assert_eq!(
            config.ski_relevant_activities,
            vec![Activity::Downhill, Activity::Nordic]
        );
    }

    #[test]
    fn partial_toml_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "proximity_search_radius_km = 1.0").unwrap();
        writeln!(file, "max_concurrency = 2").unwrap();
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.proximity_search_radius_km, 1.0);
        assert_eq!(config.max_concurrency, 2);
        // Untouched values keep their defaults
        assert_eq!(config.merge_search_radius_km, 0.25);
    }

    #[test]
    fn invalid_concurrency_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_concurrency = 0").unwrap();
        assert!(load_config(Some(file.path())).is_err());
    }
}
