//! Tunables for the derivation pipeline.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Configuration for the few aggregation parameters that are policy rather
/// than arithmetic.
///
/// Every field has a default matching the original report's behavior, so a
/// config file only needs to mention the values it wants to override.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Program-scatter points with attendance at or above this value are
    /// excluded before the view is published. The cutoff exists in the source
    /// data pipeline we inherited; whether it was meant as outlier exclusion
    /// or display scaling is unrecorded, hence configurable.
    pub scatter_attendance_cap: f64,
    /// Maximum number of rows in the genre ranking.
    pub genre_limit: usize,
    /// Maximum number of rows in the title and reading-level rankings.
    pub title_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scatter_attendance_cap: 100.0,
            genre_limit: 20,
            title_limit: 50,
        }
    }
}

impl Config {
    /// Load configuration from a JSON or YAML file, determined by extension.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| Error::CannotDetermineFileType(path.to_path_buf()))?;
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Io(path.display().to_string(), e))?;
        match ext {
            "json" => Ok(serde_json::from_str(&content)?),
            "yml" | "yaml" => Ok(serde_yaml::from_str(&content)?),
            _ => Err(Error::CannotDetermineFileType(path.to_path_buf())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_preserve_original_behavior() {
        let config = Config::default();
        assert_eq!(config.scatter_attendance_cap, 100.0);
        assert_eq!(config.genre_limit, 20);
        assert_eq!(config.title_limit, 50);
    }

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: Config = serde_yaml::from_str("genre_limit: 5").unwrap();
        assert_eq!(config.genre_limit, 5);
        assert_eq!(config.title_limit, 50);
        assert_eq!(config.scatter_attendance_cap, 100.0);
    }
}
