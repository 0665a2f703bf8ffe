use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// Tile manager configuration.
///
/// Passed in at construction and replaceable between ticks with
/// [`TileManager::set_config`](crate::TileManager::set_config).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Global multiplier applied to every layer's cull distance.
    pub cull_distance_scale: f32,
    /// Maximum number of tiles whose jobs may be in flight at once.
    pub max_processing_tiles: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            cull_distance_scale: 1.0,
            max_processing_tiles: 10,
        }
    }
}

impl ManagerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.cull_distance_scale.is_finite() || self.cull_distance_scale <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "cull_distance_scale",
                reason: format!("must be positive, got {}", self.cull_distance_scale),
            });
        }
        if self.max_processing_tiles == 0 {
            return Err(ConfigError::Invalid {
                field: "max_processing_tiles",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Load and validate a JSON config file. Missing fields take defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path)?;
        let config: Self = serde_json::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = ManagerConfig::default();
        assert_eq!(config.cull_distance_scale, 1.0);
        assert_eq!(config.max_processing_tiles, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_values() {
        let zero_ceiling = ManagerConfig {
            max_processing_tiles: 0,
            ..ManagerConfig::default()
        };
        assert!(matches!(
            zero_ceiling.validate(),
            Err(ConfigError::Invalid {
                field: "max_processing_tiles",
                ..
            })
        ));

        let bad_scale = ManagerConfig {
            cull_distance_scale: -1.0,
            ..ManagerConfig::default()
        };
        assert!(bad_scale.validate().is_err());
    }

    #[test]
    fn save_and_load() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let config = ManagerConfig {
            cull_distance_scale: 2.5,
            max_processing_tiles: 3,
        };
        config.save(tmp.path()).unwrap();
        assert_eq!(ManagerConfig::load(tmp.path()).unwrap(), config);
    }

    #[test]
    fn partial_file_uses_defaults() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(tmp, r#"{{ "max_processing_tiles": 4 }}"#).unwrap();
        let config = ManagerConfig::load(tmp.path()).unwrap();
        assert_eq!(config.max_processing_tiles, 4);
        assert_eq!(config.cull_distance_scale, 1.0);
    }

    #[test]
    fn invalid_file_is_rejected() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(tmp, r#"{{ "max_processing_tiles": 0 }}"#).unwrap();
        assert!(ManagerConfig::load(tmp.path()).is_err());

        let mut garbage = tempfile::NamedTempFile::new().unwrap();
        write!(garbage, "not json").unwrap();
        assert!(matches!(
            ManagerConfig::load(garbage.path()),
            Err(ConfigError::Json(_))
        ));
    }
}
