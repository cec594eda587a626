//! Update settings and the JSON config file at
//! `<config_dir>/easy-location/config.json`.
//!
//! Every field is optional in the file; missing fields fall back to the
//! defaults below. A missing file is not an error.

use crate::error::ConfigError;
use crate::location::ProviderKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_MIN_INTERVAL_MS: u64 = 15 * 1000;
const DEFAULT_MIN_DISTANCE_M: f32 = 50.0;

/// How often, and from which provider, location updates are requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateSettings {
    /// Minimum time between updates, in milliseconds.
    pub min_interval_ms: u64,
    /// Minimum displacement between updates, in meters.
    pub min_distance_m: f32,
    /// Providers to try, most preferred first.
    pub preferred_providers: Vec<ProviderKind>,
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            min_interval_ms: DEFAULT_MIN_INTERVAL_MS,
            min_distance_m: DEFAULT_MIN_DISTANCE_M,
            preferred_providers: vec![ProviderKind::Network, ProviderKind::Gps],
        }
    }
}

impl UpdateSettings {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min_distance_m.is_finite() || self.min_distance_m < 0.0 {
            return Err(ConfigError::Invalid {
                field: "min_distance_m",
                reason: format!("must be a non-negative number, got {}", self.min_distance_m),
            });
        }

        if self.preferred_providers.is_empty() {
            return Err(ConfigError::Invalid {
                field: "preferred_providers",
                reason: "at least one provider is required".into(),
            });
        }

        for (i, provider) in self.preferred_providers.iter().enumerate() {
            if self.preferred_providers[..i].contains(provider) {
                return Err(ConfigError::Invalid {
                    field: "preferred_providers",
                    reason: format!("'{}' is listed more than once", provider),
                });
            }
        }

        Ok(())
    }
}

/// Top-level config file contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub updates: UpdateSettings,
}

impl LocationConfig {
    /// Load from the default location, or defaults if the file is absent.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path())
    }

    /// Load from a specific path (for testing and `--config`).
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let config: LocationConfig =
            serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.updates.validate()?;

        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("easy-location")
            .join("config.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::TempDir;

    fn write_config(contents: &str) -> (PathBuf, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, contents).unwrap();
        (path, dir)
    }

    #[test]
    fn test_defaults() {
        let settings = UpdateSettings::default();
        assert_eq!(settings.min_interval(), Duration::from_secs(15));
        assert_relative_eq!(settings.min_distance_m, 50.0);
        assert_eq!(
            settings.preferred_providers,
            vec![ProviderKind::Network, ProviderKind::Gps]
        );
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = LocationConfig::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, LocationConfig::default());
    }

    #[test]
    fn test_partial_file() {
        let (path, _dir) = write_config(r#"{ "updates": { "min_distance_m": 10.5 } }"#);
        let config = LocationConfig::load_from(&path).unwrap();

        assert_relative_eq!(config.updates.min_distance_m, 10.5);
        assert_eq!(config.updates.min_interval_ms, DEFAULT_MIN_INTERVAL_MS);
        assert_eq!(config.updates.preferred_providers.len(), 2);
    }

    #[test]
    fn test_full_file() {
        let (path, _dir) = write_config(
            r#"{
                "updates": {
                    "min_interval_ms": 1000,
                    "min_distance_m": 0,
                    "preferred_providers": ["gps", "passive"]
                }
            }"#,
        );
        let config = LocationConfig::load_from(&path).unwrap();

        assert_eq!(config.updates.min_interval(), Duration::from_secs(1));
        assert_eq!(
            config.updates.preferred_providers,
            vec![ProviderKind::Gps, ProviderKind::Passive]
        );
    }

    #[test]
    fn test_malformed_json() {
        let (path, _dir) = write_config("{ updates: ");
        let err = LocationConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_unknown_provider_is_parse_error() {
        let (path, _dir) = write_config(r#"{ "updates": { "preferred_providers": ["wifi"] } }"#);
        let err = LocationConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_validation_rejects_empty_providers() {
        let (path, _dir) = write_config(r#"{ "updates": { "preferred_providers": [] } }"#);
        let err = LocationConfig::load_from(&path).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { field: "preferred_providers", .. }
        ));
    }

    #[test]
    fn test_validation_rejects_duplicates() {
        let settings = UpdateSettings {
            preferred_providers: vec![ProviderKind::Gps, ProviderKind::Network, ProviderKind::Gps],
            ..UpdateSettings::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("'gps' is listed more than once"));
    }

    #[test]
    fn test_validation_rejects_negative_distance() {
        let settings = UpdateSettings {
            min_distance_m: -1.0,
            ..UpdateSettings::default()
        };
        assert!(settings.validate().is_err());

        let settings = UpdateSettings {
            min_distance_m: f32::NAN,
            ..UpdateSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_default_path_shape() {
        let path = LocationConfig::default_path();
        assert!(path.ends_with("easy-location/config.json"));
    }
}
