//! Configuration management for flightsearch.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "flightsearch";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "flight_database.db";

/// Default preferences file name.
const PREFERENCES_FILE_NAME: &str = "preferences.json";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `FLIGHTSEARCH_`, sections split by `__`)
/// 2. TOML config file at `~/.config/flightsearch/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Search behaviour configuration.
    pub search: SearchConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/flightsearch/flight_database.db`
    pub database_path: Option<PathBuf>,
    /// Path to the preferences file holding the last search text.
    /// Defaults to `~/.local/share/flightsearch/preferences.json`
    pub preferences_path: Option<PathBuf>,
    /// JSON airport dataset used instead of the bundled one when seeding a
    /// fresh database.
    pub seed_path: Option<PathBuf>,
}

/// Search-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Quiet period before autocomplete suggestions are delivered, in milliseconds.
    pub debounce_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { debounce_ms: 500 }
    }
}

impl SearchConfig {
    /// Get the debounce period as a Duration.
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Config {
    /// Load configuration from all sources, reading the TOML file from
    /// `config_path` or the default location.
    ///
    /// Later sources override earlier ones: defaults, then the TOML file (if
    /// it exists), then `FLIGHTSEARCH_` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("FLIGHTSEARCH_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.search.debounce_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "debounce_ms must be greater than 0".to_string(),
            });
        }

        if let Some(seed) = &self.storage.seed_path {
            if !seed.is_file() {
                return Err(Error::ConfigValidation {
                    message: format!("seed_path {} is not a file", seed.display()),
                });
            }
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the preferences path, resolving defaults if not set.
    #[must_use]
    pub fn preferences_path(&self) -> PathBuf {
        self.storage
            .preferences_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(PREFERENCES_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.storage.database_path.is_none());
        assert!(config.storage.preferences_path.is_none());
        assert!(config.storage.seed_path.is_none());
        assert_eq!(config.search.debounce_ms, 500);
    }

    #[test]
    fn test_debounce() {
        let config = Config::default();
        assert_eq!(config.search.debounce(), Duration::from_millis(500));
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_debounce() {
        let mut config = Config::default();
        config.search.debounce_ms = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("debounce_ms"));
    }

    #[test]
    fn test_validate_missing_seed_file() {
        let mut config = Config::default();
        config.storage.seed_path = Some(PathBuf::from("/nonexistent/airports.json"));

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("seed_path"));
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        let path = config.database_path();

        assert!(path.to_string_lossy().contains("flight_database.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_preferences_path_default() {
        let config = Config::default();
        let path = config.preferences_path();

        assert!(path.to_string_lossy().contains("preferences.json"));
        assert!(path.to_string_lossy().contains("flightsearch"));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("flightsearch"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let result = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")));
        assert!(result.is_ok());

        let config = result.unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[search]\ndebounce_ms = 250\n\n[storage]\ndatabase_path = \"/tmp/flights.db\"\n",
        )
        .unwrap();

        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(config.search.debounce_ms, 250);
        assert_eq!(config.database_path(), PathBuf::from("/tmp/flights.db"));
    }

    #[test]
    fn test_load_rejects_invalid_toml_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[search]\ndebounce_ms = 0\n").unwrap();

        let err = Config::load_from(Some(path)).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation { .. }));
    }

    #[test]
    fn test_search_config_deserialize() {
        let json = r#"{"debounce_ms": 100}"#;
        let search: SearchConfig = serde_json::from_str(json).unwrap();
        assert_eq!(search.debounce_ms, 100);
    }

    #[test]
    fn test_storage_config_serialize() {
        let storage = StorageConfig::default();
        let json = serde_json::to_string(&storage).unwrap();
        assert!(json.contains("database_path"));
        assert!(json.contains("preferences_path"));
    }
}
