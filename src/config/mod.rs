//! # Configuration Management Module
//!
//! TOML configuration for the `afkrpg` binary. Every section and field has a
//! default, so an empty file (or no file at all) is a valid configuration.
//!
//! ## Configuration Structure
//!
//! - [`GameConfig`] - live tick interval and an optional catalog file
//! - [`ReplayConfig`] - offline replay policy (ticks per minute, floor and cap)
//! - [`StorageConfig`] - where the sled save store lives
//! - [`LoggingConfig`] - log level and optional log file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use afkrpg::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("config.toml").await?;
//!     let config = Config::load("config.toml").await?;
//!     println!("Tick every {} ms", config.game.tick_interval_ms);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [game]
//! tick_interval_ms = 2000
//! # catalog_path = "catalog.json"
//!
//! [replay]
//! ticks_per_minute = 30
//! min_elapsed_minutes = 0
//! max_elapsed_minutes = 10080
//! max_ticks_per_chunk = 1000
//!
//! [storage]
//! data_dir = "./data"
//!
//! [logging]
//! level = "info"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::idle::catalog::Catalog;
use crate::idle::session::SessionOptions;

pub use crate::idle::replay::ReplayConfig;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub replay: ReplayConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Live tick period in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// JSON catalog replacing the built-in world.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<String>,
    /// Progression path given to a character created on first run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_path: Option<String>,
}

fn default_tick_interval_ms() -> u64 {
    2_000
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            catalog_path: None,
            default_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_data_dir() -> String {
    "./data".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to the defaults.
    pub async fn load_or_default(path: &str) -> Result<Self> {
        if fs::try_exists(path).await.unwrap_or(false) {
            Self::load(path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.game.tick_interval_ms == 0 {
            return Err(anyhow!("game.tick_interval_ms must be greater than 0"));
        }
        if self.replay.ticks_per_minute == 0 {
            return Err(anyhow!("replay.ticks_per_minute must be greater than 0"));
        }
        if self.replay.max_ticks_per_chunk == 0 {
            return Err(anyhow!("replay.max_ticks_per_chunk must be greater than 0"));
        }
        if self.replay.min_elapsed_minutes > self.replay.max_elapsed_minutes {
            return Err(anyhow!(
                "replay.min_elapsed_minutes ({}) exceeds replay.max_elapsed_minutes ({})",
                self.replay.min_elapsed_minutes,
                self.replay.max_elapsed_minutes
            ));
        }
        if self.storage.data_dir.trim().is_empty() {
            return Err(anyhow!("storage.data_dir must not be empty"));
        }
        Ok(())
    }

    pub fn save_dir(&self) -> PathBuf {
        PathBuf::from(&self.storage.data_dir).join("afkrpg.sled")
    }

    /// The configured catalog, or the built-in one.
    pub fn catalog(&self) -> Result<Catalog> {
        match &self.game.catalog_path {
            Some(path) => Catalog::load_json(path)
                .map_err(|e| anyhow!("Failed to load catalog {}: {}", path, e)),
            None => Ok(Catalog::standard()),
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            tick_interval: Duration::from_millis(self.game.tick_interval_ms),
            replay: self.replay.clone(),
            new_game_path: self.game.default_path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.game.tick_interval_ms, 2_000);
        assert_eq!(config.replay, ReplayConfig::default());
        assert_eq!(config.replay.max_elapsed_minutes, 7 * 24 * 60);
        assert_eq!(config.storage.data_dir, "./data");
        assert_eq!(config.logging.level, "info");
        config.validate().unwrap();
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [replay]
            min_elapsed_minutes = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.replay.min_elapsed_minutes, 5);
        assert_eq!(config.replay.ticks_per_minute, 30);
    }

    #[test]
    fn validate_rejects_inverted_bounds() {
        let mut config = Config::default();
        config.replay.min_elapsed_minutes = 100;
        config.replay.max_elapsed_minutes = 10;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.game.tick_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.game.tick_interval_ms, 2_000);
        assert_eq!(parsed.replay, ReplayConfig::default());
    }

    #[tokio::test]
    async fn create_default_then_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let path = path.to_str().unwrap();
        Config::create_default(path).await.unwrap();
        let config = Config::load(path).await.unwrap();
        assert_eq!(config.storage.data_dir, "./data");
    }

    #[test]
    fn session_options_follow_config() {
        let mut config = Config::default();
        config.game.tick_interval_ms = 500;
        let options = config.session_options();
        assert_eq!(options.tick_interval, Duration::from_millis(500));
    }
}
