//! src/config.rs
//! ============================================================================
//! # Config: registry and logging settings
//!
//! Everything has a sensible default, so hosts can run without any file.
//! When a TOML file is supplied, missing sections fall back to defaults.
//!
//! ## Example
//! ```toml
//! [registry]
//! search_delay = "150ms"
//! worker_name = "launcher-apps"
//!
//! [logging]
//! log_dir = "logs"
//! log_level = "debug"
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::fs as TokioFs;
use tracing::info;

use crate::logging::LoggerConfig;

/// Registry actor settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Quiet period after the latest `search` call before it runs.
    #[serde(with = "humantime_serde")]
    pub search_delay: Duration,

    /// Name attached to the worker's tracing span.
    pub worker_name: String,

    /// Queue the initial enumeration as soon as the worker is spawned.
    pub initialize_on_spawn: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            search_delay: Duration::from_millis(100),
            worker_name: "applist-worker".to_string(),
            initialize_on_spawn: true,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub registry: RegistryConfig,

    pub logging: LoggerConfig,
}

impl Config {
    /// Load from `path`, or return defaults if the file does not exist.
    pub async fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !TokioFs::try_exists(path).await.unwrap_or(false) {
            info!(
                "No config file found at {}, using default configuration",
                path.display()
            );
            return Ok(Self::default());
        }

        info!("Loading config from {}", path.display());
        let text = TokioFs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Save as pretty TOML, creating parent directories as needed.
    pub async fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        info!("Saving config to {}", path.display());

        if let Some(parent) = path.parent() {
            TokioFs::create_dir_all(parent).await?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        TokioFs::write(path, toml_str).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.registry.search_delay, Duration::from_millis(100));
        assert!(cfg.registry.initialize_on_spawn);
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let cfg = Config::from_toml_str(
            r#"
            [registry]
            search_delay = "250ms"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.registry.search_delay, Duration::from_millis(250));
        assert_eq!(cfg.registry.worker_name, "applist-worker");
        assert_eq!(cfg.logging.log_level, LoggerConfig::default().log_level);
    }

    #[test]
    fn test_rejects_bad_duration() {
        assert!(Config::from_toml_str("[registry]\nsearch_delay = \"soon\"\n").is_err());
    }

    #[tokio::test]
    async fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load(dir.path().join("absent.toml")).await.unwrap();
        assert_eq!(cfg.registry, RegistryConfig::default());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.registry.search_delay = Duration::from_millis(40);
        cfg.registry.worker_name = "apps".to_string();
        cfg.save(&path).await.unwrap();

        let loaded = Config::load(&path).await.unwrap();
        assert_eq!(loaded.registry, cfg.registry);
    }
}
