//! Configuration file handling.
//!
//! The config is a TOML file with `[host]`, `[mods]` and `[logging]`
//! tables. A missing file is created with defaults on first start; missing
//! keys fall back to their defaults.

use anyhow::Result;
use ember_host::{HostConfig, ZoomPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

fn default_tick_interval() -> u64 {
    16
}

fn default_initial_zoom() -> f32 {
    1.0
}

fn default_log_capacity() -> usize {
    1024
}

/// Application configuration loaded from TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub host: HostSettings,
    #[serde(default)]
    pub mods: ModSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostSettings {
    /// Milliseconds between update ticks
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_initial_zoom")]
    pub initial_zoom: f32,
    /// Lower zoom bound; unset leaves zoom unbounded below
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_zoom: Option<f32>,
    /// Upper zoom bound; unset leaves zoom unbounded above
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_zoom: Option<f32>,
    /// Mod log entries kept in memory
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            initial_zoom: default_initial_zoom(),
            min_zoom: None,
            max_zoom: None,
            log_capacity: default_log_capacity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModSettings {
    /// Mod library directory
    pub directory: String,
    /// Load every library in `directory` on startup
    pub auto_load: bool,
    /// Library names to load (empty means load all)
    pub whitelist: Vec<String>,
}

impl Default for ModSettings {
    fn default() -> Self {
        Self {
            directory: "mods".to_string(),
            auto_load: true,
            whitelist: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level filter
    pub level: String,
    /// JSON formatting
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from `path`, writing a default file first if it
    /// does not exist.
    pub async fn load_from_file(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    pub fn zoom_policy(&self) -> Result<ZoomPolicy> {
        let policy = match (self.host.min_zoom, self.host.max_zoom) {
            (None, None) => ZoomPolicy::Unbounded,
            (min, max) => ZoomPolicy::clamped(min.unwrap_or(f32::MIN), max.unwrap_or(f32::MAX))?,
        };
        Ok(policy)
    }

    pub fn to_host_config(&self) -> Result<HostConfig> {
        Ok(HostConfig {
            initial_zoom: self.host.initial_zoom,
            zoom_policy: self.zoom_policy()?,
            mod_directory: PathBuf::from(&self.mods.directory),
            whitelist: self.mods.whitelist.clone(),
            log_capacity: self.host.log_capacity,
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.host.tick_interval_ms == 0 {
            return Err("Tick interval must be greater than zero".to_string());
        }

        if !self.host.initial_zoom.is_finite() {
            return Err(format!(
                "Initial zoom must be finite, got {}",
                self.host.initial_zoom
            ));
        }

        for (name, bound) in [("min_zoom", self.host.min_zoom), ("max_zoom", self.host.max_zoom)] {
            if let Some(value) = bound {
                if !value.is_finite() {
                    return Err(format!("{} must be finite, got {}", name, value));
                }
            }
        }
        if let (Some(min), Some(max)) = (self.host.min_zoom, self.host.max_zoom) {
            if min > max {
                return Err(format!(
                    "min_zoom ({}) must not exceed max_zoom ({})",
                    min, max
                ));
            }
        }

        if self.host.log_capacity == 0 {
            return Err("Log capacity must be greater than zero".to_string());
        }

        if self.mods.directory.is_empty() {
            return Err("Mod directory cannot be empty".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level, valid_levels
            ));
        }

        Ok(())
    }
}
