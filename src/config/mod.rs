//! Configuration module for visflow-rs
//!
//! The engine configuration is a TOML file holding logging, evaluation and
//! animation settings. It is loaded once by the application and handed to
//! each scene through [`SceneContext::with_config`](crate::scene::SceneContext::with_config);
//! there is no global settings store.
//!
//! # Location
//!
//! - **Linux**: `~/.config/dev.visflow.visflow-rs/engine.toml`
//! - **macOS**: `~/Library/Application Support/dev.visflow.visflow-rs/engine.toml`
//! - **Windows**: `%APPDATA%\dev.visflow.visflow-rs\engine.toml`
//!
//! The `VISFLOW_CONFIG` environment variable overrides the location.

pub mod settings;

pub use settings::*;

use crate::error::{Result, VisFlowError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "dev.visflow.visflow-rs";

/// Engine configuration filename
pub const CONFIG_FILE: &str = "engine.toml";

/// Environment variable overriding the configuration path
pub const CONFIG_ENV_VAR: &str = "VISFLOW_CONFIG";

/// Persisted engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub logging: LoggingSettings,
    pub evaluation: EvaluationSettings,
    pub animation: AnimationDefaults,
}

impl EngineConfig {
    /// Path of the configuration file: `VISFLOW_CONFIG` if set, otherwise
    /// the platform config directory.
    pub fn default_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR).filter(|p| !p.is_empty()) {
            return Some(PathBuf::from(path));
        }
        dirs_next::config_dir().map(|p| p.join(APP_ID).join(CONFIG_FILE))
    }

    /// Load a configuration file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            VisFlowError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        toml::from_str(&content).map_err(|e| {
            VisFlowError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })
    }

    /// Load a configuration file, returning defaults if it is missing or
    /// invalid
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load engine config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the configuration as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                VisFlowError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| VisFlowError::Serialization(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            VisFlowError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }
}
