//! Tracker configuration.
//!
//! Config file: ~/.config/skytrack/config.toml or /etc/skytrack/config.toml.
//! The Hypixel API key may also come from the HYPIXEL_API_KEY environment
//! variable, which takes precedence over the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Database location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("skyblock_stats.db"),
        }
    }
}

/// HTTP API listener
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:5000".to_string(),
        }
    }
}

/// Which profile and member to track, and how to authenticate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HypixelConfig {
    #[serde(default)]
    pub profile_id: String,
    #[serde(default)]
    pub player_uuid: String,
    /// Overridden by HYPIXEL_API_KEY when set.
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Top-level tracker configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub hypixel: HypixelConfig,
}

impl TrackerConfig {
    pub fn user_config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME").context("HOME not set")?;
        Ok(PathBuf::from(home).join(".config/skytrack/config.toml"))
    }

    pub fn system_config_path() -> PathBuf {
        PathBuf::from("/etc/skytrack/config.toml")
    }

    /// Load from the user path, then the system path, then defaults.
    pub fn load() -> Result<Self> {
        if let Ok(user_path) = Self::user_config_path() {
            if user_path.exists() {
                let contents = fs::read_to_string(&user_path)
                    .with_context(|| format!("Failed to read {}", user_path.display()))?;
                let config: TrackerConfig = toml::from_str(&contents)
                    .with_context(|| format!("Failed to parse {}", user_path.display()))?;
                return Ok(config);
            }
        }

        let system_path = Self::system_config_path();
        if system_path.exists() {
            let contents = fs::read_to_string(&system_path)
                .with_context(|| format!("Failed to read {}", system_path.display()))?;
            let config: TrackerConfig = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", system_path.display()))?;
            return Ok(config);
        }

        Ok(Self::default())
    }

    /// Resolved API key: environment wins over the config file.
    pub fn api_key(&self) -> Option<String> {
        std::env::var("HYPIXEL_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| self.hypixel.api_key.clone())
    }
}
