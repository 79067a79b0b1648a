//! Application configuration stored in the per-user app data directory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

const APP_NAME: &str = "symq";
const CONFIG_FILE: &str = "config.json";

/// Application configuration stored in the app data directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Socket read/write timeout for daemon connections, in seconds
    #[serde(default = "default_connection_timeout_secs")]
    pub connection_timeout_secs: u64,

    /// Location of the symbol database relative to a project root
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

fn default_connection_timeout_secs() -> u64 {
    30
}

fn default_database_path() -> String {
    ".symq/symbols.json".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            connection_timeout_secs: default_connection_timeout_secs(),
            database_path: default_database_path(),
        }
    }
}

impl AppConfig {
    /// Load config from the app data directory, or return defaults if absent
    pub fn load() -> Result<Self> {
        let config_path = get_config_path()?;

        if config_path.exists() {
            let content = fs::read_to_string(&config_path).context("failed to read config file")?;
            let config: AppConfig =
                serde_json::from_str(&content).context("failed to parse config file")?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to the app data directory
    pub fn save(&self) -> Result<()> {
        let config_path = get_config_path()?;
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).context("failed to create app data directory")?;
        }
        let content = serde_json::to_string_pretty(self).context("failed to encode config")?;
        fs::write(&config_path, content).context("failed to write config file")?;
        Ok(())
    }
}

/// Per-user application data directory
pub fn get_app_data_dir() -> Result<PathBuf> {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_NAME))
        .context("could not determine the user data directory")
}

fn get_config_path() -> Result<PathBuf> {
    Ok(get_app_data_dir()?.join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.connection_timeout_secs, 30);
        assert_eq!(config.database_path, ".symq/symbols.json");

        let config: AppConfig =
            serde_json::from_str(r#"{"connection_timeout_secs": 5}"#).unwrap();
        assert_eq!(config.connection_timeout_secs, 5);
        assert_eq!(config.database_path, ".symq/symbols.json");
    }
}
