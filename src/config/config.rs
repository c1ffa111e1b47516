//! Codechat configuration management
//! Handles loading and saving the config file

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::auth::UserIdentity;

/// Codechat configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// The signed-in identity, as issued by the auth service
    #[serde(default)]
    pub identity: UserIdentity,

    /// Conversation store path
    #[serde(default = "default_db_path")]
    pub database_path: String,

    /// Agent-runner backend base URL
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
}

fn default_db_path() -> String {
    "~/.codechat/codechat.db".to_string()
}

fn default_backend_url() -> String {
    "http://localhost:8000".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            identity: UserIdentity::default(),
            database_path: default_db_path(),
            backend_url: default_backend_url(),
        }
    }
}

impl Config {
    /// Load config from the default location or specified path
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = Self::config_path(path)?;

        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Config::default();
            config.save(path)?;
            return Ok(config);
        }

        let raw = fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Config = serde_yaml::from_str(&raw).context("Failed to parse config file")?;

        debug!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self, path: Option<&str>) -> Result<()> {
        let config_path = Self::config_path(path)?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(&self)?;
        fs::write(&config_path, content).context("Failed to write config file")?;

        info!("Saved config to {:?}", config_path);
        Ok(())
    }

    /// Get the config file path
    fn config_path(path: Option<&str>) -> Result<PathBuf> {
        // Check env override first
        if let Ok(env_path) = std::env::var("CODECHAT_CONFIG") {
            return Ok(PathBuf::from(env_path));
        }

        if let Some(p) = path {
            return Ok(PathBuf::from(p));
        }

        let home = dirs::home_dir().context("Cannot find home directory")?;
        Ok(home.join(".codechat").join("config.yml"))
    }

    /// Resolve database path (expand ~)
    pub fn resolve_db_path(&self) -> Result<PathBuf> {
        let home = dirs::home_dir().context("Cannot find home directory")?;
        let path = self.database_path.replace("~", &home.to_string_lossy());
        Ok(PathBuf::from(path))
    }
}
