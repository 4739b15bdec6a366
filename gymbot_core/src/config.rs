//! Configuration file support for the gym bot.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/gymbot/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub bot: BotConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Conversation tuning parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BotConfig {
    /// Items per page in exercise pickers and workout history
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Seconds a catalog snapshot stays fresh
    #[serde(default = "default_catalog_ttl_secs")]
    pub catalog_ttl_secs: u64,

    /// Longest stored day title
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,

    /// Longest rendered history label
    #[serde(default = "default_history_label_chars")]
    pub history_label_chars: usize,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            catalog_ttl_secs: default_catalog_ttl_secs(),
            title_max_chars: default_title_max_chars(),
            history_label_chars: default_history_label_chars(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        let home = std::env::var("HOME").expect("HOME environment variable not set");
        PathBuf::from(home).join(".local/share")
    });
    base.join("gymbot")
}

fn default_page_size() -> usize {
    5
}

fn default_catalog_ttl_secs() -> u64 {
    3600
}

fn default_title_max_chars() -> usize {
    100
}

fn default_history_label_chars() -> usize {
    64
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            let home = std::env::var("HOME").expect("HOME environment variable not set");
            PathBuf::from(home).join(".config")
        });
        base.join("gymbot").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.bot.page_size == 0 {
            return Err(Error::Config("bot.page_size must be at least 1".into()));
        }
        if self.bot.history_label_chars < 4 {
            return Err(Error::Config(
                "bot.history_label_chars must leave room for an ellipsis".into(),
            ));
        }
        Ok(())
    }
}
