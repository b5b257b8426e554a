use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

use pollen_common::Catalog;

use crate::error::ConfigError;
use crate::model::pollen::api_client::{POLLEN_FEED_URL, REQUEST_TIMEOUT_SECONDS};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollenConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_feed_url")]
    pub feed_url: String,

    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,

    #[serde(default = "default_update_interval_minutes")]
    pub update_interval_minutes: u64,

    /// Region ids to track, all known regions by default
    #[serde(default = "default_regions")]
    pub regions: Vec<u32>,

    /// Pollen ids to track in every region, all known types by default
    #[serde(default = "default_pollen_types")]
    pub pollen_types: Vec<u32>,

    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    #[serde(default = "default_retry_delay_seconds")]
    pub retry_delay_seconds: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_feed_url() -> String {
    POLLEN_FEED_URL.to_string()
}

fn default_request_timeout_seconds() -> u64 {
    REQUEST_TIMEOUT_SECONDS
}

fn default_update_interval_minutes() -> u64 {
    60
}

fn default_regions() -> Vec<u32> {
    Catalog::danish().region_ids()
}

fn default_pollen_types() -> Vec<u32> {
    Catalog::danish().pollen_ids()
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_seconds() -> u64 {
    2
}

impl Default for PollenConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_dir: default_log_dir(),
            feed_url: default_feed_url(),
            request_timeout_seconds: default_request_timeout_seconds(),
            update_interval_minutes: default_update_interval_minutes(),
            regions: default_regions(),
            pollen_types: default_pollen_types(),
            retry_attempts: default_retry_attempts(),
            retry_delay_seconds: default_retry_delay_seconds(),
        }
    }
}

impl PollenConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml(&content).map_err(|source| ConfigError::Toml {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the updater and client cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.update_interval_minutes == 0 {
            return Err(ConfigError::Invalid {
                key: "update_interval_minutes",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.update_interval_minutes.checked_mul(60).is_none() {
            return Err(ConfigError::Invalid {
                key: "update_interval_minutes",
                reason: format!("{} is too large", self.update_interval_minutes),
            });
        }
        if self.request_timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                key: "request_timeout_seconds",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Read `path`, or fall back to defaults when it does not exist
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::warn!("Config file {} not found, using defaults", path.display());
            Ok(Self::default())
        }
    }
}

pub static CONFIG: OnceLock<PollenConfig> = OnceLock::new();

/// Load the configuration into [`CONFIG`]
pub fn read_config(path: impl AsRef<Path>) -> Result<&'static PollenConfig, ConfigError> {
    let config = PollenConfig::load_or_default(path)?;
    CONFIG.set(config).map_err(|_| ConfigError::AlreadyLoaded)?;
    CONFIG.get().ok_or(ConfigError::AlreadyLoaded)
}
