use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::feed::fetcher::{DEFAULT_FEED_BASE_URL, DEFAULT_REQUEST_TIMEOUT};
use super::outage::DEFAULT_LABEL_PREFIX;

const ENV_PREFIX: &str = "ELEKTRO_CELJE_";
const DEFAULT_NAME: &str = "Elektro Celje Sensor";
const DEFAULT_SCAN_INTERVAL_SECS: u64 = 60 * 60;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("ELEKTRO_CELJE_{0} is required")]
    Missing(&'static str),
    #[error("ELEKTRO_CELJE_{key} has invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MonitorConfig {
    pub name: String,
    pub region: String,
    pub station: String,
    pub feed_base_url: String,
    pub scan_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub label_prefix: String,
    pub log_level: String,
    pub run_once: bool,
}

impl MonitorConfig {
    /// Reads `.env.local` if present, then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::from_filename(".env.local");
        Self::from_lookup(|key| std::env::var(format!("{ENV_PREFIX}{key}")).ok())
    }

    /// `lookup` receives keys without the `ELEKTRO_CELJE_` prefix.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        let config = Self {
            name: value("NAME").unwrap_or_else(|| DEFAULT_NAME.to_string()),
            region: value("REGION").ok_or(ConfigError::Missing("REGION"))?,
            station: value("STATION").ok_or(ConfigError::Missing("STATION"))?,
            feed_base_url: value("FEED_BASE_URL")
                .unwrap_or_else(|| DEFAULT_FEED_BASE_URL.to_string()),
            scan_interval_secs: parse_number(
                "SCAN_INTERVAL_SECS",
                value("SCAN_INTERVAL_SECS"),
                DEFAULT_SCAN_INTERVAL_SECS,
            )?,
            request_timeout_secs: parse_number(
                "REQUEST_TIMEOUT_SECS",
                value("REQUEST_TIMEOUT_SECS"),
                DEFAULT_REQUEST_TIMEOUT.as_secs(),
            )?,
            label_prefix: value("LABEL_PREFIX")
                .unwrap_or_else(|| DEFAULT_LABEL_PREFIX.to_string()),
            log_level: value("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            run_once: parse_flag("RUN_ONCE", value("RUN_ONCE"))?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "SCAN_INTERVAL_SECS",
                value: "0".to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "REQUEST_TIMEOUT_SECS",
                value: "0".to_string(),
            });
        }
        if !self.feed_base_url.starts_with("http://") && !self.feed_base_url.starts_with("https://")
        {
            return Err(ConfigError::Invalid {
                key: "FEED_BASE_URL",
                value: self.feed_base_url.clone(),
            });
        }
        Ok(())
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_number(key: &'static str, raw: Option<String>, default: u64) -> Result<u64, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

fn parse_flag(key: &'static str, raw: Option<String>) -> Result<bool, ConfigError> {
    let Some(value) = raw else {
        return Ok(false);
    };
    match value.to_ascii_lowercase().as_str() {
        "0" | "false" | "no" | "off" => Ok(false),
        "1" | "true" | "yes" | "on" => Ok(true),
        _ => Err(ConfigError::Invalid { key, value }),
    }
}
