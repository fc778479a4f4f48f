//! `badger.ron` configuration, with flag and environment overrides.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use badger_engine::{PollerSettings, TransportSettings};
use badger_logging::{badger_debug, badger_info};
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_CONFIG_FILENAME: &str = "badger.ron";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid base url {url:?}: {message}")]
    BaseUrl { url: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub poll_interval_ms: u64,
    pub retry_budget: u32,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub max_bytes: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let transport = TransportSettings::default();
        let poller = PollerSettings::default();
        Self {
            base_url: "http://localhost:3000".to_string(),
            poll_interval_ms: poller.interval.as_millis() as u64,
            retry_budget: poller.retry_budget,
            connect_timeout_ms: transport.connect_timeout.as_millis() as u64,
            request_timeout_ms: transport.request_timeout.as_millis() as u64,
            max_bytes: transport.max_bytes,
        }
    }
}

/// Values given on the command line or through `BADGER_*` variables.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub retry_budget: Option<u32>,
}

impl AppConfig {
    /// Reads `explicit` if given, else `badger.ron` in the working directory
    /// when it exists, else the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILENAME);
                if path.exists() {
                    Self::from_file(path)
                } else {
                    badger_debug!("No {} found, using defaults", DEFAULT_CONFIG_FILENAME);
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = ron::from_str(&content).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        badger_info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn with_overrides(mut self, overrides: &Overrides) -> Self {
        if let Some(base_url) = &overrides.base_url {
            self.base_url = base_url.clone();
        }
        if let Some(interval) = overrides.poll_interval_ms {
            self.poll_interval_ms = interval;
        }
        if let Some(budget) = overrides.retry_budget {
            self.retry_budget = budget;
        }
        self
    }

    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.base_url).map_err(|err| ConfigError::BaseUrl {
            url: self.base_url.clone(),
            message: err.to_string(),
        })
    }

    pub fn transport_settings(&self) -> TransportSettings {
        TransportSettings {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            max_bytes: self.max_bytes,
        }
    }

    pub fn poller_settings(&self) -> PollerSettings {
        PollerSettings {
            interval: Duration::from_millis(self.poll_interval_ms),
            retry_budget: self.retry_budget,
        }
    }
}
