//! User configuration: the execution service address, credentials and the
//! auto-submit knobs, loaded from a JSON file with environment overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use toolbridge_core_types::SiteAdapter;

pub const SERVICE_URL_ENV: &str = "TOOLBRIDGE_SERVICE_URL";
pub const AUTH_TOKEN_ENV: &str = "TOOLBRIDGE_AUTH_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parsing {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Base address of the execution service.
    pub service_url: String,
    /// Bearer token for the service; unset means run unauthenticated until
    /// the service says otherwise.
    pub auth_token: Option<String>,
    /// Whether results are submitted back automatically after the countdown.
    pub auto_send: bool,
    /// Countdown bounds in whole seconds; the actual delay is drawn
    /// uniformly between them.
    pub delay_min_secs: u64,
    pub delay_max_secs: u64,
    /// When false, every detected call waits for interactive approval.
    pub auto_execute: bool,
    /// Quiet period for the DOM observer, in milliseconds.
    pub debounce_ms: u64,
    /// Site profiles that extend or override the built-in set.
    pub sites: Vec<SiteAdapter>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            service_url: "http://127.0.0.1:8787".to_string(),
            auth_token: None,
            auto_send: true,
            delay_min_secs: 1,
            delay_max_secs: 4,
            auto_execute: true,
            debounce_ms: 800,
            sites: Vec::new(),
        }
    }
}

impl BridgeConfig {
    /// Load from `path`, falling back to defaults when the file does not
    /// exist, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                Self::default()
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(SERVICE_URL_ENV) {
            if !url.is_empty() {
                self.service_url = url;
            }
        }
        if let Ok(token) = std::env::var(AUTH_TOKEN_ENV) {
            if !token.is_empty() {
                self.auth_token = Some(token);
            }
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn delay_min(&self) -> Duration {
        Duration::from_secs(self.delay_min_secs)
    }

    pub fn delay_max(&self) -> Duration {
        Duration::from_secs(self.delay_max_secs.max(self.delay_min_secs))
    }
}

/// Default config file location under the platform config directory.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("toolbridge")
        .join("config.json")
}

/// Default location of the processed-call store.
pub fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("toolbridge")
        .join("processed.json")
}
