//! Configuration Management
//!
//! Optional settings file for compliance-mcp. Command-line flags and
//! environment variables take precedence over anything stored here.

use crate::compliance::poller::{DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL};
use crate::gcp::client::DEFAULT_ENDPOINT;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Compliance API endpoint
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Pre-issued bearer token used instead of Application Default Credentials
    #[serde(default)]
    pub access_token: Option<String>,
    /// Seconds between long-running operation polls
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
    /// Operation polls before giving up
    #[serde(default)]
    pub max_poll_attempts: Option<u32>,
    /// Log level when neither RUST_LOG nor --log-level is given
    #[serde(default)]
    pub log_level: Option<String>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("compliance-mcp").join("config.json"))
    }

    /// Load configuration from disk, falling back to defaults
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load configuration from `path`. A missing or unreadable file yields defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                // Logging is not up yet; the config decides its level
                eprintln!("Ignoring invalid config {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Get effective endpoint (config > default)
    pub fn effective_endpoint(&self) -> String {
        self.endpoint
            .clone()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
    }

    /// Get effective poll interval (config > default)
    pub fn effective_poll_interval(&self) -> Duration {
        self.poll_interval_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_POLL_INTERVAL)
    }

    /// Get effective poll attempt budget (config > default)
    pub fn effective_max_poll_attempts(&self) -> u32 {
        self.max_poll_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS)
    }
}
