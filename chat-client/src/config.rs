//! Client configuration.
//!
//! Configuration is loaded from a TOML file. Every section and field is
//! optional and falls back to the defaults below.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration for the chat client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientConfig {
    /// Channel configuration.
    #[serde(default)]
    pub channel: ChannelConfig,
    /// Outstanding request handling.
    #[serde(default)]
    pub requests: RequestConfig,
    /// Application notification delivery.
    #[serde(default)]
    pub events: EventConfig,
}

/// Channel configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    /// Server address handed to the channel factory (default: ws://127.0.0.1:3000).
    #[serde(default = "default_url")]
    pub url: String,
}

/// Request timeout configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestConfig {
    /// Seconds a request may stay unanswered before it is failed (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// How often outstanding requests are checked, in milliseconds (default: 1000).
    #[serde(default = "default_expiry_interval_ms")]
    pub expiry_interval_ms: u64,
}

/// Notification configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EventConfig {
    /// Broadcast buffer size; slow subscribers lag past this (default: 64).
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

// Default value functions
fn default_url() -> String {
    "ws://127.0.0.1:3000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_expiry_interval_ms() -> u64 {
    1000
}

fn default_event_capacity() -> usize {
    64
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self { url: default_url() }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            expiry_interval_ms: default_expiry_interval_ms(),
        }
    }
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            capacity: default_event_capacity(),
        }
    }
}

impl RequestConfig {
    /// Request timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Expiry check period. Never zero.
    pub fn expiry_interval(&self) -> Duration {
        Duration::from_millis(self.expiry_interval_ms.max(1))
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Set the channel address.
    pub fn with_url(mut self, url: &str) -> Self {
        self.channel.url = url.to_string();
        self
    }

    /// Set the request timeout in seconds.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.requests.timeout_secs = secs;
        self
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}
