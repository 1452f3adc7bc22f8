//! Configuration system for lanlink.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $LANLINK_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/lanlink/config.toml
//!   3. ~/.config/lanlink/config.toml
//!
//! The defaults in [`NetworkConfig`] and [`TimingConfig`] are the
//! cross-node interoperability contract from [`crate::wire`]; override
//! them only when every node on the segment is overridden the same way.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::wire;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LanlinkConfig {
    pub network: NetworkConfig,
    pub timing: TimingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address the inbound TCP server binds. Default: all interfaces.
    pub bind_addr: String,
    /// UDP port for presence announcements.
    pub discovery_port: u16,
    /// TCP port for greeting exchanges.
    pub app_port: u16,
    /// Destination address for presence announcements.
    pub broadcast_addr: String,
    /// Local address selection: "first" or "cidr:<net>".
    pub address_policy: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Seconds between presence announcements.
    pub announce_interval_secs: u64,
    /// Seconds between connection-manager sweeps.
    pub sweep_interval_secs: u64,
    /// Seconds between connect attempts within one dial.
    pub retry_delay_secs: u64,
    /// Total connect attempts per dial.
    pub max_dial_attempts: u32,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for LanlinkConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            timing: TimingConfig::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            discovery_port: wire::DISCOVERY_PORT,
            app_port: wire::APP_PORT,
            broadcast_addr: wire::BROADCAST_ADDR.to_string(),
            address_policy: "first".to_string(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            announce_interval_secs: wire::ANNOUNCE_INTERVAL_SECS,
            sweep_interval_secs: wire::SWEEP_INTERVAL_SECS,
            retry_delay_secs: wire::RETRY_DELAY_SECS,
            max_dial_attempts: wire::MAX_DIAL_ATTEMPTS,
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_or_tmp().join(".config"))
        .join("lanlink")
}

fn home_or_tmp() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl LanlinkConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::file_path())?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from an explicit path, falling back to defaults if the file
    /// does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(LanlinkConfig::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("LANLINK_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        Self::write_default_to(&path)?;
        Ok(path)
    }

    /// Write the default config to an explicit path unless it exists.
    pub fn write_default_to(path: &Path) -> Result<(), ConfigError> {
        if path.exists() {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteFailed(path.to_path_buf(), e))?;
        }
        let text = toml::to_string_pretty(&LanlinkConfig::default())
            .map_err(ConfigError::SerializeFailed)?;
        std::fs::write(path, text).map_err(|e| ConfigError::WriteFailed(path.to_path_buf(), e))
    }

    /// Apply LANLINK_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("LANLINK_NETWORK__BIND_ADDR") {
            self.network.bind_addr = v;
        }
        if let Ok(v) = std::env::var("LANLINK_NETWORK__DISCOVERY_PORT") {
            if let Ok(p) = v.parse() {
                self.network.discovery_port = p;
            }
        }
        if let Ok(v) = std::env::var("LANLINK_NETWORK__APP_PORT") {
            if let Ok(p) = v.parse() {
                self.network.app_port = p;
            }
        }
        if let Ok(v) = std::env::var("LANLINK_NETWORK__BROADCAST_ADDR") {
            self.network.broadcast_addr = v;
        }
        if let Ok(v) = std::env::var("LANLINK_NETWORK__ADDRESS_POLICY") {
            self.network.address_policy = v;
        }
        if let Ok(v) = std::env::var("LANLINK_TIMING__ANNOUNCE_INTERVAL_SECS") {
            if let Ok(n) = v.parse() {
                self.timing.announce_interval_secs = n;
            }
        }
        if let Ok(v) = std::env::var("LANLINK_TIMING__SWEEP_INTERVAL_SECS") {
            if let Ok(n) = v.parse() {
                self.timing.sweep_interval_secs = n;
            }
        }
        if let Ok(v) = std::env::var("LANLINK_TIMING__RETRY_DELAY_SECS") {
            if let Ok(n) = v.parse() {
                self.timing.retry_delay_secs = n;
            }
        }
        if let Ok(v) = std::env::var("LANLINK_TIMING__MAX_DIAL_ATTEMPTS") {
            if let Ok(n) = v.parse() {
                self.timing.max_dial_attempts = n;
            }
        }
    }
}
