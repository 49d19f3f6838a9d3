//! Sender configuration.
//!
//! Stored as TOML, passed as the first command-line argument
//! (`hubdrop.toml` in the working directory by default).

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use hubdrop_session::{DeviceIdentity, EndpointConfig, RetryConfig};
use hubdrop_transfer::TransferLimits;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "hubdrop.toml";

/// Sender configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub device: DeviceIdentity,

    pub endpoint: EndpointConfig,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub limits: LimitSettings,

    #[serde(default)]
    pub spool: SpoolSettings,

    /// Files to send, in order.
    #[serde(default)]
    pub files: Vec<FileEntry>,
}

/// Connection retry policy, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
}

/// Per-message size limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitSettings {
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    #[serde(default = "default_compression_margin")]
    pub compression_margin: f64,
}

/// Offline transport that records every message as one JSON line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpoolSettings {
    #[serde(default = "default_spool_path")]
    pub path: PathBuf,
    /// Hub hostname reported by the offline provisioner.
    #[serde(default = "default_spool_hub")]
    pub hub: String,
}

/// One file to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Local path to read.
    pub source: PathBuf,
    /// Destination path forwarded to the receiver.
    pub destination: String,
    #[serde(default)]
    pub compress: bool,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    250
}

fn default_max_delay_ms() -> u64 {
    15_000
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_max_message_size() -> usize {
    TransferLimits::default().max_message_size
}

fn default_compression_margin() -> f64 {
    TransferLimits::default().compression_margin
}

fn default_spool_path() -> PathBuf {
    PathBuf::from("hubdrop-spool.jsonl")
}

fn default_spool_hub() -> String {
    "spool.local".into()
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_factor: default_backoff_factor(),
        }
    }
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            max_message_size: default_max_message_size(),
            compression_margin: default_compression_margin(),
        }
    }
}

impl Default for SpoolSettings {
    fn default() -> Self {
        Self {
            path: default_spool_path(),
            hub: default_spool_hub(),
        }
    }
}

impl RetrySettings {
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            backoff_factor: self.backoff_factor,
        }
    }
}

impl LimitSettings {
    pub fn to_limits(&self) -> TransferLimits {
        TransferLimits {
            max_message_size: self.max_message_size,
            compression_margin: self.compression_margin,
        }
    }
}

impl Config {
    /// Loads and validates configuration from `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        config
            .limits
            .to_limits()
            .validate()
            .with_context(|| format!("invalid [limits] in {}", path.display()))?;
        Ok(config)
    }
}

/// Config path from the first command-line argument, or the default.
pub fn config_path(mut args: impl Iterator<Item = String>) -> PathBuf {
    args.nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
