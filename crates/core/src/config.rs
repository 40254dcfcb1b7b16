//! Configuration management for GroundLink.
//!
//! A configuration file (TOML) is optional. Values are resolved in this order:
//! built-in defaults, then the file named by `GROUNDLINK_CONFIG`, then the
//! individual environment variables listed on each field.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Environment variable naming an optional TOML configuration file.
pub const CONFIG_PATH_ENV: &str = "GROUNDLINK_CONFIG";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Configuration file is not valid TOML for this layout
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Environment override could not be parsed
    #[error("Invalid value for {key}: {value}")]
    InvalidValue {
        /// Variable name
        key: String,
        /// Raw value as found
        value: String,
    },

    /// Resolved configuration is inconsistent
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Top-level configuration file layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroundLinkConfig {
    /// `[producer]` table
    #[serde(default)]
    pub producer: ProducerConfig,
    /// `[ingestor]` table
    #[serde(default)]
    pub ingestor: IngestorConfig,
}

/// Settings for the `spaceship` producer service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProducerConfig {
    /// HTTP control endpoint port (`PORT`)
    #[serde(default = "default_producer_port")]
    pub port: u16,
    /// Admission gate capacity (`MAX_CONCURRENT_STREAMS`)
    #[serde(default = "default_max_concurrent_streams")]
    pub max_concurrent_streams: usize,
    /// Pause between packets; zero sends as fast as the socket allows (`PACKET_INTERVAL_MS`)
    #[serde(default)]
    pub packet_interval_ms: u64,
}

/// Backoff settings for control-plane calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts in total, the first one included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base of the exponential backoff
    #[serde(default = "default_multiplier")]
    pub multiplier_ms: u64,
    /// Shortest wait between attempts
    #[serde(default = "default_min_delay")]
    pub min_delay_ms: u64,
    /// Longest wait between attempts
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

/// Settings for the `data-ingestor` consumer service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestorConfig {
    /// HTTP scheduler port (`PORT`)
    #[serde(default = "default_ingestor_port")]
    pub port: u16,
    /// Packet buffer location (`REDIS_URL`)
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// Producer control endpoint base URL (`SPACESHIP_URL`)
    #[serde(default = "default_spaceship_url")]
    pub spaceship_url: String,
    /// Host the producer should stream to (`HOSTNAME`)
    #[serde(default = "default_advertise_host")]
    pub advertise_host: String,
    /// Local address the receiver binds (`UDP_BIND_ADDR`)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Well-known receiver port (`UDP_PORT`)
    #[serde(default = "default_udp_port")]
    pub udp_port: u16,
    /// Receive wait that keeps the deadline check live (`RECV_TIMEOUT_MS`)
    #[serde(default = "default_recv_timeout")]
    pub recv_timeout_ms: u64,
    /// Per-request HTTP timeout for control-plane calls (`REQUEST_TIMEOUT_MS`)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
    /// Backoff for control-plane calls
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_producer_port() -> u16 {
    8001
}

fn default_max_concurrent_streams() -> usize {
    10
}

fn default_max_attempts() -> u32 {
    5
}

fn default_multiplier() -> u64 {
    1_000
}

fn default_min_delay() -> u64 {
    4_000
}

fn default_max_delay() -> u64 {
    10_000
}

fn default_ingestor_port() -> u16 {
    8000
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/1".to_string()
}

fn default_spaceship_url() -> String {
    "http://127.0.0.1:8001".to_string()
}

fn default_advertise_host() -> String {
    "127.0.0.1".to_string()
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_udp_port() -> u16 {
    1001
}

fn default_recv_timeout() -> u64 {
    5_000
}

fn default_request_timeout() -> u64 {
    10_000
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            port: default_producer_port(),
            max_concurrent_streams: default_max_concurrent_streams(),
            packet_interval_ms: 0,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            multiplier_ms: default_multiplier(),
            min_delay_ms: default_min_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

impl Default for IngestorConfig {
    fn default() -> Self {
        Self {
            port: default_ingestor_port(),
            redis_url: default_redis_url(),
            spaceship_url: default_spaceship_url(),
            advertise_host: default_advertise_host(),
            bind_addr: default_bind_addr(),
            udp_port: default_udp_port(),
            recv_timeout_ms: default_recv_timeout(),
            request_timeout_ms: default_request_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

impl GroundLinkConfig {
    /// Parse a TOML configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Defaults, overlaid with the file named by `GROUNDLINK_CONFIG` when set.
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => {
                tracing::info!(path = %path, "Loading configuration file");
                Self::from_file(path)
            }
            Err(_) => Ok(Self::default()),
        }
    }
}

impl ProducerConfig {
    /// Resolve the producer configuration from file and process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = GroundLinkConfig::load()?.producer;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PORT") {
            self.port = parse_var("PORT", v)?;
        }
        if let Some(v) = lookup("MAX_CONCURRENT_STREAMS") {
            self.max_concurrent_streams = parse_var("MAX_CONCURRENT_STREAMS", v)?;
        }
        if let Some(v) = lookup("PACKET_INTERVAL_MS") {
            self.packet_interval_ms = parse_var("PACKET_INTERVAL_MS", v)?;
        }
        Ok(())
    }

    /// Reject settings the services cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_streams == 0 {
            return Err(ConfigError::ValidationError(
                "max_concurrent_streams must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl IngestorConfig {
    /// Resolve the ingestor configuration from file and process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = GroundLinkConfig::load()?.ingestor;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PORT") {
            self.port = parse_var("PORT", v)?;
        }
        if let Some(v) = lookup("REDIS_URL") {
            self.redis_url = v;
        }
        if let Some(v) = lookup("SPACESHIP_URL") {
            self.spaceship_url = v;
        }
        if let Some(v) = lookup("HOSTNAME") {
            self.advertise_host = v;
        }
        if let Some(v) = lookup("UDP_BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Some(v) = lookup("UDP_PORT") {
            self.udp_port = parse_var("UDP_PORT", v)?;
        }
        if let Some(v) = lookup("RECV_TIMEOUT_MS") {
            self.recv_timeout_ms = parse_var("RECV_TIMEOUT_MS", v)?;
        }
        if let Some(v) = lookup("REQUEST_TIMEOUT_MS") {
            self.request_timeout_ms = parse_var("REQUEST_TIMEOUT_MS", v)?;
        }
        Ok(())
    }

    /// Reject settings the services cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.recv_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "recv_timeout_ms must be positive".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.retry.min_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigError::ValidationError(
                "retry.min_delay_ms cannot exceed retry.max_delay_ms".to_string(),
            ));
        }
        Ok(())
    }
}
