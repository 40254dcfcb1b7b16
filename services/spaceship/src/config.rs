use groundlink_core::{ConfigError, ProducerConfig};
use groundlink_stream::SessionConfig;
use std::time::Duration;

/// Resolved settings for the producer service.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub max_concurrent_streams: usize,
    pub session: SessionConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(ProducerConfig::from_env()?.into())
    }
}

impl From<ProducerConfig> for Config {
    fn from(producer: ProducerConfig) -> Self {
        Config {
            port: producer.port,
            max_concurrent_streams: producer.max_concurrent_streams,
            session: SessionConfig {
                packet_interval: Duration::from_millis(producer.packet_interval_ms),
            },
        }
    }
}
