use groundlink_control::{ClientOptions, RetryPolicy};
use groundlink_core::{ConfigError, IngestorConfig};
use groundlink_ingest::IngestOptions;
use std::time::Duration;

/// Resolved settings for the consumer service.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub redis_url: String,
    pub spaceship_url: String,
    pub client: ClientOptions,
    pub ingest: IngestOptions,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(IngestorConfig::from_env()?.into())
    }
}

impl From<IngestorConfig> for Config {
    fn from(ingestor: IngestorConfig) -> Self {
        Config {
            port: ingestor.port,
            client: ClientOptions {
                request_timeout: Duration::from_millis(ingestor.request_timeout_ms),
                retry: RetryPolicy::from(&ingestor.retry),
            },
            ingest: IngestOptions::from(&ingestor),
            redis_url: ingestor.redis_url,
            spaceship_url: ingestor.spaceship_url,
        }
    }
}
