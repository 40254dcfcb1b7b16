//! Print how many packets are buffered for each ship.

use anyhow::Context;
use groundlink_core::logging::{self, LogFormat};
use groundlink_core::IngestorConfig;
use groundlink_ingest::{PacketBuffer, RedisBuffer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_with(LogFormat::from_env());

    let config = IngestorConfig::from_env().context("loading ingestor configuration")?;
    let buffer = RedisBuffer::connect(&config.redis_url)
        .await
        .context("connecting to packet buffer")?;

    for (key, count) in buffer.summary().await? {
        println!("{}: {}", key, count);
    }
    Ok(())
}
