use anyhow::Context;
use data_ingestor::config::Config;
use data_ingestor::router;
use data_ingestor::state::AppState;
use groundlink_control::ControlPlaneClient;
use groundlink_core::logging::{self, LogFormat};
use groundlink_ingest::{PacketBuffer, RedisBuffer};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_with(LogFormat::from_env());

    let config = Config::from_env().context("loading ingestor configuration")?;

    let buffer = RedisBuffer::connect(&config.redis_url)
        .await
        .context("connecting to packet buffer")?;
    buffer.ping().await.context("pinging packet buffer")?;
    let control = ControlPlaneClient::new(config.spaceship_url.clone(), config.client.clone())
        .context("building control-plane client")?;
    info!(spaceship = %control.base_url(), "Control-plane client ready");

    let port = config.port;
    let state = Arc::new(AppState::new(config, Arc::new(control), Arc::new(buffer)));
    let app = router(state);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {}", bind_addr))?;
    info!(addr = %bind_addr, "Data ingestor listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
