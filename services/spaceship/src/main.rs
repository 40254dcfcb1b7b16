use anyhow::Context;
use groundlink_core::logging::{self, LogFormat};
use spaceship::config::Config;
use spaceship::router;
use spaceship::state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_with(LogFormat::from_env());

    let config = Config::from_env().context("loading producer configuration")?;
    let port = config.port;
    let state = Arc::new(AppState::new(config)?);

    let app = router(state.clone());

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {}", bind_addr))?;
    info!(
        addr = %bind_addr,
        capacity = state.config.max_concurrent_streams,
        "Spaceship control endpoint listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let remaining = state.registry.shutdown(SHUTDOWN_GRACE).await;
    if remaining > 0 {
        warn!(remaining, "Exiting with streams still open");
    }
    info!("Spaceship stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
