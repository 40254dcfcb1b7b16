//! Test utilities for end-to-end tests

use data_ingestor::config::Config as IngestorServiceConfig;
use data_ingestor::state::AppState as IngestorState;
use groundlink_control::{ClientOptions, ControlPlaneClient, RetryPolicy};
use groundlink_core::IngestorConfig;
use groundlink_ingest::{IngestOptions, MemoryBuffer};
use groundlink_stream::SessionConfig;
use spaceship::config::Config as ProducerConfig;
use spaceship::state::AppState as ProducerState;
use std::sync::{Arc, Once};
use std::time::Duration;

static TRACING: Once = Once::new();

/// Install a test subscriber once; `RUST_LOG` controls verbosity.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A producer control endpoint running on an ephemeral port.
pub struct TestProducer {
    pub base_url: String,
    pub state: Arc<ProducerState>,
}

impl TestProducer {
    /// Spawn the spaceship router with `capacity` admission slots.
    pub async fn spawn(capacity: usize, packet_interval: Duration) -> Self {
        init_tracing();
        let config = ProducerConfig {
            port: 0,
            max_concurrent_streams: capacity,
            session: SessionConfig { packet_interval },
        };
        let state = Arc::new(ProducerState::new(config).expect("valid capacity"));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind producer");
        let addr = listener.local_addr().expect("producer addr");
        let app = spaceship::router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("producer server");
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    /// Client for this producer with millisecond backoff.
    pub fn client(&self) -> ControlPlaneClient {
        ControlPlaneClient::new(
            self.base_url.clone(),
            ClientOptions {
                request_timeout: Duration::from_secs(2),
                retry: fast_retry(),
            },
        )
        .expect("client")
    }
}

/// A data-ingestor scheduler endpoint backed by an in-memory buffer.
pub struct TestIngestor {
    pub base_url: String,
    pub buffer: Arc<MemoryBuffer>,
}

impl TestIngestor {
    /// Spawn the data-ingestor router against the producer at `spaceship_url`,
    /// receiving on the loopback UDP port `udp_port`.
    pub async fn spawn(spaceship_url: &str, udp_port: u16) -> Self {
        init_tracing();
        let mut config = IngestorServiceConfig::from(IngestorConfig::default());
        config.spaceship_url = spaceship_url.to_string();
        config.client = ClientOptions {
            request_timeout: Duration::from_secs(2),
            retry: fast_retry(),
        };
        config.ingest = loopback_ingest(udp_port);

        let control =
            ControlPlaneClient::new(config.spaceship_url.clone(), config.client.clone())
                .expect("client");
        let buffer = Arc::new(MemoryBuffer::new());
        let state = Arc::new(IngestorState::new(config, Arc::new(control), buffer.clone()));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ingestor");
        let addr = listener.local_addr().expect("ingestor addr");
        let app = data_ingestor::router(state);
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("ingestor server");
        });

        Self {
            base_url: format!("http://{}", addr),
            buffer,
        }
    }
}

/// Five attempts, delays in the low milliseconds.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 5,
        multiplier: Duration::from_millis(1),
        min_delay: Duration::from_millis(2),
        max_delay: Duration::from_millis(10),
    }
}

/// An unused UDP port on loopback.
pub fn free_udp_port() -> u16 {
    std::net::UdpSocket::bind("127.0.0.1:0")
        .and_then(|socket| socket.local_addr())
        .map(|addr| addr.port())
        .expect("free udp port")
}

/// Receiver options for a loopback consumer.
pub fn loopback_ingest(port: u16) -> IngestOptions {
    IngestOptions {
        bind_addr: "127.0.0.1".to_string(),
        listen_port: port,
        advertise_host: "127.0.0.1".to_string(),
        recv_timeout: Duration::from_millis(250),
    }
}

/// Poll `condition` every 20ms until it holds or `timeout` elapses.
pub async fn eventually<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition().await
}
