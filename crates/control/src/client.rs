//! HTTP client for the producer's control endpoint.

use crate::error::{ControlError, ControlResult};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use groundlink_core::{Destination, SessionToken};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// Start/stop operations the ingestion loop relies on.
#[async_trait]
pub trait SessionControl: Send + Sync {
    /// Ask the producer to start streaming to `destination`.
    async fn request_start(&self, destination: &Destination) -> ControlResult<SessionToken>;

    /// Ask the producer to stop the session identified by `token`.
    async fn request_stop(&self, token: &SessionToken) -> ControlResult<()>;

    /// Check that the producer answers at all.
    async fn health(&self) -> ControlResult<()>;
}

/// Construction options for [`ControlPlaneClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Timeout applied to each individual HTTP request
    pub request_timeout: Duration,
    /// Policy shared by every call
    pub retry: RetryPolicy,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StartResponse {
    event_key: String,
}

#[derive(Debug, Deserialize)]
struct ActiveStreamsResponse {
    active_streams: Vec<String>,
}

/// Control-plane client with retry and backoff on transient failures.
#[derive(Debug, Clone)]
pub struct ControlPlaneClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl ControlPlaneClient {
    /// Client for the control endpoint rooted at `base_url`, e.g. `http://spaceship:8001`.
    pub fn new(base_url: impl Into<String>, options: ClientOptions) -> ControlResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry: options.retry,
        })
    }

    /// Base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `POST /stream/` with `{host, port}`; returns the assigned event key.
    pub async fn request_start(&self, destination: &Destination) -> ControlResult<SessionToken> {
        let this = self;
        let token = self
            .retry
            .run("request_start", move || this.try_start(destination))
            .await?;
        info!(%token, %destination, "Stream start acknowledged by producer");
        Ok(token)
    }

    /// `DELETE /stream/{event_key}`.
    ///
    /// An unknown key yields [`ControlError::NotFound`] on the first attempt.
    pub async fn request_stop(&self, token: &SessionToken) -> ControlResult<()> {
        let this = self;
        self.retry
            .run("request_stop", move || this.try_stop(token))
            .await?;
        info!(%token, "Stream stop acknowledged by producer");
        Ok(())
    }

    /// `GET /stream/`: tokens the producer currently tracks.
    pub async fn active_sessions(&self) -> ControlResult<Vec<SessionToken>> {
        let this = self;
        self.retry
            .run("active_sessions", move || this.try_active_sessions())
            .await
    }

    /// `GET /healthcheck/`, attempted once.
    ///
    /// A health check reports the current state, so it bypasses the retry policy.
    pub async fn health(&self) -> ControlResult<()> {
        let response = self.http.get(self.url("/healthcheck/")).send().await?;
        check_status(response, None).await?;
        Ok(())
    }

    async fn try_start(&self, destination: &Destination) -> ControlResult<SessionToken> {
        debug!(%destination, "POST /stream/");
        let response = self
            .http
            .post(self.url("/stream/"))
            .json(destination)
            .send()
            .await?;
        let body: StartResponse = decode(check_status(response, None).await?).await?;
        parse_token(&body.event_key)
    }

    async fn try_stop(&self, token: &SessionToken) -> ControlResult<()> {
        debug!(%token, "DELETE /stream/{{event_key}}");
        let response = self
            .http
            .delete(self.url(&format!("/stream/{}", token)))
            .send()
            .await?;
        check_status(response, Some(token)).await?;
        Ok(())
    }

    async fn try_active_sessions(&self) -> ControlResult<Vec<SessionToken>> {
        let response = self.http.get(self.url("/stream/")).send().await?;
        let body: ActiveStreamsResponse = decode(check_status(response, None).await?).await?;
        body.active_streams.iter().map(|key| parse_token(key)).collect()
    }
}

#[async_trait]
impl SessionControl for ControlPlaneClient {
    async fn request_start(&self, destination: &Destination) -> ControlResult<SessionToken> {
        ControlPlaneClient::request_start(self, destination).await
    }

    async fn request_stop(&self, token: &SessionToken) -> ControlResult<()> {
        ControlPlaneClient::request_stop(self, token).await
    }

    async fn health(&self) -> ControlResult<()> {
        ControlPlaneClient::health(self).await
    }
}

/// Map a response status onto the error taxonomy.
async fn check_status(response: Response, token: Option<&SessionToken>) -> ControlResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::NOT_FOUND {
        if let Some(token) = token {
            return Err(ControlError::NotFound {
                event_key: token.to_string(),
            });
        }
    }

    let body = response.text().await.unwrap_or_default();
    if status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
    {
        Err(ControlError::Unavailable {
            status: status.as_u16(),
            body,
        })
    } else {
        Err(ControlError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> ControlResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| ControlError::InvalidResponse(e.to_string()))
}

fn parse_token(key: &str) -> ControlResult<SessionToken> {
    key.parse()
        .map_err(|_| ControlError::InvalidResponse(format!("malformed event_key {:?}", key)))
}
