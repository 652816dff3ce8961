//! HTTP transport seam.
//!
//! The fetcher only needs "send this request, give me a status and a body";
//! keeping that behind a trait lets the retry and cache logic run against
//! scripted responses.

use async_trait::async_trait;
use reqwest::redirect::Policy;
use tpd_core::{AppConfig, Error};
use url::Url;

use super::{FetchRequest, Payload};

/// Maximum number of redirects followed per request.
const MAX_REDIRECTS: usize = 10;

/// Status line and decoded body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Failure before any HTTP status was received.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { TransportError::Timeout } else { TransportError::Network(err.to_string()) }
    }
}

/// Sends a single request; no caching, no retries.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, url: &Url, request: &FetchRequest) -> Result<TransportResponse, TransportError>;
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a client with the configured user agent and timeout.
    pub fn new(config: &AppConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout())
            .redirect(Policy::limited(MAX_REDIRECTS))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::HttpError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, url: &Url, request: &FetchRequest) -> Result<TransportResponse, TransportError> {
        let builder = match &request.payload {
            Payload::None => self.http.get(url.clone()),
            Payload::Query(params) => self.http.get(url.clone()).query(params),
            Payload::Json(body) => self.http.post(url.clone()).json(body),
        };

        let response = builder
            .header("Accept", "text/html,application/xhtml+xml,application/json;q=0.9,*/*;q=0.8")
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(TransportResponse { status, body })
    }
}
