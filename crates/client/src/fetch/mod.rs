//! Cached, rate-limited, retried HTTP fetch.
//!
//! ### Cache first
//! - The request key (canonical URL plus canonical query/body) is looked up in
//!   the `pages` namespace before anything else. A hit costs no request and no
//!   politeness delay; a warm re-run makes zero network calls.
//!
//! ### Status handling
//! - 2xx: body is cached and returned.
//! - 404 and other 4xx: permanent, never retried, "no content".
//! - 429, 5xx and transport failures: exponential backoff (`base * 2^attempt`)
//!   up to the attempt ceiling, then "no content".
//!
//! "No content" is `Ok(None)`: the caller treats it as a recoverable failure
//! for that item. `Err` is reserved for cache I/O and unusable URLs.

pub mod rate_limit;
pub mod transport;
pub mod url;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::Value;
use tpd_core::cache::RequestFingerprint;
use tpd_core::{AppConfig, CacheKey, CacheStore, Error, Namespace};

pub use rate_limit::HostRateLimiter;
pub use transport::{ReqwestTransport, Transport, TransportError, TransportResponse};
pub use self::url::{canonicalize, host_key};

/// What accompanies a request besides its URL.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    None,
    /// Query parameters for a GET; repeated keys are allowed.
    Query(Vec<(String, String)>),
    /// JSON body sent with a POST.
    Json(Value),
}

/// A request as seen by the fetcher.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub url: String,
    pub payload: Payload,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self { url: url.into(), payload: Payload::None }
    }

    pub fn get_with_query(url: impl Into<String>, params: Vec<(String, String)>) -> Self {
        Self { url: url.into(), payload: Payload::Query(params) }
    }

    pub fn post_json(url: impl Into<String>, body: Value) -> Self {
        Self { url: url.into(), payload: Payload::Json(body) }
    }

    pub fn method(&self) -> &'static str {
        match self.payload {
            Payload::Json(_) => "POST",
            _ => "GET",
        }
    }

    /// Cache key for this request against its canonical URL.
    pub fn cache_key(&self, canonical_url: &str) -> CacheKey {
        match &self.payload {
            Payload::None => CacheKey::for_url(canonical_url),
            Payload::Query(params) => {
                let mut pairs: Vec<_> = params.iter().collect();
                pairs.sort();
                let value = Value::Array(
                    pairs
                        .into_iter()
                        .map(|(k, v)| Value::Array(vec![Value::String(k.clone()), Value::String(v.clone())]))
                        .collect(),
                );
                CacheKey::for_request(canonical_url, &RequestFingerprint::Params(&value))
            }
            Payload::Json(body) => CacheKey::for_request(canonical_url, &RequestFingerprint::Body(body)),
        }
    }
}

/// Attempt ceiling and backoff schedule for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self { max_attempts: config.max_retries, backoff_base: config.backoff_base() }
    }

    /// Delay after failed attempt `attempt` (0-based): `base * 2^attempt`.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Counters for one fetcher's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    pub cache_hits: u64,
    pub network_requests: u64,
    pub backoffs: u64,
}

#[derive(Debug, Default)]
struct Counters {
    cache_hits: AtomicU64,
    network_requests: AtomicU64,
    backoffs: AtomicU64,
}

enum StatusClass {
    Success,
    NotFound,
    ClientError,
    Transient,
}

fn classify_status(status: u16) -> StatusClass {
    match status {
        200..=299 => StatusClass::Success,
        404 => StatusClass::NotFound,
        429 => StatusClass::Transient,
        400..=499 => StatusClass::ClientError,
        _ => StatusClass::Transient,
    }
}

/// HTTP fetcher backed by the `pages` cache namespace.
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    store: CacheStore,
    limiter: HostRateLimiter,
    retry: RetryPolicy,
    counters: Counters,
}

impl Fetcher {
    pub fn new(config: &AppConfig, store: CacheStore, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            store,
            limiter: HostRateLimiter::new(config.request_delay()),
            retry: RetryPolicy::from_config(config),
            counters: Counters::default(),
        }
    }

    /// Fetcher using the real HTTP client.
    pub fn with_reqwest(config: &AppConfig, store: CacheStore) -> Result<Self, Error> {
        let transport = ReqwestTransport::new(config)?;
        Ok(Self::new(config, store, Arc::new(transport)))
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn stats(&self) -> FetchStats {
        FetchStats {
            cache_hits: self.counters.cache_hits.load(Ordering::Relaxed),
            network_requests: self.counters.network_requests.load(Ordering::Relaxed),
            backoffs: self.counters.backoffs.load(Ordering::Relaxed),
        }
    }

    /// GET a URL through the cache.
    pub async fn fetch_url(&self, url: &str) -> Result<Option<String>, Error> {
        self.fetch(&FetchRequest::get(url)).await
    }

    /// Fetch a request, at most once across the cache's lifetime.
    pub async fn fetch(&self, request: &FetchRequest) -> Result<Option<String>, Error> {
        let url = canonicalize(&request.url)?;
        let key = request.cache_key(url.as_str());

        if let Some(body) = self.store.get_text(Namespace::Pages, &key).await? {
            self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("cache hit (page): {}", url);
            return Ok(Some(body));
        }

        let host = host_key(&url);
        let method = request.method();

        for attempt in 0..self.retry.max_attempts {
            self.limiter.acquire(&host).await;
            self.counters.network_requests.fetch_add(1, Ordering::Relaxed);

            match self.transport.send(&url, request).await {
                Ok(response) => {
                    tracing::info!("{} {} -> {}", method, url, response.status);
                    match classify_status(response.status) {
                        StatusClass::Success => {
                            self.store.put_text(Namespace::Pages, &key, &response.body).await?;
                            tracing::info!("cached page: {} -> {}", url, key);
                            return Ok(Some(response.body));
                        }
                        StatusClass::NotFound => {
                            tracing::warn!("404 not found: {}", url);
                            return Ok(None);
                        }
                        StatusClass::ClientError => {
                            tracing::warn!("client error {} for {}", response.status, url);
                            return Ok(None);
                        }
                        StatusClass::Transient => {
                            tracing::warn!(
                                "transient status {} for {} (attempt {}/{})",
                                response.status,
                                url,
                                attempt + 1,
                                self.retry.max_attempts
                            );
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(
                        "request failed for {} (attempt {}/{}): {}",
                        url,
                        attempt + 1,
                        self.retry.max_attempts,
                        e
                    );
                }
            }

            if attempt + 1 < self.retry.max_attempts {
                let wait = self.retry.delay(attempt);
                tracing::warn!("backing off {:.1}s before retrying {}", wait.as_secs_f64(), url);
                self.counters.backoffs.fetch_add(1, Ordering::Relaxed);
                tokio::time::sleep(wait).await;
            }
        }

        tracing::error!("giving up on {} after {} attempts", url, self.retry.max_attempts);
        Ok(None)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted transport shared by the fetch, extract and pipeline tests.

    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct ScriptedTransport {
        replies: Mutex<HashMap<String, VecDeque<Result<TransportResponse, TransportError>>>>,
        pub calls: Mutex<Vec<FetchRequest>>,
    }

    impl ScriptedTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a status/body reply for a canonical URL.
        pub fn reply(&self, url: &str, status: u16, body: &str) -> &Self {
            self.push(url, Ok(TransportResponse { status, body: body.to_string() }))
        }

        pub fn fail(&self, url: &str, err: TransportError) -> &Self {
            self.push(url, Err(err))
        }

        fn push(&self, url: &str, reply: Result<TransportResponse, TransportError>) -> &Self {
            self.replies.lock().unwrap().entry(url.to_string()).or_default().push_back(reply);
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, url: &::url::Url, request: &FetchRequest) -> Result<TransportResponse, TransportError> {
            self.calls.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .get_mut(url.as_str())
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| Err(TransportError::Network(format!("no scripted reply for {url}"))))
        }
    }

    /// Config with no politeness delay and a 10s backoff base.
    pub fn test_config() -> AppConfig {
        AppConfig { request_delay_ms: 0, ..AppConfig::default() }
    }
}
