//! Per-host politeness delay.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum interval between two requests to the same host.
///
/// This is a voluntary sleep before each request, which only makes sense
/// because requests are issued one at a time.
#[derive(Debug)]
pub struct HostRateLimiter {
    last_request: Mutex<HashMap<String, Instant>>,
    min_interval: Duration,
}

impl HostRateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self { last_request: Mutex::new(HashMap::new()), min_interval }
    }

    /// Wait until `host` may be contacted again, then record the request time.
    ///
    /// Returns how long the caller was made to wait.
    pub async fn acquire(&self, host: &str) -> Duration {
        let mut table = self.last_request.lock().await;

        let mut waited = Duration::ZERO;
        if let Some(last) = table.get(host) {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                waited = self.min_interval - elapsed;
                tracing::debug!("rate limiting: sleeping {:.1}s for {}", waited.as_secs_f64(), host);
                tokio::time::sleep(waited).await;
            }
        }

        table.insert(host.to_string(), Instant::now());
        waited
    }
}
