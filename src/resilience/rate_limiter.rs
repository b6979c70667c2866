use crate::clock::{Clock, SystemClock};
use crate::error::SoftFailure;
use crate::store::{Document, DocumentStore};
use crate::{Error, Result};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const COMPONENT: &str = "rate_limiter";

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Trailing window `W`.
    pub window: Duration,
    /// Requests allowed per window `M`. 0 disables limiting.
    pub max_requests: u32,
    pub collection: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(10 * 60),
            max_requests: 5,
            collection: "rate_limits".to_string(),
        }
    }
}

impl RateLimitConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn with_max_requests(mut self, max: u32) -> Self {
        self.max_requests = max;
        self
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }
}

/// A request that may proceed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Counted against the window; `remaining` more requests fit in it.
    Allowed { remaining: u32 },
    /// Limiting is switched off (`max_requests == 0`).
    Unlimited,
    /// The store failed; the request is allowed without being counted.
    FailedOpen(SoftFailure),
}

impl Admission {
    pub fn soft_failure(&self) -> Option<&SoftFailure> {
        match self {
            Admission::FailedOpen(failure) => Some(failure),
            _ => None,
        }
    }
}

enum Verdict {
    Allowed { remaining: u32 },
    Denied { wait_ms: i64 },
}

/// Per-identity sliding-window limiter over a shared [`DocumentStore`].
///
/// Each identity owns one document `{"requests": [epoch_millis, ...]}`. Timestamps
/// at or before `now - W` are pruned on every check.
pub struct SlidingWindowLimiter {
    store: Arc<dyn DocumentStore>,
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
}

impl SlidingWindowLimiter {
    pub fn new(store: Arc<dyn DocumentStore>, config: RateLimitConfig) -> Self {
        Self {
            store,
            config,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Counts one request for `identity`.
    ///
    /// Fails with [`Error::RateLimitExceeded`] when the window is full. Store faults
    /// never fail the request; they come back as [`Admission::FailedOpen`].
    pub async fn check(&self, identity: &str) -> Result<Admission> {
        if self.config.max_requests == 0 {
            return Ok(Admission::Unlimited);
        }
        if !self.store.atomic_updates() {
            debug!(backend = self.store.name(), "rate-limit update is not isolated; concurrent requests may overshoot");
        }

        let now = self.clock.now_millis();
        let window_ms = i64::try_from(self.config.window.as_millis()).unwrap_or(i64::MAX);
        let max = self.config.max_requests;
        let mut verdict = Verdict::Allowed { remaining: max };

        let updated = self
            .store
            .update(
                &self.config.collection,
                identity,
                Box::new(|current: Option<&Document>| -> Option<Document> {
                    let mut requests = timestamps(current);
                    let cutoff = now.saturating_sub(window_ms);
                    requests.retain(|t| *t > cutoff);

                    if requests.len() >= max as usize {
                        let oldest = requests.iter().copied().min().unwrap_or(now);
                        verdict = Verdict::Denied {
                            wait_ms: window_ms - (now - oldest),
                        };
                        return None;
                    }
                    requests.push(now);
                    verdict = Verdict::Allowed {
                        remaining: max - requests.len() as u32,
                    };
                    Some(json!({ "requests": requests }))
                }),
            )
            .await;

        if let Err(e) = updated {
            warn!(identity, backend = self.store.name(), error = %e, "rate limiter store unavailable; allowing request");
            return Ok(Admission::FailedOpen(SoftFailure::new(COMPONENT, e.to_string())));
        }

        match verdict {
            Verdict::Allowed { remaining } => {
                debug!(identity, remaining, "request admitted");
                Ok(Admission::Allowed { remaining })
            }
            Verdict::Denied { wait_ms } => {
                let wait_minutes = wait_minutes(wait_ms);
                warn!(identity, wait_minutes, "rate limit exceeded");
                Err(Error::RateLimitExceeded { wait_minutes })
            }
        }
    }
}

fn timestamps(document: Option<&Document>) -> Vec<i64> {
    document
        .and_then(|d| d.get("requests"))
        .and_then(|r| r.as_array())
        .map(|items| items.iter().filter_map(|v| v.as_i64()).collect())
        .unwrap_or_default()
}

/// Whole minutes until the oldest request leaves the window, at least 1.
fn wait_minutes(wait_ms: i64) -> u64 {
    let minutes = (wait_ms.max(1) + 59_999) / 60_000;
    minutes.max(1) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;

    const START: i64 = 1_700_000_000_000;

    fn limiter(store: &MemoryStore, clock: &Arc<ManualClock>, max: u32) -> SlidingWindowLimiter {
        SlidingWindowLimiter::new(
            Arc::new(store.clone()),
            RateLimitConfig::new().with_max_requests(max),
        )
        .with_clock(clock.clone())
    }

    #[test]
    fn test_wait_minutes_rounds_up() {
        assert_eq!(wait_minutes(1), 1);
        assert_eq!(wait_minutes(60_000), 1);
        assert_eq!(wait_minutes(60_001), 2);
        assert_eq!(wait_minutes(600_000), 10);
    }

    #[tokio::test]
    async fn test_remaining_counts_down() {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(START));
        let limiter = limiter(&store, &clock, 3);
        assert_eq!(limiter.check("u").await.unwrap(), Admission::Allowed { remaining: 2 });
        assert_eq!(limiter.check("u").await.unwrap(), Admission::Allowed { remaining: 1 });
        assert_eq!(limiter.check("u").await.unwrap(), Admission::Allowed { remaining: 0 });
        assert!(limiter.check("u").await.is_err());
    }

    #[tokio::test]
    async fn test_wait_reflects_oldest_request() {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(START));
        let limiter = limiter(&store, &clock, 2);
        limiter.check("u").await.unwrap();
        clock.advance(Duration::from_secs(4 * 60));
        limiter.check("u").await.unwrap();
        clock.advance(Duration::from_secs(30));

        // Oldest request is 4.5 minutes old; it leaves the 10 minute window in 5.5.
        match limiter.check("u").await {
            Err(Error::RateLimitExceeded { wait_minutes }) => assert_eq!(wait_minutes, 6),
            other => panic!("expected rate limit, got {:?}", other),
        }

        // Window slides: only the first request has expired.
        clock.advance(Duration::from_secs(6 * 60));
        assert_eq!(limiter.check("u").await.unwrap(), Admission::Allowed { remaining: 0 });
    }

    #[tokio::test]
    async fn test_denied_requests_are_not_recorded() {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(START));
        let limiter = limiter(&store, &clock, 1);
        limiter.check("u").await.unwrap();
        assert!(limiter.check("u").await.is_err());
        let doc = store.get("rate_limits", "u").await.unwrap().unwrap();
        assert_eq!(doc["requests"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_zero_max_disables_limiting() {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(START));
        let limiter = limiter(&store, &clock, 0);
        for _ in 0..10 {
            assert_eq!(limiter.check("u").await.unwrap(), Admission::Unlimited);
        }
        assert!(store.is_empty("rate_limits"));
    }
}
