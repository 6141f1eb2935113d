//! Per-client rate limiting.
//!
//! The limiter runs before route dispatch. Each request is attributed to a
//! client identity ([`client_identity`]) and counted against a fixed window
//! in a [`RateLimitStore`]. Requests over budget are answered with a 429
//! envelope; everything else passes through untouched apart from the
//! `X-RateLimit-*` headers.
//!
//! The store is a trait object so the in-memory implementation can be
//! swapped for a shared one (e.g. Redis) when running several replicas.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use parking_lot::Mutex;
use tracing::warn;

use crate::config::RateLimitConfig;
use crate::metrics::record_rate_limited;
use crate::ApiError;

pub const HEADER_LIMIT: &str = "x-ratelimit-limit";
pub const HEADER_REMAINING: &str = "x-ratelimit-remaining";
pub const HEADER_RESET: &str = "x-ratelimit-reset";

/// Identity used when a request carries no address information at all.
pub const ANONYMOUS_CLIENT: &str = "anonymous";

/// Record count above which expired windows are swept, at most once per
/// window.
const PURGE_THRESHOLD: usize = 10_000;

/// Outcome of a single check-and-increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the client's window resets.
    pub reset_after: Duration,
}

impl RateLimitDecision {
    /// `reset_after` rounded up to whole seconds.
    pub fn reset_secs(&self) -> u64 {
        let secs = self.reset_after.as_secs();
        if self.reset_after.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }
}

/// Counter storage keyed by client identity.
///
/// `hit` must check and increment atomically: two concurrent hits for the
/// same key may never both observe the last free slot.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    async fn hit(&self, key: &str, limit: u32, window: Duration) -> RateLimitDecision;
}

#[derive(Debug, Clone, Copy)]
struct WindowRecord {
    started: Instant,
    count: u32,
}

#[derive(Debug, Default)]
struct Records {
    windows: HashMap<String, WindowRecord>,
    last_purge: Option<Instant>,
}

impl Records {
    fn purge_expired(&mut self, window: Duration, now: Instant) {
        if self.windows.len() < PURGE_THRESHOLD {
            return;
        }
        if self
            .last_purge
            .is_some_and(|last| now.saturating_duration_since(last) < window)
        {
            return;
        }

        self.windows
            .retain(|_, record| now.saturating_duration_since(record.started) < window);
        self.last_purge = Some(now);
    }
}

/// Process-local fixed-window store.
#[derive(Debug, Default)]
pub struct InMemoryRateLimitStore {
    records: Mutex<Records>,
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked client windows.
    pub fn len(&self) -> usize {
        self.records.lock().windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check-and-increment at an explicit instant.
    pub fn hit_at(&self, key: &str, limit: u32, window: Duration, now: Instant) -> RateLimitDecision {
        let mut records = self.records.lock();
        records.purge_expired(window, now);

        let record = records.windows.entry(key.to_string()).or_insert(WindowRecord {
            started: now,
            count: 0,
        });

        if now.saturating_duration_since(record.started) >= window {
            *record = WindowRecord {
                started: now,
                count: 0,
            };
        }

        let allowed = record.count < limit;
        if allowed {
            record.count += 1;
        }

        RateLimitDecision {
            allowed,
            limit,
            remaining: limit.saturating_sub(record.count),
            reset_after: window.saturating_sub(now.saturating_duration_since(record.started)),
        }
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn hit(&self, key: &str, limit: u32, window: Duration) -> RateLimitDecision {
        self.hit_at(key, limit, window, Instant::now())
    }
}

/// Rate limiter state handed to [`rate_limit`].
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    limit: u32,
    window: Duration,
    enabled: bool,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, config: &RateLimitConfig) -> Self {
        Self {
            store,
            limit: config.requests,
            window: config.window,
            enabled: config.enabled,
        }
    }

    /// Limiter backed by a fresh [`InMemoryRateLimitStore`].
    pub fn in_memory(config: &RateLimitConfig) -> Self {
        Self::new(Arc::new(InMemoryRateLimitStore::new()), config)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub async fn check(&self, client: &str) -> RateLimitDecision {
        self.store.hit(client, self.limit, self.window).await
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("limit", &self.limit)
            .field("window", &self.window)
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// Resolve the identity a request is counted against.
///
/// Prefers the first `X-Forwarded-For` hop, then `X-Real-IP`, then the TCP
/// peer address.
pub fn client_identity(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    forwarded
        .or(real_ip)
        .map(String::from)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| ANONYMOUS_CLIENT.to_string())
}

/// Axum middleware enforcing the rate limit.
///
/// Install with `axum::middleware::from_fn_with_state(limiter, rate_limit)`.
pub async fn rate_limit(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    if !limiter.is_enabled() {
        return next.run(request).await;
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let client = client_identity(request.headers(), peer);
    let decision = limiter.check(&client).await;

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        warn!(client = %client, limit = decision.limit, "rate limit exceeded");
        record_rate_limited();
        ApiError::RateLimited {
            retry_after_secs: decision.reset_secs(),
        }
        .into_response()
    };

    let headers = response.headers_mut();
    headers.insert(HEADER_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(HEADER_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(HEADER_RESET, HeaderValue::from(decision.reset_secs()));

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);

    #[test]
    fn allows_up_to_limit_then_rejects() {
        let store = InMemoryRateLimitStore::new();
        let now = Instant::now();

        let first = store.hit_at("a", 2, WINDOW, now);
        assert!(first.allowed);
        assert_eq!(first.remaining, 1);

        let second = store.hit_at("a", 2, WINDOW, now);
        assert!(second.allowed);
        assert_eq!(second.remaining, 0);

        let third = store.hit_at("a", 2, WINDOW, now);
        assert!(!third.allowed);
        assert_eq!(third.remaining, 0);
        assert_eq!(third.reset_secs(), 60);
    }

    #[test]
    fn window_expiry_resets_count() {
        let store = InMemoryRateLimitStore::new();
        let start = Instant::now();

        assert!(store.hit_at("a", 1, WINDOW, start).allowed);
        assert!(!store.hit_at("a", 1, WINDOW, start + Duration::from_secs(59)).allowed);

        let after = store.hit_at("a", 1, WINDOW, start + WINDOW);
        assert!(after.allowed);
        assert_eq!(after.reset_after, WINDOW);
    }

    #[test]
    fn clients_are_independent() {
        let store = InMemoryRateLimitStore::new();
        let now = Instant::now();

        assert!(store.hit_at("a", 1, WINDOW, now).allowed);
        assert!(!store.hit_at("a", 1, WINDOW, now).allowed);
        assert!(store.hit_at("b", 1, WINDOW, now).allowed);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn expired_windows_are_swept_at_most_once_per_window() {
        let store = InMemoryRateLimitStore::new();
        let start = Instant::now();

        for i in 0..PURGE_THRESHOLD {
            store.hit_at(&format!("client-{i}"), 5, WINDOW, start);
        }

        // Everything is still live: the sweep runs but frees nothing.
        store.hit_at("late", 5, WINDOW, start + WINDOW / 2);
        assert_eq!(store.len(), PURGE_THRESHOLD + 1);

        // The original windows have expired, but the last sweep is too recent.
        store.hit_at("later", 5, WINDOW, start + WINDOW);
        assert_eq!(store.len(), PURGE_THRESHOLD + 2);

        store.hit_at("latest", 5, WINDOW, start + WINDOW * 3 / 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn reset_secs_rounds_up() {
        let decision = RateLimitDecision {
            allowed: true,
            limit: 1,
            remaining: 0,
            reset_after: Duration::from_millis(1500),
        };
        assert_eq!(decision.reset_secs(), 2);
    }

    #[tokio::test]
    async fn concurrent_hits_never_exceed_limit() {
        let store = Arc::new(InMemoryRateLimitStore::new());
        let mut handles = Vec::new();

        for _ in 0..64 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.hit("shared", 10, WINDOW).await.allowed
            }));
        }

        let mut allowed = 0;
        for handle in handles {
            if handle.await.unwrap() {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 10);
    }

    #[test]
    fn identity_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        let peer: SocketAddr = "127.0.0.1:5000".parse().unwrap();

        assert_eq!(client_identity(&headers, Some(peer)), "203.0.113.7");

        headers.remove("x-forwarded-for");
        assert_eq!(client_identity(&headers, Some(peer)), "198.51.100.2");

        headers.remove("x-real-ip");
        assert_eq!(client_identity(&headers, Some(peer)), "127.0.0.1");
        assert_eq!(client_identity(&headers, None), ANONYMOUS_CLIENT);
    }
}
