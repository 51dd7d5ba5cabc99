// Fixed-window rate limiting for submission endpoints
// Windows live in process memory and are evicted once they expire

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

/// Outcome of one rate-limit check, also rendered as response headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
    pub retry_after_secs: Option<u64>,
}

impl RateLimitDecision {
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let mut put = |name: &'static str, value: String| {
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.insert(HeaderName::from_static(name), value);
            }
        };

        put("x-ratelimit-limit", self.limit.to_string());
        put("x-ratelimit-remaining", self.remaining.to_string());
        put("x-ratelimit-reset", self.reset_at.to_rfc3339());
        if let Some(retry_after) = self.retry_after_secs {
            put("retry-after", retry_after.to_string());
        }

        headers
    }
}

#[derive(Debug, Clone)]
struct Window {
    count: u32,
    reset_at: DateTime<Utc>,
}

pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub async fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, Utc::now()).await
    }

    /// Count one request for `key` at `now`
    pub async fn check_at(&self, key: &str, now: DateTime<Utc>) -> RateLimitDecision {
        let limit = self.config.max_requests;
        let window = chrono::Duration::milliseconds(self.config.window.as_millis() as i64);
        let mut windows = self.windows.lock().await;

        if let Some(entry) = windows.get_mut(key).filter(|w| w.reset_at >= now) {
            entry.count = entry.count.saturating_add(1);
            if entry.count > limit {
                return RateLimitDecision {
                    allowed: false,
                    limit,
                    remaining: 0,
                    reset_at: entry.reset_at,
                    retry_after_secs: Some(retry_after(now, entry.reset_at)),
                };
            }
            return RateLimitDecision {
                allowed: true,
                limit,
                remaining: limit - entry.count,
                reset_at: entry.reset_at,
                retry_after_secs: None,
            };
        }

        // no window yet, or the previous one expired
        let reset_at = now + window;
        windows.insert(key.to_string(), Window { count: 1, reset_at });
        RateLimitDecision {
            allowed: limit > 0,
            limit,
            remaining: limit.saturating_sub(1),
            reset_at,
            retry_after_secs: (limit == 0).then(|| retry_after(now, reset_at)),
        }
    }

    /// Drop every window that has expired by `now`; returns how many went
    pub async fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let mut windows = self.windows.lock().await;
        let before = windows.len();
        windows.retain(|_, w| w.reset_at >= now);
        before - windows.len()
    }

    pub async fn tracked_keys(&self) -> usize {
        self.windows.lock().await.len()
    }

    /// Periodically evict expired windows for the life of the process
    pub fn spawn_eviction(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let evicted = self.evict_expired(Utc::now()).await;
                if evicted > 0 {
                    let tracked = self.tracked_keys().await;
                    debug!(evicted, tracked, "Evicted expired rate limit windows");
                }
            }
        })
    }
}

/// Seconds until `reset_at`, rounded up
fn retry_after(now: DateTime<Utc>, reset_at: DateTime<Utc>) -> u64 {
    let millis = (reset_at - now).num_milliseconds().max(0) as u64;
    (millis + 999) / 1000
}

/// Client key: first `x-forwarded-for` hop, then `x-real-ip`, then "unknown"
pub fn client_identifier(headers: &HeaderMap) -> String {
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

    format!("ip:{}", forwarded.or(real_ip).unwrap_or("unknown"))
}
