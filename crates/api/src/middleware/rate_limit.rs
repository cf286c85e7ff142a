//! Per-client-IP rate limiting middleware.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::middleware::metrics::client_ip;
use crate::response::ApiError;
use crate::state::AppState;

const BYPASS_HEADER: &str = "x-rate-limit-bypass";

/// Rate limiter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Sustained requests per second per client IP
    #[serde(default = "default_rps")]
    pub rps: f64,
    /// Burst size per client IP
    #[serde(default = "default_burst")]
    pub burst: u32,
    /// Idle buckets older than this many minutes are dropped
    #[serde(default = "default_expire_minutes")]
    pub expire_minutes: u64,
    /// Requests carrying this secret in the bypass header skip limiting
    #[serde(default)]
    pub bypass_secret: String,
}

fn default_rps() -> f64 {
    100.0
}

fn default_burst() -> u32 {
    200
}

fn default_expire_minutes() -> u64 {
    3
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            rps: default_rps(),
            burst: default_burst(),
            expire_minutes: default_expire_minutes(),
            bypass_secret: String::new(),
        }
    }
}

struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(burst: u32) -> Self {
        Self {
            tokens: burst as f64,
            last_update: Instant::now(),
        }
    }

    fn try_acquire(&mut self, rps: f64, burst: u32) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        self.last_update = now;

        self.tokens = (self.tokens + elapsed * rps).min(burst as f64);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Token bucket rate limiter keyed by client IP.
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, TokenBucket>>,
    config: RateLimitConfig,
}

pub type SharedRateLimiter = Arc<RateLimiter>;

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Check if a request is allowed for the given key.
    pub fn check(&self, key: &str) -> bool {
        let mut buckets = self.buckets.lock();

        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(self.config.burst));

        bucket.try_acquire(self.config.rps, self.config.burst)
    }

    /// True when the request may skip rate limiting entirely.
    pub fn bypassed(&self, provided: Option<&[u8]>) -> bool {
        if self.config.bypass_secret.is_empty() {
            return false;
        }
        match provided {
            Some(value) => value.ct_eq(self.config.bypass_secret.as_bytes()).into(),
            None => false,
        }
    }

    pub fn expire_after(&self) -> Duration {
        Duration::from_secs(self.config.expire_minutes * 60)
    }

    /// Drop buckets idle for longer than `max_age`.
    pub fn cleanup(&self, max_age: Duration) {
        let mut buckets = self.buckets.lock();
        let now = Instant::now();

        buckets.retain(|_, bucket| now.duration_since(bucket.last_update) < max_age);
    }
}

/// Rejects requests over the per-IP budget with 429 + Retry-After.
pub async fn limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let provided = req.headers().get(BYPASS_HEADER).map(|v| v.as_bytes());
    if state.rate_limiter.bypassed(provided) {
        return next.run(req).await;
    }

    let ip = client_ip(req.headers(), req.extensions());
    if !state.rate_limiter.check(&ip) {
        warn!(ip = %ip, path = req.uri().path(), "rate limit exceeded");
        return ApiError::rate_limited(1).into_response();
    }

    next.run(req).await
}
