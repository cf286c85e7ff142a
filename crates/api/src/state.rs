//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use shortlink_core::UrlValidator;
use shortlink_metrics::Recorder;

use crate::middleware::rate_limit::{RateLimiter, SharedRateLimiter};
use crate::service::UrlService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<UrlService>,
    pub validator: Arc<UrlValidator>,
    pub recorder: Arc<Recorder>,
    pub rate_limiter: SharedRateLimiter,
}

impl AppState {
    pub fn new(
        service: Arc<UrlService>,
        validator: Arc<UrlValidator>,
        recorder: Arc<Recorder>,
        rate_limiter: RateLimiter,
    ) -> Self {
        Self {
            service,
            validator,
            recorder,
            rate_limiter: Arc::new(rate_limiter),
        }
    }

    /// Start the rate limiter cleanup background task.
    pub fn start_rate_limiter_cleanup(&self) -> tokio::task::JoinHandle<()> {
        let rate_limiter = self.rate_limiter.clone();
        let max_age = rate_limiter.expire_after();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(300));
            loop {
                interval.tick().await;
                rate_limiter.cleanup(max_age);
            }
        })
    }
}
