//! In-process response cache for short-code lookups.

use std::sync::atomic::{AtomicU64, Ordering};

use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use shortlink_metrics::{CacheStatSource, CacheStats};

/// Cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum total weight of cached entries in bytes
    #[serde(default = "default_max_size_bytes")]
    pub max_size_bytes: u64,
}

fn default_max_size_bytes() -> u64 {
    1 << 27 // 128 MiB
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: default_max_size_bytes(),
        }
    }
}

/// Caches short-code → original-URL mappings, tracking hit/miss counts for
/// the infra sampler.
pub struct UrlCache {
    cache: Cache<String, String>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl UrlCache {
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .weigher(|key: &String, value: &String| (key.len() + value.len()) as u32)
            .max_capacity(config.max_size_bytes)
            .build();

        Self {
            cache,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, short_code: &str) -> Option<String> {
        match self.cache.get(short_code) {
            Some(url) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(url)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&self, short_code: &str, original_url: &str) {
        self.cache
            .insert(short_code.to_string(), original_url.to_string());
    }

    /// Returns (hits, misses, hit ratio).
    pub fn stats(&self) -> (u64, u64, f64) {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let ratio = if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        };
        (hits, misses, ratio)
    }
}

impl CacheStatSource for UrlCache {
    fn cache_stats(&self) -> CacheStats {
        let (hits, misses, hit_ratio) = self.stats();
        CacheStats {
            hits: hits as i64,
            misses: misses as i64,
            hit_ratio,
        }
    }
}
