//! Periodic infrastructure sampler.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sysinfo::{get_current_pid, Pid, ProcessExt, System, SystemExt};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::event::InfraMetric;
use crate::recorder::Recorder;

/// Connection-pool occupancy at a point in time.
#[derive(Debug, Clone, Copy)]
pub struct PoolStats {
    pub acquired: i32,
    pub idle: i32,
    pub total: i32,
    pub max: i32,
}

/// Cache effectiveness counters at a point in time.
#[derive(Debug, Clone, Copy)]
pub struct CacheStats {
    pub hits: i64,
    pub misses: i64,
    pub hit_ratio: f64,
}

/// Source of connection-pool occupancy numbers.
pub trait PoolStatSource: Send + Sync {
    fn pool_stats(&self) -> PoolStats;
}

/// Source of cache hit/miss counters.
pub trait CacheStatSource: Send + Sync {
    fn cache_stats(&self) -> CacheStats;
}

/// Samples pool, cache, and process gauges on a fixed period and records
/// one [`InfraMetric`] per tick.
pub struct InfraSampler {
    recorder: Arc<Recorder>,
    pool: Arc<dyn PoolStatSource>,
    cache: Arc<dyn CacheStatSource>,
    period: Duration,
    system: System,
    pid: Option<Pid>,
}

impl InfraSampler {
    pub fn new(
        recorder: Arc<Recorder>,
        pool: Arc<dyn PoolStatSource>,
        cache: Arc<dyn CacheStatSource>,
        period: Duration,
    ) -> Self {
        Self {
            recorder,
            pool,
            cache,
            period,
            system: System::new(),
            pid: get_current_pid().ok(),
        }
    }

    /// Spawns the sampling task; it stops when `shutdown` is cancelled.
    pub fn spawn(mut self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(period_secs = self.period.as_secs(), "infra sampler started");

            let mut ticker = time::interval_at(Instant::now() + self.period, self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => return,
                    _ = ticker.tick() => {
                        let metric = self.sample();
                        self.recorder.record_infra(metric);
                    }
                }
            }
        })
    }

    fn sample(&mut self) -> InfraMetric {
        let pool = self.pool.pool_stats();
        let cache = self.cache.cache_stats();

        let mut heap_alloc_mb = 0.0;
        if let Some(pid) = self.pid {
            self.system.refresh_process(pid);
            if let Some(process) = self.system.process(pid) {
                heap_alloc_mb = process.memory() as f64 / 1024.0 / 1024.0;
            }
        }

        let worker_count = tokio::runtime::Handle::current().metrics().num_workers() as i32;

        InfraMetric {
            time: Utc::now(),
            pool_acquired: pool.acquired,
            pool_idle: pool.idle,
            pool_total: pool.total,
            pool_max: pool.max,
            cache_hits: cache.hits,
            cache_misses: cache.misses,
            cache_hit_ratio: cache.hit_ratio,
            worker_count,
            heap_alloc_mb,
        }
    }
}
