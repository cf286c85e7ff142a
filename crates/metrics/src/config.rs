//! Recorder configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use shortlink_core::{Error, Result};
use tracing::warn;

/// Metrics recorder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Whether metrics recording is enabled at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Per-class queue capacity (events)
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Maximum time an event waits in a batch before being written
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    /// Batch size that triggers an immediate write
    #[serde(default = "default_flush_threshold")]
    pub flush_threshold: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_buffer_size() -> usize {
    10_000
}

fn default_flush_interval_ms() -> u64 {
    100
}

fn default_flush_threshold() -> usize {
    1000
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            buffer_size: default_buffer_size(),
            flush_interval_ms: default_flush_interval_ms(),
            flush_threshold: default_flush_threshold(),
        }
    }
}

impl RecorderConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// Validates the configuration. Invalid values are fatal at startup.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(Error::config("metrics buffer_size must be positive"));
        }
        if self.flush_interval_ms == 0 {
            return Err(Error::config("metrics flush_interval_ms must be positive"));
        }
        if self.flush_threshold == 0 {
            return Err(Error::config("metrics flush_threshold must be positive"));
        }
        if self.flush_threshold > self.buffer_size {
            warn!(
                flush_threshold = self.flush_threshold,
                buffer_size = self.buffer_size,
                "flush threshold exceeds buffer size, interval timer will drive flushes"
            );
        }
        Ok(())
    }
}
