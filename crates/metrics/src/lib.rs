//! Buffered telemetry pipeline for the shortlink service.
//!
//! Request handlers and background samplers record metrics through
//! non-blocking, bounded per-class queues; one flush worker per class
//! batches events and bulk-writes them to the sink. A slow or failing
//! sink never blocks or errors the request path: overflow drops the
//! newest event, write failures drop the batch.

pub mod config;
pub mod event;
pub mod recorder;
pub mod sampler;
pub mod sink;
pub mod tracing_setup;

mod flush;

pub use config::RecorderConfig;
pub use event::*;
pub use recorder::Recorder;
pub use sampler::{CacheStatSource, CacheStats, InfraSampler, PoolStatSource, PoolStats};
pub use sink::MetricSink;
pub use tracing_setup::*;
