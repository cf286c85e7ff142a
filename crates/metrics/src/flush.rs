//! The per-class flush worker: accumulate, batch, bulk-write.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::config::RecorderConfig;
use crate::event::MetricRecord;
use crate::sink::MetricSink;

/// Bound on the final drain-and-flush during shutdown, independent of any
/// caller-provided deadline. A stalled sink must not block process exit.
const SHUTDOWN_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Consumes one metric class's queue and writes batches to the sink.
///
/// A batch is written when it reaches `flush_threshold` events, when the
/// interval timer fires with a non-empty batch, or once more during the
/// shutdown drain. Batches preserve enqueue order; a failed write is logged
/// and discarded, never retried.
pub(crate) struct FlushWorker<T: MetricRecord> {
    rx: mpsc::Receiver<T>,
    sink: Arc<dyn MetricSink>,
    flush_interval: Duration,
    flush_threshold: usize,
    capacity: usize,
    shutdown: CancellationToken,
}

impl<T: MetricRecord> FlushWorker<T> {
    pub(crate) fn new(
        rx: mpsc::Receiver<T>,
        sink: Arc<dyn MetricSink>,
        config: &RecorderConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            rx,
            sink,
            flush_interval: config.flush_interval(),
            flush_threshold: config.flush_threshold,
            capacity: config.buffer_size,
            shutdown,
        }
    }

    pub(crate) async fn run(mut self) {
        let mut batch: Vec<T> = Vec::with_capacity(self.capacity);
        let mut ticker =
            time::interval_at(Instant::now() + self.flush_interval, self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    self.drain_and_flush(&mut batch).await;
                    return;
                }
                received = self.rx.recv() => match received {
                    Some(event) => {
                        batch.push(event);
                        if batch.len() >= self.flush_threshold {
                            self.flush(&mut batch).await;
                        }
                    }
                    None => {
                        // Recorder dropped; nothing more can arrive.
                        self.drain_and_flush(&mut batch).await;
                        return;
                    }
                },
                _ = ticker.tick() => {
                    if !batch.is_empty() {
                        self.flush(&mut batch).await;
                    }
                }
            }
        }
    }

    /// Pulls whatever is still queued (without waiting for new arrivals),
    /// then performs one final bounded flush.
    async fn drain_and_flush(&mut self, batch: &mut Vec<T>) {
        while let Ok(event) = self.rx.try_recv() {
            batch.push(event);
        }

        if batch.is_empty() {
            return;
        }

        let pending = batch.len();
        if time::timeout(SHUTDOWN_FLUSH_TIMEOUT, self.flush(batch))
            .await
            .is_err()
        {
            warn!(
                table = T::TABLE,
                pending, "final metrics flush timed out, abandoning batch"
            );
        }
    }

    async fn flush(&self, batch: &mut Vec<T>) {
        if batch.is_empty() {
            return;
        }

        let count = batch.len();
        let rows = batch.drain(..).map(MetricRecord::into_row).collect();

        match self.sink.copy_in(T::TABLE, T::COLUMNS, rows).await {
            Ok(written) => {
                debug!(table = T::TABLE, count = written, "flushed metrics batch");
            }
            Err(e) => {
                error!(
                    table = T::TABLE,
                    count,
                    error = %e,
                    "failed to write metrics batch, discarding"
                );
            }
        }
    }
}
