//! The metrics recorder: non-blocking ingestion API and worker lifecycle.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::RecorderConfig;
use crate::event::{BusinessMetric, HttpMetric, InfraMetric, Labels};
use crate::flush::FlushWorker;
use crate::sink::MetricSink;
use shortlink_core::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Running,
    Closing,
    Closed,
}

struct Receivers {
    http: mpsc::Receiver<HttpMetric>,
    business: mpsc::Receiver<BusinessMetric>,
    infra: mpsc::Receiver<InfraMetric>,
}

struct RecorderState {
    lifecycle: Lifecycle,
    /// Present until `start` hands them to the flush workers.
    receivers: Option<Receivers>,
    trigger: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

/// Records operational metrics without ever blocking the caller.
///
/// Owns one bounded queue per metric class. `record_*` calls attempt a
/// non-blocking enqueue: when a queue is full the event is dropped with a
/// warning and the call still returns immediately. Three flush workers
/// (spawned by [`start`](Recorder::start)) batch and bulk-write the queues.
///
/// [`close`](Recorder::close) drains the queues, performs one final bounded
/// flush per class, and joins the workers. It is idempotent: a concurrent
/// second caller waits for the first to finish, a later one returns
/// immediately.
pub struct Recorder {
    config: RecorderConfig,
    http_tx: mpsc::Sender<HttpMetric>,
    business_tx: mpsc::Sender<BusinessMetric>,
    infra_tx: mpsc::Sender<InfraMetric>,
    sink: Arc<dyn MetricSink>,
    state: Mutex<RecorderState>,
    closed_tx: watch::Sender<bool>,
    closed_rx: watch::Receiver<bool>,
}

impl Recorder {
    /// Creates a recorder over the given sink. Fails only on invalid config.
    pub fn new(sink: Arc<dyn MetricSink>, config: RecorderConfig) -> Result<Self> {
        config.validate()?;

        let (http_tx, http_rx) = mpsc::channel(config.buffer_size);
        let (business_tx, business_rx) = mpsc::channel(config.buffer_size);
        let (infra_tx, infra_rx) = mpsc::channel(config.buffer_size);
        let (closed_tx, closed_rx) = watch::channel(false);

        Ok(Self {
            config,
            http_tx,
            business_tx,
            infra_tx,
            sink,
            state: Mutex::new(RecorderState {
                lifecycle: Lifecycle::Running,
                receivers: Some(Receivers {
                    http: http_rx,
                    business: business_rx,
                    infra: infra_rx,
                }),
                trigger: CancellationToken::new(),
                tasks: Vec::new(),
            }),
            closed_tx,
            closed_rx,
        })
    }

    /// Spawns the three flush workers.
    ///
    /// The workers also stop when `shutdown` is cancelled, so process-level
    /// cancellation and an explicit [`close`](Recorder::close) take the same
    /// drain-then-stop path.
    pub fn start(&self, shutdown: &CancellationToken) {
        if !self.config.enabled {
            info!("metrics recording disabled");
            return;
        }

        let mut state = self.state.lock();
        let Some(receivers) = state.receivers.take() else {
            warn!("metrics recorder already started");
            return;
        };

        let trigger = shutdown.child_token();
        state.trigger = trigger.clone();

        state.tasks.push(tokio::spawn(
            FlushWorker::new(receivers.http, self.sink.clone(), &self.config, trigger.clone())
                .run(),
        ));
        state.tasks.push(tokio::spawn(
            FlushWorker::new(
                receivers.business,
                self.sink.clone(),
                &self.config,
                trigger.clone(),
            )
            .run(),
        ));
        state.tasks.push(tokio::spawn(
            FlushWorker::new(receivers.infra, self.sink.clone(), &self.config, trigger).run(),
        ));

        info!(
            buffer_size = self.config.buffer_size,
            flush_interval_ms = self.config.flush_interval_ms,
            flush_threshold = self.config.flush_threshold,
            "metrics recorder started"
        );
    }

    /// Records one completed HTTP request. Never blocks, never fails.
    pub fn record_http(&self, metric: HttpMetric) {
        if !self.config.enabled {
            return;
        }
        try_record(&self.http_tx, metric, "http");
    }

    /// Records one named business event, stamped with the current time.
    pub fn record_business(&self, name: impl Into<String>, value: f64, labels: Labels) {
        if !self.config.enabled {
            return;
        }
        let metric = BusinessMetric {
            time: Utc::now(),
            metric_name: name.into(),
            value,
            labels,
        };
        try_record(&self.business_tx, metric, "business");
    }

    /// Records one infrastructure sample. Never blocks, never fails.
    pub fn record_infra(&self, metric: InfraMetric) {
        if !self.config.enabled {
            return;
        }
        try_record(&self.infra_tx, metric, "infra");
    }

    /// Drains and stops the flush workers, blocking until all are joined.
    pub async fn close(&self) {
        let tasks = {
            let mut state = self.state.lock();
            let lifecycle = state.lifecycle;
            match lifecycle {
                Lifecycle::Running => {
                    state.lifecycle = Lifecycle::Closing;
                    state.trigger.cancel();
                    std::mem::take(&mut state.tasks)
                }
                Lifecycle::Closing => {
                    drop(state);
                    let mut closed = self.closed_rx.clone();
                    let _ = closed.wait_for(|done| *done).await;
                    return;
                }
                Lifecycle::Closed => return,
            }
        };

        for task in tasks {
            if task.await.is_err() {
                error!("metrics flush worker panicked during shutdown");
            }
        }

        self.state.lock().lifecycle = Lifecycle::Closed;
        let _ = self.closed_tx.send(true);
        info!("metrics recorder stopped");
    }
}

/// Non-blocking admission: drop-with-warning when the queue is full.
/// A closed queue (recorder already stopped) is silently ignored.
fn try_record<T>(tx: &mpsc::Sender<T>, metric: T, class: &'static str) {
    match tx.try_send(metric) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            warn!(class, "metrics buffer full, dropping metric");
        }
        Err(TrySendError::Closed(_)) => {}
    }
}
