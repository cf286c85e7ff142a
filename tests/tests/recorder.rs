//! Black-box tests for the metrics recorder pipeline.
//!
//! Every test runs against the in-memory mock sink; no database is needed.
//! Events carry a sequence number in their value so batches can be checked
//! for ordering, loss, and duplication.

use std::sync::Arc;
use std::time::{Duration, Instant};

use integration_tests::mocks::{double_cell, MockSink};
use shortlink_metrics::{Labels, Recorder, RecorderConfig};
use tokio_util::sync::CancellationToken;

const BUSINESS: &str = "business_metrics";

fn config(buffer: usize, threshold: usize, interval_ms: u64) -> RecorderConfig {
    RecorderConfig {
        enabled: true,
        buffer_size: buffer,
        flush_threshold: threshold,
        flush_interval_ms: interval_ms,
    }
}

fn recorder(sink: &MockSink, cfg: RecorderConfig) -> Arc<Recorder> {
    Arc::new(Recorder::new(Arc::new(sink.clone()), cfg).expect("valid config"))
}

fn record_seq(recorder: &Recorder, range: std::ops::Range<usize>) {
    for i in range {
        recorder.record_business("seq", i as f64, Labels::new());
    }
}

fn flushed_values(sink: &MockSink) -> Vec<f64> {
    sink.flushes(BUSINESS)
        .iter()
        .flat_map(|call| call.rows.iter().map(|row| double_cell(row, 2)))
        .collect()
}

async fn wait_for(mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !cond() {
        assert!(Instant::now() < deadline, "condition not met within 2s");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Count threshold: exactly K events produce exactly one flush of size K.
#[tokio::test]
async fn test_threshold_triggers_single_flush() {
    let sink = MockSink::new();
    let rec = recorder(&sink, config(100, 5, 3_600_000));
    rec.start(&CancellationToken::new());

    record_seq(&rec, 0..5);

    wait_for(|| sink.rows_written(BUSINESS) >= 5).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let flushes = sink.flushes(BUSINESS);
    assert_eq!(flushes.len(), 1, "expected exactly one flush");
    assert_eq!(flushes[0].rows.len(), 5);
    assert_eq!(
        flushes[0].columns,
        vec!["time", "metric_name", "value", "labels"]
    );

    rec.close().await;
}

/// Interval timer: one event below the threshold is written after at most
/// one flush interval.
#[tokio::test]
async fn test_timer_triggers_flush_below_threshold() {
    let sink = MockSink::new();
    let rec = recorder(&sink, config(100, 100, 100));
    rec.start(&CancellationToken::new());

    record_seq(&rec, 0..1);

    tokio::time::sleep(Duration::from_millis(250)).await;

    let flushes = sink.flushes(BUSINESS);
    assert_eq!(flushes.len(), 1);
    assert_eq!(flushes[0].rows.len(), 1);

    rec.close().await;
}

/// Up to buffer_size events are all admitted, none dropped.
#[tokio::test]
async fn test_all_events_within_capacity_are_kept() {
    let sink = MockSink::new();
    let rec = recorder(&sink, config(50, 10, 50));

    // Enqueue before the consumer exists: the queue alone must hold them.
    record_seq(&rec, 0..50);

    rec.start(&CancellationToken::new());
    rec.close().await;

    assert_eq!(sink.rows_written(BUSINESS), 50);
}

/// Beyond buffer_size (with no consumer draining), the newest events are
/// refused; admitted events keep FIFO order.
#[tokio::test]
async fn test_overflow_drops_newest() {
    let sink = MockSink::new();
    let rec = recorder(&sink, config(10, 5, 3_600_000));

    record_seq(&rec, 0..25);

    rec.start(&CancellationToken::new());
    rec.close().await;

    let values = flushed_values(&sink);
    assert_eq!(values.len(), 10, "only buffer_size events admitted");
    let expected: Vec<f64> = (0..10).map(|i| i as f64).collect();
    assert_eq!(values, expected, "admitted events preserve enqueue order");
}

/// Close drains everything still queued before returning.
#[tokio::test]
async fn test_close_drains_pending_events() {
    let sink = MockSink::new();
    let rec = recorder(&sink, config(100, 50, 3_600_000));
    rec.start(&CancellationToken::new());

    record_seq(&rec, 0..20);
    rec.close().await;

    assert_eq!(sink.rows_written(BUSINESS), 20);
}

/// Close is idempotent: concurrent and repeated calls neither hang nor
/// duplicate the final flush.
#[tokio::test]
async fn test_close_idempotent() {
    let sink = MockSink::new();
    let rec = recorder(&sink, config(100, 50, 3_600_000));
    rec.start(&CancellationToken::new());

    record_seq(&rec, 0..7);

    tokio::join!(rec.close(), rec.close());
    rec.close().await;

    assert_eq!(sink.rows_written(BUSINESS), 7);
}

/// Cancelling the token passed to start takes the same drain path as close.
#[tokio::test]
async fn test_external_cancellation_drains() {
    let sink = MockSink::new();
    let rec = recorder(&sink, config(100, 50, 3_600_000));
    let shutdown = CancellationToken::new();
    rec.start(&shutdown);

    record_seq(&rec, 0..9);
    shutdown.cancel();

    wait_for(|| sink.rows_written(BUSINESS) >= 9).await;
    assert_eq!(sink.rows_written(BUSINESS), 9);

    rec.close().await;
}

/// Disabled recorder: no queue writes, no flushes, regardless of volume.
#[tokio::test]
async fn test_disabled_mode_is_a_no_op() {
    let sink = MockSink::new();
    let cfg = RecorderConfig {
        enabled: false,
        ..config(100, 5, 50)
    };
    let rec = recorder(&sink, cfg);
    rec.start(&CancellationToken::new());

    record_seq(&rec, 0..500);
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert!(sink.calls().is_empty());

    rec.close().await;
    assert!(sink.calls().is_empty());
}

/// The worked example: buffer 10, threshold 5, interval 100ms. Five quick
/// events flush immediately; three more are flushed by the timer.
#[tokio::test]
async fn test_threshold_then_timer_scenario() {
    let sink = MockSink::new();
    let rec = recorder(&sink, config(10, 5, 100));
    rec.start(&CancellationToken::new());

    record_seq(&rec, 0..5);
    wait_for(|| sink.rows_written(BUSINESS) >= 5).await;
    assert_eq!(sink.flushes(BUSINESS).len(), 1);
    assert_eq!(sink.flushes(BUSINESS)[0].rows.len(), 5);

    record_seq(&rec, 5..8);
    tokio::time::sleep(Duration::from_millis(150)).await;

    let flushes = sink.flushes(BUSINESS);
    assert_eq!(flushes.len(), 2);
    assert_eq!(flushes[1].rows.len(), 3);

    rec.close().await;
}

/// A failed bulk write is discarded: no retry, no duplicates, no effect on
/// later batches or on producers.
#[tokio::test]
async fn test_sink_failure_discards_batch_without_retry() {
    let sink = MockSink::new();
    let rec = recorder(&sink, config(100, 5, 3_600_000));
    rec.start(&CancellationToken::new());

    sink.fail_next(1);
    record_seq(&rec, 0..5);
    wait_for(|| !sink.calls().is_empty()).await;

    record_seq(&rec, 5..10);
    wait_for(|| sink.rows_written(BUSINESS) >= 5).await;

    let calls = sink.calls();
    assert_eq!(calls.len(), 2, "failed batch must not be retried");
    assert!(!calls[0].ok);
    assert_eq!(calls[0].rows.len(), 5);

    let values = flushed_values(&sink);
    assert_eq!(values, vec![5.0, 6.0, 7.0, 8.0, 9.0]);

    rec.close().await;
}

/// Batches preserve enqueue order across consecutive flushes.
#[tokio::test]
async fn test_fifo_order_across_flushes() {
    let sink = MockSink::new();
    let rec = recorder(&sink, config(100, 4, 3_600_000));
    rec.start(&CancellationToken::new());

    record_seq(&rec, 0..12);
    wait_for(|| sink.rows_written(BUSINESS) >= 12).await;

    let values = flushed_values(&sink);
    let expected: Vec<f64> = (0..12).map(|i| i as f64).collect();
    assert_eq!(values, expected);

    rec.close().await;
}

/// Producers never block, even with the sink wedged mid-write.
#[tokio::test]
async fn test_record_never_blocks_on_stalled_sink() {
    let sink = MockSink::new();
    let rec = recorder(&sink, config(10, 1, 3_600_000));
    rec.start(&CancellationToken::new());

    sink.set_blocked(true);

    // First event reaches the worker, whose flush now stalls in the sink.
    record_seq(&rec, 0..1);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let started = Instant::now();
    record_seq(&rec, 1..51);
    assert!(
        started.elapsed() < Duration::from_millis(500),
        "record calls must not block on a stalled sink"
    );

    sink.set_blocked(false);
    rec.close().await;

    // One in-flight event plus a full queue; the rest were dropped.
    assert_eq!(sink.rows_written(BUSINESS), 11);
}

/// Each class flushes to its own relation with its own column list.
#[tokio::test]
async fn test_classes_flush_independently() {
    let sink = MockSink::new();
    let rec = recorder(&sink, config(100, 1, 3_600_000));
    rec.start(&CancellationToken::new());

    rec.record_http(shortlink_metrics::HttpMetric {
        time: chrono::Utc::now(),
        method: "GET".into(),
        path: "/:code".into(),
        status_code: 302,
        duration_ms: 0.4,
        client_ip: "203.0.113.9".into(),
        error: String::new(),
    });
    rec.record_business("redirects", 1.0, Labels::new());
    rec.record_infra(shortlink_metrics::InfraMetric {
        time: chrono::Utc::now(),
        pool_acquired: 1,
        pool_idle: 3,
        pool_total: 4,
        pool_max: 16,
        cache_hits: 10,
        cache_misses: 2,
        cache_hit_ratio: 10.0 / 12.0,
        worker_count: 4,
        heap_alloc_mb: 30.0,
    });

    wait_for(|| {
        sink.rows_written("http_metrics") >= 1
            && sink.rows_written(BUSINESS) >= 1
            && sink.rows_written("infra_metrics") >= 1
    })
    .await;

    assert_eq!(sink.flushes("http_metrics")[0].columns.len(), 7);
    assert_eq!(sink.flushes(BUSINESS)[0].columns.len(), 4);
    assert_eq!(sink.flushes("infra_metrics")[0].columns.len(), 10);

    rec.close().await;
}
