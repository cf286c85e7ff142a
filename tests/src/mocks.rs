//! Mock implementations for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use shortlink_core::{Error, Result};
use shortlink_metrics::{MetricSink, SqlValue};
use shortlink_postgres::{NewUrl, UrlStore};
use tokio::sync::Notify;

/// One recorded bulk-copy attempt.
#[derive(Debug, Clone)]
pub struct CopyCall {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
    /// Whether the mock reported success for this attempt.
    pub ok: bool,
}

/// Mock sink that captures bulk-copy calls in memory.
///
/// Supports two failure knobs: `fail_next` makes the next N attempts return
/// an error (the batch is still captured, marked `ok = false`), and
/// `set_blocked` stalls every call until unblocked, simulating a hung sink.
#[derive(Clone, Default)]
pub struct MockSink {
    calls: Arc<Mutex<Vec<CopyCall>>>,
    failures_remaining: Arc<AtomicUsize>,
    blocked: Arc<Mutex<bool>>,
    unblock: Arc<Notify>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All attempts, including failed ones, in call order.
    pub fn calls(&self) -> Vec<CopyCall> {
        self.calls.lock().clone()
    }

    /// Successful attempts against one table, in call order.
    pub fn flushes(&self, table: &str) -> Vec<CopyCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.ok && c.table == table)
            .cloned()
            .collect()
    }

    /// Total rows successfully written to one table.
    pub fn rows_written(&self, table: &str) -> usize {
        self.flushes(table).iter().map(|c| c.rows.len()).sum()
    }

    /// Fail the next `n` copy attempts.
    pub fn fail_next(&self, n: usize) {
        self.failures_remaining.store(n, Ordering::SeqCst);
    }

    /// Stall (or release) all copy attempts.
    pub fn set_blocked(&self, blocked: bool) {
        *self.blocked.lock() = blocked;
        if !blocked {
            self.unblock.notify_waiters();
        }
    }

    async fn wait_unblocked(&self) {
        loop {
            let notified = self.unblock.notified();
            if !*self.blocked.lock() {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl MetricSink for MockSink {
    async fn copy_in(
        &self,
        table: &str,
        columns: &[&str],
        rows: Vec<Vec<SqlValue>>,
    ) -> Result<u64> {
        self.wait_unblocked().await;

        let fail = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();

        let count = rows.len() as u64;
        self.calls.lock().push(CopyCall {
            table: table.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
            ok: !fail,
        });

        if fail {
            return Err(Error::sink("mock sink failure"));
        }
        Ok(count)
    }
}

/// In-memory [`UrlStore`].
#[derive(Default)]
pub struct MockUrlStore {
    next_id: AtomicI64,
    urls: Arc<Mutex<HashMap<String, String>>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MockUrlStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn url_count(&self) -> usize {
        self.urls.lock().len()
    }

    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.lock() = fail;
    }

    fn check_failure(&self) -> Result<()> {
        if *self.should_fail.lock() {
            return Err(Error::database("mock store failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl UrlStore for MockUrlStore {
    async fn next_ids(&self, count: usize) -> Result<Vec<i64>> {
        self.check_failure()?;
        Ok((0..count)
            .map(|_| self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
            .collect())
    }

    async fn create(&self, url: &NewUrl) -> Result<()> {
        self.check_failure()?;
        self.urls
            .lock()
            .insert(url.short_code.clone(), url.original_url.clone());
        Ok(())
    }

    async fn find_by_short_code(&self, short_code: &str) -> Result<Option<String>> {
        self.check_failure()?;
        Ok(self.urls.lock().get(short_code).cloned())
    }

    async fn create_batch(&self, urls: &[NewUrl]) -> Result<u64> {
        self.check_failure()?;
        let mut map = self.urls.lock();
        for url in urls {
            map.insert(url.short_code.clone(), url.original_url.clone());
        }
        Ok(urls.len() as u64)
    }
}

/// Extracts a text cell from a captured row.
pub fn text_cell(row: &[SqlValue], index: usize) -> &str {
    match &row[index] {
        SqlValue::Text(s) => s,
        other => panic!("expected text cell at {}, got {:?}", index, other),
    }
}

/// Extracts a double cell from a captured row.
pub fn double_cell(row: &[SqlValue], index: usize) -> f64 {
    match &row[index] {
        SqlValue::Double(v) => *v,
        other => panic!("expected double cell at {}, got {:?}", index, other),
    }
}

/// Extracts an int cell from a captured row.
pub fn int_cell(row: &[SqlValue], index: usize) -> i32 {
    match &row[index] {
        SqlValue::Int(v) => *v,
        other => panic!("expected int cell at {}, got {:?}", index, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_sink_captures_calls() {
        let sink = MockSink::new();
        let rows = vec![vec![SqlValue::Text("GET".into())]];

        let written = sink.copy_in("http_metrics", &["method"], rows).await.unwrap();
        assert_eq!(written, 1);
        assert_eq!(sink.rows_written("http_metrics"), 1);
        assert_eq!(sink.calls()[0].columns, vec!["method"]);
    }

    #[tokio::test]
    async fn test_mock_sink_failure_mode() {
        let sink = MockSink::new();
        sink.fail_next(1);

        let rows = vec![vec![SqlValue::Int(1)]];
        assert!(sink.copy_in("infra_metrics", &["n"], rows.clone()).await.is_err());
        assert!(sink.copy_in("infra_metrics", &["n"], rows).await.is_ok());

        assert_eq!(sink.rows_written("infra_metrics"), 1);
        assert_eq!(sink.calls().len(), 2);
        assert!(!sink.calls()[0].ok);
    }
}
