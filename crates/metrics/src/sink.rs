//! The bulk-write contract between the flush workers and the datastore.

use async_trait::async_trait;
use shortlink_core::Result;

use crate::event::SqlValue;

/// A bulk-insert-capable metrics destination.
///
/// One call writes one batch into one relation, atomically per call. The
/// production implementation lives in `shortlink-postgres`; tests substitute
/// an in-memory capture.
#[async_trait]
pub trait MetricSink: Send + Sync {
    /// Bulk-inserts `rows` into `table` with the given column order.
    /// Returns the number of rows written.
    async fn copy_in(
        &self,
        table: &str,
        columns: &[&str],
        rows: Vec<Vec<SqlValue>>,
    ) -> Result<u64>;
}
