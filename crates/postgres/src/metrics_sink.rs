//! Bulk-copy metric sink over Postgres.

use async_trait::async_trait;
use shortlink_core::{Error, Result};
use shortlink_metrics::{MetricSink, SqlValue};
use tokio_postgres::binary_copy::BinaryCopyInWriter;
use tokio_postgres::types::{ToSql, Type};

use crate::pool::PgPool;

/// Production [`MetricSink`]: one binary `COPY FROM STDIN` per batch.
pub struct PostgresMetricSink {
    pool: PgPool,
}

impl PostgresMetricSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetricSink for PostgresMetricSink {
    async fn copy_in(
        &self,
        table: &str,
        columns: &[&str],
        rows: Vec<Vec<SqlValue>>,
    ) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let client = self.pool.get().await?;

        let statement = format!(
            "COPY {} ({}) FROM STDIN BINARY",
            table,
            columns.join(", ")
        );
        let sink = client
            .copy_in(&statement)
            .await
            .map_err(|e| Error::sink(format!("failed to start copy: {}", e)))?;

        // Rows within a batch are homogeneous; wire types come from the
        // first row's cells.
        let types: Vec<Type> = rows[0].iter().map(pg_type).collect();
        let writer = BinaryCopyInWriter::new(sink, &types);
        tokio::pin!(writer);

        for row in &rows {
            let cells: Vec<&(dyn ToSql + Sync)> = row.iter().map(sql_ref).collect();
            writer
                .as_mut()
                .write(&cells)
                .await
                .map_err(|e| Error::sink(format!("failed to write row: {}", e)))?;
        }

        writer
            .finish()
            .await
            .map_err(|e| Error::sink(format!("failed to finish copy: {}", e)))
    }
}

fn pg_type(value: &SqlValue) -> Type {
    match value {
        SqlValue::Timestamp(_) => Type::TIMESTAMPTZ,
        SqlValue::Text(_) => Type::TEXT,
        SqlValue::Int(_) => Type::INT4,
        SqlValue::BigInt(_) => Type::INT8,
        SqlValue::Double(_) => Type::FLOAT8,
        SqlValue::Json(_) => Type::JSONB,
    }
}

fn sql_ref(value: &SqlValue) -> &(dyn ToSql + Sync) {
    match value {
        SqlValue::Timestamp(t) => t,
        SqlValue::Text(s) => s,
        SqlValue::Int(i) => i,
        SqlValue::BigInt(i) => i,
        SqlValue::Double(f) => f,
        SqlValue::Json(j) => j,
    }
}
