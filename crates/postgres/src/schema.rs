//! Table schemas and idempotent schema initialization.

use shortlink_core::{Error, Result};
use tracing::info;

use crate::pool::PgPool;

/// SQL for the urls table and its id sequence.
pub const CREATE_URLS_TABLE: &str = r#"
CREATE SEQUENCE IF NOT EXISTS urls_id_seq;

CREATE TABLE IF NOT EXISTS urls (
    id BIGINT PRIMARY KEY DEFAULT nextval('urls_id_seq'),
    short_code VARCHAR(16) NOT NULL UNIQUE,
    original_url TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

/// SQL for the HTTP metrics relation. Column order matches the bulk-copy
/// column list used by the flush workers.
pub const CREATE_HTTP_METRICS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS http_metrics (
    time TIMESTAMPTZ NOT NULL,
    method TEXT NOT NULL,
    path TEXT NOT NULL,
    status_code INTEGER NOT NULL,
    duration_ms DOUBLE PRECISION NOT NULL,
    client_ip TEXT NOT NULL,
    error TEXT NOT NULL DEFAULT ''
);
CREATE INDEX IF NOT EXISTS http_metrics_time_idx ON http_metrics (time)
"#;

/// SQL for the business metrics relation.
pub const CREATE_BUSINESS_METRICS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS business_metrics (
    time TIMESTAMPTZ NOT NULL,
    metric_name TEXT NOT NULL,
    value DOUBLE PRECISION NOT NULL,
    labels JSONB NOT NULL DEFAULT '{}'
);
CREATE INDEX IF NOT EXISTS business_metrics_name_time_idx
    ON business_metrics (metric_name, time)
"#;

/// SQL for the infrastructure metrics relation.
pub const CREATE_INFRA_METRICS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS infra_metrics (
    time TIMESTAMPTZ NOT NULL,
    pool_acquired INTEGER NOT NULL,
    pool_idle INTEGER NOT NULL,
    pool_total INTEGER NOT NULL,
    pool_max INTEGER NOT NULL,
    cache_hits BIGINT NOT NULL,
    cache_misses BIGINT NOT NULL,
    cache_hit_ratio DOUBLE PRECISION NOT NULL,
    worker_count INTEGER NOT NULL,
    heap_alloc_mb DOUBLE PRECISION NOT NULL
);
CREATE INDEX IF NOT EXISTS infra_metrics_time_idx ON infra_metrics (time)
"#;

/// Creates all tables if they do not exist.
///
/// Callers may continue past a failure here; the schema usually already
/// exists in deployed environments.
pub async fn init_schema(pool: &PgPool) -> Result<()> {
    let client = pool.get().await?;

    let statements = [
        ("urls", CREATE_URLS_TABLE),
        ("http_metrics", CREATE_HTTP_METRICS_TABLE),
        ("business_metrics", CREATE_BUSINESS_METRICS_TABLE),
        ("infra_metrics", CREATE_INFRA_METRICS_TABLE),
    ];

    for (name, ddl) in statements {
        client.batch_execute(ddl).await.map_err(|e| {
            Error::database(format!("failed to init schema for {}: {}", name, e))
        })?;
        info!(table = name, "schema ready");
    }

    Ok(())
}
