//! The three metric classes and their sink row mappings.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Business metric labels. Keys are unique, order is irrelevant.
pub type Labels = HashMap<String, String>;

/// Builds a label map from string pairs.
pub fn labels(pairs: &[(&str, &str)]) -> Labels {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// One completed HTTP request.
#[derive(Debug, Clone)]
pub struct HttpMetric {
    pub time: DateTime<Utc>,
    pub method: String,
    pub path: String,
    pub status_code: i32,
    pub duration_ms: f64,
    pub client_ip: String,
    /// Empty string when the request succeeded.
    pub error: String,
}

/// One named business event.
#[derive(Debug, Clone)]
pub struct BusinessMetric {
    pub time: DateTime<Utc>,
    pub metric_name: String,
    pub value: f64,
    pub labels: Labels,
}

/// One point-in-time infrastructure sample.
#[derive(Debug, Clone)]
pub struct InfraMetric {
    pub time: DateTime<Utc>,
    pub pool_acquired: i32,
    pub pool_idle: i32,
    pub pool_total: i32,
    pub pool_max: i32,
    pub cache_hits: i64,
    pub cache_misses: i64,
    pub cache_hit_ratio: f64,
    pub worker_count: i32,
    pub heap_alloc_mb: f64,
}

/// A single cell in a bulk-copy row.
#[derive(Debug, Clone)]
pub enum SqlValue {
    Timestamp(DateTime<Utc>),
    Text(String),
    Int(i32),
    BigInt(i64),
    Double(f64),
    Json(Value),
}

/// A metric class that can be bulk-written to its own relation.
///
/// `COLUMNS` order is fixed and must match the order of cells produced by
/// [`into_row`](MetricRecord::into_row); the sink passes both through to a
/// single bulk-copy call.
pub trait MetricRecord: Send + 'static {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];

    fn into_row(self) -> Vec<SqlValue>;
}

impl MetricRecord for HttpMetric {
    const TABLE: &'static str = "http_metrics";
    const COLUMNS: &'static [&'static str] = &[
        "time",
        "method",
        "path",
        "status_code",
        "duration_ms",
        "client_ip",
        "error",
    ];

    fn into_row(self) -> Vec<SqlValue> {
        vec![
            SqlValue::Timestamp(self.time),
            SqlValue::Text(self.method),
            SqlValue::Text(self.path),
            SqlValue::Int(self.status_code),
            SqlValue::Double(self.duration_ms),
            SqlValue::Text(self.client_ip),
            SqlValue::Text(self.error),
        ]
    }
}

impl MetricRecord for BusinessMetric {
    const TABLE: &'static str = "business_metrics";
    const COLUMNS: &'static [&'static str] = &["time", "metric_name", "value", "labels"];

    fn into_row(self) -> Vec<SqlValue> {
        let labels = self
            .labels
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect::<serde_json::Map<_, _>>();

        vec![
            SqlValue::Timestamp(self.time),
            SqlValue::Text(self.metric_name),
            SqlValue::Double(self.value),
            SqlValue::Json(Value::Object(labels)),
        ]
    }
}

impl MetricRecord for InfraMetric {
    const TABLE: &'static str = "infra_metrics";
    const COLUMNS: &'static [&'static str] = &[
        "time",
        "pool_acquired",
        "pool_idle",
        "pool_total",
        "pool_max",
        "cache_hits",
        "cache_misses",
        "cache_hit_ratio",
        "worker_count",
        "heap_alloc_mb",
    ];

    fn into_row(self) -> Vec<SqlValue> {
        vec![
            SqlValue::Timestamp(self.time),
            SqlValue::Int(self.pool_acquired),
            SqlValue::Int(self.pool_idle),
            SqlValue::Int(self.pool_total),
            SqlValue::Int(self.pool_max),
            SqlValue::BigInt(self.cache_hits),
            SqlValue::BigInt(self.cache_misses),
            SqlValue::Double(self.cache_hit_ratio),
            SqlValue::Int(self.worker_count),
            SqlValue::Double(self.heap_alloc_mb),
        ]
    }
}
