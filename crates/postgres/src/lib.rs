//! Postgres storage for the shortlink service.
//!
//! One pooled client serves both the request path (URL repository) and the
//! telemetry pipeline (bulk-copy metric sink); the pool is safe for
//! concurrent use by independent callers.

pub mod config;
pub mod metrics_sink;
pub mod pool;
pub mod repository;
pub mod schema;

pub use config::DatabaseConfig;
pub use metrics_sink::PostgresMetricSink;
pub use pool::PgPool;
pub use repository::{NewUrl, UrlRepository, UrlStore};
pub use schema::init_schema;
