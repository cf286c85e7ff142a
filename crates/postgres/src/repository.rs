//! URL storage over Postgres.

use async_trait::async_trait;
use chrono::Utc;
use shortlink_core::{Error, Result};
use tokio_postgres::binary_copy::BinaryCopyInWriter;
use tokio_postgres::types::{ToSql, Type};

use crate::pool::PgPool;

/// A URL row ready for insertion.
#[derive(Debug, Clone)]
pub struct NewUrl {
    pub id: i64,
    pub short_code: String,
    pub original_url: String,
}

/// Storage operations needed by the URL service.
#[async_trait]
pub trait UrlStore: Send + Sync {
    /// Allocates `count` fresh ids from the url sequence.
    async fn next_ids(&self, count: usize) -> Result<Vec<i64>>;

    async fn create(&self, url: &NewUrl) -> Result<()>;

    /// Looks up the original URL for a short code.
    async fn find_by_short_code(&self, short_code: &str) -> Result<Option<String>>;

    /// Bulk-inserts a batch of URLs in one round trip.
    async fn create_batch(&self, urls: &[NewUrl]) -> Result<u64>;
}

/// Production [`UrlStore`] backed by the shared pool.
pub struct UrlRepository {
    pool: PgPool,
}

impl UrlRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UrlStore for UrlRepository {
    async fn next_ids(&self, count: usize) -> Result<Vec<i64>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT nextval('urls_id_seq') FROM generate_series(1, $1)",
                &[&(count as i64)],
            )
            .await
            .map_err(|e| Error::database(format!("failed to allocate ids: {}", e)))?;

        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    async fn create(&self, url: &NewUrl) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                "INSERT INTO urls (id, short_code, original_url, created_at) \
                 VALUES ($1, $2, $3, NOW())",
                &[&url.id, &url.short_code, &url.original_url],
            )
            .await
            .map_err(|e| Error::database(format!("failed to create url: {}", e)))?;
        Ok(())
    }

    async fn find_by_short_code(&self, short_code: &str) -> Result<Option<String>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT original_url FROM urls WHERE short_code = $1",
                &[&short_code],
            )
            .await
            .map_err(|e| Error::database(format!("failed to find url: {}", e)))?;

        Ok(row.map(|r| r.get(0)))
    }

    async fn create_batch(&self, urls: &[NewUrl]) -> Result<u64> {
        if urls.is_empty() {
            return Ok(0);
        }

        let client = self.pool.get().await?;
        let sink = client
            .copy_in("COPY urls (id, short_code, original_url, created_at) FROM STDIN BINARY")
            .await
            .map_err(|e| Error::database(format!("failed to start copy: {}", e)))?;

        let writer = BinaryCopyInWriter::new(
            sink,
            &[Type::INT8, Type::TEXT, Type::TEXT, Type::TIMESTAMPTZ],
        );
        tokio::pin!(writer);

        let now = Utc::now();
        for url in urls {
            let values: [&(dyn ToSql + Sync); 4] =
                [&url.id, &url.short_code, &url.original_url, &now];
            writer
                .as_mut()
                .write(&values)
                .await
                .map_err(|e| Error::database(format!("failed to write url row: {}", e)))?;
        }

        writer
            .finish()
            .await
            .map_err(|e| Error::database(format!("failed to finish copy: {}", e)))
    }
}
