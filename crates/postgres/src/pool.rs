//! Pooled Postgres client wrapper.

use deadpool_postgres::{
    Config as DeadpoolConfig, ManagerConfig, Object, Pool, PoolConfig, RecyclingMethod, Runtime,
};
use shortlink_core::{Error, Result};
use shortlink_metrics::{PoolStatSource, PoolStats};
use tokio_postgres::NoTls;
use tracing::info;

use crate::config::DatabaseConfig;

/// Connection pool shared by the request path and the metric flush workers.
#[derive(Clone)]
pub struct PgPool {
    pool: Pool,
}

impl PgPool {
    pub fn new(config: &DatabaseConfig) -> Result<Self> {
        let mut cfg = DeadpoolConfig::new();
        cfg.host = Some(config.host.clone());
        cfg.port = Some(config.port);
        cfg.user = Some(config.user.clone());
        cfg.password = Some(config.password.clone());
        cfg.dbname = Some(config.dbname.clone());
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        cfg.pool = Some(PoolConfig::new(config.pool_max_size));

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| Error::database(format!("failed to create pool: {}", e)))?;

        info!(
            host = %config.host,
            port = config.port,
            dbname = %config.dbname,
            pool_max_size = config.pool_max_size,
            "created postgres pool"
        );

        Ok(Self { pool })
    }

    /// Acquires a pooled connection.
    pub async fn get(&self) -> Result<Object> {
        self.pool
            .get()
            .await
            .map_err(|e| Error::database(format!("failed to acquire connection: {}", e)))
    }

    /// Round-trip connectivity check.
    pub async fn ping(&self) -> Result<()> {
        let client = self.get().await?;
        client
            .simple_query("SELECT 1")
            .await
            .map_err(|e| Error::database(format!("ping failed: {}", e)))?;
        Ok(())
    }
}

impl PoolStatSource for PgPool {
    fn pool_stats(&self) -> PoolStats {
        let status = self.pool.status();
        PoolStats {
            acquired: status.size.saturating_sub(status.available) as i32,
            idle: status.available as i32,
            total: status.size as i32,
            max: status.max_size as i32,
        }
    }
}
