//! Postgres configuration.

use serde::{Deserialize, Serialize};

/// Postgres connection and pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_password")]
    pub password: String,
    #[serde(default = "default_dbname")]
    pub dbname: String,
    /// Maximum pool size (connections)
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: usize,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_user() -> String {
    "postgres".to_string()
}

fn default_password() -> String {
    "postgres".to_string()
}

fn default_dbname() -> String {
    "shortlink".to_string()
}

fn default_pool_max_size() -> usize {
    16
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            user: default_user(),
            password: default_password(),
            dbname: default_dbname(),
            pool_max_size: default_pool_max_size(),
        }
    }
}
