//! # CampusFlow DB
//!
//! PostgreSQL pool initialisation.
//!
//! - `DATABASE_URL` (required)
//! - `DATABASE_MAX_CONNECTIONS` (default 10)
//!
//! ```ignore
//! let pool = campusflow_db::init_db_pool().await?;
//! ```

use std::env;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

pub use sqlx::PgPool;

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl DatabaseConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        Ok(Self {
            url,
            max_connections,
            acquire_timeout: Duration::from_secs(5),
        })
    }
}

/// Connects using [`DatabaseConfig::from_env`].
pub async fn init_db_pool() -> anyhow::Result<PgPool> {
    connect(&DatabaseConfig::from_env()?).await
}

pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.url)
        .await
        .context("Failed to connect to database")?;

    info!(max_connections = config.max_connections, "Database pool ready");

    Ok(pool)
}

/// `SELECT 1` round trip used by health checks.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}
