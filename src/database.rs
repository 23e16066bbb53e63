use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;

/// Connection pool handle. Construction connects and brings the schema up to
/// date, so a `Database` value always points at a migrated database.
#[derive(Clone)]
pub struct Database {
    pub pool: Pool<Postgres>,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .connect(&config.url)
            .await?;

        info!("Running database migrations...");
        sqlx::migrate!("./src/migrations").run(&pool).await?;
        info!("Migrations completed");

        Ok(Database { pool })
    }
}
