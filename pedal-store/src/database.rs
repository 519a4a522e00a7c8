use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::info;

use crate::app_config::DatabaseConfig;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    /// Every statement on a pooled connection, COMMIT included, is cut off
    /// server-side after `statement_timeout`.
    pub async fn new(config: &DatabaseConfig, statement_timeout: Duration) -> Result<Self, sqlx::Error> {
        let options = config
            .url
            .parse::<PgConnectOptions>()?
            .options([("statement_timeout", statement_timeout_setting(statement_timeout))]);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&self.pool)
            .await?;
        info!("Migrations completed successfully.");
        Ok(())
    }
}

fn statement_timeout_setting(timeout: Duration) -> String {
    // 0 disables the limit in Postgres
    format!("{}ms", timeout.as_millis().max(1))
}
