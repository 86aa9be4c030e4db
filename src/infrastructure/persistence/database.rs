use std::sync::{Arc, Once};
use std::time::Duration;

use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use tracing::info;

use crate::domain::repository::RepositoryError;

use super::dialect::Dialect;

/// Startup migrations must finish within this deadline.
pub const MIGRATION_TIMEOUT: Duration = Duration::from_secs(30);

static DRIVERS: Once = Once::new();

/// Connection pool plus the dialect strategy the repository speaks through.
#[derive(Clone)]
pub struct Database {
    pub pool: AnyPool,
    pub dialect: Arc<dyn Dialect>,
}

impl Database {
    pub async fn connect(dsn: &str, dialect: Arc<dyn Dialect>) -> Result<Self, RepositoryError> {
        DRIVERS.call_once(sqlx::any::install_default_drivers);

        let pool = AnyPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect(dsn)
            .await?;

        info!(dialect = dialect.name(), "Connected to database");

        Ok(Self { pool, dialect })
    }

    /// Runs the dialect's migrations under the startup deadline. Re-running
    /// against an already-migrated database is a no-op.
    pub async fn migrate(&self) -> Result<(), RepositoryError> {
        info!(dialect = self.dialect.name(), "Running database migrations");

        tokio::time::timeout(MIGRATION_TIMEOUT, self.dialect.migrate(&self.pool))
            .await
            .map_err(|_| RepositoryError::Migration("migration timed out".to_string()))??;

        info!("Database migrations completed");
        Ok(())
    }
}
