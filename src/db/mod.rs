mod alerts;
pub(crate) mod models;
mod repository;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

pub use alerts::PgAlertRepository;
pub use models::{Alert, InvalidWindow, NewAlert, RecencyWindow};
pub use repository::{AlertRepository, RepoError};

/// Opens the pool, checks the connection and applies migrations.
///
/// Any failure here is fatal for the service.
pub async fn init(options: PgConnectOptions, migration_path: &Path) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(options)
        .await
        .context("Error connecting to database")?;

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .context("Error pinging database")?;

    if migration_path.exists() {
        let migrator = Migrator::new(migration_path)
            .await
            .with_context(|| format!("Error init migration: {:?}", migration_path))?;

        migrator.run(&pool)
            .await
            .context("Error running migrations")?;
        info!("Migrations applied.");
    } else {
        warn!("Migration folder missing {:?}. check env.", migration_path);
    }

    Ok(pool)
}
