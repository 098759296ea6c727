//! Entity store for pollhub.
//!
//! Entities, migrations and repositories for users, polls, questions,
//! options, votes, invitations, comments and the activity log. Storage
//! errors leave this crate already translated by
//! [`repositories::map_db_err`].

pub mod entities;
pub mod migrations;
pub mod repositories;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use pollhub_common::{config::DatabaseConfig, AppError, AppResult};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;
use tracing::{info, log::LevelFilter};

/// Open the connection pool described by `config`.
pub async fn init(config: &DatabaseConfig) -> AppResult<DatabaseConnection> {
    let mut opt = ConnectOptions::new(&config.url);

    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(LevelFilter::Debug);

    let db = Database::connect(opt)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    info!(
        backend = ?db.get_database_backend(),
        max_connections = config.max_connections,
        "Database pool ready"
    );
    Ok(db)
}

/// Apply pending migrations, returning how many ran.
pub async fn migrate(db: &DatabaseConnection) -> AppResult<usize> {
    let pending = migrations::Migrator::get_pending_migrations(db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .len();

    migrations::Migrator::up(db, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    if pending > 0 {
        info!(applied = pending, "Migrations applied");
    }
    Ok(pending)
}
