//! Database migration commands.
//!
//! Migrations live in `crates/server/migrations/` and are embedded at
//! compile time. The server never runs them on startup.

use thiserror::Error;

use super::{MissingEnvVar, require_env};

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    MissingEnvVar(#[from] MissingEnvVar),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run all pending migrations.
pub async fn run() -> Result<(), MigrationError> {
    let database_url = require_env("DATABASE_URL")?;

    tracing::info!("Connecting to database...");
    let pool = sqlx::PgPool::connect(&database_url).await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
