//! Subcommand implementations.

pub mod admin;
pub mod migrate;
pub mod seed;
pub mod stripe;

use sqlx::PgPool;

/// Error raised when a required environment variable is absent.
#[derive(Debug, thiserror::Error)]
#[error("Missing environment variable: {0}")]
pub struct MissingEnvVar(pub &'static str);

/// Read a required environment variable, loading `.env` first.
pub fn require_env(name: &'static str) -> Result<String, MissingEnvVar> {
    dotenvy::dotenv().ok();
    std::env::var(name).map_err(|_| MissingEnvVar(name))
}

/// Connect to the platform database named by `DATABASE_URL`.
pub async fn connect() -> Result<PgPool, Box<dyn std::error::Error>> {
    let database_url = require_env("DATABASE_URL")?;

    tracing::info!("Connecting to database...");
    Ok(PgPool::connect(&database_url).await?)
}
