//! Database operations for the marketplace `PostgreSQL` schema.
//!
//! ## Tables (schema `sellor`)
//!
//! - `user` - Platform accounts (vendors, admins)
//! - `vendor` - Stores, Connect onboarding, and cached subscription state
//! - `store_settings` - Shipping and policy settings per store
//! - `product_category` / `product` - Catalog
//! - `ai_product_generation` - History of AI listing generations
//! - `order` / `order_item` - Checkout orders
//! - `stripe_event` - Processed webhook event ids
//!
//! Queries are built at runtime with `sqlx::query_as` and `FromRow` rows, then
//! mapped into [`crate::models`] types.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p sellor-cli -- migrate
//! ```

pub mod categories;
pub mod events;
pub mod generations;
pub mod orders;
pub mod products;
pub mod stats;
pub mod users;
pub mod vendors;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use categories::CategoryRepository;
pub use events::StripeEventRepository;
pub use generations::GenerationRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use stats::StatsRepository;
pub use users::UserRepository;
pub use vendors::VendorRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique violation to [`RepositoryError::Conflict`].
pub(crate) fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
