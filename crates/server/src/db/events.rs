//! Ledger of processed Stripe webhook events.
//!
//! Stripe delivers events at least once. Recording each event id after it
//! has been applied lets redeliveries short-circuit.

use sqlx::PgPool;

use super::RepositoryError;

/// Repository for the `stripe_event` ledger.
pub struct StripeEventRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StripeEventRepository<'a> {
    /// Create a new event repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Whether an event id has already been applied.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn is_processed(&self, event_id: &str) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM sellor.stripe_event WHERE id = $1)")
                .bind(event_id)
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }

    /// Mark an event as applied. Recording the same id twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn record(&self, event_id: &str, event_type: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO sellor.stripe_event (id, event_type)
            VALUES ($1, $2)
            ON CONFLICT (id) DO NOTHING
            ",
        )
        .bind(event_id)
        .bind(event_type)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}
