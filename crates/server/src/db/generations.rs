//! History of AI listing generations.

use sqlx::PgPool;

use sellor_core::{GenerationId, VendorId};

use super::RepositoryError;

/// A generation to be recorded.
#[derive(Debug, Clone)]
pub struct NewGeneration<'g> {
    pub vendor_id: VendorId,
    pub image_url: &'g str,
    pub raw_response: &'g str,
    pub title: &'g str,
    pub description: &'g str,
    pub tags: &'g [String],
    pub category: &'g str,
}

/// Repository for `ai_product_generation` rows.
pub struct GenerationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> GenerationRepository<'a> {
    /// Create a new generation repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a generation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn record(&self, generation: &NewGeneration<'_>) -> Result<GenerationId, RepositoryError> {
        let id = sqlx::query_scalar::<_, GenerationId>(
            r"
            INSERT INTO sellor.ai_product_generation (
                vendor_id, image_url, raw_response, generated_title,
                generated_description, generated_tags, generated_category
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            ",
        )
        .bind(generation.vendor_id)
        .bind(generation.image_url)
        .bind(generation.raw_response)
        .bind(generation.title)
        .bind(generation.description)
        .bind(generation.tags)
        .bind(generation.category)
        .fetch_one(self.pool)
        .await?;
        Ok(id)
    }

    /// Count generations a vendor has made since `since`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_since(
        &self,
        vendor_id: VendorId,
        since: chrono::DateTime<chrono::Utc>,
    ) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*) FROM sellor.ai_product_generation
            WHERE vendor_id = $1 AND created_at >= $2
            ",
        )
        .bind(vendor_id)
        .bind(since)
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }
}
