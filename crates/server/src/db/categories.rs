//! Product category repository.

use serde::Serialize;
use sqlx::PgPool;

use sellor_core::{CategoryId, ProductCategory};

use super::RepositoryError;

/// A category row as exposed to vendors.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
}

/// Repository for product category operations.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert the built-in categories, leaving existing rows alone.
    ///
    /// Returns the number of rows inserted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if an insert fails.
    pub async fn seed_defaults(&self) -> Result<u64, RepositoryError> {
        let mut inserted = 0;
        for category in ProductCategory::ALL {
            let result = sqlx::query(
                r"
                INSERT INTO sellor.product_category (name, description)
                VALUES ($1, $2)
                ON CONFLICT (name) DO NOTHING
                ",
            )
            .bind(category.name())
            .bind(category.description())
            .execute(self.pool)
            .await?;
            inserted += result.rows_affected();
        }
        Ok(inserted)
    }

    /// List active categories by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, Category>(
            r"
            SELECT id, name, description
            FROM sellor.product_category
            WHERE is_active
            ORDER BY name
            ",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Look up an active category id by its display name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_id_by_name(&self, name: &str) -> Result<Option<CategoryId>, RepositoryError> {
        let id = sqlx::query_scalar::<_, CategoryId>(
            "SELECT id FROM sellor.product_category WHERE lower(name) = lower($1) AND is_active",
        )
        .bind(name)
        .fetch_optional(self.pool)
        .await?;
        Ok(id)
    }
}
