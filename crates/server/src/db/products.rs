//! Product repository for catalog operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use sellor_core::{ProductId, VendorId};

use super::RepositoryError;
use crate::models::{NewProduct, Product};

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    vendor_id: VendorId,
    title: String,
    description: String,
    price_cents: i64,
    image_url: Option<String>,
    sku: Option<String>,
    inventory_quantity: Option<i32>,
    tags: Vec<String>,
    category: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Self {
            id: r.id,
            vendor_id: r.vendor_id,
            title: r.title,
            description: r.description,
            price_cents: r.price_cents,
            image_url: r.image_url,
            sku: r.sku,
            inventory_quantity: r.inventory_quantity,
            tags: r.tags,
            category: r.category,
            created_at: r.created_at,
        }
    }
}

const PRODUCT_SELECT: &str = r"
    SELECT p.id, p.vendor_id, p.title, p.description, p.price_cents, p.image_url,
           p.sku, p.inventory_quantity, p.tags, c.name AS category, p.created_at
    FROM sellor.product p
    LEFT JOIN sellor.product_category c ON c.id = p.category_id
";

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a product into a vendor's catalog.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        vendor_id: VendorId,
        product: &NewProduct,
    ) -> Result<Product, RepositoryError> {
        let id: ProductId = sqlx::query_scalar(
            r"
            INSERT INTO sellor.product (
                vendor_id, title, description, price_cents, image_url, sku,
                inventory_quantity, tags, category_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            ",
        )
        .bind(vendor_id)
        .bind(&product.title)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.image_url.as_deref())
        .bind(product.sku.as_deref())
        .bind(product.inventory_quantity)
        .bind(&product.tags)
        .bind(product.category_id)
        .fetch_one(self.pool)
        .await?;

        self.get_for_vendor(vendor_id, id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// List a vendor's products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_vendor(&self, vendor_id: VendorId) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "{PRODUCT_SELECT} WHERE p.vendor_id = $1 ORDER BY p.created_at DESC"
        ))
        .bind(vendor_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Get one product, scoped to the vendor that owns it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_vendor(
        &self,
        vendor_id: VendorId,
        id: ProductId,
    ) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "{PRODUCT_SELECT} WHERE p.vendor_id = $1 AND p.id = $2"
        ))
        .bind(vendor_id)
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Fetch several of a vendor's products at once, for pricing a cart.
    ///
    /// Ids that do not belong to the vendor are silently absent from the result.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many_for_vendor(
        &self,
        vendor_id: VendorId,
        ids: &[ProductId],
    ) -> Result<Vec<Product>, RepositoryError> {
        let raw: Vec<i32> = ids.iter().map(|id| id.as_i32()).collect();
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "{PRODUCT_SELECT} WHERE p.vendor_id = $1 AND p.id = ANY($2)"
        ))
        .bind(vendor_id)
        .bind(&raw)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Delete a vendor's product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist for this vendor.
    pub async fn delete_for_vendor(
        &self,
        vendor_id: VendorId,
        id: ProductId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM sellor.product WHERE vendor_id = $1 AND id = $2")
            .bind(vendor_id)
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
