//! Product listing models.

use chrono::{DateTime, Utc};
use serde::Serialize;

use sellor_core::{CategoryId, ProductId, VendorId};

/// A product listed in a vendor's store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub vendor_id: VendorId,
    pub title: String,
    pub description: String,
    pub price_cents: i64,
    pub image_url: Option<String>,
    pub sku: Option<String>,
    pub inventory_quantity: Option<i32>,
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Validated input for creating a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub title: String,
    pub description: String,
    pub price_cents: i64,
    pub image_url: Option<String>,
    pub sku: Option<String>,
    pub inventory_quantity: Option<i32>,
    pub tags: Vec<String>,
    pub category_id: Option<CategoryId>,
}
