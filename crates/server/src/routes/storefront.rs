//! Public storefront API.
//!
//! The store is taken from the request host (see
//! [`crate::middleware::tenant`]). Only active stores are served.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;

use sellor_core::{ProductId, StoreSlug, VendorId};

use crate::db::{ProductRepository, RepositoryError, VendorRepository};
use crate::error::{AppError, Result};
use crate::middleware::CurrentStore;
use crate::models::{Product, StoreSettings, Vendor};
use crate::state::AppState;

/// The parts of a store shown to shoppers.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicStore {
    pub id: VendorId,
    pub store_name: String,
    pub subdomain: StoreSlug,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub accent_color: Option<String>,
    pub contact_email: Option<String>,
    /// Whether the store can take payments yet.
    pub accepts_payments: bool,
}

impl From<Vendor> for PublicStore {
    fn from(v: Vendor) -> Self {
        Self {
            id: v.id,
            accepts_payments: v.connect.account_id.is_some() && v.connect.charges_enabled,
            store_name: v.store_name,
            subdomain: v.slug,
            description: v.description,
            logo_url: v.logo_url,
            accent_color: v.accent_color,
            contact_email: v.contact_email,
        }
    }
}

/// Response for `GET /api/storefront`.
#[derive(Debug, Serialize)]
pub struct StorefrontView {
    pub store: PublicStore,
    pub settings: StoreSettings,
}

/// `GET /api/storefront`
pub async fn show(
    State(state): State<AppState>,
    CurrentStore(store): CurrentStore,
) -> Result<Json<StorefrontView>> {
    let settings = match VendorRepository::new(state.pool()).get_settings(store.id).await {
        Ok(settings) => settings,
        Err(RepositoryError::NotFound) => StoreSettings::default(),
        Err(e) => return Err(e.into()),
    };

    Ok(Json(StorefrontView {
        store: PublicStore::from(store),
        settings,
    }))
}

/// `GET /api/storefront/products`
pub async fn products(
    State(state): State<AppState>,
    CurrentStore(store): CurrentStore,
) -> Result<Json<Vec<Product>>> {
    let products = ProductRepository::new(state.pool())
        .list_for_vendor(store.id)
        .await?;
    Ok(Json(products))
}

/// `GET /api/storefront/products/{id}`
pub async fn product(
    State(state): State<AppState>,
    CurrentStore(store): CurrentStore,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    ProductRepository::new(state.pool())
        .get_for_vendor(store.id, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Product not found".to_owned()))
}
