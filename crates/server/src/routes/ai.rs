//! AI listing generation handler.

use axum::{Json, extract::State};
use serde::Deserialize;

use crate::error::Result;
use crate::middleware::RequireVendor;
use crate::services::listing::{self, GeneratedListing};
use crate::state::AppState;

/// Request body for `POST /api/ai/generate`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub image_url: String,
}

/// `POST /api/ai/generate`
///
/// Describes a product photo and suggests a title, description, tags, and
/// category.
pub async fn generate(
    State(state): State<AppState>,
    vendor: RequireVendor,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GeneratedListing>> {
    let config = state.config();
    let generated = listing::generate_listing(
        state.pool(),
        state.openai(),
        &config.openai,
        vendor.vendor_id,
        &request.image_url,
    )
    .await?;

    Ok(Json(generated))
}
