//! Storefront checkout handler.

use axum::{
    Json,
    extract::{Path, State},
};

use sellor_core::VendorId;

use crate::error::Result;
use crate::services::billing::{self, PaymentIntentCreated, PaymentIntentRequest};
use crate::state::AppState;

/// `POST /api/store/{store_id}/create-payment-intent`
///
/// Prices the cart, creates a destination charge on the vendor's connected
/// account with the platform fee, and records a pending order.
pub async fn create_payment_intent(
    State(state): State<AppState>,
    Path(store_id): Path<VendorId>,
    Json(request): Json<PaymentIntentRequest>,
) -> Result<Json<PaymentIntentCreated>> {
    let created = billing::create_payment_intent(
        state.pool(),
        state.stripe(),
        &state.config().billing,
        store_id,
        &request,
    )
    .await?;

    Ok(Json(created))
}
