//! Stripe webhook endpoint.
//!
//! The raw body is verified against `Stripe-Signature` when a signing secret
//! is configured, parsed as an event, and reconciled once per event id.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use chrono::Utc;
use secrecy::ExposeSecret;
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use crate::error::{AppError, Result};
use crate::services::billing::{self, WebhookOutcome};
use crate::state::AppState;
use crate::stripe::{Event, webhook};

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Verify the signature (if a secret is configured) and parse the event.
///
/// # Errors
///
/// Returns `AppError::Webhook` for a missing or invalid signature or an
/// unparsable payload.
pub fn verified_event(
    headers: &HeaderMap,
    body: &[u8],
    secret: Option<&str>,
    now: i64,
) -> Result<Event> {
    if let Some(secret) = secret {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Webhook("Missing Stripe-Signature header".to_owned()))?;
        webhook::verify_signature(body, signature, secret, now)
            .map_err(|e| AppError::Webhook(e.to_string()))?;
    } else {
        warn!("STRIPE_WEBHOOK_SECRET not set, accepting unverified webhook");
    }

    serde_json::from_slice(body).map_err(|e| AppError::Webhook(format!("invalid payload: {e}")))
}

/// `POST /api/webhooks/stripe`
#[instrument(skip_all)]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let config = state.config();
    let secret = config
        .stripe
        .webhook_secret
        .as_ref()
        .map(ExposeSecret::expose_secret);

    let event = verified_event(&headers, &body, secret, Utc::now().timestamp())?;

    let outcome = billing::process_event(
        state.pool(),
        state.stripe(),
        state.email(),
        config.billing.currency,
        &event,
    )
    .await
    .map_err(AppError::WebhookHandler)?;

    match outcome {
        WebhookOutcome::Applied => {
            info!(event_id = %event.id, event_type = %event.event_type, "Webhook applied");
        }
        WebhookOutcome::Duplicate | WebhookOutcome::Ignored => {}
    }

    Ok(Json(json!({ "received": true })))
}
