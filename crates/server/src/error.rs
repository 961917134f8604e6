//! Unified error handling with Sentry integration.
//!
//! Every route handler returns `Result<T, AppError>`. Errors render as JSON
//! `{"error": "..."}`; Stripe request errors also carry `"type"`. Server-side
//! failures are captured to Sentry before responding, and their details are
//! not exposed to clients.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::billing::BillingError;
use crate::services::email::EmailError;
use crate::services::listing::ListingError;
use crate::services::registration::RegistrationError;
use crate::services::uploads::UploadError;
use crate::services::auth::AuthError;
use crate::stripe::StripeError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Billing error: {0}")]
    Billing(#[from] BillingError),

    #[error("Stripe error: {0}")]
    Stripe(#[from] StripeError),

    #[error("Listing error: {0}")]
    Listing(#[from] ListingError),

    #[error("Registration error: {0}")]
    Registration(#[from] RegistrationError),

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("Email error: {0}")]
    Email(#[from] EmailError),

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// A webhook delivery that could not be verified or parsed.
    #[error("Webhook Error: {0}")]
    Webhook(String),

    /// A verified webhook whose processing failed. Stripe will retry.
    ///
    /// The full cause is logged. The response only names its category.
    #[error("Webhook handler failed: {0}")]
    WebhookHandler(#[source] BillingError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

const INTERNAL: &str = "Internal server error";

fn repository_parts(err: &RepositoryError) -> (StatusCode, String) {
    match err {
        RepositoryError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_owned()),
        RepositoryError::Conflict(what) => (StatusCode::CONFLICT, capitalize(what)),
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_owned())
        }
    }
}

fn auth_parts(err: &AuthError) -> (StatusCode, String) {
    match err {
        AuthError::InvalidCredentials => {
            (StatusCode::UNAUTHORIZED, "Invalid credentials".to_owned())
        }
        AuthError::UserAlreadyExists => (
            StatusCode::CONFLICT,
            "An account with this email already exists".to_owned(),
        ),
        AuthError::WeakPassword(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        AuthError::InvalidEmail(_) => (StatusCode::BAD_REQUEST, "Invalid email address".to_owned()),
        AuthError::Repository(e) => repository_parts(e),
        AuthError::PasswordHash => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_owned()),
    }
}

fn stripe_parts(err: &StripeError) -> (StatusCode, String) {
    match err {
        StripeError::Api { message, .. } if err.is_client_error() => {
            (StatusCode::BAD_REQUEST, message.clone())
        }
        StripeError::Config(_) | StripeError::Unauthorized(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_owned())
        }
        _ => (StatusCode::BAD_GATEWAY, "Payment provider error".to_owned()),
    }
}

fn billing_parts(err: &BillingError) -> (StatusCode, String) {
    match err {
        BillingError::StoreNotConfigured => (StatusCode::NOT_FOUND, err.to_string()),
        BillingError::EmptyCart
        | BillingError::MissingCustomerEmail
        | BillingError::InvalidCustomerEmail(_)
        | BillingError::InvalidItem(_)
        | BillingError::NonPositiveTotal
        | BillingError::BelowMinimum { .. }
        | BillingError::Fee(_)
        | BillingError::NoSubscription
        | BillingError::NoCustomer
        | BillingError::Payload { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
        BillingError::PlanNotConfigured => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
        BillingError::Stripe(e) => stripe_parts(e),
        BillingError::Repository(e) => repository_parts(e),
    }
}

fn listing_parts(err: &ListingError) -> (StatusCode, String) {
    match err {
        ListingError::MissingImageUrl => (StatusCode::BAD_REQUEST, err.to_string()),
        ListingError::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, err.to_string()),
        ListingError::EmptyReply | ListingError::Unparsable => {
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
        ListingError::OpenAi(_) => (StatusCode::BAD_GATEWAY, "AI service error".to_owned()),
        ListingError::Repository(e) => repository_parts(e),
    }
}

fn registration_parts(err: &RegistrationError) -> (StatusCode, String) {
    match err {
        RegistrationError::Auth(e) => auth_parts(e),
        RegistrationError::Repository(e) => repository_parts(e),
        _ => (StatusCode::BAD_REQUEST, err.to_string()),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

impl AppError {
    /// Status code and client-facing message.
    fn parts(&self) -> (StatusCode, String) {
        match self {
            Self::Database(e) => repository_parts(e),
            Self::Auth(e) => auth_parts(e),
            Self::Billing(e) => billing_parts(e),
            Self::Stripe(e) => stripe_parts(e),
            Self::Listing(e) => listing_parts(e),
            Self::Registration(e) => registration_parts(e),
            Self::Upload(e) if e.is_client_error() => (StatusCode::BAD_REQUEST, e.to_string()),
            Self::Upload(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            Self::Email(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to send email".to_owned(),
            ),
            Self::Session(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_owned())
            }
            Self::Webhook(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            Self::WebhookHandler(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Webhook handler failed: {}", webhook_failure_kind(e)),
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        }
    }

    /// The Stripe error type to report alongside a 400, if any.
    fn stripe_error_type(&self) -> Option<&str> {
        let stripe = match self {
            Self::Stripe(e) | Self::Billing(BillingError::Stripe(e)) => e,
            _ => return None,
        };
        stripe
            .is_client_error()
            .then(|| stripe.error_type())
            .flatten()
    }
}

fn webhook_failure_kind(err: &BillingError) -> &'static str {
    match err {
        BillingError::Stripe(_) => "payment provider error",
        BillingError::Repository(_) => "storage error",
        BillingError::Payload { .. } => "malformed event object",
        _ => "processing error",
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.parts();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let body = match self.stripe_error_type() {
            Some(error_type) => json!({ "error": message, "type": error_type }),
            None => json!({ "error": message }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context after login.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context on logout.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_bad_request_is_json() {
        let (status, body) = render(AppError::BadRequest("Image URL is required".to_owned())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Image URL is required" }));
    }

    #[tokio::test]
    async fn test_store_not_configured_is_404() {
        let (status, body) = render(BillingError::StoreNotConfigured.into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Vendor Stripe account not configured.");
    }

    #[tokio::test]
    async fn test_stripe_card_error_carries_type() {
        let err = BillingError::Stripe(StripeError::Api {
            status: 402,
            error_type: "card_error".to_owned(),
            code: Some("card_declined".to_owned()),
            message: "Your card was declined.".to_owned(),
        });
        let (status, body) = render(err.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({ "error": "Your card was declined.", "type": "card_error" })
        );
    }

    #[tokio::test]
    async fn test_stripe_server_error_is_bad_gateway() {
        let err = StripeError::Api {
            status: 500,
            error_type: "api_error".to_owned(),
            code: None,
            message: "boom".to_owned(),
        };
        let (status, body) = render(err.into()).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body, json!({ "error": "Payment provider error" }));
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let (status, body) = render(AppError::Internal("pool exhausted".to_owned())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], INTERNAL);
    }

    #[tokio::test]
    async fn test_webhook_handler_body_names_only_the_category() {
        let (status, body) = render(AppError::Webhook("bad signature".to_owned())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Webhook Error: bad signature");

        let handler_failure =
            BillingError::Repository(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        let (status, body) = render(AppError::WebhookHandler(handler_failure)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Webhook handler failed: storage error");

        let malformed = BillingError::Payload {
            event_type: "invoice.paid".to_owned(),
            message: "missing field `id`".to_owned(),
        };
        let err = AppError::WebhookHandler(malformed);
        assert!(err.to_string().contains("missing field `id`"));
        let (_, body) = render(err).await;
        assert_eq!(body["error"], "Webhook handler failed: malformed event object");
    }

    #[tokio::test]
    async fn test_listing_errors() {
        let (status, _) = render(ListingError::RateLimited(50).into()).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

        let (status, body) = render(ListingError::Unparsable.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to parse AI response");
    }

    #[tokio::test]
    async fn test_registration_conflict_message() {
        let (status, body) = render(RegistrationError::SubdomainTaken.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Subdomain already exists");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("email already exists"), "Email already exists");
        assert_eq!(capitalize(""), "");
    }
}
