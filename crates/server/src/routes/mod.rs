//! HTTP route handlers for the JSON API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                   - Liveness check
//! GET  /health/ready                             - Readiness check (database)
//!
//! # Sessions (auth rate limit)
//! POST /api/auth/login                           - Password login
//! POST /api/register                             - Vendor signup
//! POST /api/auth/logout                          - Logout
//! GET  /api/auth/me                              - Current session identity
//!
//! # Storefront (public, API rate limit)
//! GET  /api/storefront                           - Store profile and settings
//! GET  /api/storefront/products                  - Catalog
//! GET  /api/storefront/products/{id}             - Product detail
//! POST /api/store/{store_id}/create-payment-intent - Checkout
//!
//! # Vendor tools (vendor session)
//! POST /api/ai/generate                          - AI listing from an image
//! POST /api/upload-image                         - Product image upload
//! ...  /api/vendor/*                             - See [`vendor`]
//!
//! # Admin (admin session)
//! ...  /api/admin/*                              - See [`admin`]
//!
//! # Stripe
//! POST /api/webhooks/stripe                      - Webhook receiver
//! ```

pub mod admin;
pub mod ai;
pub mod auth;
pub mod checkout;
pub mod storefront;
pub mod uploads;
pub mod vendor;
pub mod webhooks;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Login and signup, limited per client IP.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/register", post(auth::register))
        .layer(auth_rate_limiter())
}

/// Public storefront and checkout API, limited per client IP.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/api/storefront", get(storefront::show))
        .route("/api/storefront/products", get(storefront::products))
        .route("/api/storefront/products/{id}", get(storefront::product))
        .route(
            "/api/store/{store_id}/create-payment-intent",
            post(checkout::create_payment_intent),
        )
        .layer(api_rate_limiter())
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .merge(public_routes())
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/ai/generate", post(ai::generate))
        .route(
            "/api/upload-image",
            post(uploads::upload_image).layer(DefaultBodyLimit::max(uploads::UPLOAD_BODY_LIMIT)),
        )
        .route("/api/webhooks/stripe", post(webhooks::stripe_webhook))
        .nest("/api/vendor", vendor::routes())
        .nest("/api/admin", admin::routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn test_health_returns_ok() {
        let app: Router = Router::new().route("/health", get(health));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 64).await.unwrap();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_vendor_route_without_session_is_unauthorized() {
        use crate::middleware::RequireVendor;

        async fn guarded(_vendor: RequireVendor) -> &'static str {
            "secret"
        }

        let app: Router = Router::new().route("/api/vendor/ping", get(guarded));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/vendor/ping")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
