//! Integration tests for Sellor.
//!
//! The tests talk to a running server over HTTP and are `#[ignore]`d by
//! default.
//!
//! # Running Tests
//!
//! ```bash
//! cargo run -p sellor-cli -- migrate
//! cargo run -p sellor-cli -- seed categories
//! cargo run -p sellor-server &
//! cargo test -p sellor-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `SELLOR_BASE_URL` - Server URL (default: `http://localhost:3000`)
//! - `SELLOR_STORE_HOST` - Host header of an existing active store, for
//!   storefront tests (e.g. `demo.sellor.ai`)
//! - `SELLOR_ADMIN_EMAIL` / `SELLOR_ADMIN_PASSWORD` - An admin created with
//!   `sellor-cli admin create`, for tests that read state back through the
//!   admin API
//!
//! Webhook replay tests post unsigned events, so the server must run without
//! `STRIPE_WEBHOOK_SECRET`.

use reqwest::Client;
use serde_json::{Value, json};
use uuid::Uuid;

/// Base URL for the API (configurable via environment).
#[must_use]
pub fn base_url() -> String {
    std::env::var("SELLOR_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned())
}

/// Host header of a known store, if one is configured.
#[must_use]
pub fn store_host() -> Option<String> {
    std::env::var("SELLOR_STORE_HOST").ok()
}

/// An HTTP client that keeps the session cookie between requests.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
pub fn session_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// Unique signup data for one test run.
#[must_use]
pub fn unique_signup() -> Value {
    let short = unique_tag();
    json!({
        "email": format!("vendor-{short}@example.com"),
        "password": "integration-password",
        "storeName": format!("Test Store {short}"),
    })
}

/// Register a fresh vendor on `client`, leaving it logged in.
///
/// Returns the registration response body.
///
/// # Panics
///
/// Panics if the request fails or the server rejects the signup.
pub async fn register_vendor(client: &Client) -> Value {
    let resp = client
        .post(format!("{}/api/register", base_url()))
        .json(&unique_signup())
        .send()
        .await
        .expect("Failed to register vendor");

    assert!(
        resp.status().is_success(),
        "Registration failed: {}",
        resp.status()
    );
    resp.json().await.expect("Failed to parse registration")
}

/// A short random tag for ids that must not collide across runs.
#[must_use]
pub fn unique_tag() -> String {
    let tag = Uuid::new_v4().simple().to_string();
    tag.get(..12).unwrap_or(&tag).to_owned()
}

/// The logged-in vendor's store id.
///
/// # Panics
///
/// Panics if `/api/auth/me` fails or has no store.
pub async fn current_store_id(client: &Client) -> i64 {
    let me: Value = client
        .get(format!("{}/api/auth/me", base_url()))
        .send()
        .await
        .expect("Failed to call /api/auth/me")
        .json()
        .await
        .expect("Failed to parse /api/auth/me");
    me["storeId"].as_i64().expect("Session has no store")
}

/// A client logged in as the configured admin, or `None` when no admin
/// credentials are set.
///
/// # Panics
///
/// Panics if credentials are set but login fails.
pub async fn admin_client() -> Option<Client> {
    let email = std::env::var("SELLOR_ADMIN_EMAIL").ok()?;
    let password = std::env::var("SELLOR_ADMIN_PASSWORD").ok()?;

    let client = session_client();
    let resp = client
        .post(format!("{}/api/auth/login", base_url()))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to log in as admin");
    assert!(
        resp.status().is_success(),
        "Admin login failed: {}",
        resp.status()
    );
    Some(client)
}

/// Post an unsigned Stripe event and return the response status and body.
///
/// # Panics
///
/// Panics if the request fails or the body is not JSON.
pub async fn post_event(event: &Value) -> (reqwest::StatusCode, Value) {
    let resp = session_client()
        .post(format!("{}/api/webhooks/stripe", base_url()))
        .json(event)
        .send()
        .await
        .expect("Failed to post webhook");
    let status = resp.status();
    let body = resp.json().await.expect("Failed to parse webhook response");
    (status, body)
}
