//! Vendor signup, login, and session lifecycle.

use reqwest::StatusCode;
use serde_json::{Value, json};
use sellor_integration_tests::{base_url, register_vendor, session_client, unique_signup};

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_register_logs_in_and_me_returns_vendor() {
    let client = session_client();
    let registered = register_vendor(&client).await;
    assert!(registered["subdomain"].as_str().is_some());

    let me: Value = client
        .get(format!("{}/api/auth/me", base_url()))
        .send()
        .await
        .expect("Failed to call /api/auth/me")
        .json()
        .await
        .expect("Failed to parse /api/auth/me");

    assert_eq!(me["role"], "vendor");
    assert_eq!(me["email"], registered["email"]);
    assert!(me["storeId"].as_i64().is_some());
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_duplicate_email_is_rejected() {
    let signup = unique_signup();
    let client = session_client();

    let first = client
        .post(format!("{}/api/register", base_url()))
        .json(&signup)
        .send()
        .await
        .expect("Failed to register");
    assert!(first.status().is_success());

    let second = session_client()
        .post(format!("{}/api/register", base_url()))
        .json(&signup)
        .send()
        .await
        .expect("Failed to register again");
    assert!(second.status().is_client_error());

    let body: Value = second.json().await.expect("Failed to parse error");
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_wrong_password_is_unauthorized() {
    let signup = unique_signup();
    let client = session_client();
    client
        .post(format!("{}/api/register", base_url()))
        .json(&signup)
        .send()
        .await
        .expect("Failed to register");

    let resp = session_client()
        .post(format!("{}/api/auth/login", base_url()))
        .json(&json!({"email": signup["email"], "password": "not-the-password"}))
        .send()
        .await
        .expect("Failed to log in");

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_logout_ends_session() {
    let client = session_client();
    register_vendor(&client).await;

    let resp = client
        .post(format!("{}/api/auth/logout", base_url()))
        .send()
        .await
        .expect("Failed to log out");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(format!("{}/api/auth/me", base_url()))
        .send()
        .await
        .expect("Failed to call /api/auth/me");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
