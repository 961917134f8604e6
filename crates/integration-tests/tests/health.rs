//! Liveness and readiness checks.

use reqwest::StatusCode;
use sellor_integration_tests::{base_url, session_client};

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_health() {
    let resp = session_client()
        .get(format!("{}/health", base_url()))
        .send()
        .await
        .expect("Failed to call /health");

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.expect("Failed to read body"), "ok");
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_readiness_with_database() {
    let resp = session_client()
        .get(format!("{}/health/ready", base_url()))
        .send()
        .await
        .expect("Failed to call /health/ready");

    assert_eq!(resp.status(), StatusCode::OK);
}
