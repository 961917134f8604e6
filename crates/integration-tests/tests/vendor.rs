//! Vendor tools: dashboard, settings, products, and access control.

use reqwest::StatusCode;
use serde_json::{Value, json};
use sellor_integration_tests::{base_url, register_vendor, session_client};

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_vendor_routes_require_session() {
    let resp = session_client()
        .get(format!("{}/api/vendor/dashboard-stats", base_url()))
        .send()
        .await
        .expect("Failed to call dashboard-stats");

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_new_vendor_dashboard_is_empty() {
    let client = session_client();
    let registered = register_vendor(&client).await;

    let stats: Value = client
        .get(format!("{}/api/vendor/dashboard-stats", base_url()))
        .send()
        .await
        .expect("Failed to call dashboard-stats")
        .json()
        .await
        .expect("Failed to parse dashboard-stats");

    assert_eq!(stats["totalOrders"], 0);
    assert_eq!(stats["totalSales"].as_f64(), Some(0.0));

    let subdomain = registered["subdomain"].as_str().unwrap_or_default();
    assert!(
        stats["storeUrl"]
            .as_str()
            .is_some_and(|url| url.starts_with(subdomain))
    );
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_vendor_cannot_use_admin_panel() {
    let client = session_client();
    register_vendor(&client).await;

    let resp = client
        .get(format!("{}/api/admin/vendors", base_url()))
        .send()
        .await
        .expect("Failed to call admin vendors");

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_settings_reject_invalid_color() {
    let client = session_client();
    register_vendor(&client).await;

    let resp = client
        .put(format!("{}/api/vendor/settings", base_url()))
        .json(&json!({"storeName": "Renamed Store", "accentColor": "purple"}))
        .send()
        .await
        .expect("Failed to update settings");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running server and seeded categories"]
async fn test_create_list_and_delete_product() {
    let client = session_client();
    register_vendor(&client).await;
    let base_url = base_url();

    let resp = client
        .post(format!("{base_url}/api/vendor/products"))
        .json(&json!({
            "title": "Hand-thrown Mug",
            "description": "Stoneware, 350 ml.",
            "price": 24.5,
            "inventoryQuantity": 3,
            "tags": ["mug", "ceramics"],
            "category": "Home & Decor",
        }))
        .send()
        .await
        .expect("Failed to create product");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let product: Value = resp.json().await.expect("Failed to parse product");
    let id = product["id"].as_i64().expect("product id");

    let products: Vec<Value> = client
        .get(format!("{base_url}/api/vendor/products"))
        .send()
        .await
        .expect("Failed to list products")
        .json()
        .await
        .expect("Failed to parse products");
    assert!(products.iter().any(|p| p["id"].as_i64() == Some(id)));

    let resp = client
        .delete(format!("{base_url}/api/vendor/products/{id}"))
        .send()
        .await
        .expect("Failed to delete product");
    assert!(resp.status().is_success());

    let resp = client
        .get(format!("{base_url}/api/vendor/products/{id}"))
        .send()
        .await
        .expect("Failed to fetch deleted product");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_ai_generate_requires_image_url() {
    let client = session_client();
    register_vendor(&client).await;

    let resp = client
        .post(format!("{}/api/ai/generate", base_url()))
        .json(&json!({}))
        .send()
        .await
        .expect("Failed to call ai/generate");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
