//! Integration tests for the catalog scraper against a local fake catalog.

mod common;

use std::collections::HashMap;

use axum::{extract::Query, routing::get, Json, Router};
use serde_json::{json, Value};
use uploader_core::kernel::TestDependencies;

use crate::common::TestHarness;

async fn catalog_page(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let page: u64 = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let products = match page {
        1 => json!([
            {"url": "https://machines.example/p/1", "manufacturer": "Mazak", "name": "QTN 200", "image": "https://machines.example/1.jpg", "new": 1},
            {"url": "https://machines.example/p/2", "manufacturer": "Haas", "name": "VF-2"}
        ]),
        2 => json!([
            {"url": "https://machines.example/p/2", "manufacturer": "Haas", "name": "VF-2"},
            {"url": "https://machines.example/p/3", "manufacturer": "Okuma Corp", "name": "LB3000"}
        ]),
        _ => json!([]),
    };
    Json(json!({
        "details": {"count": "4", "products_per_page": 2, "page": page},
        "products": products,
    }))
}

async fn maintenance_page() -> &'static str {
    "<html><body>Down for maintenance</body></html>"
}

/// Serve the fake catalog on an ephemeral port; returns its base URL.
async fn spawn_catalog() -> String {
    let app = Router::new()
        .route("/catalog", get(catalog_page))
        .route("/maintenance", get(maintenance_page));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn products_are_paged_and_deduplicated() {
    let base = spawn_catalog().await;
    let ctx = TestHarness::with_mocks(TestDependencies::new().catalog_endpoint(format!("{base}/catalog")));

    let response = ctx.client().get("/products?max_seconds=30&timeout=5").await;

    assert_eq!(response.status, 200);
    let body = response.json();
    assert_eq!(body["reported_count"], 4);
    assert_eq!(body["per_page"], 2);
    assert_eq!(body["expected_pages"], 2);
    assert_eq!(body["total"], 3);
    assert_eq!(body["unique_urls"], 3);
    assert_eq!(body["truncated"], false);

    let stats = body["page_stats"].as_array().unwrap();
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[1]["returned_count"], 2);
    assert_eq!(stats[1]["unique_added"], 1);

    let products = body["products"].as_array().unwrap();
    assert_eq!(products[0]["brand"], "Mazak");
    assert_eq!(products[0]["is_new"], true);
    assert_eq!(products[0]["hash"].as_str().unwrap().len(), 6);
    assert_eq!(products[2]["brand_slug"], "okuma-corp");
    assert_eq!(products[2]["image_url"], Value::Null);
}

#[tokio::test]
async fn zero_budget_truncates_after_first_page() {
    let base = spawn_catalog().await;
    let ctx = TestHarness::with_mocks(TestDependencies::new().catalog_endpoint(format!("{base}/catalog")));

    // Page 1 always loads; the budget is checked before each later page
    let body = ctx.client().get("/products?max_seconds=0").await.json();

    assert_eq!(body["truncated"], true);
    assert_eq!(body["page_stats"].as_array().unwrap().len(), 1);
    assert_eq!(body["total"], 2);
}

#[tokio::test]
async fn non_json_first_page_is_a_bad_gateway() {
    let base = spawn_catalog().await;
    let ctx = TestHarness::with_mocks(
        TestDependencies::new().catalog_endpoint(format!("{base}/maintenance")),
    );

    let response = ctx.client().get("/products").await;

    assert_eq!(response.status, 502);
    let body = response.json();
    assert_eq!(body["error"], "page1_not_json");
    assert_eq!(body["status"], 200);
    assert!(body["body_preview"].as_str().unwrap().contains("maintenance"));
    assert!(body["details"].as_str().is_some());
}

#[tokio::test]
async fn non_finite_timeout_falls_back_to_default() {
    let base = spawn_catalog().await;
    let ctx = TestHarness::with_mocks(TestDependencies::new().catalog_endpoint(format!("{base}/catalog")));

    let response = ctx.client().get("/products?timeout=inf").await;

    assert_eq!(response.status, 200);
    assert_eq!(response.json()["total"], 3);
}
