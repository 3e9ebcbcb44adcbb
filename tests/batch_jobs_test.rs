//! Integration tests for the batch maintenance jobs.
//!
//! Tests cover:
//! - The reorder-point refresh: velocity measurement, preferred-supplier
//!   lead times, the no-op second run
//! - Automatic request generation from urgent and high suggestions

mod common;

use axum::{
    body,
    http::{Method, StatusCode},
    response::Response,
};
use common::TestApp;
use restock_api::entities::{inventory_record, sales_order::SalesOrderStatus};
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::Value;
use uuid::Uuid;

async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

async fn stored_reorder_point(app: &TestApp, product_id: Uuid) -> i32 {
    inventory_record::Entity::find()
        .filter(inventory_record::Column::ProductId.eq(product_id))
        .one(&*app.state.db)
        .await
        .expect("query inventory record")
        .expect("inventory record exists")
        .reorder_point
}

// ==================== Reorder Point Refresh ====================

#[tokio::test]
async fn refresh_recomputes_from_velocity_and_preferred_lead_time() {
    let app = TestApp::new().await;

    let product = app.seed_product("CEM-100", dec!(80.00), None).await;
    app.seed_inventory(product.id, 100, 10, Some(300), 10).await;
    // 60 units over the 30-day window: 2 per day.
    app.seed_sale(product.id, 35, 8, SalesOrderStatus::Delivered)
        .await;
    app.seed_sale(product.id, 25, 18, SalesOrderStatus::Shipped)
        .await;

    let supplier = app.seed_supplier("Cement Direct").await;
    app.seed_offer(supplier.id, product.id, dec!(70.00), 10, 1, 4.0, true)
        .await;

    let response = app
        .request(Method::POST, "/api/v1/batch/reorder-points", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let summary = response_json(response).await["data"].clone();
    assert_eq!(summary["processed"], 1);
    assert_eq!(summary["updated"], 1);

    // 2/day over a 10-day lead time plus 20% safety stock.
    assert_eq!(stored_reorder_point(&app, product.id).await, 24);

    // Nothing changed since, so the second run rewrites nothing.
    let response = app
        .request(Method::POST, "/api/v1/batch/reorder-points", None)
        .await;
    let summary = response_json(response).await["data"].clone();
    assert_eq!(summary["processed"], 1);
    assert_eq!(summary["updated"], 0);
}

#[tokio::test]
async fn refresh_assumes_one_week_lead_time_without_preferred_supplier() {
    let app = TestApp::new().await;

    let product = app.seed_product("STL-045", dec!(25.00), None).await;
    app.seed_inventory(product.id, 100, 10, Some(300), 10).await;
    app.seed_sale(product.id, 60, 15, SalesOrderStatus::Delivered)
        .await;

    // An offer exists but is not preferred, so its lead time is ignored.
    let supplier = app.seed_supplier("Steel Direct").await;
    app.seed_offer(supplier.id, product.id, dec!(20.00), 30, 1, 4.0, false)
        .await;

    let response = app
        .request(Method::POST, "/api/v1/batch/reorder-points", None)
        .await;
    let summary = response_json(response).await["data"].clone();
    assert_eq!(summary["updated"], 1);

    // 2/day over the default 7 days is 14, plus 20% is 16.8, rounded up.
    assert_eq!(stored_reorder_point(&app, product.id).await, 17);
}

#[tokio::test]
async fn refresh_skips_inactive_and_untracked_products() {
    let app = TestApp::new().await;

    let inactive = app
        .seed_product_with_activity("OLD-001", dec!(5.00), None, false)
        .await;
    app.seed_inventory(inactive.id, 10, 5, Some(50), 10).await;
    app.seed_sale(inactive.id, 30, 5, SalesOrderStatus::Delivered)
        .await;

    // Active, sales, but no inventory record to update.
    let untracked = app.seed_product("NEW-001", dec!(5.00), None).await;
    app.seed_sale(untracked.id, 30, 5, SalesOrderStatus::Delivered)
        .await;

    let response = app
        .request(Method::POST, "/api/v1/batch/reorder-points", None)
        .await;
    let summary = response_json(response).await["data"].clone();
    assert_eq!(summary["processed"], 1);
    assert_eq!(summary["updated"], 0);

    // The inactive product's stored point is untouched.
    assert_eq!(stored_reorder_point(&app, inactive.id).await, 10);
}

// ==================== Automatic Request Generation ====================

#[tokio::test]
async fn auto_generate_opens_requests_for_urgent_and_high_only() {
    let app = TestApp::new().await;

    let urgent = app.seed_product("URG-001", dec!(80.00), None).await;
    app.seed_inventory(urgent.id, 0, 20, Some(150), 50).await;
    let supplier = app.seed_supplier("Brick Bros").await;
    app.seed_offer(supplier.id, urgent.id, dec!(60.00), 5, 1, 4.0, false)
        .await;

    let high = app.seed_product("HGH-001", dec!(10.00), None).await;
    app.seed_inventory(high.id, 8, 10, Some(100), 20).await;

    // At the reorder point but healthy otherwise: suggested, never auto-opened.
    let low = app.seed_product("LOW-001", dec!(10.00), None).await;
    app.seed_inventory(low.id, 40, 10, Some(100), 50).await;

    let response = app
        .request(Method::POST, "/api/v1/batch/auto-requests", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let summary = response_json(response).await["data"].clone();
    assert_eq!(summary["created"], 2);
    assert_eq!(summary["skipped"], 0);

    let response = app.request(Method::GET, "/api/v1/requests", None).await;
    let body = response_json(response).await;
    let requests = body["data"].as_array().expect("request list");
    assert_eq!(requests.len(), 2);

    let urgent_request = requests
        .iter()
        .find(|r| r["product_sku"] == "URG-001")
        .expect("urgent request");
    assert_eq!(urgent_request["source"], "SYSTEM");
    assert_eq!(urgent_request["status"], "PENDING");
    assert_eq!(urgent_request["priority"], "URGENT");
    // Top up to max stock from zero.
    assert_eq!(urgent_request["requested_qty"], 150);
    // The best offer is carried onto the request.
    assert_eq!(urgent_request["supplier_name"], "Brick Bros");
    assert_eq!(
        urgent_request["notes"],
        "Auto-generated: stock 0 at or below reorder point 50"
    );

    let high_request = requests
        .iter()
        .find(|r| r["product_sku"] == "HGH-001")
        .expect("high request");
    assert_eq!(high_request["source"], "SYSTEM");
    assert!(high_request["supplier_id"].is_null());
}

#[tokio::test]
async fn auto_generate_skips_products_with_open_requests() {
    let app = TestApp::new().await;

    let product = app.seed_product("BRK-001", dec!(80.00), None).await;
    app.seed_inventory(product.id, 0, 20, Some(150), 50).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/requests",
            Some(serde_json::json!({"product_id": product.id, "requested_qty": 25})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .request(Method::POST, "/api/v1/batch/auto-requests", None)
        .await;
    let summary = response_json(response).await["data"].clone();
    assert_eq!(summary["created"], 0);
    assert_eq!(summary["skipped"], 1);

    // Only the manual request exists.
    let response = app.request(Method::GET, "/api/v1/requests", None).await;
    let body = response_json(response).await;
    let requests = body["data"].as_array().expect("request list");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["source"], "MANUAL");
}

#[tokio::test]
async fn auto_generate_runs_are_idempotent() {
    let app = TestApp::new().await;

    let product = app.seed_product("SND-010", dec!(15.00), None).await;
    app.seed_inventory(product.id, 0, 5, Some(60), 20).await;

    let response = app
        .request(Method::POST, "/api/v1/batch/auto-requests", None)
        .await;
    let summary = response_json(response).await["data"].clone();
    assert_eq!(summary["created"], 1);

    let response = app
        .request(Method::POST, "/api/v1/batch/auto-requests", None)
        .await;
    let summary = response_json(response).await["data"].clone();
    assert_eq!(summary["created"], 0);
    assert_eq!(summary["skipped"], 1);

    let response = app.request(Method::GET, "/api/v1/requests", None).await;
    let body = response_json(response).await;
    assert_eq!(body["data"].as_array().expect("request list").len(), 1);
}
