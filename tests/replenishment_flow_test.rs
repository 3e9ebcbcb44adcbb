//! Integration tests for the replenishment read side.
//!
//! Tests cover:
//! - Suggestion generation: reorder-point gating, quantity sizing, priority
//!   classification, and ordering
//! - Sales velocity measurement over the trailing window
//! - Supplier comparison ranking and eligibility filtering
//! - The low-stock report

mod common;

use axum::{
    body,
    http::{Method, StatusCode},
    response::Response,
};
use chrono::{DateTime, Duration, Utc};
use common::{test_now, TestApp};
use restock_api::entities::sales_order::SalesOrderStatus;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.to_string().parse().expect("decimal number"),
        other => panic!("expected a decimal value, got {other:?}"),
    }
}

fn timestamp(value: &Value) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value.as_str().expect("timestamp string"))
        .expect("rfc3339 timestamp")
        .with_timezone(&Utc)
}

// ==================== Suggestion Generation ====================

#[tokio::test]
async fn suggestions_cover_products_at_or_below_reorder_point() {
    let app = TestApp::new().await;

    let comfortable = app.seed_product("CEM-100", dec!(80.00), None).await;
    app.seed_inventory(comfortable.id, 60, 10, Some(200), 50)
        .await;

    // Exactly at the reorder point still triggers a suggestion.
    let boundary = app.seed_product("CEM-200", dec!(80.00), None).await;
    app.seed_inventory(boundary.id, 50, 10, Some(200), 50).await;

    let response = app.request(Method::POST, "/api/v1/suggestions", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let suggestions = body["data"].as_array().expect("suggestion array");
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0]["sku"], "CEM-200");
    assert_eq!(suggestions[0]["current_stock"], 50);
    assert_eq!(suggestions[0]["reorder_point"], 50);
}

#[tokio::test]
async fn stocked_out_product_is_urgent_with_full_top_up() {
    let app = TestApp::new().await;

    let product = app.seed_product("BRK-001", dec!(80.00), Some(dec!(56.00))).await;
    app.seed_inventory(product.id, 0, 20, Some(150), 50).await;

    let response = app.request(Method::POST, "/api/v1/suggestions", None).await;
    let body = response_json(response).await;

    let suggestion = &body["data"][0];
    assert_eq!(suggestion["priority"], "URGENT");
    assert_eq!(suggestion["suggested_qty"], 150);
    assert_eq!(suggestion["daily_velocity"], 0.0);
    // Nothing sold recently, so the stock-out horizon is the sentinel.
    assert_eq!(suggestion["days_until_stockout"], 999);
    assert!(suggestion["best_supplier"].is_null());
    assert_eq!(decimal(&suggestion["estimated_cost"]), dec!(8400.00));
}

#[tokio::test]
async fn priority_tiers_sort_most_urgent_first() {
    let app = TestApp::new().await;

    // Seeded deliberately out of priority order.
    let low = app.seed_product("LOW-001", dec!(10.00), None).await;
    app.seed_inventory(low.id, 40, 10, Some(100), 50).await;

    let medium = app.seed_product("MED-001", dec!(10.00), None).await;
    app.seed_inventory(medium.id, 10, 5, Some(100), 30).await;
    // 60 units over the 30-day window: 2/day, so 10 on hand lasts 5 days.
    app.seed_sale(medium.id, 60, 12, SalesOrderStatus::Delivered)
        .await;

    let urgent = app.seed_product("URG-001", dec!(10.00), None).await;
    app.seed_inventory(urgent.id, -2, 10, Some(100), 20).await;

    let high = app.seed_product("HGH-001", dec!(10.00), None).await;
    app.seed_inventory(high.id, 8, 10, Some(100), 20).await;

    let response = app.request(Method::POST, "/api/v1/suggestions", None).await;
    let body = response_json(response).await;

    let suggestions = body["data"].as_array().expect("suggestion array");
    let order: Vec<(&str, &str)> = suggestions
        .iter()
        .map(|s| {
            (
                s["sku"].as_str().expect("sku"),
                s["priority"].as_str().expect("priority"),
            )
        })
        .collect();

    assert_eq!(
        order,
        vec![
            ("URG-001", "URGENT"),
            ("HGH-001", "HIGH"),
            ("MED-001", "MEDIUM"),
            ("LOW-001", "LOW"),
        ]
    );
}

#[tokio::test]
async fn velocity_counts_only_qualifying_recent_orders() {
    let app = TestApp::new().await;

    let product = app.seed_product("STL-045", dec!(25.00), None).await;
    app.seed_inventory(product.id, 45, 30, Some(200), 50).await;

    // 60 qualifying units spread across the window.
    app.seed_sale(product.id, 20, 5, SalesOrderStatus::Delivered)
        .await;
    app.seed_sale(product.id, 20, 10, SalesOrderStatus::Shipped)
        .await;
    app.seed_sale(product.id, 10, 20, SalesOrderStatus::Processing)
        .await;
    app.seed_sale(product.id, 10, 29, SalesOrderStatus::Confirmed)
        .await;

    // None of these may count: wrong status or outside the window.
    app.seed_sale(product.id, 50, 3, SalesOrderStatus::Cancelled)
        .await;
    app.seed_sale(product.id, 40, 2, SalesOrderStatus::Pending)
        .await;
    app.seed_sale(product.id, 100, 35, SalesOrderStatus::Delivered)
        .await;

    let response = app.request(Method::POST, "/api/v1/suggestions", None).await;
    let body = response_json(response).await;

    let suggestion = &body["data"][0];
    assert_eq!(suggestion["daily_velocity"], 2.0);
    assert_eq!(suggestion["days_until_stockout"], 22);
    assert_eq!(suggestion["suggested_qty"], 155);
    // 45 on hand is above the minimum of 30 and 22 days is beyond the
    // one-week horizon, so the earlier rules never fire.
    assert_eq!(suggestion["priority"], "LOW");
}

#[tokio::test]
async fn max_stock_defaults_to_three_times_reorder_point() {
    let app = TestApp::new().await;

    let product = app.seed_product("SND-010", dec!(15.00), None).await;
    app.seed_inventory(product.id, 20, 5, None, 50).await;

    let response = app.request(Method::POST, "/api/v1/suggestions", None).await;
    let body = response_json(response).await;

    assert_eq!(body["data"][0]["suggested_qty"], 130);
}

#[tokio::test]
async fn estimated_cost_prefers_best_eligible_offer() {
    let app = TestApp::new().await;

    let product = app.seed_product("TIL-300", dec!(8.00), Some(dec!(5.00))).await;
    app.seed_inventory(product.id, 10, 5, Some(100), 40).await;

    let pricier = app.seed_supplier("Granite Works").await;
    app.seed_offer(pricier.id, product.id, dec!(2.50), 5, 1, 4.0, false)
        .await;

    // Cheaper per unit but its minimum order of 200 exceeds the 90 suggested.
    let bulk_only = app.seed_supplier("Bulk Tiles Co").await;
    app.seed_offer(bulk_only.id, product.id, dec!(2.00), 5, 200, 4.5, false)
        .await;

    let response = app.request(Method::POST, "/api/v1/suggestions", None).await;
    let body = response_json(response).await;

    let suggestion = &body["data"][0];
    assert_eq!(suggestion["suggested_qty"], 90);

    let best = &suggestion["best_supplier"];
    assert_eq!(best["supplier_name"], "Granite Works");
    assert_eq!(decimal(&best["unit_price"]), dec!(2.50));
    assert_eq!(decimal(&best["total_cost"]), dec!(225.00));
    assert_eq!(decimal(&suggestion["estimated_cost"]), dec!(225.00));
}

#[tokio::test]
async fn estimated_cost_falls_back_without_suppliers() {
    let app = TestApp::new().await;

    // Known cost price wins.
    let costed = app.seed_product("PLY-001", dec!(30.00), Some(dec!(18.00))).await;
    app.seed_inventory(costed.id, 0, 5, Some(10), 8).await;

    // No cost price: estimate at 70% of the retail price.
    let uncosted = app.seed_product("PLY-002", dec!(10.00), None).await;
    app.seed_inventory(uncosted.id, 0, 5, Some(10), 8).await;

    let response = app.request(Method::POST, "/api/v1/suggestions", None).await;
    let body = response_json(response).await;

    let suggestions = body["data"].as_array().expect("suggestion array");
    let by_sku = |sku: &str| {
        suggestions
            .iter()
            .find(|s| s["sku"] == sku)
            .unwrap_or_else(|| panic!("missing suggestion for {sku}"))
    };

    assert_eq!(decimal(&by_sku("PLY-001")["estimated_cost"]), dec!(180.00));
    assert_eq!(decimal(&by_sku("PLY-002")["estimated_cost"]), dec!(70.00));
}

#[tokio::test]
async fn inactive_and_untracked_products_are_not_suggested() {
    let app = TestApp::new().await;

    let inactive = app
        .seed_product_with_activity("OLD-001", dec!(5.00), None, false)
        .await;
    app.seed_inventory(inactive.id, 0, 10, Some(50), 20).await;

    // Active but has no inventory record at all.
    app.seed_product("NEW-001", dec!(5.00), None).await;

    let response = app.request(Method::POST, "/api/v1/suggestions", None).await;
    let body = response_json(response).await;

    assert_eq!(body["data"].as_array().expect("suggestion array").len(), 0);
}

// ==================== Supplier Comparison ====================

#[tokio::test]
async fn preferred_supplier_outranks_cheaper_offers() {
    let app = TestApp::new().await;

    let product = app.seed_product("CEM-301", dec!(150.00), None).await;
    app.seed_inventory(product.id, 100, 10, Some(300), 50).await;

    let preferred = app.seed_supplier("House Brand Cement").await;
    app.seed_offer(preferred.id, product.id, dec!(120.00), 7, 1, 3.0, true)
        .await;

    let cheaper = app.seed_supplier("Discount Cement").await;
    app.seed_offer(cheaper.id, product.id, dec!(100.00), 2, 1, 4.9, false)
        .await;

    let uri = format!("/api/v1/products/{}/suppliers", product.id);
    let response = app.request(Method::GET, &uri, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let ranked = body["data"].as_array().expect("ranked offers");
    assert_eq!(ranked.len(), 2);

    assert_eq!(ranked[0]["supplier_name"], "House Brand Cement");
    assert_eq!(ranked[0]["is_preferred"], true);
    // Default comparison quantity is 100 units.
    assert_eq!(decimal(&ranked[0]["total_cost"]), dec!(12000.00));

    assert_eq!(ranked[1]["supplier_name"], "Discount Cement");
    assert_eq!(decimal(&ranked[1]["total_cost"]), dec!(10000.00));
}

#[tokio::test]
async fn regular_offers_rank_by_cost_then_rating_then_lead_time() {
    let app = TestApp::new().await;

    let product = app.seed_product("GRV-800", dec!(4.00), None).await;

    let pricey = app.seed_supplier("Pricey Gravel").await;
    app.seed_offer(pricey.id, product.id, dec!(3.00), 10, 1, 4.0, false)
        .await;
    let low_rated = app.seed_supplier("Budget Gravel").await;
    app.seed_offer(low_rated.id, product.id, dec!(2.00), 9, 1, 3.0, false)
        .await;
    let slow = app.seed_supplier("Steady Gravel").await;
    app.seed_offer(slow.id, product.id, dec!(2.00), 9, 1, 4.5, false)
        .await;
    let fast = app.seed_supplier("Quick Gravel").await;
    app.seed_offer(fast.id, product.id, dec!(2.00), 4, 1, 4.5, false)
        .await;

    let uri = format!("/api/v1/products/{}/suppliers?quantity=50", product.id);
    let response = app.request(Method::GET, &uri, None).await;
    let body = response_json(response).await;

    let names: Vec<&str> = body["data"]
        .as_array()
        .expect("ranked offers")
        .iter()
        .map(|o| o["supplier_name"].as_str().expect("name"))
        .collect();

    assert_eq!(
        names,
        vec![
            "Quick Gravel",
            "Steady Gravel",
            "Budget Gravel",
            "Pricey Gravel",
        ]
    );
}

#[tokio::test]
async fn offers_project_delivery_dates_from_lead_times() {
    let app = TestApp::new().await;

    let product = app.seed_product("SND-220", dec!(6.00), None).await;

    let fast = app.seed_supplier("Same Week Sand").await;
    app.seed_offer(fast.id, product.id, dec!(5.00), 4, 1, 4.0, false)
        .await;
    let slow = app.seed_supplier("Bulk Sand Co").await;
    app.seed_offer(slow.id, product.id, dec!(5.50), 9, 1, 4.0, false)
        .await;

    let uri = format!("/api/v1/products/{}/suppliers?quantity=20", product.id);
    let response = app.request(Method::GET, &uri, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let ranked = body["data"].as_array().expect("ranked offers");
    assert_eq!(ranked.len(), 2);

    // Every row projects arrival from the same instant plus its own lead
    // time.
    assert_eq!(ranked[0]["supplier_name"], "Same Week Sand");
    assert_eq!(
        timestamp(&ranked[0]["delivery_date"]),
        test_now() + Duration::days(4)
    );
    assert_eq!(
        timestamp(&ranked[1]["delivery_date"]),
        test_now() + Duration::days(9)
    );
}

#[tokio::test]
async fn offers_below_minimum_order_quantity_are_filtered() {
    let app = TestApp::new().await;

    let product = app.seed_product("PIP-110", dec!(12.00), None).await;

    let retail = app.seed_supplier("Retail Pipes").await;
    app.seed_offer(retail.id, product.id, dec!(11.00), 3, 1, 4.0, false)
        .await;
    let wholesale = app.seed_supplier("Wholesale Pipes").await;
    app.seed_offer(wholesale.id, product.id, dec!(9.00), 3, 10, 4.0, false)
        .await;

    let uri = format!("/api/v1/products/{}/suppliers?quantity=5", product.id);
    let response = app.request(Method::GET, &uri, None).await;
    let body = response_json(response).await;
    let ranked = body["data"].as_array().expect("ranked offers");
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0]["supplier_name"], "Retail Pipes");

    // At ten units the wholesale offer becomes eligible and wins on price.
    let uri = format!("/api/v1/products/{}/suppliers?quantity=10", product.id);
    let response = app.request(Method::GET, &uri, None).await;
    let body = response_json(response).await;
    let ranked = body["data"].as_array().expect("ranked offers");
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0]["supplier_name"], "Wholesale Pipes");
}

#[tokio::test]
async fn comparison_rejects_unknown_product_and_bad_quantity() {
    let app = TestApp::new().await;

    let missing = format!(
        "/api/v1/products/{}/suppliers",
        uuid::Uuid::new_v4()
    );
    let response = app.request(Method::GET, &missing, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let product = app.seed_product("PIP-111", dec!(12.00), None).await;
    let uri = format!("/api/v1/products/{}/suppliers?quantity=0", product.id);
    let response = app.request(Method::GET, &uri, None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ==================== Low-Stock Report ====================

#[tokio::test]
async fn low_stock_report_tiers_products_by_severity() {
    let app = TestApp::new().await;

    let stocked_out = app.seed_product("OUT-001", dec!(10.00), None).await;
    app.seed_inventory(stocked_out.id, 0, 20, None, 30).await;

    let nearly_out = app.seed_product("NEAR-001", dec!(10.00), None).await;
    app.seed_inventory(nearly_out.id, 5, 20, Some(80), 30).await;

    let below_min = app.seed_product("BELOW-001", dec!(10.00), None).await;
    app.seed_inventory(below_min.id, 15, 20, Some(80), 30).await;

    let healthy = app.seed_product("FINE-001", dec!(10.00), None).await;
    app.seed_inventory(healthy.id, 25, 20, Some(80), 30).await;

    let response = app
        .request(Method::GET, "/api/v1/inventory/low-stock", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let alerts = body["data"].as_array().expect("alert rows");

    let rows: Vec<(&str, &str)> = alerts
        .iter()
        .map(|a| {
            (
                a["sku"].as_str().expect("sku"),
                a["tier"].as_str().expect("tier"),
            )
        })
        .collect();
    assert_eq!(
        rows,
        vec![
            ("OUT-001", "URGENT"),
            ("NEAR-001", "HIGH"),
            ("BELOW-001", "NORMAL"),
        ]
    );

    // Top-up amount for the stocked-out row uses the 3x reorder fallback.
    assert_eq!(alerts[0]["suggested_order_qty"], 90);
}
