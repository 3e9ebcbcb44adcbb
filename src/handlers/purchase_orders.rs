use super::common::success_response;
use crate::entities::purchase_order::PurchaseOrderStatus;
use crate::errors::ServiceError;
use crate::handlers::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
pub struct PurchaseOrderListParams {
    /// Filter by order status
    pub status: Option<PurchaseOrderStatus>,
    /// Filter by supplier
    pub supplier_id: Option<Uuid>,
}

/// List purchase orders
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders",
    params(PurchaseOrderListParams),
    responses(
        (status = 200, description = "Purchase orders, newest first", body = crate::ApiResponse<serde_json::Value>)
    ),
    tag = "purchase-orders"
)]
pub async fn list_purchase_orders(
    State(state): State<AppState>,
    Query(params): Query<PurchaseOrderListParams>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let orders = state
        .services
        .purchase_orders
        .list_orders(params.status, params.supplier_id)
        .await?;

    Ok(success_response(orders))
}

/// Get a purchase order with its line items
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/:id",
    params(
        ("id" = Uuid, Path, description = "Purchase order ID")
    ),
    responses(
        (status = 200, description = "Purchase order fetched", body = crate::ApiResponse<serde_json::Value>),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn get_purchase_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let order = state.services.purchase_orders.get_order(order_id).await?;
    Ok(success_response(order))
}

pub fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route("/purchase-orders", get(list_purchase_orders))
        .route("/purchase-orders/:id", get(get_purchase_order))
}
