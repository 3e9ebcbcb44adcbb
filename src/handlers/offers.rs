use super::common::{success_response, validate_input};
use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::supplier_offers::UpsertSupplierOfferInput;
use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use tracing::info;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
pub struct OfferListParams {
    /// Filter by supplier
    pub supplier_id: Option<Uuid>,
    /// Filter by product
    pub product_id: Option<Uuid>,
    /// Include offers that have been deactivated
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CompareSuppliersParams {
    /// Quantity used for total cost comparison
    pub quantity: Option<i32>,
}

/// List supplier offers
#[utoipa::path(
    get,
    path = "/api/v1/offers",
    params(OfferListParams),
    responses(
        (status = 200, description = "Catalog offers", body = crate::ApiResponse<serde_json::Value>)
    ),
    tag = "offers"
)]
pub async fn list_offers(
    State(state): State<AppState>,
    Query(params): Query<OfferListParams>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let offers = state
        .services
        .offers
        .list_offers(params.supplier_id, params.product_id, params.include_inactive)
        .await?;

    Ok(success_response(offers))
}

/// Create or update a supplier offer
#[utoipa::path(
    put,
    path = "/api/v1/offers",
    request_body = UpsertSupplierOfferInput,
    responses(
        (status = 200, description = "Offer upserted", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid offer", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown supplier or product", body = crate::errors::ErrorResponse)
    ),
    tag = "offers"
)]
pub async fn upsert_offer(
    State(state): State<AppState>,
    Json(payload): Json<UpsertSupplierOfferInput>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let offer = state.services.offers.upsert_offer(payload).await?;

    info!(offer_id = %offer.id, "Supplier offer upserted over HTTP");

    Ok(success_response(offer))
}

/// Rank suppliers for a product
#[utoipa::path(
    get,
    path = "/api/v1/products/:id/suppliers",
    params(
        ("id" = Uuid, Path, description = "Product ID"),
        CompareSuppliersParams
    ),
    responses(
        (status = 200, description = "Eligible offers, best first", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid quantity", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "offers"
)]
pub async fn compare_suppliers(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(params): Query<CompareSuppliersParams>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let ranked = state
        .services
        .ranker
        .compare_suppliers(product_id, params.quantity)
        .await?;

    Ok(success_response(ranked))
}

pub fn offer_routes() -> Router<AppState> {
    Router::new()
        .route("/offers", get(list_offers).put(upsert_offer))
        .route("/products/:id/suppliers", get(compare_suppliers))
}
