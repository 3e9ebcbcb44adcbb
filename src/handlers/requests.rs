use super::common::{created_response, success_response, validate_input};
use crate::entities::purchase_request::{RequestSource, RequestStatus};
use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::purchase_requests::CreatePurchaseRequestInput;
use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
pub struct RequestListParams {
    /// Filter by request status
    pub status: Option<RequestStatus>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApproveRequestBody {
    /// Identity of the approver, recorded on the request
    pub approved_by: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AssignSupplierBody {
    pub supplier_id: Uuid,
}

/// Create a purchase request
#[utoipa::path(
    post,
    path = "/api/v1/requests",
    request_body = CreatePurchaseRequestInput,
    responses(
        (status = 201, description = "Request created", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown product or supplier", body = crate::errors::ErrorResponse),
        (status = 409, description = "A request is already open for the product", body = crate::errors::ErrorResponse)
    ),
    tag = "requests"
)]
pub async fn create_request(
    State(state): State<AppState>,
    Json(payload): Json<CreatePurchaseRequestInput>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let request = state
        .services
        .requests
        .create_request(payload, RequestSource::Manual)
        .await?;

    info!(request_number = %request.request_number, "Purchase request created over HTTP");

    Ok(created_response(request))
}

/// List purchase requests
#[utoipa::path(
    get,
    path = "/api/v1/requests",
    params(RequestListParams),
    responses(
        (status = 200, description = "Requests, most urgent first", body = crate::ApiResponse<serde_json::Value>)
    ),
    tag = "requests"
)]
pub async fn list_requests(
    State(state): State<AppState>,
    Query(params): Query<RequestListParams>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let requests = state.services.requests.list_requests(params.status).await?;
    Ok(success_response(requests))
}

/// Get a purchase request by ID
#[utoipa::path(
    get,
    path = "/api/v1/requests/:id",
    params(
        ("id" = Uuid, Path, description = "Purchase request ID")
    ),
    responses(
        (status = 200, description = "Request fetched", body = crate::ApiResponse<serde_json::Value>),
        (status = 404, description = "Request not found", body = crate::errors::ErrorResponse)
    ),
    tag = "requests"
)]
pub async fn get_request(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let request = state.services.requests.get_request(request_id).await?;
    Ok(success_response(request))
}

/// Approve a pending purchase request
#[utoipa::path(
    post,
    path = "/api/v1/requests/:id/approve",
    request_body = ApproveRequestBody,
    params(
        ("id" = Uuid, Path, description = "Purchase request ID")
    ),
    responses(
        (status = 200, description = "Request approved", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Request is not pending", body = crate::errors::ErrorResponse),
        (status = 404, description = "Request not found", body = crate::errors::ErrorResponse)
    ),
    tag = "requests"
)]
pub async fn approve_request(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Json(payload): Json<ApproveRequestBody>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let request = state
        .services
        .requests
        .approve_request(request_id, payload.approved_by)
        .await?;

    Ok(success_response(request))
}

/// Reject a purchase request
#[utoipa::path(
    post,
    path = "/api/v1/requests/:id/reject",
    params(
        ("id" = Uuid, Path, description = "Purchase request ID")
    ),
    responses(
        (status = 200, description = "Request rejected", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Request is already terminal", body = crate::errors::ErrorResponse),
        (status = 404, description = "Request not found", body = crate::errors::ErrorResponse)
    ),
    tag = "requests"
)]
pub async fn reject_request(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let request = state.services.requests.reject_request(request_id).await?;
    Ok(success_response(request))
}

/// Convert an approved request into a draft purchase order
#[utoipa::path(
    post,
    path = "/api/v1/requests/:id/convert",
    params(
        ("id" = Uuid, Path, description = "Purchase request ID")
    ),
    responses(
        (status = 201, description = "Purchase order created", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Request is not approved or has no price basis", body = crate::errors::ErrorResponse),
        (status = 404, description = "Request not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Request has no supplier", body = crate::errors::ErrorResponse)
    ),
    tag = "requests"
)]
pub async fn convert_request(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let order = state
        .services
        .requests
        .convert_to_purchase_order(request_id)
        .await?;

    info!(order_number = %order.order_number, "Purchase request converted over HTTP");

    Ok(created_response(order))
}

/// Assign a supplier to a purchase request
#[utoipa::path(
    put,
    path = "/api/v1/requests/:id/supplier",
    request_body = AssignSupplierBody,
    params(
        ("id" = Uuid, Path, description = "Purchase request ID")
    ),
    responses(
        (status = 200, description = "Supplier assigned", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Request is already terminal", body = crate::errors::ErrorResponse),
        (status = 404, description = "Request or supplier not found", body = crate::errors::ErrorResponse)
    ),
    tag = "requests"
)]
pub async fn assign_supplier(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Json(payload): Json<AssignSupplierBody>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let request = state
        .services
        .requests
        .assign_supplier(request_id, payload.supplier_id)
        .await?;

    Ok(success_response(request))
}

pub fn request_routes() -> Router<AppState> {
    Router::new()
        .route("/requests", post(create_request).get(list_requests))
        .route("/requests/:id", get(get_request))
        .route("/requests/:id/approve", post(approve_request))
        .route("/requests/:id/reject", post(reject_request))
        .route("/requests/:id/convert", post(convert_request))
        .route("/requests/:id/supplier", put(assign_supplier))
}
