use super::common::success_response;
use crate::errors::ServiceError;
use crate::handlers::AppState;
use axum::{extract::State, routing::post, Router};
use tracing::info;

/// Recompute reorder points for all active products
#[utoipa::path(
    post,
    path = "/api/v1/batch/reorder-points",
    responses(
        (status = 200, description = "Refresh summary", body = crate::ApiResponse<serde_json::Value>),
        (status = 500, description = "Internal error", body = crate::errors::ErrorResponse)
    ),
    tag = "batch"
)]
pub async fn refresh_reorder_points(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let summary = state.services.reorder.update_all_reorder_points().await?;

    info!(
        processed = summary.processed,
        updated = summary.updated,
        "Reorder point batch requested over HTTP"
    );

    Ok(success_response(summary))
}

/// Auto-generate purchase requests for urgent and high suggestions
#[utoipa::path(
    post,
    path = "/api/v1/batch/auto-requests",
    responses(
        (status = 200, description = "Generation summary", body = crate::ApiResponse<serde_json::Value>),
        (status = 500, description = "Internal error", body = crate::errors::ErrorResponse)
    ),
    tag = "batch"
)]
pub async fn auto_generate_requests(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let summary = state.services.requests.auto_generate().await?;

    info!(
        created = summary.created,
        skipped = summary.skipped,
        "Automatic request generation requested over HTTP"
    );

    Ok(success_response(summary))
}

pub fn batch_routes() -> Router<AppState> {
    Router::new()
        .route("/batch/reorder-points", post(refresh_reorder_points))
        .route("/batch/auto-requests", post(auto_generate_requests))
}
