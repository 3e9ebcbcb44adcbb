use super::common::success_response;
use crate::errors::ServiceError;
use crate::handlers::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use tracing::info;

/// Generate replenishment suggestions
#[utoipa::path(
    post,
    path = "/api/v1/suggestions",
    responses(
        (status = 200, description = "Ranked suggestion list", body = crate::ApiResponse<serde_json::Value>),
        (status = 500, description = "Internal error", body = crate::errors::ErrorResponse)
    ),
    tag = "suggestions"
)]
pub async fn generate_suggestions(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let suggestions = state.services.suggestions.generate().await?;

    info!(count = suggestions.len(), "Suggestion run requested over HTTP");

    Ok(success_response(suggestions))
}

/// List products at or below their minimum stock level
#[utoipa::path(
    get,
    path = "/api/v1/inventory/low-stock",
    responses(
        (status = 200, description = "Low stock report", body = crate::ApiResponse<serde_json::Value>),
        (status = 500, description = "Internal error", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn low_stock_report(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let alerts = state.services.suggestions.low_stock_report().await?;
    Ok(success_response(alerts))
}

pub fn suggestion_routes() -> Router<AppState> {
    Router::new()
        .route("/suggestions", post(generate_suggestions))
        .route("/inventory/low-stock", get(low_stock_report))
}
