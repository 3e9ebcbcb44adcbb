//! Restock API Library
//!
//! Inventory replenishment and supplier selection for a building-materials
//! storefront: sales velocity, dynamic reorder points, supplier ranking,
//! and the purchase request lifecycle.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod clock;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod services;

use axum::{extract::State, response::Json, routing::get, Router};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

// Common response wrapper
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// All routes mounted under `/api/v1`.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .merge(handlers::suggestions::suggestion_routes())
        .merge(handlers::requests::request_routes())
        .merge(handlers::purchase_orders::purchase_order_routes())
        .merge(handlers::offers::offer_routes())
        .merge(handlers::batch::batch_routes())
}

/// Full application router: status and health endpoints, the v1 API, and
/// Swagger UI, wrapped in tracing, compression, CORS, and timeout layers.
pub fn app(state: AppState) -> Router {
    let cors_layer = if state.config.is_production() {
        CorsLayer::new()
    } else {
        CorsLayer::permissive()
    };

    Router::new()
        .route("/", get(|| async { "restock-api up" }))
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::swagger_ui())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors_layer)
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .with_state(state)
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let version = env!("CARGO_PKG_VERSION");
    let git = option_env!("GIT_HASH").unwrap_or("unknown");
    let build_time = option_env!("BUILD_TIME").unwrap_or("unknown");
    let status_data = json!({
        "status": "ok",
        "version": version,
        "git": git,
        "build_time": build_time,
        "service": "restock-api",
        "timestamp": Utc::now().to_rfc3339(),
        "environment": std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let db_status = match db::check_connection(&state.db).await {
        Ok(()) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}
