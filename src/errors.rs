use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

/// Simplified error structure for OpenAPI documentation
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Not Found",
    "message": "Product with ID 550e8400-e29b-41d4-a716-446655440000 not found",
    "details": null,
    "timestamp": "2026-08-25T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request", "Internal Server Error")
    #[schema(example = "Not Found")]
    pub error: String,
    /// Human-readable error description
    #[schema(example = "Product with ID 550e8400-e29b-41d4-a716-446655440000 not found")]
    pub message: String,
    /// Additional error details (validation errors, field names)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// ISO 8601 timestamp when error occurred
    #[schema(example = "2026-08-25T10:30:00.000Z")]
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        sea_orm::error::DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Missing supplier: {0}")]
    MissingSupplier(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) | Self::InvalidInput(_) | Self::InvalidStatus(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::MissingSupplier(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InternalError(_) | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::InternalError(_) | Self::Other(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = self.response_message();

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: error_message,
            details: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use axum::{body::to_bytes, http::StatusCode};

    #[test]
    fn service_error_status_code_mapping() {
        assert_eq!(
            ServiceError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::ValidationError("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::InvalidStatus("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::MissingSupplier("x".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ServiceError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::InternalError("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn service_error_response_message_hides_internal_details() {
        // Internal errors should NOT expose implementation details
        assert_eq!(
            ServiceError::DatabaseError(sea_orm::error::DbErr::Custom("dsn leak".into()))
                .response_message(),
            "Database error"
        );
        assert_eq!(
            ServiceError::InternalError("stack trace".into()).response_message(),
            "Internal server error"
        );

        // User-facing errors SHOULD include the actual message
        assert_eq!(
            ServiceError::NotFound("Product not found".into()).response_message(),
            "Not found: Product not found"
        );
        assert_eq!(
            ServiceError::MissingSupplier("request PR-1 has no supplier".into())
                .response_message(),
            "Missing supplier: request PR-1 has no supplier"
        );
    }

    #[tokio::test]
    async fn service_error_renders_json_body() {
        let response = ServiceError::NotFound("missing".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.error, "Not Found");
        assert_eq!(payload.message, "Not found: missing");
    }

    #[test]
    fn validation_errors_convert_to_service_error() {
        use validator::Validate;

        #[derive(Validate)]
        struct Payload {
            #[validate(range(min = 1))]
            quantity: i32,
        }

        let err = Payload { quantity: 0 }.validate().unwrap_err();
        let service_err: ServiceError = err.into();
        assert_matches!(service_err, ServiceError::ValidationError(_));
        assert_eq!(service_err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn database_errors_convert_to_service_error() {
        let service_err: ServiceError =
            sea_orm::error::DbErr::Custom("connection reset".into()).into();
        assert_matches!(service_err, ServiceError::DatabaseError(_));
        assert_eq!(service_err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
