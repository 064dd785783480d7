use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error body returned by every endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Bad Request",
    "message": "Cart is empty",
    "code": "empty_cart",
    "request_id": "req-abc123xyz",
    "timestamp": "2024-12-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Machine-readable error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Unique request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// ISO 8601 timestamp when error occurred
    pub timestamp: String,
}

/// Step of the commit unit of work that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum CommitStage {
    Begin,
    HeaderInsert,
    LineInsert,
    StockUpdate,
    Commit,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Incomplete payment info: missing {}", .missing.join(", "))]
    IncompletePaymentInfo { missing: Vec<&'static str> },

    #[error("Invalid fee selection: {0}")]
    InvalidFeeSelection(String),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: i32, quantity: i32 },

    #[error("Insufficient stock for product {product_id}: requested {requested}")]
    InsufficientStock { product_id: i32, requested: i32 },

    #[error("Persistence failure during {stage}: {source}")]
    PersistenceFailure {
        stage: CommitStage,
        #[source]
        source: DbErr,
    },

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    pub fn persistence(stage: CommitStage) -> impl FnOnce(DbErr) -> ServiceError {
        move |source| ServiceError::PersistenceFailure { stage, source }
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_)
            | Self::IncompletePaymentInfo { .. }
            | Self::InvalidFeeSelection(_)
            | Self::EmptyCart
            | Self::InvalidQuantity { .. } => StatusCode::BAD_REQUEST,
            Self::InvalidStatus(_) => StatusCode::CONFLICT,
            Self::InsufficientStock { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::DatabaseError(_)
            | Self::PersistenceFailure { .. }
            | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DatabaseError(_) => "database_error",
            Self::NotFound(_) => "not_found",
            Self::ValidationError(_) => "validation_error",
            Self::IncompletePaymentInfo { .. } => "incomplete_payment_info",
            Self::InvalidFeeSelection(_) => "invalid_fee_selection",
            Self::EmptyCart => "empty_cart",
            Self::InvalidQuantity { .. } => "invalid_quantity",
            Self::InsufficientStock { .. } => "insufficient_stock",
            Self::PersistenceFailure { .. } => "persistence_failure",
            Self::InvalidStatus(_) => "invalid_status",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::InternalError(_) => "internal_error",
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Storage errors return generic messages so no SQL detail leaks.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::PersistenceFailure { .. } => {
                "The order could not be saved; nothing was charged or reserved".to_string()
            }
            Self::InternalError(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

fn error_body(status: StatusCode, message: String, code: Option<String>) -> Response {
    let err = ErrorResponse {
        error: status.canonical_reason().unwrap_or("Error").to_string(),
        message,
        code,
        request_id: current_request_id(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    (status, Json(err)).into_response()
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.code(), "request failed");
        }
        error_body(status, self.response_message(), Some(self.code().to_string()))
    }
}

/// API Error type for HTTP responses
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Service error: {0}")]
    ServiceError(#[from] ServiceError),

    #[error("Validation error: {0}")]
    ValidationError(String),

}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::ServiceError(service_error) => service_error.into_response(),
            ApiError::ValidationError(msg) => error_body(
                StatusCode::BAD_REQUEST,
                msg,
                Some("validation_error".to_string()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn service_error_response_includes_request_id() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("req-123"), async {
                ServiceError::EmptyCart.into_response()
            })
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.request_id.as_deref(), Some("req-123"));
        assert_eq!(payload.code.as_deref(), Some("empty_cart"));
    }

    #[test]
    fn checkout_errors_map_to_expected_status() {
        assert_eq!(
            ServiceError::IncompletePaymentInfo {
                missing: vec!["phone"]
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::InvalidFeeSelection("unknown order method 9".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ServiceError::EmptyCart.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ServiceError::InvalidQuantity {
                product_id: 1,
                quantity: -3
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::InsufficientStock {
                product_id: 1,
                requested: 3
            }
            .status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ServiceError::PersistenceFailure {
                stage: CommitStage::LineInsert,
                source: DbErr::Custom("boom".into()),
            }
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServiceError::InvalidStatus("x".into()).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn persistence_failure_hides_database_detail() {
        let err = ServiceError::persistence(CommitStage::StockUpdate)(DbErr::Custom(
            "relation \"products\" does not exist".into(),
        ));
        assert!(!err.response_message().contains("products"));
        assert!(err.to_string().contains("stock_update"));
    }

    #[test]
    fn incomplete_payment_info_lists_missing_fields() {
        let err = ServiceError::IncompletePaymentInfo {
            missing: vec!["email", "phone"],
        };
        assert_eq!(
            err.response_message(),
            "Incomplete payment info: missing email, phone"
        );
    }
}
