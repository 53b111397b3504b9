//! Error types for the Subscription API service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use tiffin_lifecycle::LifecycleError;

/// API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    NotAuthenticated,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("Database error")]
    Database(#[from] tiffin_db::DbError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Lifecycle(e) => match e {
                LifecycleError::Unauthorized(_) => StatusCode::FORBIDDEN,
                LifecycleError::NotFound(_) => StatusCode::NOT_FOUND,
                LifecycleError::InvalidTransition { .. } | LifecycleError::Conflict(_) => {
                    StatusCode::CONFLICT
                }
                LifecycleError::NoticeViolation { .. } | LifecycleError::LimitExceeded { .. } => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                LifecycleError::Validation(_)
                | LifecycleError::PaymentVerification(_)
                | LifecycleError::Webhook(_) => StatusCode::BAD_REQUEST,
                LifecycleError::Gateway(_) => StatusCode::BAD_GATEWAY,
                LifecycleError::Database(_) | LifecycleError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => "NOT_AUTHENTICATED",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Lifecycle(e) => match e {
                LifecycleError::Unauthorized(_) => "UNAUTHORIZED",
                LifecycleError::NotFound(_) => "NOT_FOUND",
                LifecycleError::InvalidTransition { .. } => "INVALID_TRANSITION",
                LifecycleError::NoticeViolation { .. } => "NOTICE_VIOLATION",
                LifecycleError::LimitExceeded { .. } => "LIMIT_EXCEEDED",
                LifecycleError::Validation(_) => "VALIDATION_ERROR",
                LifecycleError::Conflict(_) => "CONFLICT",
                LifecycleError::PaymentVerification(_) => "PAYMENT_VERIFICATION_FAILED",
                LifecycleError::Webhook(_) => "WEBHOOK_ERROR",
                LifecycleError::Gateway(_) => "GATEWAY_ERROR",
                LifecycleError::Database(_) | LifecycleError::Internal(_) => "INTERNAL_ERROR",
            },
            Self::Database(_) | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Machine-readable context for the client
    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Lifecycle(LifecycleError::NoticeViolation {
                required_hours,
                deadline,
            }) => Some(serde_json::json!({
                "required_hours": required_hours,
                "deadline": deadline,
            })),
            Self::Lifecycle(LifecycleError::LimitExceeded { slot, limit }) => {
                Some(serde_json::json!({ "slot": slot, "limit": limit }))
            }
            _ => None,
        }
    }

    /// Whether the server, not the caller, is at fault
    fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        // Log internal errors; never leak their detail
        let message = if self.is_server_error() {
            tracing::error!(error = ?self, "Internal API error");
            match self {
                Self::Lifecycle(LifecycleError::Gateway(_)) => {
                    "Payment gateway unavailable".to_string()
                }
                _ => "Internal server error".to_string(),
            }
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
