//! Standardized error handling for API responses
//!
//! Maps gateway errors onto HTTP status codes and a consistent JSON body for
//! whatever caller-facing layer sits on top of the core.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::kubernetes::error::K8sError;

/// Standard API error response format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status code
    pub status: u16,

    /// Error code for programmatic handling
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Structured detail: per-target outcomes, cascade steps, upstream reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// Request ID for tracking (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    /// Timestamp when error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(status: u16, error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            message: message.into(),
            details: None,
            request_id: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn with_details(mut self, details: impl Into<serde_json::Value>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

/// API error types with standardized responses
#[derive(Debug)]
pub enum ApiError {
    /// 500 Internal Server Error
    Internal(String),

    /// 404 Not Found
    NotFound(String),

    /// 400 Bad Request
    BadRequest(String),

    /// 422 Unprocessable Entity
    ValidationError(String),

    /// 503 Service Unavailable
    ServiceUnavailable(String),

    /// 408 Request Timeout
    Timeout(String),

    /// Status passed through from the Kubernetes API server
    Upstream {
        status: u16,
        reason: String,
        message: String,
    },

    /// 207 Multi-Status: some parts of the operation failed
    MultiStatus {
        message: String,
        details: serde_json::Value,
    },
}

impl ApiError {
    /// Convert error to ErrorResponse
    pub fn to_error_response(&self) -> ErrorResponse {
        match self {
            ApiError::Internal(msg) => {
                error!("Internal API error: {}", msg);
                ErrorResponse::new(500, "INTERNAL_ERROR", "An internal server error occurred")
                    .with_details(msg.as_str())
            }
            ApiError::NotFound(msg) => ErrorResponse::new(404, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => ErrorResponse::new(400, "BAD_REQUEST", msg),
            ApiError::ValidationError(msg) => ErrorResponse::new(422, "VALIDATION_ERROR", msg),
            ApiError::ServiceUnavailable(msg) => {
                ErrorResponse::new(503, "SERVICE_UNAVAILABLE", msg)
            }
            ApiError::Timeout(msg) => ErrorResponse::new(408, "REQUEST_TIMEOUT", msg),
            ApiError::Upstream {
                status,
                reason,
                message,
            } => {
                // Anything that is not an error status came from a broken upstream
                let status = if (400..600).contains(status) { *status } else { 502 };
                ErrorResponse::new(status, "UPSTREAM_ERROR", message)
                    .with_details(serde_json::json!({ "reason": reason }))
            }
            ApiError::MultiStatus { message, details } => {
                ErrorResponse::new(207, "PARTIAL_FAILURE", message).with_details(details.clone())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_response = self.to_error_response();
        let status_code = StatusCode::from_u16(error_response.status)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (status_code, Json(error_response)).into_response()
    }
}

impl From<K8sError> for ApiError {
    fn from(err: K8sError) -> Self {
        let message = err.to_string();
        match err {
            K8sError::ClusterNotFound(_) | K8sError::ResourceNotFound { .. } => {
                ApiError::NotFound(message)
            }
            K8sError::Validation(msg) => ApiError::ValidationError(msg),
            K8sError::ConnectionFailed { .. } => ApiError::ServiceUnavailable(message),
            K8sError::Upstream {
                code,
                reason,
                message,
            } => ApiError::Upstream {
                status: code,
                reason,
                message,
            },
            K8sError::PartialBatchFailure(result) => ApiError::MultiStatus {
                message,
                details: serde_json::to_value(&result).unwrap_or_default(),
            },
            K8sError::CascadeStepFailure(result) => ApiError::MultiStatus {
                message,
                details: serde_json::to_value(&result).unwrap_or_default(),
            },
            K8sError::Cancelled(_) => ApiError::Timeout(message),
            K8sError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<kubegate_common::Error> for ApiError {
    fn from(err: kubegate_common::Error) -> Self {
        match err {
            kubegate_common::Error::UnknownKind(kind) => {
                ApiError::BadRequest(format!("Unknown resource kind '{}'", kind))
            }
            other => ApiError::ValidationError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::BadRequest(format!("Invalid JSON: {}", err))
    }
}
