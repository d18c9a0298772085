use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::{error, info, warn};

/// Centralized error types for consistent API error handling
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Resource already exists: {0}")]
    Conflict(String),

    #[error("Server not configured: {0}")]
    NotConfigured(String),

    /// Upstream failure relayed with its own status and raw body
    #[error("Upstream returned {status}")]
    Upstream { status: StatusCode, body: String },

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// `{ "error": ... }` body shared by every failing endpoint
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self { error: message.into() }
    }
}

/// Error context for structured logging
#[derive(Debug)]
pub struct ErrorContext {
    pub operation: String,
    pub resource_id: Option<String>,
    pub resource_type: String,
    pub user_friendly_message: Option<String>,
}

impl ErrorContext {
    pub fn new(operation: &str, resource_type: &str) -> Self {
        Self {
            operation: operation.to_string(),
            resource_id: None,
            resource_type: resource_type.to_string(),
            user_friendly_message: None,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.resource_id = Some(id.to_string());
        self
    }

    pub fn with_user_message(mut self, message: &str) -> Self {
        self.user_friendly_message = Some(message.to_string());
        self
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::NotConfigured(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Upstream { status, .. } => *status,
        }
    }

    /// Convert API error to HTTP response with consistent structure and logging
    pub fn to_response_with_context(self, context: ErrorContext) -> Response {
        let status = self.status();
        match self {
            ApiError::BadRequest(message) | ApiError::Unauthorized(message) | ApiError::Conflict(message) => {
                warn!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    status = %status,
                    error = %message,
                    "Request rejected"
                );
                let message = context.user_friendly_message.unwrap_or(message);
                (status, Json(ErrorBody::new(message))).into_response()
            }
            ApiError::NotConfigured(message) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    error = %message,
                    "Server not configured"
                );
                let message = context.user_friendly_message.unwrap_or(message);
                (status, Json(ErrorBody::new(message))).into_response()
            }
            ApiError::Upstream { status, body } => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    status = %status,
                    error = %body,
                    "Upstream error relayed"
                );
                (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
            }
            ApiError::Internal(err) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %err,
                    "Internal server error"
                );
                let message = context.user_friendly_message.unwrap_or_else(|| err.to_string());
                (status, Json(ErrorBody::new(message))).into_response()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        info!(error = %self, "Converting error without context");
        self.to_response_with_context(ErrorContext::new("unknown", "resource"))
    }
}

/// Helper macro for structured error responses
#[macro_export]
macro_rules! api_error {
    (bad_request, $operation:expr, $resource_type:expr, $message:expr) => {
        $crate::errors::ApiError::BadRequest($message.to_string())
            .to_response_with_context($crate::errors::ErrorContext::new($operation, $resource_type))
    };

    (unauthorized, $operation:expr, $resource_type:expr, $message:expr) => {
        $crate::errors::ApiError::Unauthorized($message.to_string())
            .to_response_with_context($crate::errors::ErrorContext::new($operation, $resource_type))
    };

    (conflict, $operation:expr, $resource_type:expr, $id:expr, $message:expr) => {
        $crate::errors::ApiError::Conflict($message.to_string()).to_response_with_context(
            $crate::errors::ErrorContext::new($operation, $resource_type).with_id($id),
        )
    };

    (internal, $operation:expr, $resource_type:expr, $error:expr, $message:expr) => {
        $crate::errors::ApiError::Internal($error.into()).to_response_with_context(
            $crate::errors::ErrorContext::new($operation, $resource_type).with_user_message($message),
        )
    };
}
