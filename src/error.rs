//! Application error types shared by stores, clients and services.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by the booking lifecycle core.
///
/// `NotFound`, `Unauthorized`, `Validation` and `InvalidState` are never
/// retried. `Upstream` from the ticketing provider is safe to retry because
/// every mutating operation is idempotent; `Upstream` from the payment
/// processor is surfaced for manual review instead.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid state transition: {from} -> {to}")]
    InvalidState { from: String, to: String },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("upstream {service} error: {message}")]
    Upstream { service: &'static str, message: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Shorthand for an illegal status transition.
    pub fn invalid_state(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::InvalidState {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Upstream failure from the ticketing provider.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Upstream {
            service: "ticketing provider",
            message: message.into(),
        }
    }

    /// Upstream failure from the payment processor.
    pub fn processor(message: impl Into<String>) -> Self {
        Self::Upstream {
            service: "payment processor",
            message: message.into(),
        }
    }
}

/// Result type for core operations.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::FORBIDDEN,
            AppError::InvalidState { .. } => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "success": false,
            "data": null,
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
