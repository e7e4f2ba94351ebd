use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Message returned to callers for every 500-class failure.
pub const GENERIC_INTERNAL_MESSAGE: &str = "An internal server error occurred.";

/// Closed set of failures a handler can produce.
///
/// Only `Validation` and `NotFound` carry a caller-visible message. Every
/// other variant is reported with [`GENERIC_INTERNAL_MESSAGE`] and its cause
/// goes to the log.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Dependency error: {0}")]
    Dependency(anyhow::Error),

    #[error("Configuration error: {0}")]
    Configuration(anyhow::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Service unavailable")]
    ServiceUnavailable(serde_json::Value),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Dependency(_) | AppError::Configuration(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Short label used for log fields and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::NotFound(_) => "not_found",
            AppError::Dependency(_) => "dependency",
            AppError::Configuration(_) => "configuration",
            AppError::Internal(_) => "internal",
            AppError::ServiceUnavailable(_) => "unavailable",
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
        }

        let status = self.status_code();
        let kind = self.kind();

        match self {
            AppError::Validation(message) | AppError::NotFound(message) => {
                tracing::info!(kind, error = %message, "Request rejected");
                (status, Json(ErrorResponse { error: message })).into_response()
            }
            AppError::Dependency(err) | AppError::Configuration(err) | AppError::Internal(err) => {
                tracing::error!(kind, error = ?err, "Request failed");
                (
                    status,
                    Json(ErrorResponse {
                        error: GENERIC_INTERNAL_MESSAGE.to_string(),
                    }),
                )
                    .into_response()
            }
            AppError::ServiceUnavailable(body) => (status, Json(body)).into_response(),
        }
    }
}
