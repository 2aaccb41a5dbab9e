//! services/mock_api/src/error.rs
//!
//! Defines the primary error type for the mock API service and the error body
//! handlers answer with.

use axum::{http::StatusCode, Json};
use quiz_pipeline_core::ports::PortError;
use serde::Serialize;
use utoipa::ToSchema;

use crate::config::ConfigError;

/// The primary error type for the `mock_api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// JSON body of every error response, e.g. `{"error": "Session not found"}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

/// What a failing handler returns.
pub type HandlerError = (StatusCode, Json<ErrorBody>);

pub fn error_response(status: StatusCode, message: impl Into<String>) -> HandlerError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

/// Maps a refused port operation onto the matching status code.
pub fn port_error(e: PortError) -> HandlerError {
    let status = match &e {
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::Conflict(_) => StatusCode::CONFLICT,
        PortError::Invalid(_) => StatusCode::BAD_REQUEST,
        PortError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, e.to_string())
}
