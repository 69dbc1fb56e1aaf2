//! Error types for the cache and queue
//!
//! Provides unified error handling using thiserror. Routine cache outcomes
//! (miss, oversized entry, eviction shortfall) never reach this type; they
//! are reported through `Option`/`bool` return values instead.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Error Enum ==
/// Unified error type for the resilience layer.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input: oversized entry, bad import envelope, bad config
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Capacity could not be freed (queue full)
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Executor failure that is still eligible for retry
    #[error("Transient execution failure: {0}")]
    TransientExecution(String),

    /// Executor failure after the attempt budget ran out
    #[error("Execution failed permanently: {0}")]
    TerminalExecution(String),

    /// TTL or expiresAt elapsed
    #[error("Expired: {0}")]
    Expired(String),

    /// Snapshot load/save failure
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Compression codec failure
    #[error("Compression error: {0}")]
    Compression(String),

    /// Lookup of an unknown key or operation id
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Expired(_) => StatusCode::GONE,
            Error::ResourceExhausted(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::TransientExecution(_)
            | Error::TerminalExecution(_)
            | Error::Persistence(_)
            | Error::Compression(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the crate.
pub type Result<T> = std::result::Result<T, Error>;
