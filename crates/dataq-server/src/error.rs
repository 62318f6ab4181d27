//! Error taxonomy and HTTP mapping
//!
//! `ValidationError` and `NoDatasetLoaded` are client errors and surface
//! immediately; model-backend failures are upstream errors (502); engine
//! timeouts are 504; everything else is a processing error. Every message
//! crossing the boundary carries the offending query text or backend
//! diagnostic so failures can be diagnosed without re-running.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dataq_duck::{EngineError, IngestError};
use dataq_llm::LlmError;
use dataq_sql::ValidationError;
use serde_json::json;
use thiserror::Error;

/// Failure of the ask pipeline. Summarization failures are deliberately
/// absent: they are swallowed with a fallback narrative.
#[derive(Debug, Error)]
pub enum AskError {
    #[error("Question must not be empty.")]
    EmptyQuestion,

    #[error("No data loaded yet. Please upload a file first.")]
    NoDatasetLoaded,

    #[error("Failed to generate SQL via LLM: {0}")]
    Translation(#[from] LlmError),

    #[error("Generated SQL was rejected: {0}")]
    Validation(#[from] ValidationError),

    #[error("Query engine error: {0}")]
    Engine(EngineError),

    #[error("Query timed out: {query}")]
    ExecutionTimeout { query: String },

    #[error("Could not produce a working query. Last attempt: {query}; error: {last_error}")]
    QueryGenerationFailed { query: String, last_error: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AskError {
    /// Metrics label for the stage that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            AskError::EmptyQuestion => "question",
            AskError::NoDatasetLoaded => "dataset",
            AskError::Translation(_) => "translate",
            AskError::Validation(_) => "validate",
            AskError::Engine(_) => "execute",
            AskError::ExecutionTimeout { .. } => "timeout",
            AskError::QueryGenerationFailed { .. } => "retries",
            AskError::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AskError::EmptyQuestion | AskError::NoDatasetLoaded | AskError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            AskError::Translation(_) => StatusCode::BAD_GATEWAY,
            AskError::ExecutionTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            AskError::Engine(_)
            | AskError::QueryGenerationFailed { .. }
            | AskError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AskError {
    fn into_response(self) -> Response {
        ApiError::new(self.status(), self.to_string()).into_response()
    }
}

/// Route-level error: a status code plus a `{"error": ...}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<AskError> for ApiError {
    fn from(err: AskError) -> Self {
        ApiError::new(err.status(), err.to_string())
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        let status = match err {
            IngestError::UnsupportedFormat { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            IngestError::Read(_) => StatusCode::BAD_REQUEST,
            IngestError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError::new(status, err.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::bad_request(format!("Invalid query: {err}"))
    }
}
