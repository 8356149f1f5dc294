use axum::http::StatusCode;
use recipe_flow::GraphError;
use serde::Serialize;
use thiserror::Error;

use crate::llm::LlmError;

/// Wire-level error codes returned in `error.code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidRequest,
    AiServiceUnavailable,
    RequestTimeout,
    AiResponseError,
    RateLimitExceeded,
    InternalServerError,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
            ErrorCode::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::AiServiceUnavailable => StatusCode::BAD_GATEWAY,
            ErrorCode::RequestTimeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorCode::AiResponseError | ErrorCode::InternalServerError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Every way a generation request can fail.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("AI service unavailable: {0}")]
    AiServiceUnavailable(String),

    #[error("AI request timed out: {0}")]
    RequestTimeout(String),

    #[error("AI rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// The model answered, but no JSON object could be read from the text.
    #[error("Failed to parse AI response: {0}")]
    ParseFailed(String),

    /// The model's JSON did not have the recipe shape. Holds every violation found.
    #[error("AI response failed validation: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),

    #[error("{0}")]
    Internal(String),
}

impl GenerationError {
    pub fn code(&self) -> ErrorCode {
        match self {
            GenerationError::InvalidRequest(_) => ErrorCode::InvalidRequest,
            GenerationError::AiServiceUnavailable(_) => ErrorCode::AiServiceUnavailable,
            GenerationError::RequestTimeout(_) => ErrorCode::RequestTimeout,
            GenerationError::RateLimitExceeded(_) => ErrorCode::RateLimitExceeded,
            GenerationError::ParseFailed(_) | GenerationError::ValidationFailed(_) => {
                ErrorCode::AiResponseError
            }
            GenerationError::Internal(_) => ErrorCode::InternalServerError,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.code().status()
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        GenerationError::InvalidRequest(message.into())
    }

    /// Recover the pipeline's own error from a graph failure. Anything else is internal.
    pub fn from_graph_error(error: GraphError) -> Self {
        match error.downcast_task_error::<GenerationError>() {
            Ok(err) => err,
            Err(other) => GenerationError::Internal(other.to_string()),
        }
    }
}

impl From<LlmError> for GenerationError {
    fn from(error: LlmError) -> Self {
        match error {
            LlmError::RateLimited { .. } => GenerationError::RateLimitExceeded(error.to_string()),
            LlmError::Timeout(_) => GenerationError::RequestTimeout(error.to_string()),
            LlmError::EmptyResponse => GenerationError::ParseFailed(error.to_string()),
            LlmError::RequestFailed(_)
            | LlmError::ApiError { .. }
            | LlmError::NotConfigured(_) => GenerationError::AiServiceUnavailable(error.to_string()),
        }
    }
}

impl From<GenerationError> for GraphError {
    fn from(error: GenerationError) -> Self {
        GraphError::task(error)
    }
}
