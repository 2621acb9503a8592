use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::story::ServiceError;

/// Which endpoint failed; picks the message shown for server-side faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    GenerateChapter,
    CreativeSuggestions,
    SummarizeChapter,
}

impl Operation {
    fn failure_message(&self) -> &'static str {
        match self {
            Operation::GenerateChapter => "Failed to generate chapter. Please try again.",
            Operation::CreativeSuggestions => "Failed to generate suggestions. Please try again.",
            Operation::SummarizeChapter => "Failed to summarize chapter. Please try again.",
        }
    }
}

/// Errors as they leave the HTTP boundary.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{}", .0.failure_message())]
    Internal(Operation),
}

impl ApiError {
    /// Maps a service failure, logging the detail that clients never see.
    pub fn from_service(err: ServiceError, operation: Operation) -> Self {
        match err {
            ServiceError::Validation(message) => {
                tracing::warn!(?operation, %message, "validation error");
                ApiError::BadRequest(message)
            }
            ServiceError::Generation(source) => {
                tracing::error!(?operation, error = %source, "generation failed");
                ApiError::Internal(operation)
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::warn!(error = %rejection.body_text(), "rejected request body");
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::llm::GenerationError;

    #[test]
    fn validation_maps_to_bad_request_with_detail() {
        let err = ApiError::from_service(
            ServiceError::Validation("count must be between 1 and 20, got 0".to_string()),
            Operation::CreativeSuggestions,
        );
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "count must be between 1 and 20, got 0");
    }

    #[test]
    fn generation_failure_hides_detail() {
        let err = ApiError::from_service(
            ServiceError::Generation(GenerationError::EmptyResponse),
            Operation::GenerateChapter,
        );
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Failed to generate chapter. Please try again.");
    }
}
