use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use super::models::{ErrorBody, InternalErrorBody};

pub const QUERY_REQUIRED: &str = "Query is required";

const INTERNAL_APOLOGY: &str =
    "I apologize, but I encountered an error while processing your request. Please try again.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Query is required")]
    MissingQuery,
    #[error("malformed request body: {0}")]
    MalformedBody(#[from] serde_json::Error),
    #[error("request body is null")]
    NullBody,
    #[error(transparent)]
    Search(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::MissingQuery => (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody {
                    error: QUERY_REQUIRED.to_string(),
                }),
            )
                .into_response(),
            other => {
                tracing::error!("search request failed: {:#}", other);
                internal_error_response()
            }
        }
    }
}

pub fn internal_error_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(InternalErrorBody {
            error: "Internal server error".to_string(),
            results: Vec::new(),
            answer: INTERNAL_APOLOGY.to_string(),
        }),
    )
        .into_response()
}
