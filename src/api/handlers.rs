use axum::{Json, body::Bytes, extract::State, http::StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

use crate::data_models::{Query, SearchResponse};
use crate::gateway::SearchService;

use super::error::ApiError;

pub async fn search_handler(
    State(search): State<Arc<dyn SearchService>>,
    body: Bytes,
) -> Result<Json<SearchResponse>, ApiError> {
    let start = Instant::now();

    // Parsed by hand so that a missing or wrong content type is not rejected
    // before the query is looked at. Any JSON value other than null is a
    // request; non-objects simply have no `query`.
    let body: Value = serde_json::from_slice(&body)?;
    if body.is_null() {
        return Err(ApiError::NullBody);
    }

    let query = body
        .get("query")
        .and_then(Value::as_str)
        .and_then(Query::parse)
        .ok_or(ApiError::MissingQuery)?;

    tracing::info!(query = %query, "searching");

    let response = search.search(query.as_str()).await?;

    tracing::info!(
        query = %query,
        results = response.results.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "search complete"
    );

    Ok(Json(response))
}

/// Bare `OPTIONS` requests that are not full CORS preflights still get an
/// empty 200.
pub async fn preflight_handler() -> StatusCode {
    StatusCode::OK
}
