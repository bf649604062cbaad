use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::AppState;
use super::errors::ApiError;
use crate::fetch::redact_url;
use crate::model::AggregatedResult;

#[derive(Deserialize)]
pub struct SearchParams {
    q: Option<String>,
}

/// `GET /search?q=`
pub async fn search_get(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<AggregatedResult>, ApiError> {
    let query = params
        .q
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| {
            ApiError::InvalidInput(
                "Query parameter 'q' is required and must be a non-empty string".to_string(),
            )
        })?;
    run(&state, &query).await
}

/// `POST /search` with `{"query": ...}`
pub async fn search_post(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<AggregatedResult>, ApiError> {
    let body: Value = serde_json::from_slice(&body).map_err(|_| ApiError::invalid_json())?;
    let query = body
        .get("query")
        .and_then(Value::as_str)
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| {
            ApiError::InvalidInput("Query is required and must be a non-empty string".to_string())
        })?;
    run(&state, query).await
}

async fn run(state: &AppState, query: &str) -> Result<Json<AggregatedResult>, ApiError> {
    info!(query_chars = query.chars().count(), "search started");
    let report = tokio::time::timeout(state.request_timeout, state.orchestrator.run(query))
        .await
        .map_err(|_| {
            warn!(timeout = ?state.request_timeout, "search exceeded request deadline");
            ApiError::Timeout
        })??;

    for (index, processed) in report.hits.iter().enumerate() {
        debug!(
            index,
            url = %redact_url(&processed.hit.hit.link),
            text_chars = processed.hit.text.chars().count(),
            companies = processed.entities.as_ref().map_or(0, |e| e.companies.len()),
            "hit processed"
        );
    }
    Ok(Json(report.result))
}
