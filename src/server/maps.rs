use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use super::AppState;
use super::errors::{ApiError, map_error};
use super::session::{RequiredSession, SessionCookie};
use crate::maps::{MapMetadata, SavedMap};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapsParams {
    id: Option<String>,
    session_id: Option<String>,
}

/// One row of `GET /maps`.
#[derive(Serialize)]
pub struct MapSummary {
    id: Uuid,
    query: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    metadata: MapMetadata,
}

impl From<SavedMap> for MapSummary {
    fn from(map: SavedMap) -> Self {
        Self {
            id: map.id,
            query: map.query,
            created_at: map.created_at,
            updated_at: map.updated_at,
            metadata: map.metadata,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapDetail {
    id: Uuid,
    query: String,
    results: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SavedMap> for MapDetail {
    fn from(map: SavedMap) -> Self {
        Self {
            id: map.id,
            query: map.query,
            results: map.results,
            created_at: map.created_at,
            updated_at: map.updated_at,
        }
    }
}

/// `POST /maps` with `{"query": ..., "results": ...}`
pub async fn save_map(
    State(state): State<Arc<AppState>>,
    RequiredSession(session_id): RequiredSession,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let mut body: Value = serde_json::from_slice(&body).map_err(|_| ApiError::invalid_json())?;

    let query = body
        .get("query")
        .and_then(Value::as_str)
        .filter(|q| !q.trim().is_empty())
        .map(str::to_string);
    let results = body
        .get_mut("results")
        .map(Value::take)
        .filter(|r| !r.is_null());
    let (Some(query), Some(results)) = (query, results) else {
        return Err(ApiError::InvalidInput(
            "query and results are required".to_string(),
        ));
    };

    let map = state
        .maps
        .save(&session_id, &query, results)
        .await
        .map_err(map_error("Failed to save map"))?;
    Ok(Json(json!({ "mapId": map.id, "createdAt": map.created_at })))
}

/// `GET /maps`: a single map with `?id=`, otherwise the caller's maps.
/// `?sessionId=` overrides the cookie for listing.
pub async fn list_maps(
    State(state): State<Arc<AppState>>,
    SessionCookie(cookie): SessionCookie,
    Query(params): Query<MapsParams>,
) -> Result<Response, ApiError> {
    if let Some(id) = params.id.filter(|id| !id.is_empty()) {
        return fetch_one(&state, cookie.as_deref(), &id)
            .await
            .map(IntoResponse::into_response);
    }

    let session_id = params
        .session_id
        .filter(|s| !s.is_empty())
        .or(cookie)
        .ok_or(ApiError::Unauthenticated)?;
    let maps = state
        .maps
        .list(&session_id)
        .await
        .map_err(map_error("Failed to fetch maps"))?;
    let rows: Vec<MapSummary> = maps.into_iter().map(MapSummary::from).collect();
    Ok(Json(rows).into_response())
}

/// `GET /maps/{id}`
pub async fn get_map(
    State(state): State<Arc<AppState>>,
    SessionCookie(cookie): SessionCookie,
    Path(id): Path<String>,
) -> Result<Json<MapDetail>, ApiError> {
    fetch_one(&state, cookie.as_deref(), &id).await
}

/// `DELETE /maps/{id}`
pub async fn delete_map(
    State(state): State<Arc<AppState>>,
    RequiredSession(session_id): RequiredSession,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .maps
        .delete(&session_id, &id)
        .await
        .map_err(map_error("Failed to delete map"))?;
    Ok(Json(json!({ "success": true })))
}

async fn fetch_one(
    state: &AppState,
    session_id: Option<&str>,
    id: &str,
) -> Result<Json<MapDetail>, ApiError> {
    let map = state
        .maps
        .get(session_id, id)
        .await
        .map_err(map_error("Failed to fetch map"))?;
    Ok(Json(MapDetail::from(map)))
}
