//! HTTP route handlers for the travels server.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::response::Response;

use super::metrics::Metrics;
use super::request::{LocationAvgParams, UserVisitsParams};
use super::response::{json_response, mutation_response, ApiError};
use crate::codec::{self, format_avg, round_avg};
use crate::model::UserVisitsResult;
use crate::travels::TravelDb;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<TravelDb>,
    /// Fixed "now" for the age filters (data-generation timestamp).
    pub now: i64,
    pub metrics: Arc<Metrics>,
}

/// Path ids are plain non-negative decimals; anything else is an unknown
/// resource, not a malformed request.
fn parse_id(raw: &str) -> Result<u32, ApiError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiError::not_found());
    }
    raw.parse().map_err(|_| ApiError::not_found())
}

// ---- users ----

/// Handle POST /users/new
pub async fn create_user(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let user = codec::parse_user_patch(&body)?.into_new()?;
    state.db.create_user(user)?;
    Ok(mutation_response())
}

/// Handle POST /users/{id}
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let patch = codec::parse_user_patch(&body)?;
    state.db.update_user(id, patch)?;
    Ok(mutation_response())
}

/// Handle GET /users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    Ok(json_response(state.db.get_user_json(id)?))
}

/// Handle GET /users/{id}/visits
pub async fn get_user_visits(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<UserVisitsParams>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let query = params.into_query()?;
    let visits = state.db.get_user_visits(id, &query)?;
    let body = serde_json::to_vec(&UserVisitsResult { visits })
        .expect("visits serialization cannot fail");
    Ok(json_response(body.into()))
}

// ---- locations ----

/// Handle POST /locations/new
pub async fn create_location(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let location = codec::parse_location_patch(&body)?.into_new()?;
    state.db.create_location(location)?;
    Ok(mutation_response())
}

/// Handle POST /locations/{id}
pub async fn update_location(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let patch = codec::parse_location_patch(&body)?;
    state.db.update_location(id, patch)?;
    Ok(mutation_response())
}

/// Handle GET /locations/{id}
pub async fn get_location(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    Ok(json_response(state.db.get_location_json(id)?))
}

/// Handle GET /locations/{id}/avg
pub async fn get_location_avg(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<LocationAvgParams>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let query = params.into_query()?;
    let avg = state.db.get_location_avg(id, &query, state.now)?;
    let body = format!(r#"{{"avg":{}}}"#, format_avg(round_avg(avg)));
    Ok(json_response(body.into()))
}

// ---- visits ----

/// Handle POST /visits/new
///
/// A reference to an unknown user or location is a 400 here, not a 404.
pub async fn create_visit(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let visit = codec::parse_visit_patch(&body)?.into_new()?;
    state.db.create_visit(visit).map_err(ApiError::for_create)?;
    Ok(mutation_response())
}

/// Handle POST /visits/{id}
pub async fn update_visit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let patch = codec::parse_visit_patch(&body)?;
    state.db.update_visit(id, patch)?;
    Ok(mutation_response())
}

/// Handle GET /visits/{id}
pub async fn get_visit(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    Ok(json_response(state.db.get_visit_json(id)?))
}

// ---- operational ----

/// Handle GET /metrics - Prometheus text format.
pub async fn metrics(State(state): State<AppState>) -> String {
    state.metrics.refresh_entities(state.db.stats());
    state.metrics.encode()
}

/// Fallback for unknown routes.
pub async fn not_found() -> ApiError {
    ApiError::not_found()
}
