//! REST handlers for the `/todos` resource.
//!
//! Request flow: extract → (gate, for protected verbs) → store call → map
//! the typed outcome to a wire response. The `?` conversions in
//! [`crate::error::AppError`] do the mapping; handlers stay declarative.

use crate::error::AppError;
use crate::extractors::BasicAuth;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, RawQuery, State, rejection::JsonRejection},
    http::StatusCode,
};
use todo_relay_core::{ListParams, Todo, TodoId};

/// `GET /todos` — always 200 with a (possibly empty) JSON array.
///
/// Pagination is advisory: the query string is picked apart by hand
/// (`RawQuery` cannot reject) and the raw values go through
/// [`ListParams::from_raw`], so duplicate keys, non-numeric values and
/// other garbage all degrade to defaults instead of failing the request.
pub async fn list(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Json<Vec<Todo>> {
    let (offset, limit) = pagination_values(query.as_deref());
    let params = ListParams::from_raw(offset.as_deref(), limit.as_deref());
    Json(state.store.list(params).await)
}

/// Pulls the last `offset`/`limit` values out of a raw query string.
fn pagination_values(query: Option<&str>) -> (Option<String>, Option<String>) {
    let mut offset = None;
    let mut limit = None;

    for pair in query.unwrap_or_default().split('&') {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        match key {
            "offset" => offset = Some(value.to_string()),
            "limit" => limit = Some(value.to_string()),
            _ => {}
        }
    }

    (offset, limit)
}

/// `POST /todos` — 201 with the stored todo, 409 on a duplicate id,
/// 400 on a malformed body. Open per the auth policy.
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<Todo>, JsonRejection>,
) -> Result<(StatusCode, Json<Todo>), AppError> {
    let Json(todo) = body.map_err(|e| AppError::bad_request(e.body_text()))?;
    let stored = state.store.create(todo).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// `PUT /todos/:id` — protected; 200 with the new state, 401 on bad
/// credentials, 404 on an unknown id. The path id is authoritative; the
/// body's `id` field is ignored.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    auth: BasicAuth,
    body: Result<Json<Todo>, JsonRejection>,
) -> Result<Json<Todo>, AppError> {
    state.auth.check(&auth.username, &auth.password)?;

    let Json(todo) = body.map_err(|e| AppError::bad_request(e.body_text()))?;
    let updated = state
        .store
        .update(TodoId(id), todo.text, todo.completed)
        .await?;
    Ok(Json(updated))
}

/// `DELETE /todos/:id` — protected; 204, 401 on bad credentials, 404 on
/// an unknown id.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    auth: BasicAuth,
) -> Result<StatusCode, AppError> {
    state.auth.check(&auth.username, &auth.password)?;

    state.store.delete(TodoId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
