//! Presence endpoints
//!
//! Clients viewing a note POST a heartbeat every few seconds; reads return
//! the clients whose last heartbeat falls inside a freshness window.
//!
//! # Endpoints
//!
//! - `POST /api/notes/:id/presence` - Record a viewer heartbeat
//! - `GET /api/notes/:id/presence` - Active viewers of a note

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;

use crate::api::{AppState, HttpError};
use ravel_core::PresenceEntry;

/// Heartbeat request body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatRequest {
    /// Opaque identifier the client picks for itself
    pub client_id: String,

    /// Name to show other viewers
    pub display_name: String,
}

/// Query parameters for the viewers read
#[derive(Debug, Deserialize)]
pub struct ViewersQuery {
    /// Freshness window in seconds (default 30)
    window: Option<u64>,
}

/// Record a viewer heartbeat
///
/// ```bash
/// curl -X POST http://localhost:4300/api/notes/<id>/presence \
///   -H "Content-Type: application/json" \
///   -d '{"clientId": "tab-1", "displayName": "Ada"}'
/// ```
async fn heartbeat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<HeartbeatRequest>,
) -> Result<StatusCode, HttpError> {
    state
        .presence
        .heartbeat(&id, &req.client_id, &req.display_name)
        .await?;
    Ok(StatusCode::OK)
}

/// Active viewers of a note, newest heartbeat first
async fn viewers(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ViewersQuery>,
) -> Result<Json<Vec<PresenceEntry>>, HttpError> {
    let entries = state.presence.viewers(&id, params.window).await?;
    Ok(Json(entries))
}

/// Create router with all presence endpoints
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/notes/:id/presence", post(heartbeat))
        .route("/api/notes/:id/presence", get(viewers))
        .with_state(state)
}
