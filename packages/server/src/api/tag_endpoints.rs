//! Tag endpoints
//!
//! Tags are global entities shared across notes. The save pipeline creates
//! them from hashtags automatically; `POST /api/tags` exists for clients
//! that manage tags directly, including nested names like `project/alpha`
//! that the hashtag scanner never produces.
//!
//! # Endpoints
//!
//! - `GET /api/tags` - List all tags
//! - `POST /api/tags` - Upsert a tag by name
//! - `GET /api/notes/:id/tags` - Tags associated with one note

use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;

use crate::api::{AppState, HttpError};
use ravel_core::Tag;

/// Request body for upserting a tag
#[derive(Debug, Deserialize)]
pub struct UpsertTagRequest {
    pub name: String,
}

/// List every tag, alphabetically
async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<Tag>>, HttpError> {
    let tags = state.notes.list_tags().await?;
    Ok(Json(tags))
}

/// Upsert a tag by name
///
/// Returns the existing tag when the name is already taken, so clients
/// can treat this as get-or-create.
async fn upsert_tag(
    State(state): State<AppState>,
    Json(req): Json<UpsertTagRequest>,
) -> Result<Json<Tag>, HttpError> {
    let tag = state.notes.upsert_tag(&req.name).await?;
    Ok(Json(tag))
}

/// Tags currently associated with a note
async fn note_tags(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Tag>>, HttpError> {
    let tags = state.notes.tags_for_note(&id).await?;
    Ok(Json(tags))
}

/// Create router with all tag endpoints
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/tags", get(list_tags))
        .route("/api/tags", post(upsert_tag))
        .route("/api/notes/:id/tags", get(note_tags))
        .with_state(state)
}
