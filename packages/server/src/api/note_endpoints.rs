//! Note CRUD, save, folder, and periodic-note endpoints
//!
//! These endpoints expose the note lifecycle. Saving a body goes through
//! `POST /api/notes/:id/save`, which is the boundary that re-scans the
//! body and reconciles links and tags.
//!
//! # Endpoints
//!
//! - `GET /api/health` - Health check endpoint
//! - `POST /api/notes` - Create a new note
//! - `GET /api/notes` - List notes, optionally filtered or searched
//! - `GET /api/notes/:id` - Get a note by ID
//! - `PATCH /api/notes/:id` - Update a note
//! - `DELETE /api/notes/:id` - Delete a note
//! - `POST /api/notes/:id/save` - Save a note body and reconcile its graph
//! - `POST /api/notes/periodic` - Get or create a daily/weekly/monthly note
//! - `POST /api/folders` - Create a folder
//! - `GET /api/folders` - List folders
//! - `DELETE /api/folders/:id` - Delete a folder (notes are orphaned)

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{delete, get, patch, post},
    Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{AppState, HttpError};
use ravel_core::services::{CreateNoteParams, PeriodicKind};
use ravel_core::{DeleteResult, Folder, Note, NoteUpdate, SaveOutcome};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

/// Query parameters for listing notes
#[derive(Debug, Deserialize)]
pub struct ListNotesQuery {
    /// Case-insensitive substring to search titles and bodies for
    q: Option<String>,

    /// Folder ID to filter by (ignored when `q` is present)
    folder_id: Option<String>,

    /// Maximum number of notes to return
    limit: Option<usize>,
}

/// Request body for saving a note
#[derive(Debug, Deserialize)]
pub struct SaveNoteRequest {
    pub body: String,
}

/// Request body for the periodic-note endpoint
#[derive(Debug, Deserialize)]
pub struct PeriodicRequest {
    /// "daily", "weekly", or "monthly"
    pub kind: PeriodicKind,

    /// Anchor date as `YYYY-MM-DD`; today (UTC) when omitted
    pub date: Option<String>,
}

/// Request body for creating a folder
#[derive(Debug, Deserialize)]
pub struct CreateFolderRequest {
    pub name: String,
}

/// Health check endpoint
///
/// # Example
///
/// ```bash
/// curl http://localhost:4300/api/health
/// ```
async fn health_check() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Create a new note
///
/// # Request Body
///
/// ```bash
/// curl -X POST http://localhost:4300/api/notes \
///   -H "Content-Type: application/json" \
///   -d '{"title": "Budget", "body": "Numbers for [[Plan]]"}'
/// ```
///
/// The body is scanned on create, so wikilinks and hashtags written at
/// creation time land in the graph immediately.
async fn create_note(
    State(state): State<AppState>,
    Json(params): Json<CreateNoteParams>,
) -> Result<Json<Note>, HttpError> {
    let note = state.notes.create_note(params).await.map_err(|e| {
        tracing::error!("❌ Note creation failed: {}", e);
        HttpError::from(e)
    })?;

    tracing::debug!("✅ Created note: {}", note.id);
    Ok(Json(note))
}

/// List notes, newest first
///
/// # Query Parameters
///
/// - `q` (optional): search titles and bodies for a substring
/// - `folder_id` (optional): only notes in this folder
/// - `limit` (optional): cap the result count
async fn list_notes(
    State(state): State<AppState>,
    Query(params): Query<ListNotesQuery>,
) -> Result<Json<Vec<Note>>, HttpError> {
    let notes = match params.q {
        Some(ref q) if !q.trim().is_empty() => {
            state.notes.search_notes(q, params.limit).await?
        }
        _ => {
            state
                .notes
                .list_notes(params.folder_id.as_deref(), params.limit)
                .await?
        }
    };

    Ok(Json(notes))
}

/// Get a note by ID
async fn get_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Note>, HttpError> {
    let note = state.notes.get_note(&id).await?;
    Ok(Json(note))
}

/// Update a note's title, body, or folder
///
/// Fields are optional; absent fields keep their value. Updating the body
/// triggers the same reconciliation as a save.
///
/// ```bash
/// curl -X PATCH http://localhost:4300/api/notes/<id> \
///   -H "Content-Type: application/json" \
///   -d '{"title": "Budget 2026"}'
/// ```
async fn update_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<NoteUpdate>,
) -> Result<Json<Note>, HttpError> {
    let note = state.notes.update_note(&id, update).await.map_err(|e| {
        tracing::error!("❌ Note update failed for {}: {}", id, e);
        HttpError::from(e)
    })?;

    Ok(Json(note))
}

/// Delete a note by ID
///
/// Idempotent: deleting an unknown ID reports `existed: false`.
async fn delete_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResult>, HttpError> {
    let result = state.notes.delete_note(&id).await?;

    tracing::debug!("✅ Deleted note: {}", id);
    Ok(Json(result))
}

/// Save a note body and reconcile its links and tags
///
/// This is the endpoint editors call on every save. The response reports
/// what the scan found:
///
/// ```bash
/// curl -X POST http://localhost:4300/api/notes/<id>/save \
///   -H "Content-Type: application/json" \
///   -d '{"body": "Prep [[Budget]] for the #q3 review"}'
/// # => {"resolvedLinks": 1, "unresolvedTitles": [], "tags": [...]}
/// ```
async fn save_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SaveNoteRequest>,
) -> Result<Json<SaveOutcome>, HttpError> {
    let outcome = state.notes.save_note(&id, &req.body).await.map_err(|e| {
        tracing::error!("❌ Save failed for note {}: {}", id, e);
        HttpError::from(e)
    })?;

    Ok(Json(outcome))
}

/// Get or create the daily/weekly/monthly note for a date
///
/// ```bash
/// curl -X POST http://localhost:4300/api/notes/periodic \
///   -H "Content-Type: application/json" \
///   -d '{"kind": "weekly", "date": "2026-01-05"}'
/// ```
async fn periodic_note(
    State(state): State<AppState>,
    Json(req): Json<PeriodicRequest>,
) -> Result<Json<Note>, HttpError> {
    let date = match req.date {
        Some(ref raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
            HttpError::new(
                format!("Invalid date '{}'. Expected YYYY-MM-DD", raw),
                "INVALID_INPUT",
            )
        })?,
        None => Utc::now().date_naive(),
    };

    let note = state.notes.get_or_create_periodic(req.kind, date).await?;
    Ok(Json(note))
}

/// Create a folder
async fn create_folder(
    State(state): State<AppState>,
    Json(req): Json<CreateFolderRequest>,
) -> Result<Json<Folder>, HttpError> {
    let folder = state.notes.create_folder(&req.name).await?;
    Ok(Json(folder))
}

/// List all folders
async fn list_folders(State(state): State<AppState>) -> Result<Json<Vec<Folder>>, HttpError> {
    let folders = state.notes.list_folders().await?;
    Ok(Json(folders))
}

/// Delete a folder; its notes lose their folder assignment
async fn delete_folder(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResult>, HttpError> {
    let result = state.notes.delete_folder(&id).await?;
    Ok(Json(result))
}

/// Create router with all note and folder endpoints
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/notes", post(create_note))
        .route("/api/notes", get(list_notes))
        .route("/api/notes/periodic", post(periodic_note))
        .route("/api/notes/:id", get(get_note))
        .route("/api/notes/:id", patch(update_note))
        .route("/api/notes/:id", delete(delete_note))
        .route("/api/notes/:id/save", post(save_note))
        .route("/api/folders", post(create_folder))
        .route("/api/folders", get(list_folders))
        .route("/api/folders/:id", delete(delete_folder))
        .with_state(state)
}
