//! Link-graph read endpoints: outgoing links, backlinks, unlinked
//! mentions, and related-note suggestions
//!
//! All of these are derived views over edges the save pipeline maintains;
//! none of them write anything.
//!
//! # Endpoints
//!
//! - `GET /api/notes/:id/links` - Outgoing links, including unresolved ones
//! - `GET /api/notes/:id/backlinks` - Notes linking here, with excerpts
//! - `GET /api/notes/:id/mentions` - Plain-text title mentions, unlinked
//! - `GET /api/notes/:id/related` - Ranked related-note suggestions

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::api::{AppState, HttpError};
use ravel_core::{BacklinkGroup, OutgoingLink, RelatedNote, UnlinkedMention};

/// Default suggestion count for the related endpoint
const DEFAULT_RELATED_LIMIT: usize = 10;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BacklinksResponse {
    pub backlinks: Vec<BacklinkGroup>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MentionsResponse {
    pub unlinked_mentions: Vec<UnlinkedMention>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedResponse {
    pub related: Vec<RelatedNote>,
}

/// Query parameters for related-note suggestions
#[derive(Debug, Deserialize)]
pub struct RelatedQuery {
    /// Comma-separated note IDs the client visited recently
    recent: Option<String>,

    /// Maximum number of suggestions (default 10)
    limit: Option<usize>,
}

/// Outgoing links of a note
///
/// Unresolved wikilinks appear with a `missing:<title>` id and
/// `resolved: false` so clients can offer to create the target.
async fn outgoing_links(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<OutgoingLink>>, HttpError> {
    let links = state.notes.outgoing_links(&id).await?;
    Ok(Json(links))
}

/// Backlinks of a note, grouped per linking note
///
/// ```bash
/// curl http://localhost:4300/api/notes/<id>/backlinks
/// # => {"backlinks": [{"source": {...}, "contexts": ["...excerpt..."], "mentionCount": 1}]}
/// ```
async fn backlinks(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BacklinksResponse>, HttpError> {
    let backlinks = state.backlinks.backlinks(&id).await?;
    Ok(Json(BacklinksResponse { backlinks }))
}

/// Unlinked plain-text mentions of a note's title
async fn unlinked_mentions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MentionsResponse>, HttpError> {
    let unlinked_mentions = state.backlinks.unlinked_mentions(&id).await?;
    Ok(Json(MentionsResponse { unlinked_mentions }))
}

/// Related-note suggestions
///
/// # Query Parameters
///
/// - `recent` (optional): comma-separated note IDs the client visited
///   recently, folded into the candidate pool
/// - `limit` (optional): maximum suggestions, default 10
///
/// Notes this note already links to are filtered out here: suggesting a
/// note the user explicitly connected adds nothing.
async fn related_notes(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<RelatedQuery>,
) -> Result<Json<RelatedResponse>, HttpError> {
    let recent_ids: Vec<String> = params
        .recent
        .as_deref()
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    let limit = params.limit.unwrap_or(DEFAULT_RELATED_LIMIT);

    let linked: HashSet<String> = state
        .notes
        .outgoing_links(&id)
        .await?
        .into_iter()
        .filter(|link| link.resolved)
        .map(|link| link.id)
        .collect();

    // Rank a few extra so the filter below can still fill the limit.
    let ranked = state
        .related
        .rank(&id, &recent_ids, limit + linked.len())
        .await?;

    let related: Vec<RelatedNote> = ranked
        .into_iter()
        .filter(|r| !linked.contains(&r.note_id))
        .take(limit)
        .collect();

    Ok(Json(RelatedResponse { related }))
}

/// Create router with all link-graph read endpoints
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/notes/:id/links", get(outgoing_links))
        .route("/api/notes/:id/backlinks", get(backlinks))
        .route("/api/notes/:id/mentions", get(unlinked_mentions))
        .route("/api/notes/:id/related", get(related_notes))
        .with_state(state)
}
