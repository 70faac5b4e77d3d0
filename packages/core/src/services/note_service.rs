//! Note Service - Core CRUD and Reconciliation
//!
//! This module provides the main business logic layer for note operations:
//!
//! - CRUD operations (create, read, update, delete) for notes and folders
//! - The "note saved" pipeline: body persist, then link + tag reconciliation
//! - Wikilink resolution (exact title match, deterministic tie-break,
//!   self-link suppression)
//! - Outgoing-link listings with `missing:<title>` placeholders
//! - Periodic (daily/weekly/monthly) note lookup-or-create
//!
//! # Reconciliation Model
//!
//! A note's outgoing edges and tag associations are fully owned by its
//! current body. Every save recomputes both sets from scratch and swaps them
//! in transactionally; there is no incremental diffing. A reconciliation
//! failure after the body write surfaces as
//! [`NoteServiceError::ReconciliationFailed`] so callers can tell it apart
//! from a failed save: the body is persisted, the previous edge set is
//! intact.

use crate::db::NoteStore;
use crate::models::{
    validate_tag_name, DeleteResult, Folder, Note, NoteUpdate, OutgoingLink, SaveOutcome, Tag,
    ValidationError, MAX_TITLE_LEN,
};
use crate::services::error::NoteServiceError;
use crate::services::markup;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Default result cap for list/search queries when the caller gives none.
const DEFAULT_QUERY_LIMIT: usize = 50;

/// Parameters for creating a note
///
/// # ID Generation Strategy
///
/// The `id` field supports two scenarios:
///
/// 1. **Caller-provided UUID**: clients pre-generate ids for optimistic UI
///    updates, keeping client and server state in sync.
/// 2. **Auto-generated UUID**: when `id` is `None`, the service generates
///    one. The database enforces uniqueness either way.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteParams {
    /// Optional id for the note. If None, a UUID v4 is generated
    pub id: Option<String>,
    /// Display title (may be empty, capped at 500 characters)
    #[serde(default)]
    pub title: String,
    /// Body markup source
    #[serde(default)]
    pub body: String,
    /// Optional folder to file the note under (must exist)
    pub folder_id: Option<String>,
}

/// Which periodic note a title should encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodicKind {
    Daily,
    Weekly,
    Monthly,
}

/// Deterministic title for a periodic note.
///
/// Daily notes use `YYYY-MM-DD`, weekly notes `YYYY-Www` (ISO week, so the
/// year is the ISO week-year, not the calendar year), monthly notes
/// `YYYY-MM`.
pub fn periodic_title(kind: PeriodicKind, date: NaiveDate) -> String {
    match kind {
        PeriodicKind::Daily => date.format("%Y-%m-%d").to_string(),
        PeriodicKind::Weekly => {
            let week = date.iso_week();
            format!("{}-W{:02}", week.year(), week.week())
        }
        PeriodicKind::Monthly => date.format("%Y-%m").to_string(),
    }
}

/// Outcome of resolving a set of wikilink titles for one note.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinkResolution {
    /// Ids of existing notes the titles resolved to (self excluded)
    pub resolved_targets: Vec<String>,

    /// Titles with no matching note, in order of first appearance
    pub unresolved_titles: Vec<String>,
}

/// Business logic layer for notes, folders, and the link/tag graph.
///
/// All persistence goes through the [`NoteStore`] trait; the service holds
/// no state beyond the store handle and is cheap to clone.
///
/// # Examples
///
/// ```no_run
/// use ravel_core::db::{DatabaseService, NoteStore, TursoStore};
/// use ravel_core::services::NoteService;
/// use std::path::PathBuf;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let db = Arc::new(DatabaseService::new(PathBuf::from("./data/ravel.db")).await?);
///     let store: Arc<dyn NoteStore> = Arc::new(TursoStore::new(db));
///     let service = NoteService::new(store);
///
///     let note = service
///         .create_note(ravel_core::services::CreateNoteParams {
///             id: None,
///             title: "Budget".to_string(),
///             body: "Numbers for [[Plan]]".to_string(),
///             folder_id: None,
///         })
///         .await?;
///     println!("Created note: {}", note.id);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct NoteService {
    /// Store for all persistence operations
    store: Arc<dyn NoteStore>,
}

impl NoteService {
    /// Create a new NoteService over a store handle.
    pub fn new(store: Arc<dyn NoteStore>) -> Self {
        Self { store }
    }

    /// Get access to the underlying store
    ///
    /// Useful for read paths that bypass business logic (tests, admin
    /// tooling).
    pub fn store(&self) -> &Arc<dyn NoteStore> {
        &self.store
    }

    //
    // NOTE CRUD
    //

    /// Create a note and run the reconciliation pipeline on its body.
    ///
    /// # Arguments
    ///
    /// * `params` - Title/body/folder plus an optional caller-supplied id
    ///
    /// # Errors
    ///
    /// * [`NoteServiceError::ValidationFailed`] - title over the cap or
    ///   unknown folder reference
    /// * [`NoteServiceError::ReconciliationFailed`] - the note was stored
    ///   but its links/tags could not be reconciled
    pub async fn create_note(&self, params: CreateNoteParams) -> Result<Note, NoteServiceError> {
        if let Some(folder_id) = &params.folder_id {
            self.require_folder(folder_id).await?;
        }

        let note = match params.id {
            Some(id) => Note::with_id(id, params.title, params.body, params.folder_id),
            None => Note::new(params.title, params.body, params.folder_id),
        };
        note.validate()?;

        let stored = self
            .store
            .create_note(note)
            .await
            .map_err(|e| NoteServiceError::query_failed(format!("Failed to create note: {}", e)))?;

        tracing::debug!("Created note {} ({:?})", stored.id, stored.title);

        self.reconcile_body(&stored.id, &stored.body)
            .await
            .map_err(into_reconciliation_error)?;

        Ok(stored)
    }

    /// Get a note by id.
    ///
    /// # Errors
    ///
    /// Returns [`NoteServiceError::NoteNotFound`] when no note has that id.
    pub async fn get_note(&self, id: &str) -> Result<Note, NoteServiceError> {
        self.store
            .get_note(id)
            .await
            .map_err(|e| NoteServiceError::query_failed(format!("Failed to get note: {}", e)))?
            .ok_or_else(|| NoteServiceError::note_not_found(id))
    }

    /// Apply a sparse update to a note.
    ///
    /// Only the provided fields change. A body change re-runs the full
    /// link/tag reconciliation pipeline; a title change does not touch
    /// existing edges (backlink contexts go stale instead, which the
    /// context builder tolerates).
    pub async fn update_note(
        &self,
        id: &str,
        update: NoteUpdate,
    ) -> Result<Note, NoteServiceError> {
        if let Some(title) = &update.title {
            let len = title.chars().count();
            if len > MAX_TITLE_LEN {
                return Err(ValidationError::TitleTooLong {
                    actual: len,
                    max: MAX_TITLE_LEN,
                }
                .into());
            }
        }
        if let Some(Some(folder_id)) = &update.folder_id {
            self.require_folder(folder_id).await?;
        }

        let body_changed = update.body.clone();

        let updated = self
            .store
            .update_note(id, update)
            .await
            .map_err(|e| NoteServiceError::query_failed(format!("Failed to update note: {}", e)))?
            .ok_or_else(|| NoteServiceError::note_not_found(id))?;

        if let Some(body) = body_changed {
            self.reconcile_body(id, &body)
                .await
                .map_err(into_reconciliation_error)?;
        }

        Ok(updated)
    }

    /// Delete a note together with its graph edges.
    ///
    /// Edges where the note is source or target are removed explicitly;
    /// schema-level cascades cover tag associations and presence rows.
    /// Idempotent: deleting an unknown id reports `existed: false` rather
    /// than erroring.
    pub async fn delete_note(&self, id: &str) -> Result<DeleteResult, NoteServiceError> {
        self.store.delete_links_for_note(id).await.map_err(|e| {
            NoteServiceError::query_failed(format!("Failed to delete links for note: {}", e))
        })?;

        let result = self
            .store
            .delete_note(id)
            .await
            .map_err(|e| NoteServiceError::query_failed(format!("Failed to delete note: {}", e)))?;

        if result.existed {
            tracing::debug!("Deleted note {}", id);
        }
        Ok(result)
    }

    /// List notes, newest-updated first, optionally scoped to a folder.
    pub async fn list_notes(
        &self,
        folder_id: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<Note>, NoteServiceError> {
        self.store
            .list_notes(folder_id, limit)
            .await
            .map_err(|e| NoteServiceError::query_failed(format!("Failed to list notes: {}", e)))
    }

    /// Case-insensitive substring search over titles and bodies.
    pub async fn search_notes(
        &self,
        query: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Note>, NoteServiceError> {
        self.store
            .search_notes(query, limit.unwrap_or(DEFAULT_QUERY_LIMIT))
            .await
            .map_err(|e| NoteServiceError::query_failed(format!("Failed to search notes: {}", e)))
    }

    //
    // SAVE PIPELINE
    //

    /// Persist a note body, then reconcile its links and tags.
    ///
    /// This is the "note saved" boundary. The body write and the
    /// reconciliation are separate steps: when the write succeeds but the
    /// reconciliation fails, the error is
    /// [`NoteServiceError::ReconciliationFailed`] and the body is already
    /// saved (the previous edge/tag sets stay intact thanks to the
    /// transactional replace).
    ///
    /// # Returns
    ///
    /// What the scan found: count of resolved links, unresolved titles in
    /// order of first appearance, and the note's reconciled tag set.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use ravel_core::db::{DatabaseService, NoteStore, TursoStore};
    /// # use ravel_core::services::NoteService;
    /// # use std::sync::Arc;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// # let db = Arc::new(DatabaseService::new("./ravel.db".into()).await?);
    /// # let store: Arc<dyn NoteStore> = Arc::new(TursoStore::new(db));
    /// # let service = NoteService::new(store);
    /// let outcome = service
    ///     .save_note("note-id", "See [[Budget]] for the #finance numbers")
    ///     .await?;
    /// println!(
    ///     "{} resolved, {} unresolved, {} tags",
    ///     outcome.resolved_links,
    ///     outcome.unresolved_titles.len(),
    ///     outcome.tags.len()
    /// );
    /// # Ok(())
    /// # }
    /// ```
    pub async fn save_note(
        &self,
        note_id: &str,
        body: &str,
    ) -> Result<SaveOutcome, NoteServiceError> {
        let updated = self.store.update_note_body(note_id, body).await.map_err(|e| {
            NoteServiceError::query_failed(format!("Failed to save note body: {}", e))
        })?;
        if updated.is_none() {
            return Err(NoteServiceError::note_not_found(note_id));
        }

        tracing::debug!("Saved body for note {}, reconciling links and tags", note_id);

        self.reconcile_body(note_id, body)
            .await
            .map_err(into_reconciliation_error)
    }

    /// Recompute a note's edges and tags from a body and swap them in.
    async fn reconcile_body(
        &self,
        note_id: &str,
        body: &str,
    ) -> Result<SaveOutcome, NoteServiceError> {
        let titles = markup::extract_wikilinks(body);
        let resolution = self.resolve_links(note_id, &titles).await?;

        self.store
            .replace_outgoing_links(note_id, &resolution.resolved_targets)
            .await
            .map_err(|e| {
                NoteServiceError::reconciliation_failed(format!(
                    "Failed to replace outgoing links for {}: {}",
                    note_id, e
                ))
            })?;

        let tags = self.reconcile_tags(note_id, body).await?;

        Ok(SaveOutcome {
            resolved_links: resolution.resolved_targets.len(),
            unresolved_titles: resolution.unresolved_titles,
            tags,
        })
    }

    //
    // LINK RESOLUTION
    //

    /// Resolve wikilink titles to target note ids.
    ///
    /// Each distinct title gets an exact, case-sensitive lookup. When
    /// several notes share the title, the canonical match is the
    /// earliest-created one (ties broken by lowest id). A canonical match
    /// equal to the resolving note itself is silently dropped, not
    /// reported as unresolved.
    pub async fn resolve_links(
        &self,
        note_id: &str,
        titles: &[String],
    ) -> Result<LinkResolution, NoteServiceError> {
        let mut seen = HashSet::new();
        let mut resolution = LinkResolution::default();

        for title in titles {
            if !seen.insert(title.as_str()) {
                continue;
            }

            let matches = self.store.find_notes_by_title(title).await.map_err(|e| {
                NoteServiceError::query_failed(format!("Failed to resolve title: {}", e))
            })?;

            match matches.first() {
                Some(canonical) if canonical.id == note_id => {
                    tracing::debug!("Skipping self-link: {} -> [[{}]]", note_id, title);
                }
                Some(canonical) => resolution.resolved_targets.push(canonical.id.clone()),
                None => resolution.unresolved_titles.push(title.clone()),
            }
        }

        Ok(resolution)
    }

    /// List a note's outgoing links, resolved and unresolved.
    ///
    /// Resolved entries come from the stored edge set; unresolved titles
    /// are recomputed from the current body and reported with synthetic
    /// `missing:<title>` ids so clients can offer a create affordance.
    pub async fn outgoing_links(&self, note_id: &str) -> Result<Vec<OutgoingLink>, NoteServiceError> {
        let note = self.get_note(note_id).await?;

        let targets = self.store.outgoing_link_targets(note_id).await.map_err(|e| {
            NoteServiceError::query_failed(format!("Failed to get outgoing links: {}", e))
        })?;

        let mut links: Vec<OutgoingLink> = targets
            .into_iter()
            .map(|summary| OutgoingLink {
                id: summary.id,
                title: summary.title,
                resolved: true,
            })
            .collect();

        let titles = markup::extract_wikilinks(&note.body);
        let resolution = self.resolve_links(note_id, &titles).await?;
        links.extend(resolution.unresolved_titles.into_iter().map(OutgoingLink::missing));

        Ok(links)
    }

    //
    // TAG RECONCILIATION
    //

    /// Reconcile a note's tag associations from its body.
    ///
    /// Extracted hashtag names are deduplicated and upserted by name (an
    /// existing tag is reused, never duplicated); the note's association
    /// rows are then replaced wholesale. A body with no hashtags clears
    /// the associations. Tag entities themselves are never deleted here,
    /// even when they end up unreferenced.
    pub async fn reconcile_tags(
        &self,
        note_id: &str,
        body: &str,
    ) -> Result<Vec<Tag>, NoteServiceError> {
        let mut seen = HashSet::new();
        let mut tags = Vec::new();

        for name in markup::extract_hashtags(body) {
            if !seen.insert(name.clone()) {
                continue;
            }
            if let Err(e) = validate_tag_name(&name) {
                tracing::warn!("Skipping hashtag {:?} in note {}: {}", name, note_id, e);
                continue;
            }

            let tag = self.store.upsert_tag(&name).await.map_err(|e| {
                NoteServiceError::reconciliation_failed(format!(
                    "Failed to upsert tag {:?}: {}",
                    name, e
                ))
            })?;
            tags.push(tag);
        }

        let tag_ids: Vec<String> = tags.iter().map(|t| t.id.clone()).collect();
        self.store
            .replace_note_tags(note_id, &tag_ids)
            .await
            .map_err(|e| {
                NoteServiceError::reconciliation_failed(format!(
                    "Failed to replace tags for {}: {}",
                    note_id, e
                ))
            })?;

        Ok(tags)
    }

    /// Tags currently associated with a note.
    pub async fn tags_for_note(&self, note_id: &str) -> Result<Vec<Tag>, NoteServiceError> {
        self.store
            .tags_for_note(note_id)
            .await
            .map_err(|e| NoteServiceError::query_failed(format!("Failed to get note tags: {}", e)))
    }

    /// All known tags, alphabetically.
    pub async fn list_tags(&self) -> Result<Vec<Tag>, NoteServiceError> {
        self.store
            .list_tags()
            .await
            .map_err(|e| NoteServiceError::query_failed(format!("Failed to list tags: {}", e)))
    }

    /// Upsert a tag by name (direct API path; this is how nested names
    /// like `project/alpha` enter, since the body scanner stops at `/`).
    pub async fn upsert_tag(&self, name: &str) -> Result<Tag, NoteServiceError> {
        validate_tag_name(name)?;
        self.store
            .upsert_tag(name)
            .await
            .map_err(|e| NoteServiceError::query_failed(format!("Failed to upsert tag: {}", e)))
    }

    //
    // FOLDERS
    //

    /// Create a folder.
    pub async fn create_folder(&self, name: &str) -> Result<Folder, NoteServiceError> {
        if name.trim().is_empty() {
            return Err(ValidationError::MissingField("name".to_string()).into());
        }
        self.store
            .create_folder(Folder::new(name.to_string()))
            .await
            .map_err(|e| NoteServiceError::query_failed(format!("Failed to create folder: {}", e)))
    }

    /// List all folders.
    pub async fn list_folders(&self) -> Result<Vec<Folder>, NoteServiceError> {
        self.store
            .list_folders()
            .await
            .map_err(|e| NoteServiceError::query_failed(format!("Failed to list folders: {}", e)))
    }

    /// Delete a folder. Notes filed under it stay, with their folder
    /// reference cleared. Idempotent.
    pub async fn delete_folder(&self, id: &str) -> Result<DeleteResult, NoteServiceError> {
        self.store
            .delete_folder(id)
            .await
            .map_err(|e| NoteServiceError::query_failed(format!("Failed to delete folder: {}", e)))
    }

    async fn require_folder(&self, folder_id: &str) -> Result<(), NoteServiceError> {
        let folder = self.store.get_folder(folder_id).await.map_err(|e| {
            NoteServiceError::query_failed(format!("Failed to look up folder: {}", e))
        })?;
        if folder.is_none() {
            return Err(ValidationError::InvalidFolder(folder_id.to_string()).into());
        }
        Ok(())
    }

    //
    // PERIODIC NOTES
    //

    /// Find or create the periodic note for a date.
    ///
    /// Lookup is by the deterministic title; when duplicates exist the
    /// earliest-created note wins, same as wikilink resolution. Creation
    /// happens on demand, there is no scheduler.
    pub async fn get_or_create_periodic(
        &self,
        kind: PeriodicKind,
        date: NaiveDate,
    ) -> Result<Note, NoteServiceError> {
        let title = periodic_title(kind, date);

        let matches = self.store.find_notes_by_title(&title).await.map_err(|e| {
            NoteServiceError::query_failed(format!("Failed to look up periodic note: {}", e))
        })?;
        if let Some(existing) = matches.into_iter().next() {
            return Ok(existing);
        }

        tracing::debug!("Creating {:?} periodic note {:?}", kind, title);
        self.create_note(CreateNoteParams {
            id: None,
            title,
            body: String::new(),
            folder_id: None,
        })
        .await
    }
}

/// Convert any post-save error into a reconciliation error, preserving one
/// that already is.
fn into_reconciliation_error(e: NoteServiceError) -> NoteServiceError {
    match e {
        e @ NoteServiceError::ReconciliationFailed { .. } => e,
        other => NoteServiceError::reconciliation_failed(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DatabaseService, TursoStore};
    use tempfile::TempDir;

    async fn create_test_service() -> anyhow::Result<(NoteService, TempDir)> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("test.db");
        let db = Arc::new(DatabaseService::new(db_path).await?);
        let store: Arc<dyn NoteStore> = Arc::new(TursoStore::new(db));
        Ok((NoteService::new(store), temp_dir))
    }

    fn params(title: &str, body: &str) -> CreateNoteParams {
        CreateNoteParams {
            id: None,
            title: title.to_string(),
            body: body.to_string(),
            folder_id: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_note() -> anyhow::Result<()> {
        let (service, _dir) = create_test_service().await?;

        let created = service.create_note(params("Plan", "quarterly goals")).await?;
        let fetched = service.get_note(&created.id).await?;

        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.title, "Plan");
        assert_eq!(fetched.body, "quarterly goals");
        Ok(())
    }

    #[tokio::test]
    async fn test_get_missing_note_is_not_found() -> anyhow::Result<()> {
        let (service, _dir) = create_test_service().await?;

        let err = service.get_note("ghost").await.unwrap_err();
        assert!(matches!(err, NoteServiceError::NoteNotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_note_rejects_unknown_folder() -> anyhow::Result<()> {
        let (service, _dir) = create_test_service().await?;

        let err = service
            .create_note(CreateNoteParams {
                folder_id: Some("no-such-folder".to_string()),
                ..params("Plan", "")
            })
            .await
            .unwrap_err();
        assert!(matches!(err, NoteServiceError::ValidationFailed(_)));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_note_rejects_oversized_title() -> anyhow::Result<()> {
        let (service, _dir) = create_test_service().await?;

        let err = service
            .create_note(params(&"x".repeat(MAX_TITLE_LEN + 1), ""))
            .await
            .unwrap_err();
        assert!(matches!(err, NoteServiceError::ValidationFailed(_)));
        Ok(())
    }

    #[tokio::test]
    async fn test_save_note_resolves_wikilinks() -> anyhow::Result<()> {
        let (service, _dir) = create_test_service().await?;

        let budget = service.create_note(params("Budget", "")).await?;
        let note = service.create_note(params("Weekly sync", "")).await?;

        let outcome = service.save_note(&note.id, "See [[Budget]] today").await?;

        assert_eq!(outcome.resolved_links, 1);
        assert!(outcome.unresolved_titles.is_empty());

        let links = service.outgoing_links(&note.id).await?;
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].id, budget.id);
        assert!(links[0].resolved);
        Ok(())
    }

    #[tokio::test]
    async fn test_save_suppresses_self_link() -> anyhow::Result<()> {
        let (service, _dir) = create_test_service().await?;

        let plan = service.create_note(params("Plan", "")).await?;
        let budget = service.create_note(params("Budget", "")).await?;

        let outcome = service
            .save_note(&plan.id, "See [[Plan]] and [[Budget]]")
            .await?;

        assert_eq!(outcome.resolved_links, 1);
        assert!(outcome.unresolved_titles.is_empty());

        let links = service.outgoing_links(&plan.id).await?;
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].id, budget.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_save_reports_unresolved_titles() -> anyhow::Result<()> {
        let (service, _dir) = create_test_service().await?;

        let budget = service.create_note(params("Budget", "")).await?;
        let note = service.create_note(params("Inbox", "")).await?;

        let outcome = service
            .save_note(&note.id, "[[Nowhere]] and [[Budget]]")
            .await?;

        assert_eq!(outcome.resolved_links, 1);
        assert_eq!(outcome.unresolved_titles, vec!["Nowhere"]);

        let links = service.outgoing_links(&note.id).await?;
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].id, budget.id);
        assert!(links[0].resolved);
        assert_eq!(links[1].id, "missing:Nowhere");
        assert_eq!(links[1].title, "Nowhere");
        assert!(!links[1].resolved);
        Ok(())
    }

    #[tokio::test]
    async fn test_save_duplicate_wikilinks_yield_single_edge() -> anyhow::Result<()> {
        let (service, _dir) = create_test_service().await?;

        let budget = service.create_note(params("Budget", "")).await?;
        let note = service.create_note(params("Inbox", "")).await?;

        let outcome = service
            .save_note(&note.id, "[[Budget]] again [[Budget]]")
            .await?;

        assert_eq!(outcome.resolved_links, 1);
        let links = service.outgoing_links(&note.id).await?;
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].id, budget.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_resave_unchanged_body_is_idempotent() -> anyhow::Result<()> {
        let (service, _dir) = create_test_service().await?;

        service.create_note(params("Budget", "")).await?;
        let note = service.create_note(params("Inbox", "")).await?;

        let body = "See [[Budget]] and #finance";
        let first = service.save_note(&note.id, body).await?;
        let second = service.save_note(&note.id, body).await?;

        assert_eq!(first.resolved_links, second.resolved_links);
        assert_eq!(first.unresolved_titles, second.unresolved_titles);
        assert_eq!(first.tags.len(), second.tags.len());

        let links = service.outgoing_links(&note.id).await?;
        assert_eq!(links.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_save_escaped_brackets_parse_as_link() -> anyhow::Result<()> {
        let (service, _dir) = create_test_service().await?;

        let budget = service.create_note(params("Budget", "")).await?;
        let note = service.create_note(params("Inbox", "")).await?;

        // Escape normalization runs before extraction, so the escaped
        // brackets still produce a real edge.
        let outcome = service.save_note(&note.id, r"\[\[Budget\]\]").await?;

        assert_eq!(outcome.resolved_links, 1);
        let links = service.outgoing_links(&note.id).await?;
        assert_eq!(links[0].id, budget.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_unresolved_link_resolves_after_target_created() -> anyhow::Result<()> {
        let (service, _dir) = create_test_service().await?;

        let note = service.create_note(params("Inbox", "")).await?;
        let body = "pending [[Roadmap]]";

        let outcome = service.save_note(&note.id, body).await?;
        assert_eq!(outcome.unresolved_titles, vec!["Roadmap"]);
        assert_eq!(outcome.resolved_links, 0);

        let roadmap = service.create_note(params("Roadmap", "")).await?;

        let outcome = service.save_note(&note.id, body).await?;
        assert_eq!(outcome.resolved_links, 1);
        assert!(outcome.unresolved_titles.is_empty());

        let links = service.outgoing_links(&note.id).await?;
        assert_eq!(links[0].id, roadmap.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_titles_resolve_to_earliest_created() -> anyhow::Result<()> {
        let (service, _dir) = create_test_service().await?;

        service
            .create_note(CreateNoteParams {
                id: Some("a-dup".to_string()),
                ..params("Dup", "")
            })
            .await?;
        service
            .create_note(CreateNoteParams {
                id: Some("b-dup".to_string()),
                ..params("Dup", "")
            })
            .await?;

        let note = service.create_note(params("Inbox", "")).await?;
        service.save_note(&note.id, "[[Dup]]").await?;

        let links = service.outgoing_links(&note.id).await?;
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].id, "a-dup");
        Ok(())
    }

    #[tokio::test]
    async fn test_reconcile_tags_full_replace() -> anyhow::Result<()> {
        let (service, _dir) = create_test_service().await?;

        let note = service.create_note(params("Inbox", "")).await?;

        let outcome = service.save_note(&note.id, "#work and #focus").await?;
        let mut names: Vec<String> = outcome.tags.iter().map(|t| t.name.clone()).collect();
        names.sort();
        assert_eq!(names, vec!["focus", "work"]);

        let outcome = service.save_note(&note.id, "#work only now").await?;
        assert_eq!(outcome.tags.len(), 1);
        assert_eq!(outcome.tags[0].name, "work");

        let attached = service.tags_for_note(&note.id).await?;
        assert_eq!(attached.len(), 1);

        // The detached tag entity survives.
        let all = service.list_tags().await?;
        assert_eq!(all.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_reconcile_tags_empty_body_clears_associations() -> anyhow::Result<()> {
        let (service, _dir) = create_test_service().await?;

        let note = service.create_note(params("Inbox", "#work #focus")).await?;
        assert_eq!(service.tags_for_note(&note.id).await?.len(), 2);

        let outcome = service.save_note(&note.id, "no tags anymore").await?;
        assert!(outcome.tags.is_empty());
        assert!(service.tags_for_note(&note.id).await?.is_empty());
        assert_eq!(service.list_tags().await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_hashtags_deduped_per_save() -> anyhow::Result<()> {
        let (service, _dir) = create_test_service().await?;

        let note = service.create_note(params("Inbox", "")).await?;
        let outcome = service.save_note(&note.id, "#work and #work").await?;

        assert_eq!(outcome.tags.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_oversized_hashtag_skipped() -> anyhow::Result<()> {
        let (service, _dir) = create_test_service().await?;

        let note = service.create_note(params("Inbox", "")).await?;
        let body = format!("#{} and #ok", "a".repeat(101));
        let outcome = service.save_note(&note.id, &body).await?;

        assert_eq!(outcome.tags.len(), 1);
        assert_eq!(outcome.tags[0].name, "ok");
        Ok(())
    }

    #[tokio::test]
    async fn test_update_note_body_reconciles() -> anyhow::Result<()> {
        let (service, _dir) = create_test_service().await?;

        let budget = service.create_note(params("Budget", "")).await?;
        let note = service.create_note(params("Inbox", "")).await?;

        let update = NoteUpdate {
            body: Some("now linking [[Budget]]".to_string()),
            ..Default::default()
        };
        service.update_note(&note.id, update).await?;

        let links = service.outgoing_links(&note.id).await?;
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].id, budget.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_title_only_keeps_edges() -> anyhow::Result<()> {
        let (service, _dir) = create_test_service().await?;

        service.create_note(params("Budget", "")).await?;
        let note = service.create_note(params("Inbox", "[[Budget]]")).await?;
        assert_eq!(service.outgoing_links(&note.id).await?.len(), 1);

        let update = NoteUpdate {
            title: Some("Renamed inbox".to_string()),
            ..Default::default()
        };
        let renamed = service.update_note(&note.id, update).await?;

        assert_eq!(renamed.title, "Renamed inbox");
        assert_eq!(service.outgoing_links(&note.id).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_note_removes_edges_both_directions() -> anyhow::Result<()> {
        let (service, _dir) = create_test_service().await?;

        let budget = service.create_note(params("Budget", "")).await?;
        let note = service.create_note(params("Inbox", "[[Budget]]")).await?;
        assert_eq!(service.outgoing_links(&note.id).await?.len(), 1);

        let result = service.delete_note(&budget.id).await?;
        assert!(result.existed);

        // The stored edge pointing at the deleted target is gone; the title
        // now reports as unresolved instead.
        let links = service.outgoing_links(&note.id).await?;
        assert_eq!(links.len(), 1);
        assert!(!links[0].resolved);

        let again = service.delete_note(&budget.id).await?;
        assert!(!again.existed);
        Ok(())
    }

    #[tokio::test]
    async fn test_folder_lifecycle() -> anyhow::Result<()> {
        let (service, _dir) = create_test_service().await?;

        let folder = service.create_folder("Projects").await?;
        let note = service
            .create_note(CreateNoteParams {
                folder_id: Some(folder.id.clone()),
                ..params("Plan", "")
            })
            .await?;
        assert_eq!(note.folder_id.as_deref(), Some(folder.id.as_str()));

        service.delete_folder(&folder.id).await?;
        let orphaned = service.get_note(&note.id).await?;
        assert_eq!(orphaned.folder_id, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_folder_requires_name() -> anyhow::Result<()> {
        let (service, _dir) = create_test_service().await?;

        let err = service.create_folder("   ").await.unwrap_err();
        assert!(matches!(err, NoteServiceError::ValidationFailed(_)));
        Ok(())
    }

    #[test]
    fn test_periodic_title_formats() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
        assert_eq!(periodic_title(PeriodicKind::Daily, date), "2025-03-05");
        assert_eq!(periodic_title(PeriodicKind::Monthly, date), "2025-03");
        assert_eq!(periodic_title(PeriodicKind::Weekly, date), "2025-W10");

        // ISO week-years differ from calendar years at the boundary:
        // 2024-12-30 is the Monday of 2025's first ISO week.
        let boundary = NaiveDate::from_ymd_opt(2024, 12, 30).unwrap();
        assert_eq!(periodic_title(PeriodicKind::Weekly, boundary), "2025-W01");
    }

    #[tokio::test]
    async fn test_get_or_create_periodic_is_idempotent() -> anyhow::Result<()> {
        let (service, _dir) = create_test_service().await?;

        let date = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
        let first = service.get_or_create_periodic(PeriodicKind::Daily, date).await?;
        assert_eq!(first.title, "2025-03-05");

        let second = service.get_or_create_periodic(PeriodicKind::Daily, date).await?;
        assert_eq!(second.id, first.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_search_notes_matches_title_and_body() -> anyhow::Result<()> {
        let (service, _dir) = create_test_service().await?;

        service.create_note(params("Quarterly budget", "")).await?;
        service.create_note(params("Diary", "met about the budget")).await?;
        service.create_note(params("Unrelated", "nothing here")).await?;

        let hits = service.search_notes("budget", None).await?;
        assert_eq!(hits.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_save_missing_note_is_not_found() -> anyhow::Result<()> {
        let (service, _dir) = create_test_service().await?;

        let err = service.save_note("ghost", "body").await.unwrap_err();
        assert!(matches!(err, NoteServiceError::NoteNotFound { .. }));
        Ok(())
    }
}
