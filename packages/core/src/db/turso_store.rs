//! TursoStore - NoteStore Implementation for the libsql Backend
//!
//! This module implements the `NoteStore` trait on top of DatabaseService,
//! providing the persistence layer the services program against.
//!
//! # Design Principles
//!
//! 1. **Pure Delegation**: All methods delegate to the extracted `db_*`
//!    methods on DatabaseService
//! 2. **Row Conversion**: Handles libsql::Row → model conversion in one place
//! 3. **No business logic**: Wikilink scanning, resolution, and reconciliation
//!    ordering live in the service layer
//!
//! # Examples
//!
//! ```rust,no_run
//! use ravel_core::db::{NoteStore, TursoStore, DatabaseService};
//! use std::sync::Arc;
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let db = Arc::new(DatabaseService::new(PathBuf::from("./data/ravel.db")).await?);
//!     let store: Arc<dyn NoteStore> = Arc::new(TursoStore::new(db));
//!
//!     let note = store.get_note("note-123").await?;
//!
//!     Ok(())
//! }
//! ```

use crate::db::note_store::NoteStore;
use crate::db::DatabaseService;
use crate::models::{DeleteResult, Folder, Note, NoteSummary, NoteUpdate, PresenceEntry, Tag};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use libsql::Row;
use std::sync::Arc;
use uuid::Uuid;

/// TursoStore implements the NoteStore trait for the libsql backend
///
/// This is a thin wrapper around DatabaseService: SQL lives there, row
/// conversion lives here, domain rules live in the services.
pub struct TursoStore {
    /// Underlying database service (extracted SQL operations)
    db: Arc<DatabaseService>,
}

impl TursoStore {
    /// Create a new TursoStore wrapper
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # use ravel_core::db::{TursoStore, DatabaseService};
    /// # use std::sync::Arc;
    /// # use std::path::PathBuf;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let db = Arc::new(DatabaseService::new(PathBuf::from("./test.db")).await?);
    /// let store = TursoStore::new(db);
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    /// Parse timestamp from database - handles both SQLite and RFC3339 formats
    ///
    /// SQLite CURRENT_TIMESTAMP returns: "YYYY-MM-DD HH:MM:SS"
    /// Imported data might use RFC3339: "YYYY-MM-DDTHH:MM:SSZ"
    fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
            return Ok(naive.and_utc());
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }

        Err(anyhow::anyhow!(
            "Unable to parse timestamp '{}' as SQLite or RFC3339 format",
            s
        ))
    }

    /// Convert libsql::Row to Note model
    ///
    /// # Row Format
    ///
    /// Expected columns (in order): id, title, body, folder_id, created_at,
    /// updated_at
    fn row_to_note(row: &Row) -> Result<Note> {
        let id: String = row.get(0).context("Failed to get id")?;
        let title: String = row.get(1).context("Failed to get title")?;
        let body: String = row.get(2).context("Failed to get body")?;
        let folder_id: Option<String> = row.get(3).context("Failed to get folder_id")?;
        let created_at_str: String = row.get(4).context("Failed to get created_at")?;
        let updated_at_str: String = row.get(5).context("Failed to get updated_at")?;

        let created_at =
            Self::parse_timestamp(&created_at_str).context("Failed to parse created_at")?;
        let updated_at =
            Self::parse_timestamp(&updated_at_str).context("Failed to parse updated_at")?;

        Ok(Note {
            id,
            title,
            body,
            folder_id,
            created_at,
            updated_at,
        })
    }

    /// Convert libsql::Row to Tag model (columns: id, name, color, created_at)
    fn row_to_tag(row: &Row) -> Result<Tag> {
        let id: String = row.get(0).context("Failed to get tag id")?;
        let name: String = row.get(1).context("Failed to get tag name")?;
        let color: Option<String> = row.get(2).context("Failed to get tag color")?;
        let created_at_str: String = row.get(3).context("Failed to get tag created_at")?;

        Ok(Tag {
            id,
            name,
            color,
            created_at: Self::parse_timestamp(&created_at_str)
                .context("Failed to parse tag created_at")?,
        })
    }

    /// Convert libsql::Row to Folder model (columns: id, name, created_at)
    fn row_to_folder(row: &Row) -> Result<Folder> {
        let id: String = row.get(0).context("Failed to get folder id")?;
        let name: String = row.get(1).context("Failed to get folder name")?;
        let created_at_str: String = row.get(2).context("Failed to get folder created_at")?;

        Ok(Folder {
            id,
            name,
            created_at: Self::parse_timestamp(&created_at_str)
                .context("Failed to parse folder created_at")?,
        })
    }

    /// Drain a Rows iterator of note records into a Vec
    async fn collect_notes(mut rows: libsql::Rows) -> Result<Vec<Note>> {
        let mut notes = Vec::new();
        while let Some(row) = rows.next().await.context("Failed to read note row")? {
            notes.push(Self::row_to_note(&row)?);
        }
        Ok(notes)
    }

    /// Escape LIKE wildcards so a needle matches literally
    fn escape_like(needle: &str) -> String {
        needle
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_")
    }
}

#[async_trait]
impl NoteStore for TursoStore {
    async fn create_note(&self, note: Note) -> Result<Note> {
        self.db
            .db_create_note(&note.id, &note.title, &note.body, note.folder_id.as_deref())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create note: {}", e))?;

        // Fetch and return the created note with store-stamped timestamps
        self.get_note(&note.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Note not found after creation"))
    }

    async fn get_note(&self, id: &str) -> Result<Option<Note>> {
        match self
            .db
            .db_get_note(id)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to get note: {}", e))?
        {
            Some(row) => Ok(Some(Self::row_to_note(&row)?)),
            None => Ok(None),
        }
    }

    async fn update_note(&self, id: &str, update: NoteUpdate) -> Result<Option<Note>> {
        // Fetch current note to merge the sparse update
        let Some(current) = self.get_note(id).await? else {
            return Ok(None);
        };

        let title = update.title.unwrap_or(current.title);
        let body = update.body.unwrap_or(current.body);
        let folder_id = match update.folder_id {
            None => current.folder_id,
            Some(new_folder) => new_folder,
        };

        self.db
            .db_update_note(id, &title, &body, folder_id.as_deref())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to update note: {}", e))?;

        self.get_note(id).await
    }

    async fn update_note_body(&self, id: &str, body: &str) -> Result<Option<Note>> {
        let rows_affected = self
            .db
            .db_update_note_body(id, body)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to update note body: {}", e))?;

        if rows_affected == 0 {
            return Ok(None);
        }

        self.get_note(id).await
    }

    async fn delete_note(&self, id: &str) -> Result<DeleteResult> {
        let rows_affected = self
            .db
            .db_delete_note(id)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to delete note: {}", e))?;

        Ok(DeleteResult {
            existed: rows_affected > 0,
        })
    }

    async fn list_notes(
        &self,
        folder_id: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<Note>> {
        let limit_clause = limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default();

        let rows = self
            .db
            .db_list_notes(folder_id, &limit_clause)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to list notes: {}", e))?;

        Self::collect_notes(rows).await
    }

    async fn find_notes_by_title(&self, title: &str) -> Result<Vec<Note>> {
        let rows = self
            .db
            .db_find_notes_by_title(title)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to find notes by title: {}", e))?;

        Self::collect_notes(rows).await
    }

    async fn search_notes(&self, query: &str, limit: usize) -> Result<Vec<Note>> {
        let pattern = format!("%{}%", query);
        let limit_clause = format!(" LIMIT {}", limit);

        let rows = self
            .db
            .db_search_notes(&pattern, &limit_clause)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to search notes: {}", e))?;

        Self::collect_notes(rows).await
    }

    async fn recent_notes(&self, limit: usize) -> Result<Vec<Note>> {
        let rows = self
            .db
            .db_recent_notes(limit)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to get recent notes: {}", e))?;

        Self::collect_notes(rows).await
    }

    async fn find_notes_with_text(&self, needle: &str, exclude_id: &str) -> Result<Vec<Note>> {
        let pattern = format!("%{}%", Self::escape_like(needle));

        let rows = self
            .db
            .db_find_notes_with_text(&pattern, exclude_id)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to find notes with text: {}", e))?;

        Self::collect_notes(rows).await
    }

    async fn replace_outgoing_links(&self, source_id: &str, target_ids: &[String]) -> Result<()> {
        self.db
            .db_replace_outgoing_links(source_id, target_ids)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to replace outgoing links: {}", e))
    }

    async fn outgoing_link_targets(&self, source_id: &str) -> Result<Vec<NoteSummary>> {
        let targets = self
            .db
            .db_get_outgoing_links(source_id)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to get outgoing links: {}", e))?;

        Ok(targets
            .into_iter()
            .map(|(id, title)| NoteSummary { id, title })
            .collect())
    }

    async fn incoming_link_sources(&self, target_id: &str) -> Result<Vec<Note>> {
        let rows = self
            .db
            .db_get_incoming_links(target_id)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to get incoming links: {}", e))?;

        Self::collect_notes(rows).await
    }

    async fn linked_note_ids(&self, note_id: &str) -> Result<Vec<String>> {
        self.db
            .db_get_linked_note_ids(note_id)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to get linked note ids: {}", e))
    }

    async fn delete_links_for_note(&self, note_id: &str) -> Result<()> {
        self.db
            .db_delete_links_for_note(note_id)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to delete links for note: {}", e))?;
        Ok(())
    }

    async fn upsert_tag(&self, name: &str) -> Result<Tag> {
        // INSERT OR IGNORE against the unique name, then read back whichever
        // row won. A racing upsert of the same name just loses the insert.
        let candidate_id = Uuid::new_v4().to_string();
        self.db
            .db_insert_tag_if_absent(&candidate_id, name)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to upsert tag: {}", e))?;

        match self
            .db
            .db_get_tag_by_name(name)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to get tag by name: {}", e))?
        {
            Some(row) => Self::row_to_tag(&row),
            None => Err(anyhow::anyhow!("Tag not found after upsert: {}", name)),
        }
    }

    async fn replace_note_tags(&self, note_id: &str, tag_ids: &[String]) -> Result<()> {
        self.db
            .db_replace_note_tags(note_id, tag_ids)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to replace note tags: {}", e))
    }

    async fn tags_for_note(&self, note_id: &str) -> Result<Vec<Tag>> {
        let mut rows = self
            .db
            .db_get_tags_for_note(note_id)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to get tags for note: {}", e))?;

        let mut tags = Vec::new();
        while let Some(row) = rows.next().await.context("Failed to read tag row")? {
            tags.push(Self::row_to_tag(&row)?);
        }

        Ok(tags)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        let mut rows = self
            .db
            .db_list_tags()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to list tags: {}", e))?;

        let mut tags = Vec::new();
        while let Some(row) = rows.next().await.context("Failed to read tag row")? {
            tags.push(Self::row_to_tag(&row)?);
        }

        Ok(tags)
    }

    async fn notes_by_tag(&self, tag_id: &str) -> Result<Vec<Note>> {
        let rows = self
            .db
            .db_get_notes_by_tag(tag_id)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to get notes by tag: {}", e))?;

        Self::collect_notes(rows).await
    }

    async fn notes_sharing_tags(&self, note_id: &str) -> Result<Vec<(Note, u32)>> {
        let mut rows = self
            .db
            .db_get_notes_sharing_tags(note_id)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to get notes sharing tags: {}", e))?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.context("Failed to read shared-tag row")? {
            let note = Self::row_to_note(&row)?;
            let shared: i64 = row.get(6).context("Failed to get shared tag count")?;
            results.push((note, shared as u32));
        }

        Ok(results)
    }

    async fn create_folder(&self, folder: Folder) -> Result<Folder> {
        self.db
            .db_create_folder(&folder.id, &folder.name)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create folder: {}", e))?;

        match self
            .db
            .db_get_folder(&folder.id)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to get folder: {}", e))?
        {
            Some(row) => Self::row_to_folder(&row),
            None => Err(anyhow::anyhow!("Folder not found after creation")),
        }
    }

    async fn get_folder(&self, id: &str) -> Result<Option<Folder>> {
        match self
            .db
            .db_get_folder(id)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to get folder: {}", e))?
        {
            Some(row) => Ok(Some(Self::row_to_folder(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_folders(&self) -> Result<Vec<Folder>> {
        let mut rows = self
            .db
            .db_list_folders()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to list folders: {}", e))?;

        let mut folders = Vec::new();
        while let Some(row) = rows.next().await.context("Failed to read folder row")? {
            folders.push(Self::row_to_folder(&row)?);
        }

        Ok(folders)
    }

    async fn delete_folder(&self, id: &str) -> Result<DeleteResult> {
        let rows_affected = self
            .db
            .db_delete_folder(id)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to delete folder: {}", e))?;

        Ok(DeleteResult {
            existed: rows_affected > 0,
        })
    }

    async fn upsert_presence(
        &self,
        note_id: &str,
        client_id: &str,
        display_name: &str,
    ) -> Result<()> {
        self.db
            .db_upsert_presence(note_id, client_id, display_name)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to upsert presence: {}", e))
    }

    async fn active_presence(
        &self,
        note_id: &str,
        window_secs: u64,
    ) -> Result<Vec<PresenceEntry>> {
        let mut rows = self
            .db
            .db_get_active_presence(note_id, window_secs)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to get active presence: {}", e))?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await.context("Failed to read presence row")? {
            let client_id: String = row.get(0).context("Failed to get client_id")?;
            let display_name: String = row.get(1).context("Failed to get display_name")?;
            let last_seen_str: String = row.get(2).context("Failed to get last_seen_at")?;

            entries.push(PresenceEntry {
                client_id,
                display_name,
                last_seen_at: Self::parse_timestamp(&last_seen_str)
                    .context("Failed to parse last_seen_at")?,
            });
        }

        Ok(entries)
    }

    async fn close(&self) -> Result<()> {
        self.db
            .db_close()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to close database: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_store() -> Result<(TursoStore, TempDir)> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("test.db");
        let db = Arc::new(DatabaseService::new(db_path).await?);
        Ok((TursoStore::new(db), temp_dir))
    }

    #[tokio::test]
    async fn test_create_and_get_note() -> Result<()> {
        let (store, _temp_dir) = create_test_store().await?;

        let note = Note::with_id(
            "n-1".to_string(),
            "Plan".to_string(),
            "Quarterly plan".to_string(),
            None,
        );
        let created = store.create_note(note).await?;
        assert_eq!(created.id, "n-1");
        assert_eq!(created.title, "Plan");

        let fetched = store.get_note("n-1").await?;
        assert!(fetched.is_some());
        assert_eq!(fetched.unwrap().body, "Quarterly plan");

        let missing = store.get_note("nope").await?;
        assert!(missing.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_update_note_merges_sparse_fields() -> Result<()> {
        let (store, _temp_dir) = create_test_store().await?;

        store
            .create_note(Note::with_id(
                "n-1".to_string(),
                "Plan".to_string(),
                "original body".to_string(),
                None,
            ))
            .await?;

        // Title-only update leaves the body alone
        let updated = store
            .update_note(
                "n-1",
                NoteUpdate {
                    title: Some("Plan v2".to_string()),
                    body: None,
                    folder_id: None,
                },
            )
            .await?
            .unwrap();
        assert_eq!(updated.title, "Plan v2");
        assert_eq!(updated.body, "original body");

        // Updating a missing note reports None rather than an error
        let missing = store
            .update_note("ghost", NoteUpdate::default())
            .await?;
        assert!(missing.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_update_note_can_clear_folder() -> Result<()> {
        let (store, _temp_dir) = create_test_store().await?;

        let folder = store.create_folder(Folder::new("Inbox".to_string())).await?;
        store
            .create_note(Note::with_id(
                "n-1".to_string(),
                "Plan".to_string(),
                String::new(),
                Some(folder.id.clone()),
            ))
            .await?;

        let cleared = store
            .update_note(
                "n-1",
                NoteUpdate {
                    title: None,
                    body: None,
                    folder_id: Some(None),
                },
            )
            .await?
            .unwrap();
        assert!(cleared.folder_id.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_note_is_idempotent() -> Result<()> {
        let (store, _temp_dir) = create_test_store().await?;

        store
            .create_note(Note::with_id(
                "n-1".to_string(),
                "Plan".to_string(),
                String::new(),
                None,
            ))
            .await?;

        let first = store.delete_note("n-1").await?;
        assert!(first.existed);

        let second = store.delete_note("n-1").await?;
        assert!(!second.existed);

        Ok(())
    }

    #[tokio::test]
    async fn test_find_notes_by_title_orders_by_creation() -> Result<()> {
        let (store, _temp_dir) = create_test_store().await?;

        // Insertion order matches id order, so the expected winner is stable
        // whether the tie breaks on created_at or on id
        store
            .create_note(Note::with_id(
                "a-first".to_string(),
                "Plan".to_string(),
                String::new(),
                None,
            ))
            .await?;
        store
            .create_note(Note::with_id(
                "b-second".to_string(),
                "Plan".to_string(),
                String::new(),
                None,
            ))
            .await?;

        let matches = store.find_notes_by_title("Plan").await?;
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].id, "a-first");

        // Title matching is case-sensitive
        let lowercase = store.find_notes_by_title("plan").await?;
        assert!(lowercase.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_upsert_tag_reuses_existing_row() -> Result<()> {
        let (store, _temp_dir) = create_test_store().await?;

        let first = store.upsert_tag("urgent").await?;
        let second = store.upsert_tag("urgent").await?;
        assert_eq!(first.id, second.id);

        let other = store.upsert_tag("project/alpha").await?;
        assert_ne!(first.id, other.id);

        Ok(())
    }

    #[tokio::test]
    async fn test_replace_note_tags_swaps_associations() -> Result<()> {
        let (store, _temp_dir) = create_test_store().await?;

        store
            .create_note(Note::with_id(
                "n-1".to_string(),
                "Plan".to_string(),
                String::new(),
                None,
            ))
            .await?;
        let urgent = store.upsert_tag("urgent").await?;
        let later = store.upsert_tag("later").await?;

        store
            .replace_note_tags("n-1", &[urgent.id.clone()])
            .await?;
        let tags = store.tags_for_note("n-1").await?;
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "urgent");

        store.replace_note_tags("n-1", &[later.id.clone()]).await?;
        let tags = store.tags_for_note("n-1").await?;
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "later");

        // The detached tag entity survives
        let all = store.list_tags().await?;
        assert_eq!(all.len(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_find_notes_with_text_treats_needle_literally() -> Result<()> {
        let (store, _temp_dir) = create_test_store().await?;

        store
            .create_note(Note::with_id(
                "n-1".to_string(),
                "Status".to_string(),
                "the rollout is 100% done".to_string(),
                None,
            ))
            .await?;
        store
            .create_note(Note::with_id(
                "n-2".to_string(),
                "Other".to_string(),
                "the rollout is 100x done".to_string(),
                None,
            ))
            .await?;

        // Without escaping, '%' would also match "100x done"
        let matches = store.find_notes_with_text("100%", "none").await?;
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "n-1");

        Ok(())
    }

    #[tokio::test]
    async fn test_active_presence_scoped_to_note() -> Result<()> {
        let (store, _temp_dir) = create_test_store().await?;

        store
            .create_note(Note::with_id(
                "n-1".to_string(),
                "Plan".to_string(),
                String::new(),
                None,
            ))
            .await?;
        store
            .create_note(Note::with_id(
                "n-2".to_string(),
                "Other".to_string(),
                String::new(),
                None,
            ))
            .await?;

        store.upsert_presence("n-1", "client-1", "Ada").await?;

        let viewers = store.active_presence("n-1", 30).await?;
        assert_eq!(viewers.len(), 1);
        assert_eq!(viewers[0].display_name, "Ada");

        let none = store.active_presence("n-2", 30).await?;
        assert!(none.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_outgoing_and_incoming_links() -> Result<()> {
        let (store, _temp_dir) = create_test_store().await?;

        for (id, title) in [("a", "A"), ("b", "B"), ("c", "C")] {
            store
                .create_note(Note::with_id(
                    id.to_string(),
                    title.to_string(),
                    String::new(),
                    None,
                ))
                .await?;
        }

        store
            .replace_outgoing_links("a", &["b".to_string(), "c".to_string()])
            .await?;

        let outgoing = store.outgoing_link_targets("a").await?;
        assert_eq!(outgoing.len(), 2);

        let incoming = store.incoming_link_sources("b").await?;
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].id, "a");

        let adjacent = store.linked_note_ids("b").await?;
        assert_eq!(adjacent, vec!["a".to_string()]);

        Ok(())
    }
}
