//! NoteStore Trait - Database Abstraction Layer
//!
//! This module defines the `NoteStore` trait that abstracts persistence
//! operations for notes, links, tags, folders, and presence. The trait
//! separates business logic in the service layer from the libsql-backed
//! implementation, and gives tests a seam for alternative backends.
//!
//! # Design Decisions
//!
//! 1. **Async-First**: All methods are async; the default backend is
//!    embedded libsql but nothing in the services assumes that
//! 2. **Ownership Semantics**: Creation methods take ownership of model
//!    values to avoid unnecessary cloning (caller can clone if needed)
//! 3. **Error Handling**: Uses `anyhow::Result` for flexible error context
//! 4. **Missing is not an error**: Lookups return `Ok(None)` when the row
//!    does not exist
//!
//! # Examples
//!
//! ```rust,no_run
//! use ravel_core::db::{NoteStore, TursoStore, DatabaseService};
//! use ravel_core::models::Note;
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let db = Arc::new(DatabaseService::new(PathBuf::from("ravel.db")).await?);
//!     let store: Arc<dyn NoteStore> = Arc::new(TursoStore::new(db));
//!
//!     let note = Note::new("Plan".to_string(), "Quarterly plan".to_string(), None);
//!     let created = store.create_note(note).await?;
//!
//!     Ok(())
//! }
//! ```

use crate::models::{DeleteResult, Folder, Note, NoteSummary, NoteUpdate, PresenceEntry, Tag};
use anyhow::Result;
use async_trait::async_trait;

/// Abstraction layer for note-graph persistence operations
///
/// All methods are async. Implementations must be `Send + Sync` to allow
/// usage in async contexts where futures may be moved between threads.
///
/// # Method Categories
///
/// - **Core CRUD**: 5 methods (create, read, update, body write, delete)
/// - **Querying**: 5 methods (listing, title lookup, search, recency, mention candidates)
/// - **Link graph**: 5 methods (edge replacement, traversal, cleanup)
/// - **Tags**: 6 methods (upsert, association replacement, listing)
/// - **Folders**: 4 methods (CRUD without cascade into notes)
/// - **Presence**: 2 methods (heartbeat, windowed read)
/// - **Lifecycle**: 1 method (resource management)
#[async_trait]
pub trait NoteStore: Send + Sync {
    //
    // CORE CRUD OPERATIONS
    //

    /// Create a new note
    ///
    /// # Arguments
    ///
    /// * `note` - Note to create (ownership transferred to avoid cloning)
    ///
    /// # Returns
    ///
    /// Created note with store-generated timestamps
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Note ID already exists (duplicate key)
    /// - Folder reference doesn't exist (foreign key violation)
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # use ravel_core::db::NoteStore;
    /// # use ravel_core::models::Note;
    /// # async fn example(store: &dyn NoteStore) -> anyhow::Result<()> {
    /// let note = Note::new("Plan".to_string(), String::new(), None);
    /// let created = store.create_note(note).await?;
    /// println!("Created note: {}", created.id);
    /// # Ok(())
    /// # }
    /// ```
    async fn create_note(&self, note: Note) -> Result<Note>;

    /// Get note by ID
    ///
    /// # Returns
    ///
    /// - `Ok(Some(note))` if the note exists
    /// - `Ok(None)` if the note doesn't exist (not an error)
    /// - `Err(_)` if a database error occurs
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # use ravel_core::db::NoteStore;
    /// # async fn example(store: &dyn NoteStore) -> anyhow::Result<()> {
    /// match store.get_note("note-123").await? {
    ///     Some(note) => println!("Found: {}", note.title),
    ///     None => println!("Note not found"),
    /// }
    /// # Ok(())
    /// # }
    /// ```
    async fn get_note(&self, id: &str) -> Result<Option<Note>>;

    /// Apply a sparse update to a note
    ///
    /// Fetches the existing row, merges only the provided fields, and writes
    /// the result back with a fresh updated_at.
    ///
    /// # Returns
    ///
    /// The updated note, or `Ok(None)` if no note has this ID
    async fn update_note(&self, id: &str, update: NoteUpdate) -> Result<Option<Note>>;

    /// Overwrite only a note's body
    ///
    /// This is the persistence half of the save pipeline; link and tag
    /// reconciliation happens separately in the service layer.
    ///
    /// # Returns
    ///
    /// The refreshed note, or `Ok(None)` if no note has this ID
    async fn update_note_body(&self, id: &str, body: &str) -> Result<Option<Note>>;

    /// Delete a note
    ///
    /// Link edges in both directions, tag associations, and presence rows
    /// are removed with it. Tag entities survive.
    ///
    /// # Returns
    ///
    /// `DeleteResult { existed }` - deleting a missing note is not an error
    async fn delete_note(&self, id: &str) -> Result<DeleteResult>;

    //
    // QUERYING OPERATIONS
    //

    /// List notes ordered by most recently updated
    ///
    /// # Arguments
    ///
    /// * `folder_id` - Optional folder filter
    /// * `limit` - Optional result cap
    async fn list_notes(&self, folder_id: Option<&str>, limit: Option<usize>)
        -> Result<Vec<Note>>;

    /// Find notes by exact title match (case-sensitive)
    ///
    /// # Returns
    ///
    /// Matching notes ordered by created_at ascending, then ID ascending.
    /// The first entry is the canonical target when titles collide.
    async fn find_notes_by_title(&self, title: &str) -> Result<Vec<Note>>;

    /// Search notes by title or body substring (case-insensitive)
    async fn search_notes(&self, query: &str, limit: usize) -> Result<Vec<Note>>;

    /// Get the most recently updated notes
    async fn recent_notes(&self, limit: usize) -> Result<Vec<Note>>;

    /// Find notes whose body contains the needle (case-insensitive)
    ///
    /// Coarse candidate filter for unlinked-mention detection; callers must
    /// re-verify occurrences against the raw body. The needle is treated as
    /// literal text, not a pattern.
    ///
    /// # Arguments
    ///
    /// * `needle` - Literal text to look for
    /// * `exclude_id` - Note to skip (the note whose title is being sought)
    async fn find_notes_with_text(&self, needle: &str, exclude_id: &str) -> Result<Vec<Note>>;

    //
    // LINK GRAPH OPERATIONS
    //

    /// Atomically replace all outgoing links of a note
    ///
    /// Runs delete-then-insert inside a single transaction: concurrent
    /// readers see either the old edge set or the new one, never the empty
    /// window in between. On failure the previous edges remain intact.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # use ravel_core::db::NoteStore;
    /// # async fn example(store: &dyn NoteStore) -> anyhow::Result<()> {
    /// store
    ///     .replace_outgoing_links("note-1", &["note-2".to_string()])
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    async fn replace_outgoing_links(&self, source_id: &str, target_ids: &[String]) -> Result<()>;

    /// Get summaries of all notes this note links to
    async fn outgoing_link_targets(&self, source_id: &str) -> Result<Vec<NoteSummary>>;

    /// Get full records of all notes linking to this note
    ///
    /// Full records because backlink rendering needs source bodies to cut
    /// context excerpts.
    async fn incoming_link_sources(&self, target_id: &str) -> Result<Vec<Note>>;

    /// Get IDs of notes linked to this note in either direction
    async fn linked_note_ids(&self, note_id: &str) -> Result<Vec<String>>;

    /// Delete every edge where the note is source or target
    ///
    /// Invoked when a note is deleted so the graph never holds edges into
    /// a missing note.
    async fn delete_links_for_note(&self, note_id: &str) -> Result<()>;

    //
    // TAG OPERATIONS
    //

    /// Get or create a tag by name
    ///
    /// Looks up the tag by its unique name, creating it when absent. Safe
    /// under concurrency: two racing upserts of the same name converge on
    /// one row.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # use ravel_core::db::NoteStore;
    /// # async fn example(store: &dyn NoteStore) -> anyhow::Result<()> {
    /// let tag = store.upsert_tag("project/alpha").await?;
    /// println!("Tag id: {}", tag.id);
    /// # Ok(())
    /// # }
    /// ```
    async fn upsert_tag(&self, name: &str) -> Result<Tag>;

    /// Atomically replace all tag associations of a note
    ///
    /// Same transactional contract as [`replace_outgoing_links`](Self::replace_outgoing_links).
    /// Tag entities that lose their last association are kept.
    async fn replace_note_tags(&self, note_id: &str, tag_ids: &[String]) -> Result<()>;

    /// Get all tags attached to a note, ordered by name
    async fn tags_for_note(&self, note_id: &str) -> Result<Vec<Tag>>;

    /// List all tags ordered by name
    async fn list_tags(&self) -> Result<Vec<Tag>>;

    /// Get all notes carrying a tag, most recently updated first
    async fn notes_by_tag(&self, tag_id: &str) -> Result<Vec<Note>>;

    /// Get notes sharing at least one tag with the given note
    ///
    /// # Returns
    ///
    /// `(note, shared_tag_count)` pairs, highest overlap first, excluding
    /// the note itself. Input to the related-notes ranker.
    async fn notes_sharing_tags(&self, note_id: &str) -> Result<Vec<(Note, u32)>>;

    //
    // FOLDER OPERATIONS
    //

    /// Create a new folder
    async fn create_folder(&self, folder: Folder) -> Result<Folder>;

    /// Get folder by ID (`Ok(None)` when missing)
    async fn get_folder(&self, id: &str) -> Result<Option<Folder>>;

    /// List all folders ordered by name
    async fn list_folders(&self) -> Result<Vec<Folder>>;

    /// Delete a folder
    ///
    /// Notes inside the folder are orphaned (folder_id cleared), not deleted.
    async fn delete_folder(&self, id: &str) -> Result<DeleteResult>;

    //
    // PRESENCE OPERATIONS
    //

    /// Record or refresh a viewer heartbeat for a note
    ///
    /// Upserts on (note_id, client_id); stale rows are overwritten in place
    /// rather than reaped.
    async fn upsert_presence(
        &self,
        note_id: &str,
        client_id: &str,
        display_name: &str,
    ) -> Result<()>;

    /// Get viewers whose heartbeat is fresher than the window
    ///
    /// # Arguments
    ///
    /// * `note_id` - Note being viewed
    /// * `window_secs` - Freshness window in seconds
    async fn active_presence(&self, note_id: &str, window_secs: u64)
        -> Result<Vec<PresenceEntry>>;

    //
    // LIFECYCLE OPERATIONS
    //

    /// Close store resources gracefully
    ///
    /// Flushes pending writes. Should be called before application shutdown.
    async fn close(&self) -> Result<()>;
}
