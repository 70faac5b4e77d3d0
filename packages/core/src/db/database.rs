//! Database Connection Management
//!
//! This module provides the core database connection and initialization
//! functionality using libsql for Ravel's relational note-graph schema.
//!
//! # Architecture
//!
//! - **Path-agnostic**: Accepts any valid PathBuf (user-selectable data dir)
//! - **Fixed relational schema**: Notes, links, tags, and presence live in
//!   plain tables created idempotently at startup
//! - **WAL mode**: Write-Ahead Logging for better concurrency
//! - **Foreign keys**: Enabled for referential integrity (link and tag rows
//!   cascade away with their notes)
//!
//! # Database Connection Patterns
//!
//! ## Async contexts (Tokio runtime)
//!
//! **ALWAYS use `connect_with_timeout()` in async functions** to avoid SQLite
//! thread-safety violations when the Tokio runtime moves futures between threads.
//!
//! The 5-second busy timeout allows concurrent operations to wait and retry
//! instead of failing immediately with `SQLITE_BUSY` errors.
//!
//! ```no_run
//! # use ravel_core::db::DatabaseService;
//! # use std::path::PathBuf;
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let db_service = DatabaseService::new(PathBuf::from(":memory:")).await?;
//! // ✅ CORRECT: Use connect_with_timeout() in async functions
//! let conn = db_service.connect_with_timeout().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Synchronous contexts
//!
//! Use `connect()` only in single-threaded, synchronous contexts where the
//! connection will not be used across await points.
//!
//! **Note**: Most code in Ravel is async, so `connect_with_timeout()` should
//! be your default choice.

use crate::db::error::DatabaseError;
use libsql::{Builder, Database};
use std::path::PathBuf;
use std::sync::Arc;

/// Database service for managing libsql connection and schema
///
/// # Examples
///
/// ```no_run
/// use ravel_core::db::DatabaseService;
/// use std::path::PathBuf;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let db_path = PathBuf::from("/path/to/ravel.db");
///     let db_service = DatabaseService::new(db_path).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct DatabaseService {
    /// libsql database connection (wrapped in Arc for sharing)
    pub db: Arc<Database>,

    /// Path to the database file
    pub db_path: PathBuf,
}

impl DatabaseService {
    /// Create a new DatabaseService with the specified database path
    ///
    /// This will:
    /// 1. Ensure the parent directory exists (create if needed)
    /// 2. Open/create the database file
    /// 3. Initialize the schema (CREATE TABLE IF NOT EXISTS)
    /// 4. Enable SQLite features (WAL mode, foreign keys)
    ///
    /// # Arguments
    ///
    /// * `db_path` - Path to the database file (can be in Dropbox, iCloud, etc.)
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if:
    /// - Parent directory cannot be created
    /// - Database connection fails
    /// - Schema initialization fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use ravel_core::db::DatabaseService;
    /// # use std::path::PathBuf;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let db_path = PathBuf::from("./data/ravel.db");
    /// let db_service = DatabaseService::new(db_path).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new(db_path: PathBuf) -> Result<Self, DatabaseError> {
        // Check if database file already exists (before we open it)
        // This allows us to optimize the WAL checkpoint - only needed for new databases
        let is_new_database = !db_path.exists();

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::PermissionDenied {
                        DatabaseError::permission_denied(db_path.clone())
                    } else {
                        DatabaseError::DirectoryCreationFailed(e)
                    }
                })?;
            }
        }

        // Open database connection using Builder pattern
        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;

        let service = Self {
            db: Arc::new(db),
            db_path,
        };

        // Initialize schema (only checkpoints if is_new_database = true)
        service.initialize_schema(is_new_database).await?;

        Ok(service)
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements return rows, so we must use query() instead of execute().
    /// This helper method encapsulates that pattern for cleaner code.
    async fn execute_pragma(
        &self,
        conn: &libsql::Connection,
        pragma: &str,
    ) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        let _ = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    /// Initialize database schema and configuration
    ///
    /// Creates tables and indexes using CREATE TABLE IF NOT EXISTS,
    /// ensuring idempotent initialization (safe to call multiple times).
    ///
    /// # Arguments
    ///
    /// * `is_new_database` - Whether this is a newly created database file.
    ///   If true, performs a WAL checkpoint to flush schema to disk (prevents
    ///   race conditions in tests). If false, skips checkpoint for performance.
    ///
    /// # Schema
    ///
    /// - `folders` table: Optional note grouping
    /// - `notes` table: Note content (title, body, folder reference)
    /// - `links` table: Directed note-to-note edges derived from wikilinks
    /// - `tags` / `note_tags` tables: Global tags and their note associations
    /// - `presence` table: Ephemeral per-note viewer heartbeats
    ///
    /// # SQLite Configuration
    ///
    /// - WAL mode: Write-Ahead Logging for better concurrency
    /// - Foreign keys: Enabled for referential integrity
    async fn initialize_schema(&self, is_new_database: bool) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        // Enable WAL mode for better concurrency
        self.execute_pragma(&conn, "PRAGMA journal_mode = WAL")
            .await?;

        // Set busy timeout to 5 seconds (5000ms)
        // This makes SQLite wait up to 5s instead of failing immediately on lock
        self.execute_pragma(&conn, "PRAGMA busy_timeout = 5000")
            .await?;

        // Enable foreign key constraints
        self.execute_pragma(&conn, "PRAGMA foreign_keys = ON")
            .await?;

        // Create folders table (must exist before notes for the FK)
        conn.execute(
            "CREATE TABLE IF NOT EXISTS folders (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to create folders table: {}", e))
        })?;

        // Create notes table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS notes (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL DEFAULT '',
                body TEXT NOT NULL DEFAULT '',
                folder_id TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                -- Folder deletion orphans notes instead of removing them
                FOREIGN KEY (folder_id) REFERENCES folders(id) ON DELETE SET NULL
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to create notes table: {}", e))
        })?;

        // Create links table (directed wikilink edges)
        conn.execute(
            "CREATE TABLE IF NOT EXISTS links (
                source_id TEXT NOT NULL,
                target_id TEXT NOT NULL,
                PRIMARY KEY (source_id, target_id),
                FOREIGN KEY (source_id) REFERENCES notes(id) ON DELETE CASCADE,
                FOREIGN KEY (target_id) REFERENCES notes(id) ON DELETE CASCADE
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to create links table: {}", e))
        })?;

        // Create tags table (names are globally unique)
        conn.execute(
            "CREATE TABLE IF NOT EXISTS tags (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                color TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            (),
        )
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to create tags table: {}", e)))?;

        // Create note_tags join table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS note_tags (
                note_id TEXT NOT NULL,
                tag_id TEXT NOT NULL,
                PRIMARY KEY (note_id, tag_id),
                FOREIGN KEY (note_id) REFERENCES notes(id) ON DELETE CASCADE,
                FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to create note_tags table: {}", e))
        })?;

        // Create presence table (ephemeral viewer heartbeats)
        conn.execute(
            "CREATE TABLE IF NOT EXISTS presence (
                note_id TEXT NOT NULL,
                client_id TEXT NOT NULL,
                display_name TEXT NOT NULL DEFAULT '',
                last_seen_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (note_id, client_id),
                FOREIGN KEY (note_id) REFERENCES notes(id) ON DELETE CASCADE
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to create presence table: {}", e))
        })?;

        // Create core indexes
        self.create_core_indexes(&conn).await?;

        // Force WAL checkpoint only for newly created databases.
        // This prevents race conditions where rapid database swaps in tests
        // cause "no such table" errors due to WAL entries not being flushed.
        // For existing databases, skip checkpoint to avoid unnecessary overhead.
        if is_new_database {
            self.execute_pragma(&conn, "PRAGMA wal_checkpoint(TRUNCATE)")
                .await?;
        }

        Ok(())
    }

    /// Create core indexes
    ///
    /// These indexes are essential for query performance and never change
    /// (no ALTER TABLE required on user machines).
    async fn create_core_indexes(&self, conn: &libsql::Connection) -> Result<(), DatabaseError> {
        // Index on title (wikilink resolution is an exact-title lookup)
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_notes_title ON notes(title)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to create index 'idx_notes_title': {}", e))
        })?;

        // Index on folder_id (folder listing)
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_notes_folder ON notes(folder_id)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!(
                "Failed to create index 'idx_notes_folder': {}",
                e
            ))
        })?;

        // Index on updated_at (recency queries)
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_notes_updated ON notes(updated_at)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!(
                "Failed to create index 'idx_notes_updated': {}",
                e
            ))
        })?;

        // Index on links target (backlink queries walk the edge backwards;
        // the composite primary key already covers source-side lookups)
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_links_target ON links(target_id)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!(
                "Failed to create index 'idx_links_target': {}",
                e
            ))
        })?;

        // Index on note_tags tag side (tag listing pages)
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_note_tags_tag ON note_tags(tag_id)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!(
                "Failed to create index 'idx_note_tags_tag': {}",
                e
            ))
        })?;

        // Index on presence freshness (windowed viewer reads)
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_presence_seen ON presence(last_seen_at)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!(
                "Failed to create index 'idx_presence_seen': {}",
                e
            ))
        })?;

        Ok(())
    }

    /// Get a synchronous connection to the database
    ///
    /// **⚠️ WARNING**: Only use this in synchronous, single-threaded contexts.
    /// In async functions or Tokio runtime contexts, use `connect_with_timeout()`
    /// instead to avoid SQLite thread-safety violations.
    ///
    /// Returns a new connection that can be used for queries.
    /// Multiple connections can be used concurrently thanks to WAL mode.
    pub fn connect(&self) -> Result<libsql::Connection, DatabaseError> {
        self.db.connect().map_err(DatabaseError::LibsqlError)
    }

    /// Get an async connection with busy timeout and foreign keys configured
    ///
    /// **✅ RECOMMENDED**: Use this for all async functions and Tokio runtime contexts.
    ///
    /// Sets a 5-second busy timeout so concurrent operations wait and retry
    /// instead of failing immediately when the database is locked, and turns
    /// foreign key enforcement on (SQLite scopes both settings to the
    /// connection, so every connection must repeat them). Without the foreign
    /// key pragma, ON DELETE CASCADE on link, tag, and presence rows would
    /// silently not fire.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use ravel_core::db::DatabaseService;
    /// # use std::path::PathBuf;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// # let db_service = DatabaseService::new(PathBuf::from(":memory:")).await?;
    /// // ✅ CORRECT: Use in async functions
    /// let conn = db_service.connect_with_timeout().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect_with_timeout(&self) -> Result<libsql::Connection, DatabaseError> {
        // This synchronous connect() call is safe here because it's just
        // creating the connection handle. The actual SQLite operations happen
        // later, and the busy timeout ensures they work correctly in async contexts.
        let conn = self.connect()?;

        // Per-connection settings
        self.execute_pragma(&conn, "PRAGMA busy_timeout = 5000")
            .await?;
        self.execute_pragma(&conn, "PRAGMA foreign_keys = ON")
            .await?;

        Ok(conn)
    }

    //
    // NOTE OPERATIONS
    // Raw SQL for note rows. Wrapped by the NoteStore trait implementation,
    // which converts rows into model structs.
    //

    /// Insert a note into the database
    ///
    /// # Arguments
    ///
    /// * `id` - Note ID (caller-generated UUID)
    /// * `title` - Note title (may be empty)
    /// * `body` - Note body (may be empty)
    /// * `folder_id` - Optional folder reference
    ///
    /// # Notes
    ///
    /// - created_at and updated_at are set automatically by the database
    /// - Fails if the folder reference points at a missing folder
    pub async fn db_create_note(
        &self,
        id: &str,
        title: &str,
        body: &str,
        folder_id: Option<&str>,
    ) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            "INSERT INTO notes (id, title, body, folder_id) VALUES (?, ?, ?, ?)",
            (id, title, body, folder_id),
        )
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to insert note: {}", e)))?;

        Ok(())
    }

    /// Retrieve a single note by ID
    ///
    /// # Returns
    ///
    /// * `Ok(Some(row))` - Note found, returns the libsql Row
    /// * `Ok(None)` - Note not found in database
    /// * `Err(DatabaseError)` - Query execution failed
    pub async fn db_get_note(&self, id: &str) -> Result<Option<libsql::Row>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(
                "SELECT id, title, body, folder_id, created_at, updated_at
                 FROM notes WHERE id = ?",
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare get_note query: {}", e))
            })?;

        let mut rows = stmt.query([id]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute get_note query: {}", e))
        })?;

        rows.next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))
    }

    /// Update a note's fields
    ///
    /// Takes fully merged values; partial-update merging happens in the
    /// service layer, which fetches the existing row first.
    ///
    /// # Returns
    ///
    /// Number of rows affected (0 = note didn't exist)
    pub async fn db_update_note(
        &self,
        id: &str,
        title: &str,
        body: &str,
        folder_id: Option<&str>,
    ) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let rows_affected = conn
            .execute(
                "UPDATE notes SET title = ?, body = ?, folder_id = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
                (title, body, folder_id, id),
            )
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to update note: {}", e)))?;

        Ok(rows_affected)
    }

    /// Update only a note's body (the save-pipeline write)
    ///
    /// # Returns
    ///
    /// Number of rows affected (0 = note didn't exist)
    pub async fn db_update_note_body(&self, id: &str, body: &str) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let rows_affected = conn
            .execute(
                "UPDATE notes SET body = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
                (body, id),
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to update note body: {}", e))
            })?;

        Ok(rows_affected)
    }

    /// Delete a note from the database
    ///
    /// # Returns
    ///
    /// Number of rows affected (0 = note didn't exist, >0 = note deleted)
    ///
    /// # Notes
    ///
    /// - DELETE CASCADE removes link rows in both directions, tag
    ///   associations, and presence rows (requires foreign_keys pragma,
    ///   which `connect_with_timeout` sets)
    /// - Idempotent: deleting a non-existent note returns 0 (success)
    pub async fn db_delete_note(&self, id: &str) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let rows_affected = conn
            .execute("DELETE FROM notes WHERE id = ?", [id])
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to delete note: {}", e)))?;

        Ok(rows_affected)
    }

    /// List notes, optionally filtered by folder
    ///
    /// # Arguments
    ///
    /// * `folder_id` - Optional folder filter
    /// * `limit_clause` - SQL LIMIT clause (e.g., " LIMIT 100"), may be empty
    ///
    /// # Returns
    ///
    /// Rows iterator ordered by updated_at descending
    pub async fn db_list_notes(
        &self,
        folder_id: Option<&str>,
        limit_clause: &str,
    ) -> Result<libsql::Rows, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        if let Some(folder_id) = folder_id {
            let query = format!(
                "SELECT id, title, body, folder_id, created_at, updated_at
                 FROM notes WHERE folder_id = ? ORDER BY updated_at DESC{}",
                limit_clause
            );

            let mut stmt = conn.prepare(&query).await.map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare list_notes query: {}", e))
            })?;

            stmt.query([folder_id]).await.map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to execute list_notes query: {}", e))
            })
        } else {
            let query = format!(
                "SELECT id, title, body, folder_id, created_at, updated_at
                 FROM notes ORDER BY updated_at DESC{}",
                limit_clause
            );

            let mut stmt = conn.prepare(&query).await.map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare list_notes query: {}", e))
            })?;

            stmt.query(()).await.map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to execute list_notes query: {}", e))
            })
        }
    }

    /// Find notes whose title matches exactly (case-sensitive)
    ///
    /// # Returns
    ///
    /// Rows ordered by created_at ascending, then id ascending. The first
    /// row is the canonical resolution target when titles are duplicated.
    ///
    /// # Notes
    ///
    /// - SQLite TEXT comparison is byte-wise, which gives exact
    ///   case-sensitive matching as long as no COLLATE NOCASE is applied
    pub async fn db_find_notes_by_title(&self, title: &str) -> Result<libsql::Rows, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(
                "SELECT id, title, body, folder_id, created_at, updated_at
                 FROM notes WHERE title = ? ORDER BY created_at ASC, id ASC",
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!(
                    "Failed to prepare find_notes_by_title query: {}",
                    e
                ))
            })?;

        stmt.query([title]).await.map_err(|e| {
            DatabaseError::sql_execution(format!(
                "Failed to execute find_notes_by_title query: {}",
                e
            ))
        })
    }

    /// Search notes by title or body substring (case-insensitive LIKE)
    ///
    /// # Arguments
    ///
    /// * `pattern` - SQL LIKE pattern (e.g., "%search%")
    /// * `limit_clause` - SQL LIMIT clause (e.g., " LIMIT 20"), may be empty
    pub async fn db_search_notes(
        &self,
        pattern: &str,
        limit_clause: &str,
    ) -> Result<libsql::Rows, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let query = format!(
            "SELECT id, title, body, folder_id, created_at, updated_at
             FROM notes WHERE title LIKE ? OR body LIKE ?
             ORDER BY updated_at DESC{}",
            limit_clause
        );

        let mut stmt = conn.prepare(&query).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to prepare search_notes query: {}", e))
        })?;

        stmt.query([pattern, pattern]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute search_notes query: {}", e))
        })
    }

    /// Find notes whose body contains a text fragment (mention candidates)
    ///
    /// # Arguments
    ///
    /// * `pattern` - SQL LIKE pattern with `\`-escaped wildcards
    /// * `exclude_id` - Note ID to exclude (the note being mentioned)
    ///
    /// # Notes
    ///
    /// - This is a coarse prefilter; the caller re-verifies occurrences
    ///   against the raw body before reporting a mention
    pub async fn db_find_notes_with_text(
        &self,
        pattern: &str,
        exclude_id: &str,
    ) -> Result<libsql::Rows, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(
                "SELECT id, title, body, folder_id, created_at, updated_at
                 FROM notes WHERE id != ? AND body LIKE ? ESCAPE '\\'
                 ORDER BY updated_at DESC",
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!(
                    "Failed to prepare find_notes_with_text query: {}",
                    e
                ))
            })?;

        stmt.query([exclude_id, pattern]).await.map_err(|e| {
            DatabaseError::sql_execution(format!(
                "Failed to execute find_notes_with_text query: {}",
                e
            ))
        })
    }

    /// Get the most recently updated notes
    pub async fn db_recent_notes(&self, limit: usize) -> Result<libsql::Rows, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(
                "SELECT id, title, body, folder_id, created_at, updated_at
                 FROM notes ORDER BY updated_at DESC LIMIT ?",
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare recent_notes query: {}", e))
            })?;

        stmt.query([limit as i64]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute recent_notes query: {}", e))
        })
    }

    //
    // LINK OPERATIONS
    // Raw SQL for the directed wikilink edge table.
    //

    /// Create a link edge between two notes
    ///
    /// # Notes
    ///
    /// - Uses INSERT OR IGNORE for idempotency (duplicate wikilinks in one
    ///   body collapse onto the composite primary key)
    /// - Does NOT validate note existence or prevent self-references
    ///   (NoteService handles that)
    pub async fn db_create_link(
        &self,
        source_id: &str,
        target_id: &str,
    ) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            "INSERT OR IGNORE INTO links (source_id, target_id)
             VALUES (?, ?)",
            (source_id, target_id),
        )
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to create link: {}", e)))?;

        Ok(())
    }

    /// Replace all outgoing links of a note in a single transaction
    ///
    /// Deletes every existing edge whose source is `source_id`, then inserts
    /// one edge per target. Readers on other connections never observe the
    /// empty intermediate state.
    ///
    /// # Arguments
    ///
    /// * `source_id` - Source note ID
    /// * `target_ids` - Resolved target note IDs (deduplicated by the
    ///   composite primary key via INSERT OR IGNORE)
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::TransactionFailed` if any statement fails;
    /// the transaction is rolled back and the previous edges remain intact.
    pub async fn db_replace_outgoing_links(
        &self,
        source_id: &str,
        target_ids: &[String],
    ) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        // Begin transaction
        conn.execute("BEGIN TRANSACTION", ()).await.map_err(|e| {
            DatabaseError::transaction_failed(format!("Failed to begin transaction: {}", e))
        })?;

        if let Err(e) = conn
            .execute("DELETE FROM links WHERE source_id = ?", [source_id])
            .await
        {
            let _rollback = conn.execute("ROLLBACK", ()).await;
            return Err(DatabaseError::transaction_failed(format!(
                "Failed to clear links for {}: {}",
                source_id, e
            )));
        }

        for target_id in target_ids {
            let result = conn
                .execute(
                    "INSERT OR IGNORE INTO links (source_id, target_id)
                     VALUES (?, ?)",
                    (source_id, target_id.as_str()),
                )
                .await;

            if let Err(e) = result {
                let _rollback = conn.execute("ROLLBACK", ()).await;
                return Err(DatabaseError::transaction_failed(format!(
                    "Failed to insert link {} -> {}: {}",
                    source_id, target_id, e
                )));
            }
        }

        // Commit transaction
        conn.execute("COMMIT", ()).await.map_err(|e| {
            std::mem::drop(conn.execute("ROLLBACK", ()));
            DatabaseError::transaction_failed(format!("Failed to commit transaction: {}", e))
        })?;

        Ok(())
    }

    /// Get the id and title of every note this note links to
    ///
    /// # Returns
    ///
    /// Vector of `(target_id, target_title)` pairs ordered by title
    pub async fn db_get_outgoing_links(
        &self,
        source_id: &str,
    ) -> Result<Vec<(String, String)>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(
                "SELECT n.id, n.title
                 FROM links l
                 JOIN notes n ON n.id = l.target_id
                 WHERE l.source_id = ?
                 ORDER BY n.title ASC",
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!(
                    "Failed to prepare outgoing_links query: {}",
                    e
                ))
            })?;

        let mut rows = stmt.query([source_id]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute outgoing_links query: {}", e))
        })?;

        let mut targets = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            let id: String = row
                .get(0)
                .map_err(|e| DatabaseError::sql_execution(e.to_string()))?;
            let title: String = row
                .get(1)
                .map_err(|e| DatabaseError::sql_execution(e.to_string()))?;
            targets.push((id, title));
        }

        Ok(targets)
    }

    /// Get full rows of every note linking to this note (backlinks)
    ///
    /// # Returns
    ///
    /// Rows of complete note records ordered by updated_at descending.
    /// Full rows because backlink rendering needs source bodies for
    /// context excerpts.
    pub async fn db_get_incoming_links(
        &self,
        target_id: &str,
    ) -> Result<libsql::Rows, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(
                "SELECT n.id, n.title, n.body, n.folder_id, n.created_at, n.updated_at
                 FROM links l
                 JOIN notes n ON n.id = l.source_id
                 WHERE l.target_id = ?
                 ORDER BY n.updated_at DESC",
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!(
                    "Failed to prepare incoming_links query: {}",
                    e
                ))
            })?;

        stmt.query([target_id]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute incoming_links query: {}", e))
        })
    }

    /// Get ids of all notes linked to this note in either direction
    ///
    /// Used by the related-notes ranker for adjacency scoring.
    pub async fn db_get_linked_note_ids(
        &self,
        note_id: &str,
    ) -> Result<Vec<String>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(
                "SELECT target_id FROM links WHERE source_id = ?
                 UNION
                 SELECT source_id FROM links WHERE target_id = ?",
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!(
                    "Failed to prepare linked_note_ids query: {}",
                    e
                ))
            })?;

        let mut rows = stmt.query([note_id, note_id]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute linked_note_ids query: {}", e))
        })?;

        let mut ids = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            let id: String = row
                .get(0)
                .map_err(|e| DatabaseError::sql_execution(e.to_string()))?;
            ids.push(id);
        }

        Ok(ids)
    }

    /// Delete every link edge where the note is source or target
    ///
    /// # Returns
    ///
    /// Number of edges removed
    ///
    /// # Notes
    ///
    /// - Invoked on note deletion; ON DELETE CASCADE covers the same rows,
    ///   so this is also safe to call redundantly
    pub async fn db_delete_links_for_note(&self, note_id: &str) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let rows_affected = conn
            .execute(
                "DELETE FROM links WHERE source_id = ? OR target_id = ?",
                (note_id, note_id),
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to delete links for note: {}", e))
            })?;

        Ok(rows_affected)
    }

    //
    // TAG OPERATIONS
    // Raw SQL for tags and note-tag associations.
    //

    /// Insert a tag if no tag with that name exists
    ///
    /// # Notes
    ///
    /// - Uses INSERT OR IGNORE against the UNIQUE name constraint, so a
    ///   concurrent insert of the same name is harmless; the caller
    ///   re-reads by name to get the winning row
    pub async fn db_insert_tag_if_absent(&self, id: &str, name: &str) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            "INSERT OR IGNORE INTO tags (id, name) VALUES (?, ?)",
            (id, name),
        )
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to insert tag: {}", e)))?;

        Ok(())
    }

    /// Retrieve a tag by its unique name
    pub async fn db_get_tag_by_name(
        &self,
        name: &str,
    ) -> Result<Option<libsql::Row>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare("SELECT id, name, color, created_at FROM tags WHERE name = ?")
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!(
                    "Failed to prepare get_tag_by_name query: {}",
                    e
                ))
            })?;

        let mut rows = stmt.query([name]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute get_tag_by_name query: {}", e))
        })?;

        rows.next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))
    }

    /// List all tags ordered by name
    pub async fn db_list_tags(&self) -> Result<libsql::Rows, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare("SELECT id, name, color, created_at FROM tags ORDER BY name ASC")
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare list_tags query: {}", e))
            })?;

        stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute list_tags query: {}", e))
        })
    }

    /// Get all tags attached to a note, ordered by name
    pub async fn db_get_tags_for_note(&self, note_id: &str) -> Result<libsql::Rows, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(
                "SELECT t.id, t.name, t.color, t.created_at
                 FROM note_tags nt
                 JOIN tags t ON t.id = nt.tag_id
                 WHERE nt.note_id = ?
                 ORDER BY t.name ASC",
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!(
                    "Failed to prepare tags_for_note query: {}",
                    e
                ))
            })?;

        stmt.query([note_id]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute tags_for_note query: {}", e))
        })
    }

    /// Replace all tag associations of a note in a single transaction
    ///
    /// Same shape as [`db_replace_outgoing_links`](Self::db_replace_outgoing_links):
    /// delete all rows for the note, reinsert, commit. Rolled back as a unit
    /// on any failure.
    ///
    /// Tag entities themselves are never deleted here; a tag that loses its
    /// last association simply has no rows in note_tags.
    pub async fn db_replace_note_tags(
        &self,
        note_id: &str,
        tag_ids: &[String],
    ) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        // Begin transaction
        conn.execute("BEGIN TRANSACTION", ()).await.map_err(|e| {
            DatabaseError::transaction_failed(format!("Failed to begin transaction: {}", e))
        })?;

        if let Err(e) = conn
            .execute("DELETE FROM note_tags WHERE note_id = ?", [note_id])
            .await
        {
            let _rollback = conn.execute("ROLLBACK", ()).await;
            return Err(DatabaseError::transaction_failed(format!(
                "Failed to clear tags for {}: {}",
                note_id, e
            )));
        }

        for tag_id in tag_ids {
            let result = conn
                .execute(
                    "INSERT OR IGNORE INTO note_tags (note_id, tag_id)
                     VALUES (?, ?)",
                    (note_id, tag_id.as_str()),
                )
                .await;

            if let Err(e) = result {
                let _rollback = conn.execute("ROLLBACK", ()).await;
                return Err(DatabaseError::transaction_failed(format!(
                    "Failed to attach tag {} to {}: {}",
                    tag_id, note_id, e
                )));
            }
        }

        // Commit transaction
        conn.execute("COMMIT", ()).await.map_err(|e| {
            std::mem::drop(conn.execute("ROLLBACK", ()));
            DatabaseError::transaction_failed(format!("Failed to commit transaction: {}", e))
        })?;

        Ok(())
    }

    /// Get full rows of every note carrying a given tag
    pub async fn db_get_notes_by_tag(&self, tag_id: &str) -> Result<libsql::Rows, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(
                "SELECT n.id, n.title, n.body, n.folder_id, n.created_at, n.updated_at
                 FROM note_tags nt
                 JOIN notes n ON n.id = nt.note_id
                 WHERE nt.tag_id = ?
                 ORDER BY n.updated_at DESC",
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare notes_by_tag query: {}", e))
            })?;

        stmt.query([tag_id]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute notes_by_tag query: {}", e))
        })
    }

    /// Get notes sharing at least one tag with the given note
    ///
    /// # Returns
    ///
    /// Rows of `(id, title, body, folder_id, created_at, updated_at,
    /// shared_tags)` ordered by shared tag count descending. The note itself
    /// is excluded.
    pub async fn db_get_notes_sharing_tags(
        &self,
        note_id: &str,
    ) -> Result<libsql::Rows, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(
                "SELECT n.id, n.title, n.body, n.folder_id, n.created_at, n.updated_at,
                        COUNT(nt.tag_id) AS shared_tags
                 FROM note_tags nt
                 JOIN notes n ON n.id = nt.note_id
                 WHERE nt.tag_id IN (SELECT tag_id FROM note_tags WHERE note_id = ?)
                   AND n.id != ?
                 GROUP BY n.id
                 ORDER BY shared_tags DESC",
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!(
                    "Failed to prepare notes_sharing_tags query: {}",
                    e
                ))
            })?;

        stmt.query([note_id, note_id]).await.map_err(|e| {
            DatabaseError::sql_execution(format!(
                "Failed to execute notes_sharing_tags query: {}",
                e
            ))
        })
    }

    //
    // FOLDER OPERATIONS
    //

    /// Insert a folder
    pub async fn db_create_folder(&self, id: &str, name: &str) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute("INSERT INTO folders (id, name) VALUES (?, ?)", (id, name))
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to insert folder: {}", e)))?;

        Ok(())
    }

    /// Retrieve a folder by ID
    pub async fn db_get_folder(&self, id: &str) -> Result<Option<libsql::Row>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare("SELECT id, name, created_at FROM folders WHERE id = ?")
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare get_folder query: {}", e))
            })?;

        let mut rows = stmt.query([id]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute get_folder query: {}", e))
        })?;

        rows.next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))
    }

    /// List all folders ordered by name
    pub async fn db_list_folders(&self) -> Result<libsql::Rows, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare("SELECT id, name, created_at FROM folders ORDER BY name ASC")
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare list_folders query: {}", e))
            })?;

        stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute list_folders query: {}", e))
        })
    }

    /// Delete a folder
    ///
    /// # Returns
    ///
    /// Number of rows affected (0 = folder didn't exist)
    ///
    /// # Notes
    ///
    /// - Notes in the folder get folder_id = NULL via ON DELETE SET NULL;
    ///   they are never removed with the folder
    pub async fn db_delete_folder(&self, id: &str) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let rows_affected = conn
            .execute("DELETE FROM folders WHERE id = ?", [id])
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to delete folder: {}", e)))?;

        Ok(rows_affected)
    }

    //
    // PRESENCE OPERATIONS
    //

    /// Record or refresh a viewer heartbeat
    ///
    /// # Notes
    ///
    /// - Upserts on the (note_id, client_id) primary key; repeated
    ///   heartbeats overwrite display_name and bump last_seen_at in place
    pub async fn db_upsert_presence(
        &self,
        note_id: &str,
        client_id: &str,
        display_name: &str,
    ) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            "INSERT INTO presence (note_id, client_id, display_name, last_seen_at)
             VALUES (?, ?, ?, CURRENT_TIMESTAMP)
             ON CONFLICT(note_id, client_id) DO UPDATE SET
                 display_name = excluded.display_name,
                 last_seen_at = CURRENT_TIMESTAMP",
            (note_id, client_id, display_name),
        )
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to upsert presence: {}", e)))?;

        Ok(())
    }

    /// Get heartbeats for a note that are fresher than the window
    ///
    /// # Arguments
    ///
    /// * `note_id` - Note being viewed
    /// * `window_secs` - Freshness window in seconds; older rows are
    ///   ignored (and overwritten by the next heartbeat, so no reaper
    ///   task is needed)
    pub async fn db_get_active_presence(
        &self,
        note_id: &str,
        window_secs: u64,
    ) -> Result<libsql::Rows, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let cutoff = format!("-{} seconds", window_secs);

        let mut stmt = conn
            .prepare(
                "SELECT client_id, display_name, last_seen_at
                 FROM presence
                 WHERE note_id = ? AND last_seen_at >= datetime('now', ?)
                 ORDER BY last_seen_at DESC",
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!(
                    "Failed to prepare active_presence query: {}",
                    e
                ))
            })?;

        stmt.query([note_id, cutoff.as_str()]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute active_presence query: {}", e))
        })
    }

    /// Close database connections gracefully
    ///
    /// Ensures WAL is checkpointed before closing to prevent data loss.
    ///
    /// # Notes
    ///
    /// - Performs TRUNCATE checkpoint to flush all WAL entries to the main
    ///   database file
    /// - Should be called before application shutdown or database path changes
    /// - libsql connections are automatically dropped, this ensures clean state
    pub async fn db_close(&self) -> Result<(), DatabaseError> {
        // Checkpoint WAL to ensure all writes are flushed
        let conn = self.connect_with_timeout().await?;
        self.execute_pragma(&conn, "PRAGMA wal_checkpoint(TRUNCATE)")
            .await?;

        // Connection will be automatically dropped when it goes out of scope
        // libsql handles connection cleanup internally
        Ok(())
    }
}
