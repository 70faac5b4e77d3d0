//! Note Data Structures
//!
//! This module defines the core `Note` struct plus the folder grouping type
//! and the validation errors shared across the service layer.
//!
//! # Architecture
//!
//! - **Title-addressed linking**: wikilinks resolve against `title`, so the
//!   field is indexed but deliberately NOT unique (duplicate titles are a
//!   documented ambiguity resolved by creation order)
//! - **Body as markup source**: `body` holds the raw text that the scanner
//!   extracts `[[wikilinks]]` and `#tags` from
//! - **Store-owned timestamps**: `created_at`/`updated_at` are set by the
//!   database on insert/update; in-memory values are provisional
//!
//! # Examples
//!
//! ```rust
//! use ravel_core::models::Note;
//!
//! let note = Note::new(
//!     "Budget".to_string(),
//!     "See [[Plan]] for context. #finance".to_string(),
//!     None,
//! );
//! assert_eq!(note.title, "Budget");
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Maximum accepted note title length, in characters.
pub const MAX_TITLE_LEN: usize = 500;

/// Validation errors for note and tag input
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Title exceeds {max} characters (got {actual})")]
    TitleTooLong { actual: usize, max: usize },

    #[error("Invalid tag name: {0}")]
    InvalidTagName(String),

    #[error("Invalid folder reference: {0}")]
    InvalidFolder(String),
}

/// A single note: the unit of the link graph.
///
/// # Fields
///
/// - `id`: unique identifier (UUID v4 string)
/// - `title`: display title and wikilink resolution key (may be empty)
/// - `body`: raw markup source scanned for `[[wikilinks]]` and `#tags`
/// - `folder_id`: optional folder grouping (cleared when the folder goes)
/// - `created_at` / `updated_at`: UTC timestamps maintained by the store
///
/// Outgoing link edges and tag associations are persisted separately and
/// fully derived from `body` on every save; they are never carried on the
/// struct itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Unique identifier (UUID v4)
    pub id: String,

    /// Display title; wikilinks resolve against this, case-sensitively
    pub title: String,

    /// Raw body text (markup source)
    pub body: String,

    /// Optional folder reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// Create a new note with a generated UUID and current timestamps.
    ///
    /// The timestamps are provisional: the store stamps its own values on
    /// insert and the persisted row is what callers get back.
    pub fn new(title: String, body: String, folder_id: Option<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), title, body, folder_id)
    }

    /// Create a note with a caller-supplied id.
    ///
    /// Used when a client pre-generates the id for optimistic UI updates.
    pub fn with_id(id: String, title: String, body: String, folder_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            title,
            body,
            folder_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Validate field constraints prior to persistence.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::TitleTooLong` when the title exceeds
    /// [`MAX_TITLE_LEN`] characters. Empty titles are allowed.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let len = self.title.chars().count();
        if len > MAX_TITLE_LEN {
            return Err(ValidationError::TitleTooLong {
                actual: len,
                max: MAX_TITLE_LEN,
            });
        }
        Ok(())
    }
}

/// Sparse note update: only provided fields change.
///
/// `folder_id` uses a double `Option` so callers can distinguish "leave the
/// folder alone" (`None`) from "clear the folder" (`Some(None)`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteUpdate {
    /// New title, if changing
    pub title: Option<String>,

    /// New body, if changing (triggers link/tag reconciliation)
    pub body: Option<String>,

    /// New folder assignment: `Some(None)` clears it
    #[serde(default, with = "double_option")]
    pub folder_id: Option<Option<String>>,
}

/// Serde helper for `Option<Option<T>>`: an absent field deserializes to
/// `None`, an explicit `null` to `Some(None)`.
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(de).map(Some)
    }
}

/// Result of a delete operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResult {
    /// Whether the record existed before deletion (deletes are idempotent)
    pub existed: bool,
}

/// A folder grouping notes. Deleting a folder orphans its notes rather than
/// cascading into them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Folder {
    /// Create a new folder with a generated UUID.
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            created_at: Utc::now(),
        }
    }
}
