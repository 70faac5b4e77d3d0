//! Tag Data Structures
//!
//! Tags are global, named entities shared across notes. They are created
//! lazily the first time a `#tag` token appears in a saved body and are
//! never deleted automatically when the last reference goes away.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::note::ValidationError;

/// Maximum accepted tag name length, in characters. Longer candidates are
/// skipped during extraction rather than truncated.
pub const MAX_TAG_NAME_LEN: usize = 100;

/// A tag entity. `name` is unique; nested names use `/` separators
/// (for example `project/alpha`) but nesting carries no semantics here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    /// Unique identifier (UUID v4)
    pub id: String,

    /// Unique tag name, without the leading `#`
    pub name: String,

    /// Optional display color (hex string, client-defined)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Tag {
    /// Create a new tag with a generated UUID.
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            color: None,
            created_at: Utc::now(),
        }
    }
}

/// Validate a tag name supplied directly by a client (as opposed to one
/// extracted from a body, where invalid candidates are silently skipped).
///
/// # Errors
///
/// Returns `ValidationError::InvalidTagName` for empty or oversized names.
pub fn validate_tag_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::InvalidTagName(
            "name must not be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_TAG_NAME_LEN {
        return Err(ValidationError::InvalidTagName(format!(
            "name exceeds {} characters",
            MAX_TAG_NAME_LEN
        )));
    }
    Ok(())
}
