//! Link Graph View Types
//!
//! Link edges live in the store as bare `(source_id, target_id)` pairs; the
//! types here are the enriched shapes the services hand to callers: outgoing
//! links with unresolved placeholders, backlink groups with context excerpts,
//! unlinked mentions, save outcomes, and related-note suggestions.

use serde::{Deserialize, Serialize};

use super::tag::Tag;

/// Prefix for synthetic ids representing wikilinks whose target title does
/// not resolve to any note. The remainder of the id is the raw title text.
pub const MISSING_LINK_PREFIX: &str = "missing:";

/// Lightweight note reference used in link listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteSummary {
    pub id: String,
    pub title: String,
}

/// One outgoing link from a note body, resolved or not.
///
/// Unresolved entries carry a synthetic `missing:<title>` id so clients can
/// render a create-on-click affordance without a second lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingLink {
    /// Target note id, or `missing:<title>` when unresolved
    pub id: String,

    /// Title as written inside the wikilink
    pub title: String,

    /// Whether the target exists
    pub resolved: bool,
}

impl OutgoingLink {
    /// Build the unresolved placeholder for a title with no matching note.
    pub fn missing(title: String) -> Self {
        Self {
            id: format!("{}{}", MISSING_LINK_PREFIX, title),
            title,
            resolved: false,
        }
    }
}

/// All backlink references from one source note, with a context excerpt per
/// occurrence of the wikilink in that source's body.
///
/// `contexts` may be empty when the stored edge is stale (the source body no
/// longer contains the wikilink); the group is still reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacklinkGroup {
    /// Source note containing the link
    pub source: NoteSummary,

    /// One excerpt per `[[title]]` occurrence in the source body
    pub contexts: Vec<String>,

    /// Number of occurrences (always `contexts.len()`)
    pub mention_count: usize,
}

/// Plain-text occurrences of a note title in one other note, none of them
/// already wrapped as a wikilink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlinkedMention {
    /// Note whose body mentions the title
    pub source: NoteSummary,

    /// One excerpt per unlinked occurrence
    pub contexts: Vec<String>,

    /// Number of occurrences (always `contexts.len()`)
    pub mention_count: usize,
}

/// Result of saving a note body: what the scan found and how it landed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOutcome {
    /// Count of wikilinks that resolved to an existing note
    pub resolved_links: usize,

    /// Titles that did not resolve, in order of first appearance
    pub unresolved_titles: Vec<String>,

    /// Tag entities now associated with the note
    pub tags: Vec<Tag>,
}

/// A related-note suggestion produced by the heuristic ranker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedNote {
    pub note_id: String,
    pub title: String,

    /// Human-readable explanation, for example "2 shared tags"
    pub reason: String,
}
