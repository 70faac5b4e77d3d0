//! Data Models
//!
//! This module contains the core data structures used throughout Ravel:
//!
//! - `Note` - the unit of the link graph, plus folder grouping
//! - Link graph view types (outgoing links, backlinks, mentions)
//! - `Tag` - global named entities attached to notes
//! - `PresenceEntry` - ephemeral viewer records
//!
//! Link and tag associations are derived from note bodies on save and stored
//! relationally; the view types here are the shapes services return.

pub mod link;
pub mod note;
pub mod presence;
pub mod tag;

pub use link::{
    BacklinkGroup, NoteSummary, OutgoingLink, RelatedNote, SaveOutcome, UnlinkedMention,
    MISSING_LINK_PREFIX,
};
pub use note::{DeleteResult, Folder, Note, NoteUpdate, ValidationError, MAX_TITLE_LEN};
pub use presence::{PresenceEntry, DEFAULT_PRESENCE_WINDOW_SECS};
pub use tag::{validate_tag_name, Tag, MAX_TAG_NAME_LEN};
