//! Business Services
//!
//! This module contains the core business logic services:
//!
//! - `NoteService` - note/folder CRUD and the save-reconcile pipeline
//! - `BacklinkService` - backlinks and unlinked mentions with context
//! - `RelatedService` - heuristic related-notes ranking with optional AI
//!   re-ranking
//! - `PresenceService` - viewer heartbeats and windowed reads
//! - `markup` - pure wikilink/hashtag scanning shared by the above
//!
//! Services coordinate between the store layer and application logic,
//! implementing business rules and orchestrating complex operations.

pub mod backlink_service;
pub mod error;
pub mod markup;
pub mod note_service;
pub mod presence_service;
pub mod related_service;

pub use backlink_service::BacklinkService;
pub use error::NoteServiceError;
pub use note_service::{
    periodic_title, CreateNoteParams, LinkResolution, NoteService, PeriodicKind,
};
pub use presence_service::PresenceService;
pub use related_service::{AiProvider, RelatedService};
