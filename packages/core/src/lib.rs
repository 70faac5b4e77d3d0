//! Ravel Core Business Logic Layer
//!
//! This crate provides the link-graph maintenance core of the Ravel
//! note-taking system: wikilink/hashtag scanning, link resolution,
//! transactional edge/tag reconciliation, backlink and unlinked-mention
//! views, and related-notes ranking.
//!
//! # Architecture
//!
//! - **Body-owned graph**: a note's outgoing edges and tag rows are derived
//!   from its body and fully replaced on every save (no incremental diff)
//! - **libsql/Turso**: embedded SQLite database behind the [`db::NoteStore`]
//!   trait
//! - **Stateless services**: request-scoped operations, no background
//!   workers; atomicity is delegated to store transactions
//!
//! # Modules
//!
//! - [`models`] - Data structures (Note, Tag, link views, presence)
//! - [`services`] - Business services (NoteService, BacklinkService, etc.)
//! - [`db`] - Database layer with libsql integration

pub mod db;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use models::*;
pub use services::*;
