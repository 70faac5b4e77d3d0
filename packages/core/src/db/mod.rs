//! Database Layer
//!
//! This module handles all database interactions using libsql:
//!
//! - Database initialization and connection management
//! - Fixed relational schema for notes, links, tags, folders, and presence
//! - WAL mode with per-connection busy timeout and foreign key enforcement
//!
//! # Architecture
//!
//! Ravel uses embedded libsql (SQLite) as its only database backend:
//!
//! - Single-file databases that users can sync via Dropbox/iCloud
//! - Transactional delete-and-reinsert for link/tag reconciliation
//! - Cascading cleanup of link, tag, and presence rows on note deletion
//!
//! Services depend on the `NoteStore` trait rather than the concrete
//! `TursoStore`, keeping SQL out of the business logic.

mod database;
mod error;
mod note_store;
mod turso_store;

pub use database::DatabaseService;
pub use error::DatabaseError;
pub use note_store::NoteStore;
pub use turso_store::TursoStore;
