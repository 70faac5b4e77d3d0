//! Service Layer Error Types
//!
//! This module defines error types for service-layer operations, providing
//! detailed error handling for business logic failures.

use crate::models::ValidationError;
use thiserror::Error;

/// Service operation errors
///
/// Provides high-level error types for all service operations,
/// with detailed context and proper error chaining.
#[derive(Error, Debug)]
pub enum NoteServiceError {
    /// Note not found by ID
    #[error("Note not found: {id}")]
    NoteNotFound { id: String },

    /// Folder not found by ID
    #[error("Folder not found: {id}")]
    FolderNotFound { id: String },

    /// Validation failed for note or tag input
    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),

    /// Store query or write failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Link/tag reconciliation failed after the body was already saved.
    ///
    /// The transactional replace rolled back, so the previous edge/tag set
    /// is still intact; only the re-scan did not take effect.
    #[error("Reconciliation failed: {context}")]
    ReconciliationFailed { context: String },

    /// Service initialization failed
    #[error("Initialization error: {0}")]
    InitializationError(String),
}

impl NoteServiceError {
    /// Create a note not found error
    pub fn note_not_found(id: impl Into<String>) -> Self {
        Self::NoteNotFound { id: id.into() }
    }

    /// Create a folder not found error
    pub fn folder_not_found(id: impl Into<String>) -> Self {
        Self::FolderNotFound { id: id.into() }
    }

    /// Create a query failed error
    pub fn query_failed(msg: impl Into<String>) -> Self {
        Self::QueryFailed(msg.into())
    }

    /// Create a reconciliation failed error
    pub fn reconciliation_failed(context: impl Into<String>) -> Self {
        Self::ReconciliationFailed {
            context: context.into(),
        }
    }

    /// Create an initialization error
    pub fn initialization_error(msg: impl Into<String>) -> Self {
        Self::InitializationError(msg.into())
    }
}
