//! HTTP error handling for the API server
//!
//! Provides consistent `{message, code, details?}` error bodies so web
//! clients can branch on machine-readable codes instead of status text.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use ravel_core::services::NoteServiceError;
use serde::{Deserialize, Serialize};

/// HTTP error response body
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpError {
    /// User-facing error message
    pub message: String,
    /// Machine-readable error code
    pub code: String,
    /// Optional detailed error information for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl HttpError {
    /// Create a new HTTP error
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            details: None,
        }
    }

    /// Create a new HTTP error with details
    pub fn with_details(
        message: impl Into<String>,
        code: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            details: Some(details.into()),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = match self.code.as_str() {
            "NOTE_NOT_FOUND" | "RESOURCE_NOT_FOUND" => StatusCode::NOT_FOUND,
            "INVALID_INPUT" | "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

impl From<NoteServiceError> for HttpError {
    fn from(err: NoteServiceError) -> Self {
        match err {
            NoteServiceError::NoteNotFound { id } => {
                HttpError::new(format!("Note not found: {}", id), "NOTE_NOT_FOUND")
            }
            NoteServiceError::FolderNotFound { id } => {
                HttpError::new(format!("Folder not found: {}", id), "RESOURCE_NOT_FOUND")
            }
            NoteServiceError::ValidationFailed(e) => {
                HttpError::new(e.to_string(), "VALIDATION_ERROR")
            }
            NoteServiceError::ReconciliationFailed { context } => HttpError::with_details(
                "The note body was saved, but its links and tags were not updated",
                "RECONCILIATION_FAILED",
                context,
            ),
            other => HttpError::new(other.to_string(), "QUERY_FAILED"),
        }
    }
}
