//! Viewer Presence
//!
//! A deliberately simple polling mechanism, unrelated to the link graph:
//! clients heartbeat while viewing a note, readers ask who was seen within
//! a freshness window. Client identity is an opaque caller-supplied id,
//! never process-wide state.

use crate::db::NoteStore;
use crate::models::{PresenceEntry, ValidationError, DEFAULT_PRESENCE_WINDOW_SECS};
use crate::services::error::NoteServiceError;
use std::sync::Arc;

/// Heartbeat upsert plus time-windowed viewer reads.
#[derive(Clone)]
pub struct PresenceService {
    store: Arc<dyn NoteStore>,
}

impl PresenceService {
    /// Create a new PresenceService over a store handle.
    pub fn new(store: Arc<dyn NoteStore>) -> Self {
        Self { store }
    }

    /// Record a viewer heartbeat.
    ///
    /// Upserts on `(note_id, client_id)`, so repeated heartbeats refresh
    /// the timestamp instead of accumulating rows.
    ///
    /// # Errors
    ///
    /// * [`NoteServiceError::NoteNotFound`] - unknown note
    /// * [`NoteServiceError::ValidationFailed`] - empty client id or
    ///   display name
    pub async fn heartbeat(
        &self,
        note_id: &str,
        client_id: &str,
        display_name: &str,
    ) -> Result<(), NoteServiceError> {
        if client_id.trim().is_empty() {
            return Err(ValidationError::MissingField("clientId".to_string()).into());
        }
        if display_name.trim().is_empty() {
            return Err(ValidationError::MissingField("displayName".to_string()).into());
        }
        self.require_note(note_id).await?;

        self.store
            .upsert_presence(note_id, client_id, display_name)
            .await
            .map_err(|e| {
                NoteServiceError::query_failed(format!("Failed to record heartbeat: {}", e))
            })
    }

    /// Who is currently viewing a note.
    ///
    /// Returns entries whose last heartbeat falls within `window_secs`
    /// (default 30), newest first. Stale rows are filtered, not deleted.
    pub async fn viewers(
        &self,
        note_id: &str,
        window_secs: Option<u64>,
    ) -> Result<Vec<PresenceEntry>, NoteServiceError> {
        self.require_note(note_id).await?;

        self.store
            .active_presence(note_id, window_secs.unwrap_or(DEFAULT_PRESENCE_WINDOW_SECS))
            .await
            .map_err(|e| NoteServiceError::query_failed(format!("Failed to get viewers: {}", e)))
    }

    async fn require_note(&self, note_id: &str) -> Result<(), NoteServiceError> {
        let note = self
            .store
            .get_note(note_id)
            .await
            .map_err(|e| NoteServiceError::query_failed(format!("Failed to get note: {}", e)))?;
        if note.is_none() {
            return Err(NoteServiceError::note_not_found(note_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DatabaseService, TursoStore};
    use crate::services::note_service::{CreateNoteParams, NoteService};
    use tempfile::TempDir;

    async fn create_test_services() -> anyhow::Result<(NoteService, PresenceService, TempDir)> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("test.db");
        let db = Arc::new(DatabaseService::new(db_path).await?);
        let store: Arc<dyn NoteStore> = Arc::new(TursoStore::new(db));
        Ok((
            NoteService::new(store.clone()),
            PresenceService::new(store),
            temp_dir,
        ))
    }

    async fn create_note(notes: &NoteService, title: &str) -> anyhow::Result<String> {
        let note = notes
            .create_note(CreateNoteParams {
                id: None,
                title: title.to_string(),
                body: String::new(),
                folder_id: None,
            })
            .await?;
        Ok(note.id)
    }

    #[tokio::test]
    async fn test_heartbeat_then_viewers() -> anyhow::Result<()> {
        let (notes, presence, _dir) = create_test_services().await?;
        let note_id = create_note(&notes, "Shared doc").await?;

        presence.heartbeat(&note_id, "client-1", "Ada").await?;
        presence.heartbeat(&note_id, "client-2", "Grace").await?;

        let viewers = presence.viewers(&note_id, None).await?;
        assert_eq!(viewers.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_repeated_heartbeats_do_not_accumulate() -> anyhow::Result<()> {
        let (notes, presence, _dir) = create_test_services().await?;
        let note_id = create_note(&notes, "Shared doc").await?;

        presence.heartbeat(&note_id, "client-1", "Ada").await?;
        presence.heartbeat(&note_id, "client-1", "Ada L.").await?;

        let viewers = presence.viewers(&note_id, None).await?;
        assert_eq!(viewers.len(), 1);
        assert_eq!(viewers[0].display_name, "Ada L.");
        Ok(())
    }

    #[tokio::test]
    async fn test_viewers_scoped_to_note() -> anyhow::Result<()> {
        let (notes, presence, _dir) = create_test_services().await?;
        let first = create_note(&notes, "First").await?;
        let second = create_note(&notes, "Second").await?;

        presence.heartbeat(&first, "client-1", "Ada").await?;

        assert_eq!(presence.viewers(&first, None).await?.len(), 1);
        assert!(presence.viewers(&second, None).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_heartbeat_unknown_note_is_not_found() -> anyhow::Result<()> {
        let (_notes, presence, _dir) = create_test_services().await?;

        let err = presence.heartbeat("ghost", "client-1", "Ada").await.unwrap_err();
        assert!(matches!(err, NoteServiceError::NoteNotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_heartbeat_requires_client_id() -> anyhow::Result<()> {
        let (notes, presence, _dir) = create_test_services().await?;
        let note_id = create_note(&notes, "Doc").await?;

        let err = presence.heartbeat(&note_id, "  ", "Ada").await.unwrap_err();
        assert!(matches!(err, NoteServiceError::ValidationFailed(_)));
        Ok(())
    }
}
