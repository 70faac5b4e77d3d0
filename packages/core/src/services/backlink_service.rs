//! Backlink and Unlinked-Mention Builder
//!
//! Read-only views over the link graph, both driven by the target note's
//! **title** rather than its id:
//!
//! - backlinks: structural incoming edges, each source grouped with context
//!   excerpts around its `[[title]]` occurrences
//! - unlinked mentions: plain-text occurrences of the title in other notes
//!   that are not wrapped as a wikilink
//!
//! Context matching is case-insensitive so excerpts survive a target
//! rename; a stored edge whose source body no longer contains the wikilink
//! is still reported, with an empty context list.

use crate::db::NoteStore;
use crate::models::{BacklinkGroup, NoteSummary, UnlinkedMention};
use crate::services::error::NoteServiceError;
use crate::services::markup;
use std::sync::Arc;

/// Builds backlink and mention views for a note.
#[derive(Clone)]
pub struct BacklinkService {
    store: Arc<dyn NoteStore>,
}

impl BacklinkService {
    /// Create a new BacklinkService over a store handle.
    pub fn new(store: Arc<dyn NoteStore>) -> Self {
        Self { store }
    }

    /// Structural backlinks for a note, grouped per source.
    ///
    /// For every incoming edge, the source body is scanned for literal
    /// `[[<target title>]]` occurrences (case-insensitive); each occurrence
    /// yields a context excerpt. One [`BacklinkGroup`] is returned per
    /// source note, even when the scan finds nothing (stale edge).
    ///
    /// # Errors
    ///
    /// Returns [`NoteServiceError::NoteNotFound`] when the note id is
    /// unknown.
    pub async fn backlinks(&self, note_id: &str) -> Result<Vec<BacklinkGroup>, NoteServiceError> {
        let note = self
            .store
            .get_note(note_id)
            .await
            .map_err(|e| NoteServiceError::query_failed(format!("Failed to get note: {}", e)))?
            .ok_or_else(|| NoteServiceError::note_not_found(note_id))?;

        let sources = self.store.incoming_link_sources(note_id).await.map_err(|e| {
            NoteServiceError::query_failed(format!("Failed to get incoming links: {}", e))
        })?;

        let groups = sources
            .into_iter()
            .map(|source| {
                let contexts = markup::wikilink_contexts(&source.body, &note.title);
                BacklinkGroup {
                    source: NoteSummary {
                        id: source.id,
                        title: source.title,
                    },
                    mention_count: contexts.len(),
                    contexts,
                }
            })
            .collect();

        Ok(groups)
    }

    /// Plain-text mentions of a note's title in other notes.
    ///
    /// Occurrences already wrapped by `[[` and `]]` are structural links,
    /// not mentions, and are skipped. Titles shorter than
    /// [`markup::MIN_MENTION_TITLE_LEN`] characters return an empty list
    /// outright. Only notes with at least one qualifying occurrence appear.
    ///
    /// # Errors
    ///
    /// Returns [`NoteServiceError::NoteNotFound`] when the note id is
    /// unknown.
    pub async fn unlinked_mentions(
        &self,
        note_id: &str,
    ) -> Result<Vec<UnlinkedMention>, NoteServiceError> {
        let note = self
            .store
            .get_note(note_id)
            .await
            .map_err(|e| NoteServiceError::query_failed(format!("Failed to get note: {}", e)))?
            .ok_or_else(|| NoteServiceError::note_not_found(note_id))?;

        if note.title.chars().count() < markup::MIN_MENTION_TITLE_LEN {
            return Ok(Vec::new());
        }

        // The store does a cheap substring prefilter; the scanner then
        // applies the case-insensitive match and the wrapped-occurrence
        // exclusion authoritatively.
        let candidates = self
            .store
            .find_notes_with_text(&note.title, note_id)
            .await
            .map_err(|e| {
                NoteServiceError::query_failed(format!("Failed to search for mentions: {}", e))
            })?;

        let mentions = candidates
            .into_iter()
            .filter_map(|candidate| {
                let contexts = markup::mention_contexts(&candidate.body, &note.title);
                if contexts.is_empty() {
                    return None;
                }
                Some(UnlinkedMention {
                    source: NoteSummary {
                        id: candidate.id,
                        title: candidate.title,
                    },
                    mention_count: contexts.len(),
                    contexts,
                })
            })
            .collect();

        Ok(mentions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DatabaseService, TursoStore};
    use crate::models::NoteUpdate;
    use crate::services::note_service::{CreateNoteParams, NoteService};
    use tempfile::TempDir;

    async fn create_test_services() -> anyhow::Result<(NoteService, BacklinkService, TempDir)> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("test.db");
        let db = Arc::new(DatabaseService::new(db_path).await?);
        let store: Arc<dyn NoteStore> = Arc::new(TursoStore::new(db));
        Ok((
            NoteService::new(store.clone()),
            BacklinkService::new(store),
            temp_dir,
        ))
    }

    fn params(title: &str, body: &str) -> CreateNoteParams {
        CreateNoteParams {
            id: None,
            title: title.to_string(),
            body: body.to_string(),
            folder_id: None,
        }
    }

    #[tokio::test]
    async fn test_backlinks_with_context() -> anyhow::Result<()> {
        let (notes, backlinks, _dir) = create_test_services().await?;

        let budget = notes.create_note(params("Budget", "")).await?;
        let diary = notes
            .create_note(params("Diary", "Check [[Budget]] before Friday"))
            .await?;

        let groups = backlinks.backlinks(&budget.id).await?;
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].source.id, diary.id);
        assert_eq!(groups[0].source.title, "Diary");
        assert_eq!(groups[0].mention_count, 1);
        assert!(groups[0].contexts[0].contains("[[Budget]] before Friday"));
        Ok(())
    }

    #[tokio::test]
    async fn test_backlinks_group_multiple_occurrences() -> anyhow::Result<()> {
        let (notes, backlinks, _dir) = create_test_services().await?;

        let budget = notes.create_note(params("Budget", "")).await?;
        notes
            .create_note(params("Diary", "[[Budget]] draft, then final [[Budget]]"))
            .await?;

        let groups = backlinks.backlinks(&budget.id).await?;
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].mention_count, 2);
        assert_eq!(groups[0].contexts.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_backlinks_from_multiple_sources() -> anyhow::Result<()> {
        let (notes, backlinks, _dir) = create_test_services().await?;

        let budget = notes.create_note(params("Budget", "")).await?;
        notes.create_note(params("Diary", "see [[Budget]]")).await?;
        notes.create_note(params("Plan", "fund per [[Budget]]")).await?;

        let groups = backlinks.backlinks(&budget.id).await?;
        assert_eq!(groups.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_backlink_contexts_survive_target_rename() -> anyhow::Result<()> {
        let (notes, backlinks, _dir) = create_test_services().await?;

        let budget = notes.create_note(params("BUDGET", "")).await?;
        notes.create_note(params("Diary", "see [[BUDGET]] today")).await?;

        // Rename only changes the title; the edge and the old body stay.
        notes
            .update_note(
                &budget.id,
                NoteUpdate {
                    title: Some("budget".to_string()),
                    ..Default::default()
                },
            )
            .await?;

        let groups = backlinks.backlinks(&budget.id).await?;
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].mention_count, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_stale_edge_reported_with_empty_contexts() -> anyhow::Result<()> {
        let (notes, backlinks, _dir) = create_test_services().await?;

        let budget = notes.create_note(params("Budget", "")).await?;
        notes.create_note(params("Diary", "see [[Budget]]")).await?;

        // A rename the linking body never caught up with.
        notes
            .update_note(
                &budget.id,
                NoteUpdate {
                    title: Some("Budget 2025".to_string()),
                    ..Default::default()
                },
            )
            .await?;

        let groups = backlinks.backlinks(&budget.id).await?;
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].mention_count, 0);
        assert!(groups[0].contexts.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_backlinks_empty_without_edges() -> anyhow::Result<()> {
        let (notes, backlinks, _dir) = create_test_services().await?;

        let lonely = notes.create_note(params("Lonely", "")).await?;
        assert!(backlinks.backlinks(&lonely.id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_backlinks_unknown_note_is_not_found() -> anyhow::Result<()> {
        let (_notes, backlinks, _dir) = create_test_services().await?;

        let err = backlinks.backlinks("ghost").await.unwrap_err();
        assert!(matches!(err, NoteServiceError::NoteNotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_unlinked_mentions_basic() -> anyhow::Result<()> {
        let (notes, backlinks, _dir) = create_test_services().await?;

        let budget = notes.create_note(params("Budget", "")).await?;
        let memo = notes
            .create_note(params("Memo", "the Budget needs another pass"))
            .await?;

        let mentions = backlinks.unlinked_mentions(&budget.id).await?;
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].source.id, memo.id);
        assert_eq!(mentions[0].mention_count, 1);
        assert!(mentions[0].contexts[0].contains("Budget needs another pass"));
        Ok(())
    }

    #[tokio::test]
    async fn test_unlinked_mentions_case_insensitive() -> anyhow::Result<()> {
        let (notes, backlinks, _dir) = create_test_services().await?;

        let budget = notes.create_note(params("Budget", "")).await?;
        notes.create_note(params("Memo", "the BUDGET sheet")).await?;

        let mentions = backlinks.unlinked_mentions(&budget.id).await?;
        assert_eq!(mentions.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_unlinked_mentions_exclude_wrapped_occurrences() -> anyhow::Result<()> {
        let (notes, backlinks, _dir) = create_test_services().await?;

        let budget = notes.create_note(params("Budget", "")).await?;
        notes.create_note(params("Linked", "see [[Budget]]")).await?;
        let mixed = notes
            .create_note(params("Mixed", "see [[Budget]] and the budget draft"))
            .await?;

        let mentions = backlinks.unlinked_mentions(&budget.id).await?;
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].source.id, mixed.id);
        assert_eq!(mentions[0].mention_count, 1);
        assert!(mentions[0].contexts[0].contains("budget draft"));
        Ok(())
    }

    #[tokio::test]
    async fn test_unlinked_mentions_short_title_returns_empty() -> anyhow::Result<()> {
        let (notes, backlinks, _dir) = create_test_services().await?;

        let short = notes.create_note(params("AB", "")).await?;
        notes.create_note(params("Memo", "AB appears here")).await?;

        assert!(backlinks.unlinked_mentions(&short.id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_unlinked_mentions_exclude_own_body() -> anyhow::Result<()> {
        let (notes, backlinks, _dir) = create_test_services().await?;

        let budget = notes
            .create_note(params("Budget", "this Budget tracks itself"))
            .await?;

        assert!(backlinks.unlinked_mentions(&budget.id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_unlinked_mentions_unknown_note_is_not_found() -> anyhow::Result<()> {
        let (_notes, backlinks, _dir) = create_test_services().await?;

        let err = backlinks.unlinked_mentions("ghost").await.unwrap_err();
        assert!(matches!(err, NoteServiceError::NoteNotFound { .. }));
        Ok(())
    }
}
