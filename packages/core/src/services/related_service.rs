//! Contextual / Related-Notes Ranker
//!
//! A heuristic, best-effort scorer over a candidate pool of recently
//! updated and recently visited notes. Scoring combines shared-tag count,
//! existing link adjacency, and edit recency; every suggestion carries a
//! human-readable reason string.
//!
//! The only hard guarantee is that the current note never appears in its
//! own suggestions. Filtering out already-linked candidates is the
//! caller's job (the HTTP handler does it for the suggestion endpoint),
//! because other callers want adjacency kept in.
//!
//! An optional AI provider can reorder the heuristic result. It runs under
//! a hard timeout and any failure (timeout, transport error, malformed
//! output, missing configuration) falls back to the deterministic order.

use crate::db::NoteStore;
use crate::models::{Note, RelatedNote};
use crate::services::error::NoteServiceError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Weight per tag shared with the current note.
const SHARED_TAG_WEIGHT: u32 = 3;

/// Weight for an existing edge in either direction.
const LINK_ADJACENCY_WEIGHT: u32 = 2;

/// Bonus for notes edited within the last day / last week.
const EDITED_TODAY_BONUS: u32 = 2;
const EDITED_THIS_WEEK_BONUS: u32 = 1;

/// How many recently updated notes seed the candidate pool.
const RECENT_POOL_SIZE: usize = 50;

/// Hard cap on one AI re-ranking call.
const DEFAULT_AI_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(2);

/// Black-box text completion provider for the optional re-ranking step.
///
/// Implementations are expected to be remote and flaky; the ranker treats
/// every error as a signal to keep the deterministic order.
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Complete a prompt, returning the raw model output.
    async fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Heuristic related-notes ranker.
#[derive(Clone)]
pub struct RelatedService {
    store: Arc<dyn NoteStore>,
    ai: Option<Arc<dyn AiProvider>>,
    ai_timeout: std::time::Duration,
}

struct ScoredCandidate {
    note: Note,
    score: u32,
    reason: String,
}

impl RelatedService {
    /// Create a ranker with no AI augmentation (the deterministic path).
    pub fn new(store: Arc<dyn NoteStore>) -> Self {
        Self {
            store,
            ai: None,
            ai_timeout: DEFAULT_AI_TIMEOUT,
        }
    }

    /// Attach an AI provider for best-effort re-ranking.
    pub fn with_ai_provider(mut self, provider: Arc<dyn AiProvider>) -> Self {
        self.ai = Some(provider);
        self
    }

    /// Override the AI call timeout.
    pub fn with_ai_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.ai_timeout = timeout;
        self
    }

    /// Rank candidate notes related to `note_id`, best first.
    ///
    /// # Arguments
    ///
    /// * `note_id` - The note suggestions are computed for
    /// * `recent_note_ids` - Recently visited note ids supplied by the
    ///   caller (unknown ids are skipped, not errors)
    /// * `limit` - Maximum number of suggestions
    ///
    /// # Errors
    ///
    /// Returns [`NoteServiceError::NoteNotFound`] when `note_id` is
    /// unknown. AI provider failures are never surfaced.
    pub async fn rank(
        &self,
        note_id: &str,
        recent_note_ids: &[String],
        limit: usize,
    ) -> Result<Vec<RelatedNote>, NoteServiceError> {
        let current = self
            .store
            .get_note(note_id)
            .await
            .map_err(|e| NoteServiceError::query_failed(format!("Failed to get note: {}", e)))?
            .ok_or_else(|| NoteServiceError::note_not_found(note_id))?;

        let candidates = self.gather_candidates(note_id, recent_note_ids).await?;

        let shared_tags: HashMap<String, u32> = self
            .store
            .notes_sharing_tags(note_id)
            .await
            .map_err(|e| {
                NoteServiceError::query_failed(format!("Failed to get shared tags: {}", e))
            })?
            .into_iter()
            .map(|(note, count)| (note.id, count))
            .collect();

        let linked: HashSet<String> = self
            .store
            .linked_note_ids(note_id)
            .await
            .map_err(|e| {
                NoteServiceError::query_failed(format!("Failed to get linked notes: {}", e))
            })?
            .into_iter()
            .collect();

        let now = Utc::now();
        let mut scored: Vec<ScoredCandidate> = candidates
            .into_iter()
            .filter_map(|note| {
                let tags = shared_tags.get(&note.id).copied().unwrap_or(0);
                let adjacent = linked.contains(&note.id);
                let recency = recency_bonus(note.updated_at, now);

                let score = tags * SHARED_TAG_WEIGHT
                    + if adjacent { LINK_ADJACENCY_WEIGHT } else { 0 }
                    + recency;
                if score == 0 {
                    return None;
                }
                let reason = build_reason(tags, adjacent, recency);
                Some(ScoredCandidate { note, score, reason })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| b.note.updated_at.cmp(&a.note.updated_at))
                .then_with(|| a.note.id.cmp(&b.note.id))
        });

        let ranked: Vec<RelatedNote> = scored
            .into_iter()
            .take(limit)
            .map(|c| RelatedNote {
                note_id: c.note.id,
                title: c.note.title,
                reason: c.reason,
            })
            .collect();

        Ok(self.apply_ai_ordering(&current, ranked).await)
    }

    /// Candidate pool: recently updated notes plus caller-supplied
    /// recently visited ones, deduplicated, current note excluded.
    async fn gather_candidates(
        &self,
        note_id: &str,
        recent_note_ids: &[String],
    ) -> Result<Vec<Note>, NoteServiceError> {
        let mut seen = HashSet::new();
        let mut pool = Vec::new();

        let recent = self.store.recent_notes(RECENT_POOL_SIZE).await.map_err(|e| {
            NoteServiceError::query_failed(format!("Failed to list recent notes: {}", e))
        })?;
        for note in recent {
            if note.id != note_id && seen.insert(note.id.clone()) {
                pool.push(note);
            }
        }

        for visited_id in recent_note_ids {
            if visited_id == note_id || seen.contains(visited_id) {
                continue;
            }
            let note = self.store.get_note(visited_id).await.map_err(|e| {
                NoteServiceError::query_failed(format!("Failed to get visited note: {}", e))
            })?;
            if let Some(note) = note {
                seen.insert(note.id.clone());
                pool.push(note);
            }
        }

        Ok(pool)
    }

    /// Hand the heuristic order to the AI provider, if any, and apply its
    /// reordering. Every failure keeps the deterministic order.
    async fn apply_ai_ordering(
        &self,
        current: &Note,
        ranked: Vec<RelatedNote>,
    ) -> Vec<RelatedNote> {
        let Some(provider) = &self.ai else {
            return ranked;
        };
        if ranked.len() < 2 {
            return ranked;
        }

        let prompt = build_ranking_prompt(current, &ranked);
        let completion =
            match tokio::time::timeout(self.ai_timeout, provider.complete(&prompt)).await {
                Ok(Ok(text)) => text,
                Ok(Err(e)) => {
                    tracing::warn!("AI ranking failed, keeping heuristic order: {}", e);
                    return ranked;
                }
                Err(_) => {
                    tracing::warn!(
                        "AI ranking timed out after {:?}, keeping heuristic order",
                        self.ai_timeout
                    );
                    return ranked;
                }
            };

        match serde_json::from_str::<Vec<String>>(completion.trim()) {
            Ok(ordered_ids) => reorder_by_ids(ranked, &ordered_ids),
            Err(e) => {
                tracing::warn!("AI ranking returned malformed output, ignoring: {}", e);
                ranked
            }
        }
    }
}

fn recency_bonus(updated_at: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let age = now.signed_duration_since(updated_at);
    if age < Duration::days(1) {
        EDITED_TODAY_BONUS
    } else if age < Duration::days(7) {
        EDITED_THIS_WEEK_BONUS
    } else {
        0
    }
}

fn build_reason(shared_tags: u32, linked: bool, recency: u32) -> String {
    let mut parts = Vec::new();
    if shared_tags == 1 {
        parts.push("1 shared tag".to_string());
    } else if shared_tags > 1 {
        parts.push(format!("{} shared tags", shared_tags));
    }
    if linked {
        parts.push("linked to this note".to_string());
    }
    if recency > 0 {
        parts.push("edited recently".to_string());
    }
    parts.join(", ")
}

fn build_ranking_prompt(current: &Note, ranked: &[RelatedNote]) -> String {
    let mut prompt = format!(
        "Rank these notes by relevance to the note titled {:?}.\n\
         Respond with only a JSON array of note ids, best first.\n\nCandidates:\n",
        current.title
    );
    for candidate in ranked {
        prompt.push_str(&format!("- id: {} title: {:?}\n", candidate.note_id, candidate.title));
    }
    prompt
}

/// Reorder `ranked` to follow `ordered_ids`; ids the model did not mention
/// keep their relative order at the tail, ids it invented are ignored.
fn reorder_by_ids(mut ranked: Vec<RelatedNote>, ordered_ids: &[String]) -> Vec<RelatedNote> {
    let mut result = Vec::with_capacity(ranked.len());
    for id in ordered_ids {
        if let Some(pos) = ranked.iter().position(|r| &r.note_id == id) {
            result.push(ranked.remove(pos));
        }
    }
    result.extend(ranked);
    result
}
