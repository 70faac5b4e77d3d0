//! Presence Data Structures
//!
//! Ephemeral "who is viewing this note" records. Clients heartbeat while a
//! note is open; viewers are whoever heartbeated within a sliding window.
//! Stale rows age out of reads naturally and are overwritten in place on the
//! next heartbeat, so there is no reaper task.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default freshness window for presence reads, in seconds.
pub const DEFAULT_PRESENCE_WINDOW_SECS: u64 = 30;

/// One client currently viewing a note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEntry {
    /// Opaque client-chosen identifier; uniqueness per note is the
    /// client's problem
    pub client_id: String,

    /// Display name shown to other viewers
    pub display_name: String,

    /// Time of the most recent heartbeat
    pub last_seen_at: DateTime<Utc>,
}
