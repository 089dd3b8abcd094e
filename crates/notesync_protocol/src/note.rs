//! The note entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Where a note stands in its sync lifecycle.
///
/// Derived from the note's flags, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Created locally, not yet acknowledged by the remote store.
    CreatedLocal,
    /// Known remotely; the latest edit is unconfirmed.
    EditPending,
    /// Delete requested locally, not yet confirmed remotely.
    DeletePending,
    /// Local and remote agree.
    Synced,
}

impl SyncStatus {
    /// Returns a stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::CreatedLocal => "created_local",
            SyncStatus::EditPending => "edit_pending",
            SyncStatus::DeletePending => "delete_pending",
            SyncStatus::Synced => "synced",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A short text note.
///
/// `local_id` is the stable identity used by the local store and the UI. It is
/// assigned once by [`Note::new`] and never changes. `remote_id` appears only
/// after the remote store has acknowledged the create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Client-generated identifier.
    pub local_id: String,
    /// Server-assigned identifier, absent until the create is acknowledged.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    /// Note text.
    pub title: String,
    /// Creation time, fixed at creation.
    pub created_at: DateTime<Utc>,
    /// A delete was issued locally but is not yet confirmed remotely.
    #[serde(default)]
    pub pending_delete: bool,
    /// The latest edit is not yet confirmed remotely.
    #[serde(default)]
    pub pending_edit: bool,
    /// Stamp of the last write to this record.
    ///
    /// Remote completions are only applied against the version they were
    /// issued for.
    #[serde(default)]
    pub version: u64,
}

impl Note {
    /// Creates a local-only note with a fresh identifier.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            local_id: Uuid::new_v4().to_string(),
            remote_id: None,
            title: title.into(),
            created_at: Utc::now(),
            pending_delete: false,
            pending_edit: false,
            version: 0,
        }
    }

    /// Returns the derived sync status.
    pub fn status(&self) -> SyncStatus {
        if self.pending_delete {
            SyncStatus::DeletePending
        } else if self.remote_id.is_none() {
            SyncStatus::CreatedLocal
        } else if self.pending_edit {
            SyncStatus::EditPending
        } else {
            SyncStatus::Synced
        }
    }

    /// Returns true if the remote store has acknowledged this note.
    pub fn is_remote(&self) -> bool {
        self.remote_id.is_some()
    }

    /// Returns true if local and remote agree.
    pub fn is_synced(&self) -> bool {
        self.status() == SyncStatus::Synced
    }

    /// Returns true if any remote operation is still owed for this note.
    pub fn needs_sync(&self) -> bool {
        !self.is_synced()
    }

    /// Returns true if the note should be shown in a list.
    ///
    /// Tombstoned notes stay in the store until the delete is confirmed but
    /// are hidden by the presentation layer.
    pub fn is_visible(&self) -> bool {
        !self.pending_delete
    }
}
