//! Next remote operation for a note.

use notesync_protocol::Note;

/// The single remote operation a note currently owes.
///
/// Derived from the note's flags alone, so a retry after any failure or
/// restart issues the right call without a separate queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOp {
    /// Nothing to do.
    None,
    /// Create the note remotely with its latest title.
    Create,
    /// Push the latest title.
    Update {
        /// Server id of the note.
        remote_id: String,
    },
    /// Delete the remote copy, then purge.
    Delete {
        /// Server id of the note.
        remote_id: String,
    },
    /// The note never reached the remote; purge it locally.
    LocalPurge,
}

impl RemoteOp {
    /// Plans the next operation for `note`.
    pub fn plan(note: &Note) -> Self {
        match (&note.remote_id, note.pending_delete) {
            (Some(id), true) => RemoteOp::Delete {
                remote_id: id.clone(),
            },
            (None, true) => RemoteOp::LocalPurge,
            (None, false) => RemoteOp::Create,
            (Some(id), false) if note.pending_edit => RemoteOp::Update {
                remote_id: id.clone(),
            },
            (Some(_), false) => RemoteOp::None,
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            RemoteOp::None => "none",
            RemoteOp::Create => "create",
            RemoteOp::Update { .. } => "update",
            RemoteOp::Delete { .. } => "delete",
            RemoteOp::LocalPurge => "purge",
        }
    }
}
