//! Error types for the sync engine.

use notesync_storage::StorageError;
use thiserror::Error;

use crate::gateway::RemoteFailure;

/// Result type for engine operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors surfaced by engine operations.
///
/// Remote failures during a note's lane pass are not errors: they are
/// recorded in the note's flags and retried on the next flush. Only the
/// refresh path, which has no note to park the failure on, reports them here.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The local store failed. No progress is possible without it.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The note does not exist locally.
    #[error("note not found: {0}")]
    NoteNotFound(String),

    /// The remote store could not be reached or answered badly.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteFailure),

    /// A background sync task panicked or was aborted by the runtime.
    #[error("background task failed: {0}")]
    Task(String),
}

impl SyncError {
    /// Returns true if the error leaves local state unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::Storage(_) | SyncError::Task(_))
    }

    /// Returns true if a later flush may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Remote(failure) => failure.is_transient(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let storage = SyncError::from(StorageError::Corrupted("bad frame".into()));
        assert!(storage.is_fatal());
        assert!(!storage.is_retryable());

        let transient = SyncError::from(RemoteFailure::transient("connection reset"));
        assert!(!transient.is_fatal());
        assert!(transient.is_retryable());

        assert!(!SyncError::NoteNotFound("n1".into()).is_retryable());
        assert!(!SyncError::from(RemoteFailure::NotFound).is_retryable());
    }

    #[test]
    fn error_display() {
        let err = SyncError::NoteNotFound("abc".into());
        assert_eq!(err.to_string(), "note not found: abc");

        let err = SyncError::from(RemoteFailure::transient("503"));
        assert!(err.to_string().contains("503"));
    }
}
