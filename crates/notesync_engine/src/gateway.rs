//! Remote gateway abstraction.

use notesync_protocol::{Note, RemoteNote};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Result of a remote operation.
pub type RemoteResult<T> = Result<T, RemoteFailure>;

/// Why a remote operation did not succeed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteFailure {
    /// Network unreachable, timeout, 5xx or an unexpected answer. Retried on
    /// the next flush.
    #[error("transient remote failure: {message}")]
    Transient {
        /// Description of the failure.
        message: String,
    },

    /// The remote store does not know the note.
    #[error("note not found remotely")]
    NotFound,
}

impl RemoteFailure {
    /// Creates a transient failure.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    /// Returns true for failures a later attempt may fix.
    pub fn is_transient(&self) -> bool {
        matches!(self, RemoteFailure::Transient { .. })
    }
}

/// The remote note store as seen by the engine.
///
/// Failures are returned as values; implementations must not panic on
/// network trouble and are responsible for their own timeouts.
pub trait RemoteGateway: Send + Sync {
    /// Creates the note remotely and returns its server id.
    fn create_remote(&self, note: &Note) -> impl Future<Output = RemoteResult<String>> + Send;

    /// Replaces the title of a remote note.
    fn update_remote(
        &self,
        remote_id: &str,
        title: &str,
    ) -> impl Future<Output = RemoteResult<()>> + Send;

    /// Deletes a remote note.
    fn delete_remote(&self, remote_id: &str) -> impl Future<Output = RemoteResult<()>> + Send;

    /// Lists every remote note.
    fn list_remote(&self) -> impl Future<Output = RemoteResult<Vec<RemoteNote>>> + Send;
}

impl<G: RemoteGateway> RemoteGateway for Arc<G> {
    fn create_remote(&self, note: &Note) -> impl Future<Output = RemoteResult<String>> + Send {
        (**self).create_remote(note)
    }

    fn update_remote(
        &self,
        remote_id: &str,
        title: &str,
    ) -> impl Future<Output = RemoteResult<()>> + Send {
        (**self).update_remote(remote_id, title)
    }

    fn delete_remote(&self, remote_id: &str) -> impl Future<Output = RemoteResult<()>> + Send {
        (**self).delete_remote(remote_id)
    }

    fn list_remote(&self) -> impl Future<Output = RemoteResult<Vec<RemoteNote>>> + Send {
        (**self).list_remote()
    }
}

/// A gateway with no remote behind it.
///
/// Every call fails transiently, so all intents stay queued locally until a
/// real gateway flushes them.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineGateway;

impl OfflineGateway {
    fn offline<T>() -> RemoteResult<T> {
        Err(RemoteFailure::transient("offline"))
    }
}

impl RemoteGateway for OfflineGateway {
    async fn create_remote(&self, _note: &Note) -> RemoteResult<String> {
        Self::offline()
    }

    async fn update_remote(&self, _remote_id: &str, _title: &str) -> RemoteResult<()> {
        Self::offline()
    }

    async fn delete_remote(&self, _remote_id: &str) -> RemoteResult<()> {
        Self::offline()
    }

    async fn list_remote(&self) -> RemoteResult<Vec<RemoteNote>> {
        Self::offline()
    }
}
