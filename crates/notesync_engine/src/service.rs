//! Presentation-facing façade.

use crate::config::EngineConfig;
use crate::connectivity::{ConnectivityListener, FlushWorker};
use crate::engine::{
    DeleteStaged, EditStaged, FlushReport, NoteSyncOutcome, RefreshReport, SyncEngine,
};
use crate::error::{SyncError, SyncResult};
use crate::gateway::RemoteGateway;
use notesync_protocol::Note;
use notesync_storage::LocalStore;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, warn};

/// Handle on the network half of an operation.
///
/// The local half has already happened when a ticket is returned. Awaiting
/// [`SyncTicket::settled`] waits for the remote half; dropping the ticket
/// lets it run on unobserved. Nothing is cancelled.
#[derive(Debug)]
#[must_use = "drop the ticket explicitly if the remote outcome is not needed"]
pub struct SyncTicket<T = NoteSyncOutcome> {
    inner: TicketInner<T>,
}

#[derive(Debug)]
enum TicketInner<T> {
    Ready(T),
    Running(JoinHandle<SyncResult<T>>),
}

impl<T: Send + 'static> SyncTicket<T> {
    fn ready(value: T) -> Self {
        Self {
            inner: TicketInner::Ready(value),
        }
    }

    fn spawn<F>(operation: &'static str, work: F) -> Self
    where
        F: Future<Output = SyncResult<T>> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let result = work.await;
            if let Err(e) = &result {
                if e.is_fatal() {
                    error!(operation, error = %e, "background sync failed");
                } else {
                    warn!(operation, error = %e, "background sync incomplete");
                }
            }
            result
        });
        Self {
            inner: TicketInner::Running(handle),
        }
    }

    /// Returns true if the remote half has finished.
    pub fn is_settled(&self) -> bool {
        match &self.inner {
            TicketInner::Ready(_) => true,
            TicketInner::Running(handle) => handle.is_finished(),
        }
    }

    /// Waits for the remote half.
    ///
    /// # Errors
    ///
    /// Returns what the background operation returned, or
    /// [`SyncError::Task`] if it panicked.
    pub async fn settled(self) -> SyncResult<T> {
        match self.inner {
            TicketInner::Ready(value) => Ok(value),
            TicketInner::Running(handle) => handle
                .await
                .map_err(|e| SyncError::Task(e.to_string()))?,
        }
    }
}

/// The operations a note list UI calls.
///
/// Every mutating call writes the local store before returning, so the next
/// [`NoteService::get_notes`] reflects it, and then hands the network work to
/// the tokio runtime. Must be used from within a tokio runtime.
///
/// # Example
///
/// ```rust
/// use notesync_engine::{EngineConfig, MockGateway, NoteService};
/// use notesync_storage::InMemoryStore;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> notesync_engine::SyncResult<()> {
/// let service = NoteService::open(EngineConfig::default(), InMemoryStore::new(), MockGateway::new())?;
///
/// let note = service.create_note("Buy milk");
/// let ticket = service.submit_note(note)?;
/// assert_eq!(service.get_notes()?.len(), 1);
///
/// ticket.settled().await?;
/// assert!(service.get_notes()?[0].is_synced());
/// # Ok(())
/// # }
/// ```
pub struct NoteService<S, G>
where
    S: LocalStore + 'static,
    G: RemoteGateway + 'static,
{
    engine: Arc<SyncEngine<S, G>>,
}

impl<S, G> Clone for NoteService<S, G>
where
    S: LocalStore + 'static,
    G: RemoteGateway + 'static,
{
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
        }
    }
}

impl<S, G> NoteService<S, G>
where
    S: LocalStore + 'static,
    G: RemoteGateway + 'static,
{
    /// Wraps an existing engine.
    pub fn new(engine: Arc<SyncEngine<S, G>>) -> Self {
        Self { engine }
    }

    /// Builds the engine and wraps it.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn open(config: EngineConfig, store: S, gateway: G) -> SyncResult<Self> {
        Ok(Self::new(Arc::new(SyncEngine::new(config, store, gateway)?)))
    }

    /// Returns the underlying engine.
    pub fn engine(&self) -> &Arc<SyncEngine<S, G>> {
        &self.engine
    }

    /// Creates a local-only note.
    pub fn create_note(&self, title: impl Into<String>) -> Note {
        self.engine.create_note(title)
    }

    /// Stores the note and starts its remote create.
    ///
    /// # Errors
    ///
    /// Returns a storage error; remote trouble only shows in the note's flags.
    pub fn submit_note(&self, note: Note) -> SyncResult<SyncTicket> {
        let note = self.engine.stage_submit(note)?;
        Ok(self.dispatch("submit", note.local_id))
    }

    /// Changes the title and starts the remote update if one is due.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NoteNotFound`] for an unknown note, or a storage
    /// error.
    pub fn edit_note(&self, local_id: &str, title: impl Into<String>) -> SyncResult<SyncTicket> {
        Ok(match self.engine.stage_edit(local_id, title.into())? {
            EditStaged::Dispatch => self.dispatch("edit", local_id.to_string()),
            EditStaged::Folded => SyncTicket::ready(NoteSyncOutcome::Queued),
            EditStaged::Ignored => SyncTicket::ready(NoteSyncOutcome::Ignored),
        })
    }

    /// Deletes the note, remotely if it ever got there.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn delete_note(&self, local_id: &str) -> SyncResult<SyncTicket> {
        Ok(match self.engine.stage_delete(local_id)? {
            DeleteStaged::Tombstoned => self.dispatch("delete", local_id.to_string()),
            DeleteStaged::Removed | DeleteStaged::Absent => {
                SyncTicket::ready(NoteSyncOutcome::Removed)
            }
        })
    }

    /// Starts a refresh from the remote.
    pub fn refresh_notes(&self) -> SyncTicket<RefreshReport> {
        let engine = Arc::clone(&self.engine);
        SyncTicket::spawn("refresh", async move { engine.refresh_notes().await })
    }

    /// Starts a flush of every pending note.
    pub fn flush(&self) -> SyncTicket<FlushReport> {
        let engine = Arc::clone(&self.engine);
        SyncTicket::spawn("flush", async move { engine.flush().await })
    }

    /// Returns the local snapshot, tombstones included. Never touches the
    /// network.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn get_notes(&self) -> SyncResult<Vec<Note>> {
        self.engine.get_notes()
    }

    /// Spawns a flush worker driven by `listener`.
    pub fn spawn_worker(&self, listener: ConnectivityListener) -> FlushWorker {
        FlushWorker::spawn(Arc::clone(&self.engine), listener)
    }

    fn dispatch(&self, operation: &'static str, local_id: String) -> SyncTicket {
        let engine = Arc::clone(&self.engine);
        SyncTicket::spawn(operation, async move { engine.sync_note(&local_id).await })
    }
}
