//! Scripted in-memory gateway for tests.

use crate::gateway::{RemoteFailure, RemoteGateway, RemoteResult};
use chrono::Utc;
use notesync_protocol::{Note, RemoteNote};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

/// One of the four gateway operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    /// `create_remote`
    Create,
    /// `update_remote`
    Update,
    /// `delete_remote`
    Delete,
    /// `list_remote`
    List,
}

/// A call that reached the mock remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    /// A create carrying the note's local id and title.
    Create {
        /// Client id of the note.
        local_id: String,
        /// Title sent.
        title: String,
    },
    /// An update.
    Update {
        /// Server id of the note.
        remote_id: String,
        /// Title sent.
        title: String,
    },
    /// A delete.
    Delete {
        /// Server id of the note.
        remote_id: String,
    },
    /// A list.
    List,
}

impl GatewayCall {
    /// Returns the operation kind.
    pub fn op(&self) -> GatewayOp {
        match self {
            GatewayCall::Create { .. } => GatewayOp::Create,
            GatewayCall::Update { .. } => GatewayOp::Update,
            GatewayCall::Delete { .. } => GatewayOp::Delete,
            GatewayCall::List => GatewayOp::List,
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    notes: Vec<RemoteNote>,
    next_id: u64,
    failures: HashMap<GatewayOp, VecDeque<RemoteFailure>>,
    lost: HashMap<GatewayOp, usize>,
    calls: Vec<GatewayCall>,
    offline_rejections: u64,
}

impl MockState {
    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("r{}", self.next_id)
    }

    fn position(&self, remote_id: &str) -> Option<usize> {
        self.notes.iter().position(|n| n.id == remote_id)
    }
}

/// An in-memory remote note store with scripted failures.
///
/// - `set_online(false)` makes every call fail transiently without reaching
///   the store (counted in [`MockGateway::offline_rejections`])
/// - `fail_next` queues failures per operation, consumed in order
/// - `lose_next` applies the next call of an operation but answers it with a
///   transient failure, like a response dropped on the way back
/// - `hold` parks every call after it is logged until `release`, which lets
///   tests act while a remote operation is in flight
///
/// Creates are deduplicated by `local_id`, like the reference server.
#[derive(Debug)]
pub struct MockGateway {
    state: Mutex<MockState>,
    online: AtomicBool,
    gate: watch::Sender<bool>,
    entered: watch::Sender<usize>,
}

impl MockGateway {
    /// Creates an empty, online mock.
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        let (entered, _) = watch::channel(0);
        Self {
            state: Mutex::new(MockState::default()),
            online: AtomicBool::new(true),
            gate,
            entered,
        }
    }

    /// Sets the connectivity state.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Returns the connectivity state.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Queues a failure for the next call of `op`.
    pub fn fail_next(&self, op: GatewayOp, failure: RemoteFailure) {
        self.state
            .lock()
            .failures
            .entry(op)
            .or_default()
            .push_back(failure);
    }

    /// Applies the next call of `op` but reports it as failed.
    pub fn lose_next(&self, op: GatewayOp) {
        *self.state.lock().lost.entry(op).or_default() += 1;
    }

    /// Parks calls after they are logged until [`MockGateway::release`].
    pub fn hold(&self) {
        self.gate.send_replace(false);
    }

    /// Lets parked and future calls complete.
    pub fn release(&self) {
        self.gate.send_replace(true);
    }

    /// Waits until at least `count` calls have reached the mock.
    pub async fn wait_for_calls(&self, count: usize) {
        let mut entered = self.entered.subscribe();
        let _ = entered.wait_for(|n| *n >= count).await;
    }

    /// Returns every call that reached the mock, in order.
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.state.lock().calls.clone()
    }

    /// Counts calls of one operation.
    pub fn count(&self, op: GatewayOp) -> usize {
        self.state.lock().calls.iter().filter(|c| c.op() == op).count()
    }

    /// Forgets the call log.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Number of calls refused while offline.
    pub fn offline_rejections(&self) -> u64 {
        self.state.lock().offline_rejections
    }

    /// Returns the remote notes.
    pub fn notes(&self) -> Vec<RemoteNote> {
        self.state.lock().notes.clone()
    }

    /// Finds a remote note by server id.
    pub fn note(&self, remote_id: &str) -> Option<RemoteNote> {
        let state = self.state.lock();
        state.position(remote_id).map(|i| state.notes[i].clone())
    }

    /// Adds a note as if another client had created it.
    pub fn seed(&self, title: impl Into<String>) -> RemoteNote {
        let mut state = self.state.lock();
        let note = RemoteNote {
            id: state.allocate_id(),
            title: title.into(),
            created_at: Utc::now(),
            local_id: None,
        };
        state.notes.push(note.clone());
        note
    }

    /// Changes a remote title behind the client's back.
    pub fn rename(&self, remote_id: &str, title: impl Into<String>) -> bool {
        let mut state = self.state.lock();
        match state.position(remote_id) {
            Some(i) => {
                state.notes[i].title = title.into();
                true
            }
            None => false,
        }
    }

    /// Removes a remote note behind the client's back.
    pub fn remove(&self, remote_id: &str) -> bool {
        let mut state = self.state.lock();
        match state.position(remote_id) {
            Some(i) => {
                state.notes.remove(i);
                true
            }
            None => false,
        }
    }

    async fn call<T>(
        &self,
        call: GatewayCall,
        apply: impl FnOnce(&mut MockState) -> RemoteResult<T> + Send,
    ) -> RemoteResult<T> {
        if !self.is_online() {
            self.state.lock().offline_rejections += 1;
            return Err(RemoteFailure::transient("offline"));
        }

        let op = call.op();
        self.state.lock().calls.push(call);
        self.entered.send_modify(|n| *n += 1);

        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        let mut state = self.state.lock();
        if let Some(failure) = state.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            return Err(failure);
        }
        let result = apply(&mut state);
        if let Some(lost) = state.lost.get_mut(&op).filter(|n| **n > 0) {
            *lost -= 1;
            return Err(RemoteFailure::transient("response lost"));
        }
        result
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteGateway for MockGateway {
    async fn create_remote(&self, note: &Note) -> RemoteResult<String> {
        let call = GatewayCall::Create {
            local_id: note.local_id.clone(),
            title: note.title.clone(),
        };
        self.call(call, |state| {
            if let Some(existing) = state
                .notes
                .iter()
                .find(|n| n.local_id.as_deref() == Some(note.local_id.as_str()))
            {
                return Ok(existing.id.clone());
            }
            let id = state.allocate_id();
            state.notes.push(RemoteNote {
                id: id.clone(),
                title: note.title.clone(),
                created_at: note.created_at,
                local_id: Some(note.local_id.clone()),
            });
            Ok(id)
        })
        .await
    }

    async fn update_remote(&self, remote_id: &str, title: &str) -> RemoteResult<()> {
        let call = GatewayCall::Update {
            remote_id: remote_id.to_string(),
            title: title.to_string(),
        };
        self.call(call, |state| {
            let i = state.position(remote_id).ok_or(RemoteFailure::NotFound)?;
            state.notes[i].title = title.to_string();
            Ok(())
        })
        .await
    }

    async fn delete_remote(&self, remote_id: &str) -> RemoteResult<()> {
        let call = GatewayCall::Delete {
            remote_id: remote_id.to_string(),
        };
        self.call(call, |state| {
            let i = state.position(remote_id).ok_or(RemoteFailure::NotFound)?;
            state.notes.remove(i);
            Ok(())
        })
        .await
    }

    async fn list_remote(&self) -> RemoteResult<Vec<RemoteNote>> {
        self.call(GatewayCall::List, |state| Ok(state.notes.clone()))
            .await
    }
}
