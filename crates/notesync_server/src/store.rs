//! Server-side note storage.

use crate::error::{ServerError, ServerResult};
use notesync_protocol::{CreateNoteRequest, RemoteNote};
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Inner {
    /// Notes in creation order.
    notes: Vec<RemoteNote>,
    /// Client local id -> server id, for idempotent create.
    by_local: HashMap<String, String>,
}

impl Inner {
    fn position(&self, id: &str) -> Option<usize> {
        self.notes.iter().position(|n| n.id == id)
    }
}

/// The authoritative set of notes held by the server.
#[derive(Debug, Default)]
pub struct NoteStore {
    inner: RwLock<Inner>,
}

impl NoteStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a note, or returns the existing one for a repeated `local_id`.
    ///
    /// The flag is true if a new note was stored.
    pub fn create(
        &self,
        request: CreateNoteRequest,
        limit: usize,
    ) -> ServerResult<(RemoteNote, bool)> {
        let mut inner = self.inner.write();

        if let Some(id) = inner.by_local.get(&request.local_id) {
            if let Some(i) = inner.position(id) {
                return Ok((inner.notes[i].clone(), false));
            }
        }

        if inner.notes.len() >= limit {
            return Err(ServerError::CapacityExceeded(limit));
        }

        let note = RemoteNote {
            id: Uuid::new_v4().simple().to_string(),
            title: request.title,
            created_at: request.created_at,
            local_id: Some(request.local_id.clone()),
        };
        inner.by_local.insert(request.local_id, note.id.clone());
        inner.notes.push(note.clone());
        Ok((note, true))
    }

    /// Replaces a note's title.
    pub fn update(&self, id: &str, title: String) -> ServerResult<RemoteNote> {
        let mut inner = self.inner.write();
        let i = inner
            .position(id)
            .ok_or_else(|| ServerError::NoteNotFound(id.to_string()))?;
        inner.notes[i].title = title;
        Ok(inner.notes[i].clone())
    }

    /// Deletes a note.
    pub fn delete(&self, id: &str) -> ServerResult<RemoteNote> {
        let mut inner = self.inner.write();
        let i = inner
            .position(id)
            .ok_or_else(|| ServerError::NoteNotFound(id.to_string()))?;
        let note = inner.notes.remove(i);
        if let Some(local_id) = &note.local_id {
            inner.by_local.remove(local_id);
        }
        Ok(note)
    }

    /// Gets a note by server id.
    pub fn get(&self, id: &str) -> Option<RemoteNote> {
        let inner = self.inner.read();
        inner.position(id).map(|i| inner.notes[i].clone())
    }

    /// Returns all notes in creation order.
    pub fn list(&self) -> Vec<RemoteNote> {
        self.inner.read().notes.clone()
    }

    /// Returns the number of notes.
    pub fn len(&self) -> usize {
        self.inner.read().notes.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every note.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.notes.clear();
        inner.by_local.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn request(local_id: &str, title: &str) -> CreateNoteRequest {
        CreateNoteRequest {
            local_id: local_id.into(),
            title: title.into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn empty_store() {
        let store = NoteStore::new();
        assert!(store.is_empty());
        assert!(store.list().is_empty());
    }

    #[test]
    fn create_is_idempotent_per_local_id() {
        let store = NoteStore::new();
        let (first, created) = store.create(request("l1", "a"), 10).unwrap();
        assert!(created);
        let (second, created) = store.create(request("l1", "a"), 10).unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn create_after_delete_stores_a_new_note() {
        let store = NoteStore::new();
        let (note, _) = store.create(request("l1", "a"), 10).unwrap();
        store.delete(&note.id).unwrap();

        let (again, created) = store.create(request("l1", "a"), 10).unwrap();
        assert!(created);
        assert_ne!(again.id, note.id);
    }

    #[test]
    fn update_and_delete_missing() {
        let store = NoteStore::new();
        assert!(matches!(
            store.update("nope", "t".into()),
            Err(ServerError::NoteNotFound(_))
        ));
        assert!(matches!(store.delete("nope"), Err(ServerError::NoteNotFound(_))));
    }

    #[test]
    fn capacity_limit() {
        let store = NoteStore::new();
        store.create(request("l1", "a"), 1).unwrap();
        assert!(matches!(
            store.create(request("l2", "b"), 1),
            Err(ServerError::CapacityExceeded(1))
        ));
        // A retried create of a stored note still succeeds at capacity.
        assert!(store.create(request("l1", "a"), 1).is_ok());
    }
}
