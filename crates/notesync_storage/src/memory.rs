//! In-memory note store for testing.

use crate::error::StorageResult;
use crate::store::LocalStore;
use crate::table::NoteTable;
use notesync_protocol::Note;
use parking_lot::RwLock;

/// An in-memory note store.
///
/// Suitable for unit tests, integration tests and sessions that don't need
/// persistence. Never fails.
///
/// # Example
///
/// ```rust
/// use notesync_protocol::Note;
/// use notesync_storage::{InMemoryStore, LocalStore};
///
/// let store = InMemoryStore::new();
/// store.put(Note::new("a")).unwrap();
/// assert_eq!(store.len().unwrap(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    table: RwLock<NoteTable>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with notes, in order.
    #[must_use]
    pub fn with_notes(notes: impl IntoIterator<Item = Note>) -> Self {
        let mut table = NoteTable::new();
        for note in notes {
            table.put(note);
        }
        Self {
            table: RwLock::new(table),
        }
    }
}

impl LocalStore for InMemoryStore {
    fn put(&self, note: Note) -> StorageResult<()> {
        self.table.write().put(note);
        Ok(())
    }

    fn get(&self, local_id: &str) -> StorageResult<Option<Note>> {
        Ok(self.table.read().get(local_id).cloned())
    }

    fn list(&self) -> StorageResult<Vec<Note>> {
        Ok(self.table.read().list())
    }

    fn remove(&self, local_id: &str) -> StorageResult<Option<Note>> {
        Ok(self.table.write().remove(local_id))
    }

    fn len(&self) -> StorageResult<usize> {
        Ok(self.table.read().len())
    }
}
