//! Local store trait definition.

use crate::error::StorageResult;
use notesync_protocol::Note;
use std::sync::Arc;

/// Durable, ordered persistence of notes keyed by `local_id`.
///
/// # Invariants
///
/// - `put` inserts or replaces; a replaced note keeps its list position
/// - `list` returns notes in insertion order
/// - `remove` of an unknown key is not an error
/// - Implementations must be `Send + Sync` and serialize concurrent writes
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing
/// - [`super::FileStore`] - For persistent storage
pub trait LocalStore: Send + Sync {
    /// Inserts or replaces a note.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be made durable.
    fn put(&self, note: Note) -> StorageResult<()>;

    /// Gets a note by local id.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage medium cannot be read.
    fn get(&self, local_id: &str) -> StorageResult<Option<Note>>;

    /// Returns all notes in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage medium cannot be read.
    fn list(&self) -> StorageResult<Vec<Note>>;

    /// Removes a note, returning it if it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal cannot be made durable.
    fn remove(&self, local_id: &str) -> StorageResult<Option<Note>>;

    /// Returns the number of stored notes.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage medium cannot be read.
    fn len(&self) -> StorageResult<usize> {
        Ok(self.list()?.len())
    }

    /// Returns true if the store holds no notes.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage medium cannot be read.
    fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl<S: LocalStore + ?Sized> LocalStore for Arc<S> {
    fn put(&self, note: Note) -> StorageResult<()> {
        (**self).put(note)
    }

    fn get(&self, local_id: &str) -> StorageResult<Option<Note>> {
        (**self).get(local_id)
    }

    fn list(&self) -> StorageResult<Vec<Note>> {
        (**self).list()
    }

    fn remove(&self, local_id: &str) -> StorageResult<Option<Note>> {
        (**self).remove(local_id)
    }

    fn len(&self) -> StorageResult<usize> {
        (**self).len()
    }
}
