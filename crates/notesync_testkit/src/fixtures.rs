//! Test fixtures and store helpers.

use notesync_protocol::Note;
use notesync_storage::{FileStore, FileStoreConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A file store in a temporary directory, removed on drop.
///
/// The store is shared so an engine can own a handle to it; every handle
/// must be dropped before [`TempFileStore::reopen`] or the directory lock is
/// still held.
pub struct TempFileStore {
    store: Option<Arc<FileStore>>,
    path: PathBuf,
    config: FileStoreConfig,
    _temp_dir: TempDir,
}

impl TempFileStore {
    /// Opens a fresh store with fsync disabled.
    pub fn new() -> Self {
        Self::with_config(FileStoreConfig::default().sync_on_write(false))
    }

    /// Opens a fresh store with the given configuration.
    pub fn with_config(config: FileStoreConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("store");
        let store = FileStore::open_with_config(&path, config.clone())
            .expect("Failed to open file store");
        Self {
            store: Some(Arc::new(store)),
            path,
            config,
            _temp_dir: temp_dir,
        }
    }

    /// Returns the open store.
    pub fn store(&self) -> &FileStore {
        self.store.as_ref().expect("store is open")
    }

    /// Returns a shared handle to the open store.
    pub fn shared(&self) -> Arc<FileStore> {
        Arc::clone(self.store.as_ref().expect("store is open"))
    }

    /// Returns the store directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Closes the store and opens it again from disk, as after a restart.
    pub fn reopen(mut self) -> Self {
        drop(self.store.take());
        self.store = Some(Arc::new(
            FileStore::open_with_config(&self.path, self.config.clone())
                .expect("Failed to reopen file store"),
        ));
        self
    }

    /// Closes the store, returning its directory guard for a later open.
    pub fn close(mut self) -> ClosedStore {
        drop(self.store.take());
        ClosedStore {
            path: self.path.clone(),
            config: self.config.clone(),
            temp_dir: self._temp_dir,
        }
    }
}

impl Default for TempFileStore {
    fn default() -> Self {
        Self::new()
    }
}

/// A temporary store directory with nothing holding it open.
pub struct ClosedStore {
    path: PathBuf,
    config: FileStoreConfig,
    temp_dir: TempDir,
}

impl ClosedStore {
    /// Returns the store directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens the store again.
    pub fn open(self) -> TempFileStore {
        let store = FileStore::open_with_config(&self.path, self.config.clone())
            .expect("Failed to reopen file store");
        TempFileStore {
            store: Some(Arc::new(store)),
            path: self.path,
            config: self.config,
            _temp_dir: self.temp_dir,
        }
    }
}

/// Builder for notes in a particular sync state.
#[derive(Debug, Clone)]
pub struct NoteBuilder {
    note: Note,
}

impl NoteBuilder {
    /// Starts from a fresh local-only note.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            note: Note::new(title),
        }
    }

    /// Sets the local id.
    pub fn local_id(mut self, local_id: impl Into<String>) -> Self {
        self.note.local_id = local_id.into();
        self
    }

    /// Marks the note as known to the remote under `remote_id`.
    pub fn remote(mut self, remote_id: impl Into<String>) -> Self {
        self.note.remote_id = Some(remote_id.into());
        self
    }

    /// Marks a title change as awaiting upload.
    pub fn pending_edit(mut self) -> Self {
        self.note.pending_edit = true;
        self
    }

    /// Marks the note as deleted locally, awaiting remote delete.
    pub fn pending_delete(mut self) -> Self {
        self.note.pending_delete = true;
        self
    }

    /// Sets the write version.
    pub fn version(mut self, version: u64) -> Self {
        self.note.version = version;
        self
    }

    /// Returns the note.
    pub fn build(self) -> Note {
        self.note
    }
}

/// Scenario helpers.
pub mod scenarios {
    use super::*;

    /// One note in each sync state, with versions 1 to 4:
    /// created-local, synced, edited-local and deleted-local.
    pub fn one_of_each() -> Vec<Note> {
        vec![
            NoteBuilder::new("created").local_id("c").version(1).build(),
            NoteBuilder::new("synced")
                .local_id("s")
                .remote("r-s")
                .version(2)
                .build(),
            NoteBuilder::new("edited")
                .local_id("e")
                .remote("r-e")
                .pending_edit()
                .version(3)
                .build(),
            NoteBuilder::new("deleted")
                .local_id("d")
                .remote("r-d")
                .pending_delete()
                .version(4)
                .build(),
        ]
    }
}
