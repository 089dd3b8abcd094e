//! File-backed note store.
//!
//! Directory layout:
//!
//! ```text
//! <store_path>/
//! ├─ LOCK            # Advisory lock for single-writer
//! ├─ notes.log       # Append-only record log
//! └─ notes.log.tmp   # Present only while compacting
//! ```

use crate::error::{StorageError, StorageResult};
use crate::log::{scan, LogRecord};
use crate::store::LocalStore;
use crate::table::NoteTable;
use fs2::FileExt;
use notesync_protocol::Note;
use parking_lot::RwLock;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const LOCK_FILE: &str = "LOCK";
const LOG_FILE: &str = "notes.log";
const LOG_TEMP: &str = "notes.log.tmp";

/// Configuration for a [`FileStore`].
#[derive(Debug, Clone)]
pub struct FileStoreConfig {
    /// Whether to `fsync` after every record (safer but slower).
    pub sync_on_write: bool,
    /// Fraction of dead records that triggers compaction.
    pub compaction_ratio: f64,
    /// Minimum log length, in records, before compaction is considered.
    pub min_compaction_records: u64,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            sync_on_write: true,
            compaction_ratio: 0.5,
            min_compaction_records: 256,
        }
    }
}

impl FileStoreConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to sync on every write.
    #[must_use]
    pub const fn sync_on_write(mut self, value: bool) -> Self {
        self.sync_on_write = value;
        self
    }

    /// Sets the dead-record ratio that triggers compaction.
    #[must_use]
    pub const fn compaction_ratio(mut self, ratio: f64) -> Self {
        self.compaction_ratio = ratio;
        self
    }

    /// Sets the minimum number of records before compaction.
    #[must_use]
    pub const fn min_compaction_records(mut self, records: u64) -> Self {
        self.min_compaction_records = records;
        self
    }
}

/// Size and health figures for a [`FileStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStoreStats {
    /// Notes currently in the store.
    pub live_notes: usize,
    /// Records in the log.
    pub log_records: u64,
    /// Records that compaction would drop.
    pub dead_records: u64,
    /// Log size in bytes.
    pub log_bytes: u64,
    /// Compactions performed since open.
    pub compactions: u64,
}

#[derive(Debug)]
struct LogState {
    table: NoteTable,
    log: File,
    log_bytes: u64,
    log_records: u64,
    dead_records: u64,
    compactions: u64,
}

/// A durable note store backed by an append-only log.
///
/// Every `put` and `remove` appends one framed record. Opening the store
/// replays the log; a torn or corrupt tail (e.g. from a crash mid-write) is
/// truncated back to the last valid record. When enough of the log is dead
/// weight it is rewritten with only the live notes.
///
/// The store holds an exclusive lock on its directory for its lifetime.
///
/// # Example
///
/// ```no_run
/// use notesync_protocol::Note;
/// use notesync_storage::{FileStore, LocalStore};
/// use std::path::Path;
///
/// let store = FileStore::open(Path::new("notes_db")).unwrap();
/// store.put(Note::new("persistent")).unwrap();
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    config: FileStoreConfig,
    state: RwLock<LogState>,
    _lock_file: File,
}

impl FileStore {
    /// Opens or creates a store with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created, another process
    /// holds the lock, or the log cannot be read.
    pub fn open(path: &Path) -> StorageResult<Self> {
        Self::open_with_config(path, FileStoreConfig::default())
    }

    /// Opens or creates a store.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created, another process
    /// holds the lock, or the log cannot be read.
    pub fn open_with_config(path: &Path, config: FileStoreConfig) -> StorageResult<Self> {
        fs::create_dir_all(path)?;
        if !path.is_dir() {
            return Err(StorageError::Corrupted(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked(path.to_path_buf()));
        }

        // A leftover temp file means a compaction died before its rename;
        // the original log is still authoritative.
        let temp = path.join(LOG_TEMP);
        if temp.exists() {
            warn!(path = %temp.display(), "discarding incomplete compaction");
            fs::remove_file(&temp)?;
        }

        let mut log = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOG_FILE))?;

        let mut buffer = Vec::new();
        log.read_to_end(&mut buffer)?;
        let scanned = scan(&buffer);

        if let Some(reason) = &scanned.stopped {
            warn!(
                path = %path.display(),
                valid_bytes = scanned.valid_len,
                dropped_bytes = buffer.len() as u64 - scanned.valid_len,
                reason = %reason,
                "truncating damaged log tail"
            );
            log.set_len(scanned.valid_len)?;
            log.sync_all()?;
        }

        let mut table = NoteTable::new();
        let mut dead_records = 0u64;
        let log_records = scanned.records.len() as u64;
        for record in scanned.records {
            match record {
                LogRecord::Put(note) => {
                    if table.put(note) {
                        dead_records += 1;
                    }
                }
                LogRecord::Remove(local_id) => {
                    // The remove itself is dead weight, plus the put it cancels.
                    dead_records += 1;
                    if table.remove(&local_id).is_some() {
                        dead_records += 1;
                    }
                }
            }
        }

        debug!(
            path = %path.display(),
            notes = table.len(),
            records = log_records,
            "opened note store"
        );

        let store = Self {
            path: path.to_path_buf(),
            config,
            state: RwLock::new(LogState {
                table,
                log,
                log_bytes: scanned.valid_len,
                log_records,
                dead_records,
                compactions: 0,
            }),
            _lock_file: lock_file,
        };
        store.maybe_compact()?;
        Ok(store)
    }

    /// Returns the store directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns size and health figures.
    pub fn stats(&self) -> FileStoreStats {
        let state = self.state.read();
        FileStoreStats {
            live_notes: state.table.len(),
            log_records: state.log_records,
            dead_records: state.dead_records,
            log_bytes: state.log_bytes,
            compactions: state.compactions,
        }
    }

    /// Rewrites the log with only the live notes.
    ///
    /// # Errors
    ///
    /// Returns an error if the new log cannot be written or swapped in. The
    /// old log stays valid in that case.
    pub fn compact(&self) -> StorageResult<()> {
        let mut state = self.state.write();
        self.compact_locked(&mut state)
    }

    fn compact_locked(&self, state: &mut LogState) -> StorageResult<()> {
        let temp_path = self.path.join(LOG_TEMP);
        let log_path = self.path.join(LOG_FILE);

        let mut bytes = 0u64;
        {
            let mut temp = File::create(&temp_path)?;
            for note in state.table.iter() {
                let frame = LogRecord::Put(note.clone()).encode()?;
                temp.write_all(&frame)?;
                bytes += frame.len() as u64;
            }
            temp.sync_all()?;
        }
        fs::rename(&temp_path, &log_path)?;

        let mut log = OpenOptions::new().read(true).write(true).open(&log_path)?;
        log.seek(SeekFrom::End(0))?;

        let before = state.log_records;
        state.log = log;
        state.log_bytes = bytes;
        state.log_records = state.table.len() as u64;
        state.dead_records = 0;
        state.compactions += 1;

        info!(
            path = %self.path.display(),
            records_before = before,
            records_after = state.log_records,
            "compacted note log"
        );
        Ok(())
    }

    fn maybe_compact(&self) -> StorageResult<()> {
        let mut state = self.state.write();
        self.maybe_compact_locked(&mut state)
    }

    fn maybe_compact_locked(&self, state: &mut LogState) -> StorageResult<()> {
        if state.log_records < self.config.min_compaction_records || state.log_records == 0 {
            return Ok(());
        }
        let ratio = state.dead_records as f64 / state.log_records as f64;
        if ratio >= self.config.compaction_ratio {
            self.compact_locked(state)?;
        }
        Ok(())
    }

    /// Appends one record at the end of the valid log.
    ///
    /// Records are written at `log_bytes`, not at the file end, so a torn
    /// frame left by a failed append is overwritten instead of hiding every
    /// later record from the next replay.
    fn append(&self, state: &mut LogState, record: &LogRecord) -> StorageResult<()> {
        let frame = record.encode()?;
        let start = state.log_bytes;
        if let Err(e) = write_frame(&mut state.log, start, &frame, self.config.sync_on_write) {
            warn!(path = %self.path.display(), error = %e, "append failed, cutting torn record");
            if let Err(cut) = state.log.set_len(start) {
                warn!(path = %self.path.display(), error = %cut, "could not cut torn record");
            }
            return Err(e);
        }
        state.log_bytes += frame.len() as u64;
        state.log_records += 1;
        Ok(())
    }
}

fn write_frame(log: &mut File, at: u64, frame: &[u8], sync: bool) -> StorageResult<()> {
    log.seek(SeekFrom::Start(at))?;
    log.write_all(frame)?;
    if sync {
        log.sync_data()?;
    } else {
        log.flush()?;
    }
    Ok(())
}

impl LocalStore for FileStore {
    fn put(&self, note: Note) -> StorageResult<()> {
        let mut state = self.state.write();
        let record = LogRecord::Put(note);
        self.append(&mut state, &record)?;
        if let LogRecord::Put(note) = record {
            if state.table.put(note) {
                state.dead_records += 1;
            }
        }
        self.maybe_compact_locked(&mut state)
    }

    fn get(&self, local_id: &str) -> StorageResult<Option<Note>> {
        Ok(self.state.read().table.get(local_id).cloned())
    }

    fn list(&self) -> StorageResult<Vec<Note>> {
        Ok(self.state.read().table.list())
    }

    fn remove(&self, local_id: &str) -> StorageResult<Option<Note>> {
        let mut state = self.state.write();
        if state.table.get(local_id).is_none() {
            return Ok(None);
        }
        self.append(&mut state, &LogRecord::Remove(local_id.to_string()))?;
        let removed = state.table.remove(local_id);
        state.dead_records += 2;
        self.maybe_compact_locked(&mut state)?;
        Ok(removed)
    }

    fn len(&self) -> StorageResult<usize> {
        Ok(self.state.read().table.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn no_auto_compaction() -> FileStoreConfig {
        FileStoreConfig::new()
            .sync_on_write(false)
            .min_compaction_records(u64::MAX)
    }

    #[test]
    fn file_create_new() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(store.is_empty().unwrap());
        assert!(dir.path().join(LOG_FILE).exists());
        assert!(dir.path().join(LOCK_FILE).exists());
    }

    #[test]
    fn file_persistence() {
        let dir = tempdir().unwrap();
        let mut kept = Note::new("kept");
        kept.remote_id = Some("r1".into());
        kept.pending_edit = true;
        let gone = Note::new("gone");

        {
            let store = FileStore::open(dir.path()).unwrap();
            store.put(Note::new("placeholder")).unwrap();
            store.put(kept.clone()).unwrap();
            store.put(gone.clone()).unwrap();
            store.remove(&gone.local_id).unwrap();
        }

        let store = FileStore::open(dir.path()).unwrap();
        let notes = store.list().unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[1], kept);
        assert_eq!(store.get(&gone.local_id).unwrap(), None);
    }

    #[test]
    fn records_after_a_torn_append_survive_reopen() {
        let dir = tempdir().unwrap();
        let first = Note::new("first");
        let torn = Note::new("torn");
        let after = Note::new("after");

        {
            let store = FileStore::open_with_config(dir.path(), no_auto_compaction()).unwrap();
            store.put(first.clone()).unwrap();

            // What a write that failed ten bytes in leaves behind.
            let frame = LogRecord::Put(torn.clone()).encode().unwrap();
            let mut log = OpenOptions::new()
                .append(true)
                .open(dir.path().join(LOG_FILE))
                .unwrap();
            log.write_all(&frame[..10]).unwrap();
            drop(log);

            store.put(after.clone()).unwrap();
            assert_eq!(store.len().unwrap(), 2);
        }

        let store = FileStore::open_with_config(dir.path(), no_auto_compaction()).unwrap();
        assert_eq!(store.get(&first.local_id).unwrap(), Some(first));
        assert_eq!(store.get(&after.local_id).unwrap(), Some(after));
        assert_eq!(store.get(&torn.local_id).unwrap(), None);
    }

    #[test]
    fn file_lock_is_exclusive() {
        let dir = tempdir().unwrap();
        let _store = FileStore::open(dir.path()).unwrap();
        let second = FileStore::open(dir.path());
        assert!(matches!(second, Err(StorageError::Locked(_))));
    }

    #[test]
    fn file_recovers_from_torn_tail() {
        let dir = tempdir().unwrap();
        let note = Note::new("survivor");
        {
            let store = FileStore::open_with_config(dir.path(), no_auto_compaction()).unwrap();
            store.put(note.clone()).unwrap();
        }

        // Simulate a crash halfway through the next record.
        let partial = LogRecord::Put(Note::new("lost")).encode().unwrap();
        let mut log = OpenOptions::new()
            .append(true)
            .open(dir.path().join(LOG_FILE))
            .unwrap();
        log.write_all(&partial[..partial.len() / 2]).unwrap();
        drop(log);

        let store = FileStore::open_with_config(dir.path(), no_auto_compaction()).unwrap();
        assert_eq!(store.list().unwrap(), vec![note.clone()]);

        // The damaged tail is gone, so new writes land on a clean boundary.
        store.put(Note::new("after")).unwrap();
        drop(store);
        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn file_compaction_drops_dead_records() {
        let dir = tempdir().unwrap();
        let store = FileStore::open_with_config(dir.path(), no_auto_compaction()).unwrap();

        let mut note = Note::new("v0");
        for i in 1..=10 {
            note.title = format!("v{i}");
            store.put(note.clone()).unwrap();
        }
        let before = store.stats();
        assert_eq!(before.log_records, 10);
        assert_eq!(before.dead_records, 9);

        store.compact().unwrap();
        let after = store.stats();
        assert_eq!(after.log_records, 1);
        assert_eq!(after.dead_records, 0);
        assert_eq!(after.compactions, 1);
        assert!(after.log_bytes < before.log_bytes);
        drop(store);

        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(store.get(&note.local_id).unwrap().unwrap().title, "v10");
    }

    #[test]
    fn file_auto_compaction() {
        let dir = tempdir().unwrap();
        let config = FileStoreConfig::new()
            .sync_on_write(false)
            .min_compaction_records(8)
            .compaction_ratio(0.5);
        let store = FileStore::open_with_config(dir.path(), config).unwrap();

        let note = Note::new("churn");
        for _ in 0..8 {
            store.put(note.clone()).unwrap();
        }
        assert!(store.stats().compactions >= 1);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn file_remove_unknown_writes_nothing() {
        let dir = tempdir().unwrap();
        let store = FileStore::open_with_config(dir.path(), no_auto_compaction()).unwrap();
        assert_eq!(store.remove("nope").unwrap(), None);
        assert_eq!(store.stats().log_records, 0);
    }

    #[test]
    fn file_stale_temp_is_discarded() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(LOG_TEMP), b"half-written").unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(store.is_empty().unwrap());
        assert!(!dir.path().join(LOG_TEMP).exists());
    }
}
