//! Storage fault injection.
//!
//! [`FaultyStore`] wraps any [`LocalStore`] and fails chosen operations, so
//! tests can check that a storage failure surfaces as an error and never as a
//! partially applied write.

use notesync_protocol::Note;
use notesync_storage::{LocalStore, StorageError, StorageResult};
use parking_lot::Mutex;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// A store wrapper that fails on demand.
pub struct FaultyStore<S> {
    inner: S,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    /// Writes still allowed before writes start failing.
    writes_left: Mutex<Option<u64>>,
    failures: AtomicU64,
}

impl<S: LocalStore> FaultyStore<S> {
    /// Wraps a store. Nothing fails until asked to.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_writes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            writes_left: Mutex::new(None),
            failures: AtomicU64::new(0),
        }
    }

    /// Makes every `put` and `remove` fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes every `get` and `list` fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Lets `count` more writes through, then fails the rest.
    pub fn fail_writes_after(&self, count: u64) {
        *self.writes_left.lock() = Some(count);
    }

    /// Clears every injected fault.
    pub fn reset(&self) {
        self.set_fail_writes(false);
        self.set_fail_reads(false);
        *self.writes_left.lock() = None;
    }

    /// Number of operations failed so far.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::SeqCst)
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn check_write(&self) -> StorageResult<()> {
        let budget_spent = {
            let mut left = self.writes_left.lock();
            match left.as_mut() {
                Some(0) => true,
                Some(n) => {
                    *n -= 1;
                    false
                }
                None => false,
            }
        };
        if budget_spent || self.fail_writes.load(Ordering::SeqCst) {
            return Err(self.injected("write"));
        }
        Ok(())
    }

    fn check_read(&self) -> StorageResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(self.injected("read"));
        }
        Ok(())
    }

    fn injected(&self, what: &str) -> StorageError {
        self.failures.fetch_add(1, Ordering::SeqCst);
        StorageError::Io(io::Error::new(
            io::ErrorKind::Other,
            format!("injected {what} failure"),
        ))
    }
}

impl<S: LocalStore> LocalStore for FaultyStore<S> {
    fn put(&self, note: Note) -> StorageResult<()> {
        self.check_write()?;
        self.inner.put(note)
    }

    fn get(&self, local_id: &str) -> StorageResult<Option<Note>> {
        self.check_read()?;
        self.inner.get(local_id)
    }

    fn list(&self) -> StorageResult<Vec<Note>> {
        self.check_read()?;
        self.inner.list()
    }

    fn remove(&self, local_id: &str) -> StorageResult<Option<Note>> {
        self.check_write()?;
        self.inner.remove(local_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notesync_storage::InMemoryStore;

    #[test]
    fn passes_through_until_told() {
        let store = FaultyStore::new(InMemoryStore::new());
        let note = Note::new("a");
        store.put(note.clone()).unwrap();
        assert_eq!(store.get(&note.local_id).unwrap(), Some(note));
        assert_eq!(store.failures(), 0);
    }

    #[test]
    fn failed_write_changes_nothing() {
        let store = FaultyStore::new(InMemoryStore::new());
        store.set_fail_writes(true);
        assert!(matches!(
            store.put(Note::new("lost")),
            Err(StorageError::Io(_))
        ));
        assert!(store.inner().is_empty().unwrap());
        assert_eq!(store.failures(), 1);
    }

    #[test]
    fn write_budget() {
        let store = FaultyStore::new(InMemoryStore::new());
        store.fail_writes_after(2);
        store.put(Note::new("1")).unwrap();
        store.put(Note::new("2")).unwrap();
        assert!(store.put(Note::new("3")).is_err());

        store.reset();
        store.put(Note::new("3")).unwrap();
        assert_eq!(store.len().unwrap(), 3);
    }

    #[test]
    fn read_faults() {
        let store = FaultyStore::new(InMemoryStore::new());
        store.set_fail_reads(true);
        assert!(store.list().is_err());
        assert!(store.len().is_err());
    }
}
