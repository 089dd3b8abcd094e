//! # NoteSync Storage
//!
//! Local note store trait and implementations for NoteSync.
//!
//! The local store is the only state the presentation layer observes. It is a
//! durable, ordered key-value map from `local_id` to [`Note`]; it knows nothing
//! about sync semantics.
//!
//! ## Design Principles
//!
//! - Operations are synchronous from the caller's perspective
//! - `list` returns notes in insertion order; overwriting keeps the position
//! - Writes to the same key are serialized by the store
//! - A storage failure is fatal to the operation that hit it
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For testing and ephemeral sessions
//! - [`FileStore`] - Append-only log on disk with crash recovery and compaction
//!
//! ## Example
//!
//! ```rust
//! use notesync_protocol::Note;
//! use notesync_storage::{InMemoryStore, LocalStore};
//!
//! let store = InMemoryStore::new();
//! let note = Note::new("Buy milk");
//! store.put(note.clone()).unwrap();
//! assert_eq!(store.get(&note.local_id).unwrap(), Some(note));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod log;
mod memory;
mod store;
mod table;

pub use error::{StorageError, StorageResult};
pub use file::{FileStore, FileStoreConfig, FileStoreStats};
pub use memory::InMemoryStore;
pub use store::LocalStore;

/// Re-exported for store implementors.
pub use notesync_protocol::Note;
