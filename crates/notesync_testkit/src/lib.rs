//! # NoteSync Testkit
//!
//! Test utilities for NoteSync.
//!
//! This crate provides:
//! - Temporary file stores and note builders
//! - Property-based generators for titles and user intent sequences
//! - A store wrapper that fails on demand, for exercising fatal storage paths
//!
//! ## Usage
//!
//! ```rust
//! use notesync_storage::LocalStore;
//! use notesync_testkit::prelude::*;
//!
//! let temp = TempFileStore::new();
//! temp.store().put(NoteBuilder::new("Buy milk").build()).unwrap();
//! let reopened = temp.reopen();
//! assert_eq!(reopened.store().len().unwrap(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faults;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faults::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use faults::*;
pub use fixtures::*;
pub use generators::*;
