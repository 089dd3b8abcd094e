//! Error types for storage operations.

use notesync_protocol::CodecError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
///
/// Every variant means the store cannot make progress; callers treat these as
/// fatal rather than retrying.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A record could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The store's files are corrupted beyond recovery.
    #[error("storage corrupted: {0}")]
    Corrupted(String),

    /// Another process holds the store open.
    #[error("store locked: another process has exclusive access to {}", .0.display())]
    Locked(PathBuf),
}
