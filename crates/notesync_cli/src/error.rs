//! CLI errors.

use notesync_engine::SyncError;
use notesync_protocol::TitleError;
use thiserror::Error;

/// Errors reported to the user.
#[derive(Debug, Error)]
pub enum CliError {
    /// The title was rejected before anything was stored.
    #[error("invalid title: {0}")]
    Title(#[from] TitleError),

    /// No note matches the given id.
    #[error("no note matches '{0}'")]
    UnknownNote(String),

    /// More than one note matches the given id prefix.
    #[error("'{prefix}' matches {count} notes; use a longer prefix")]
    AmbiguousId {
        /// The prefix given.
        prefix: String,
        /// Number of matches.
        count: usize,
    },

    /// The engine failed.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Output could not be rendered.
    #[error("output error: {0}")]
    Output(#[from] serde_json::Error),

    /// Unsupported `--format` value.
    #[error("unknown format '{0}' (expected text or json)")]
    Format(String),
}

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;
