//! CLI command implementations.

pub mod add;
pub mod delete;
pub mod edit;
pub mod inspect;
pub mod list;
pub mod sync;

use crate::error::{CliError, CliResult};
use notesync_engine::{NoteSyncOutcome, RemoteGateway, SyncEngine};
use notesync_protocol::Note;
use notesync_storage::LocalStore;

/// Characters of a local id shown in listings.
pub const SHORT_ID: usize = 8;

/// Output format for commands that print records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Human-readable text.
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl Format {
    /// Parses a `--format` value.
    pub fn parse(value: &str) -> CliResult<Self> {
        match value {
            "text" => Ok(Format::Text),
            "json" => Ok(Format::Json),
            other => Err(CliError::Format(other.to_string())),
        }
    }
}

/// Finds the note whose local id is `id` or starts with it.
///
/// An exact match wins even if it is also a prefix of other ids.
pub fn resolve<S, G>(engine: &SyncEngine<S, G>, id: &str) -> CliResult<Note>
where
    S: LocalStore,
    G: RemoteGateway,
{
    if let Some(note) = engine.get_note(id)? {
        return Ok(note);
    }
    let mut matches: Vec<Note> = engine
        .get_notes()?
        .into_iter()
        .filter(|n| n.local_id.starts_with(id))
        .collect();
    match matches.len() {
        0 => Err(CliError::UnknownNote(id.to_string())),
        1 => Ok(matches.remove(0)),
        count => Err(CliError::AmbiguousId {
            prefix: id.to_string(),
            count,
        }),
    }
}

/// Shortened id for display.
pub fn short_id(note: &Note) -> &str {
    let end = note
        .local_id
        .char_indices()
        .nth(SHORT_ID)
        .map_or(note.local_id.len(), |(i, _)| i);
    &note.local_id[..end]
}

/// One-line description of a lane outcome.
pub fn describe(outcome: &NoteSyncOutcome) -> String {
    match outcome {
        NoteSyncOutcome::Synced => "synced".to_string(),
        NoteSyncOutcome::Removed => "removed".to_string(),
        NoteSyncOutcome::Queued => "queued for next sync".to_string(),
        NoteSyncOutcome::Ignored => "ignored (note is being deleted)".to_string(),
        NoteSyncOutcome::Deferred(failure) => format!("queued for next sync ({failure})"),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use notesync_engine::{EngineConfig, OfflineGateway, SyncEngine};
    use notesync_storage::FileStore;
    use std::sync::Arc;
    use tempfile::TempDir;

    pub type OfflineEngine = SyncEngine<FileStore, OfflineGateway>;

    /// An offline engine over a file store in a temp dir.
    pub fn offline_engine() -> (Arc<OfflineEngine>, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(&dir.path().join("store")).unwrap();
        let engine = SyncEngine::new(EngineConfig::default(), store, OfflineGateway).unwrap();
        (Arc::new(engine), dir)
    }
}
