//! Inspect command implementation.

use super::Format;
use crate::error::CliResult;
use notesync_engine::{RemoteGateway, SyncEngine};
use notesync_protocol::SyncStatus;
use notesync_storage::FileStore;
use serde::Serialize;

/// Store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store directory.
    pub path: String,
    /// Remote the engine talks to.
    pub remote: String,
    /// Notes by sync status.
    pub counts: StatusCounts,
    /// Highest write version handed out.
    pub version: u64,
    /// Notes currently stored.
    pub live_notes: usize,
    /// Records in the log.
    pub log_records: u64,
    /// Records compaction would drop.
    pub dead_records: u64,
    /// Log size in bytes.
    pub log_bytes: u64,
}

/// Notes per sync status.
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct StatusCounts {
    /// Local only.
    pub created_local: usize,
    /// Edit awaiting upload.
    pub edit_pending: usize,
    /// Delete awaiting upload.
    pub delete_pending: usize,
    /// In sync.
    pub synced: usize,
}

/// Runs the inspect command.
pub fn run<G: RemoteGateway>(
    engine: &SyncEngine<FileStore, G>,
    remote: &str,
    format: &str,
) -> CliResult<()> {
    let format = Format::parse(format)?;
    let result = inspect(engine, remote)?;
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        Format::Text => print_text_output(&result),
    }
    Ok(())
}

fn inspect<G: RemoteGateway>(
    engine: &SyncEngine<FileStore, G>,
    remote: &str,
) -> CliResult<InspectResult> {
    let mut counts = StatusCounts::default();
    for note in engine.get_notes()? {
        match note.status() {
            SyncStatus::CreatedLocal => counts.created_local += 1,
            SyncStatus::EditPending => counts.edit_pending += 1,
            SyncStatus::DeletePending => counts.delete_pending += 1,
            SyncStatus::Synced => counts.synced += 1,
        }
    }

    let store = engine.store();
    let stats = store.stats();
    Ok(InspectResult {
        path: store.path().display().to_string(),
        remote: remote.to_string(),
        counts,
        version: engine.current_version(),
        live_notes: stats.live_notes,
        log_records: stats.log_records,
        dead_records: stats.dead_records,
        log_bytes: stats.log_bytes,
    })
}

fn print_text_output(result: &InspectResult) {
    println!("Store:   {}", result.path);
    println!("Remote:  {}", result.remote);
    println!("Version: {}", result.version);
    println!();
    println!("Notes");
    println!("  synced:          {}", result.counts.synced);
    println!("  created locally: {}", result.counts.created_local);
    println!("  edit pending:    {}", result.counts.edit_pending);
    println!("  delete pending:  {}", result.counts.delete_pending);
    println!();
    println!("Log");
    println!("  live notes:   {}", result.live_notes);
    println!("  records:      {}", result.log_records);
    println!("  dead records: {}", result.dead_records);
    println!("  size:         {} bytes", result.log_bytes);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::offline_engine;

    #[tokio::test]
    async fn counts_by_status() {
        let (engine, _dir) = offline_engine();
        for title in ["a", "b"] {
            let note = engine.create_note(title);
            engine.submit_note(note).await.unwrap();
        }

        let result = inspect(&engine, "none").unwrap();
        assert_eq!(
            result.counts,
            StatusCounts {
                created_local: 2,
                ..StatusCounts::default()
            }
        );
        assert_eq!(result.live_notes, 2);
        assert!(result.log_bytes > 0);
        assert!(result.version >= 2);
    }
}
