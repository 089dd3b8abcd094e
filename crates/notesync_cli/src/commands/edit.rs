//! Edit command implementation.

use super::{describe, resolve, short_id};
use crate::error::CliResult;
use notesync_engine::{RemoteGateway, SyncEngine};
use notesync_protocol::validate_title;
use notesync_storage::LocalStore;

/// Runs the edit command.
pub async fn run<S, G>(engine: &SyncEngine<S, G>, id: &str, title: String) -> CliResult<()>
where
    S: LocalStore,
    G: RemoteGateway,
{
    validate_title(&title)?;
    let note = resolve(engine, id)?;
    let outcome = engine.edit_note(&note.local_id, title).await?;
    println!("Edited {}: {}", short_id(&note), describe(&outcome));
    Ok(())
}
