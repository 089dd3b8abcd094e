//! Delete command implementation.

use super::{describe, resolve, short_id};
use crate::error::CliResult;
use notesync_engine::{RemoteGateway, SyncEngine};
use notesync_storage::LocalStore;

/// Runs the delete command.
pub async fn run<S, G>(engine: &SyncEngine<S, G>, id: &str) -> CliResult<()>
where
    S: LocalStore,
    G: RemoteGateway,
{
    let note = resolve(engine, id)?;
    let outcome = engine.delete_note(&note.local_id).await?;
    println!("Deleted {}: {}", short_id(&note), describe(&outcome));
    Ok(())
}
