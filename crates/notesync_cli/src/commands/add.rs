//! Add command implementation.

use super::{describe, short_id};
use crate::error::CliResult;
use notesync_engine::{RemoteGateway, SyncEngine};
use notesync_protocol::validate_title;
use notesync_storage::LocalStore;

/// Runs the add command.
pub async fn run<S, G>(engine: &SyncEngine<S, G>, title: String) -> CliResult<()>
where
    S: LocalStore,
    G: RemoteGateway,
{
    validate_title(&title)?;
    let note = engine.create_note(title);
    let id = note.local_id.clone();
    let outcome = engine.submit_note(note).await?;

    let stored = engine.get_note(&id)?;
    let shown = stored.as_ref().map_or(id.as_str(), short_id);
    println!("Added {shown}: {}", describe(&outcome));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::offline_engine;
    use crate::error::CliError;
    use notesync_protocol::SyncStatus;

    #[tokio::test]
    async fn add_queues_while_offline() {
        let (engine, _dir) = offline_engine();
        run(&engine, "Buy milk".into()).await.unwrap();

        let notes = engine.get_notes().unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "Buy milk");
        assert_eq!(notes[0].status(), SyncStatus::CreatedLocal);
    }

    #[tokio::test]
    async fn blank_title_is_rejected() {
        let (engine, _dir) = offline_engine();
        assert!(matches!(
            run(&engine, "   ".into()).await,
            Err(CliError::Title(_))
        ));
        assert!(engine.get_notes().unwrap().is_empty());
    }
}
