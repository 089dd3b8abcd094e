//! Sync command implementation.

use crate::error::CliResult;
use notesync_engine::{RemoteGateway, SyncEngine};
use notesync_storage::LocalStore;
use std::sync::Arc;
use tracing::warn;

/// Runs the sync command: flush, then refresh unless told not to.
pub async fn run<S, G>(engine: &Arc<SyncEngine<S, G>>, has_server: bool, refresh: bool) -> CliResult<()>
where
    S: LocalStore + 'static,
    G: RemoteGateway + 'static,
{
    if !has_server {
        let pending = engine.get_notes()?.iter().filter(|n| n.needs_sync()).count();
        println!("No server configured; {pending} note(s) waiting to sync.");
        return Ok(());
    }

    let report = engine.flush().await?;
    println!(
        "Pushed {} of {} pending note(s): {} synced, {} removed, {} deferred ({:?})",
        report.synced + report.removed,
        report.attempted,
        report.synced,
        report.removed,
        report.deferred,
        report.duration
    );

    if refresh {
        match engine.refresh_notes().await {
            Ok(report) => println!(
                "Pulled {} remote note(s): {} new, {} updated, {} removed, {} kept local",
                report.fetched,
                report.inserted + report.adopted,
                report.updated,
                report.purged,
                report.kept
            ),
            Err(e) if e.is_retryable() => {
                warn!(error = %e, "refresh failed");
                println!("Could not pull remote changes: {e}");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notesync_engine::{EngineConfig, HttpGateway, HttpGatewayConfig, LoopbackClient};
    use notesync_protocol::HttpRequest;
    use notesync_server::{NoteServer, ServerConfig};
    use notesync_storage::InMemoryStore;

    #[tokio::test]
    async fn sync_pushes_and_pulls() {
        let server = Arc::new(NoteServer::new(ServerConfig::default()));
        let handle = Arc::clone(&server);
        let gateway = HttpGateway::new(
            HttpGatewayConfig::new("http://localhost"),
            LoopbackClient::new(move |request: HttpRequest| handle.handle(request)),
        );
        let engine = Arc::new(
            SyncEngine::new(EngineConfig::default(), InMemoryStore::new(), gateway).unwrap(),
        );

        server.set_offline(true);
        let note = engine.create_note("later");
        engine.submit_note(note).await.unwrap();
        server.set_offline(false);

        run(&engine, true, true).await.unwrap();
        assert_eq!(server.notes().len(), 1);
        assert!(engine.get_notes().unwrap()[0].is_synced());
    }

    #[tokio::test]
    async fn sync_without_server_changes_nothing() {
        let engine = Arc::new(
            SyncEngine::new(
                EngineConfig::default(),
                InMemoryStore::new(),
                notesync_engine::OfflineGateway,
            )
            .unwrap(),
        );
        let note = engine.create_note("queued");
        engine.submit_note(note).await.unwrap();

        run(&engine, false, true).await.unwrap();
        assert!(engine.get_notes().unwrap()[0].needs_sync());
    }
}
