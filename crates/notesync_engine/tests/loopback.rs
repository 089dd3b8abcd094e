//! End-to-end sync against the reference server over the loopback client.

use notesync_engine::{
    EngineConfig, HttpGateway, HttpGatewayConfig, LoopbackClient, LoopbackServer,
    NoteSyncOutcome, SyncEngine,
};
use notesync_protocol::{HttpRequest, HttpResponse, SyncStatus};
use notesync_server::{NoteServer, ServerConfig};
use notesync_storage::InMemoryStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Routes requests into a shared [`NoteServer`]. Can swallow a response
/// after the server has applied the request, as a dropped connection would.
#[derive(Clone)]
struct Served {
    server: Arc<NoteServer>,
    lose_next_response: Arc<AtomicBool>,
}

impl LoopbackServer for Served {
    fn handle(&self, request: HttpRequest) -> HttpResponse {
        let response = self.server.handle(request);
        if self.lose_next_response.swap(false, Ordering::SeqCst) {
            return HttpResponse::error(502, "connection reset");
        }
        response
    }
}

type Engine = SyncEngine<InMemoryStore, HttpGateway<LoopbackClient<Served>>>;

struct Harness {
    server: Arc<NoteServer>,
    served: Served,
}

impl Harness {
    fn new() -> Self {
        let server = Arc::new(NoteServer::new(ServerConfig::default()));
        let served = Served {
            server: Arc::clone(&server),
            lose_next_response: Arc::new(AtomicBool::new(false)),
        };
        Self { server, served }
    }

    /// A device: its own local store, talking to the shared server.
    fn device(&self) -> Arc<Engine> {
        let base = "http://notes.test/api/";
        let gateway = HttpGateway::new(
            HttpGatewayConfig::new(base),
            LoopbackClient::with_base_url(self.served.clone(), base),
        );
        Arc::new(SyncEngine::new(EngineConfig::default(), InMemoryStore::new(), gateway).unwrap())
    }

    fn lose_next_response(&self) {
        self.served.lose_next_response.store(true, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn buy_milk() {
    let harness = Harness::new();
    let engine = harness.device();

    let note = engine.create_note("Buy milk");
    let outcome = engine.submit_note(note.clone()).await.unwrap();
    assert_eq!(outcome, NoteSyncOutcome::Synced);

    let local = engine.get_note(&note.local_id).unwrap().unwrap();
    let remote = harness.server.notes();
    assert_eq!(remote.len(), 1);
    assert_eq!(remote[0].title, "Buy milk");
    assert_eq!(local.remote_id.as_deref(), Some(remote[0].id.as_str()));
    assert_eq!(local.status(), SyncStatus::Synced);
}

#[tokio::test]
async fn offline_create_syncs_on_flush() {
    let harness = Harness::new();
    let engine = harness.device();

    harness.server.set_offline(true);
    let note = engine.create_note("written on a plane");
    let outcome = engine.submit_note(note.clone()).await.unwrap();
    assert!(matches!(outcome, NoteSyncOutcome::Deferred(_)));
    assert_eq!(engine.get_notes().unwrap()[0].status(), SyncStatus::CreatedLocal);

    harness.server.set_offline(false);
    let report = engine.flush().await.unwrap();
    assert_eq!(report.synced, 1);
    assert!(engine.get_notes().unwrap()[0].is_synced());

    // A refresh afterwards finds nothing new.
    let refresh = engine.refresh_notes().await.unwrap();
    assert_eq!(refresh.fetched, 1);
    assert_eq!(refresh.inserted, 0);
    assert_eq!(engine.get_notes().unwrap().len(), 1);
}

#[tokio::test]
async fn failed_update_is_retried() {
    let harness = Harness::new();
    let engine = harness.device();

    let note = engine.create_note("A");
    engine.submit_note(note.clone()).await.unwrap();

    harness.server.fail_next(500);
    let outcome = engine.edit_note(&note.local_id, "B").await.unwrap();
    assert!(matches!(outcome, NoteSyncOutcome::Deferred(_)));
    let local = engine.get_note(&note.local_id).unwrap().unwrap();
    assert_eq!(local.title, "B");
    assert_eq!(local.status(), SyncStatus::EditPending);
    assert_eq!(harness.server.notes()[0].title, "A");

    engine.flush().await.unwrap();
    assert_eq!(harness.server.notes()[0].title, "B");
    assert!(engine.get_note(&note.local_id).unwrap().unwrap().is_synced());
}

#[tokio::test]
async fn lost_create_response_does_not_duplicate() {
    let harness = Harness::new();
    let engine = harness.device();

    harness.lose_next_response();
    let note = engine.create_note("once");
    let outcome = engine.submit_note(note.clone()).await.unwrap();
    assert!(matches!(outcome, NoteSyncOutcome::Deferred(_)));
    assert_eq!(harness.server.notes().len(), 1);

    engine.flush().await.unwrap();
    assert_eq!(harness.server.notes().len(), 1);
    let local = engine.get_note(&note.local_id).unwrap().unwrap();
    assert_eq!(local.remote_id.as_deref(), Some(harness.server.notes()[0].id.as_str()));
}

#[tokio::test]
async fn lost_create_response_is_adopted_by_refresh() {
    let harness = Harness::new();
    let engine = harness.device();

    harness.lose_next_response();
    let note = engine.create_note("adopt me");
    engine.submit_note(note.clone()).await.unwrap();

    let report = engine.refresh_notes().await.unwrap();
    assert_eq!(report.adopted, 1);
    assert_eq!(report.inserted, 0);

    let notes = engine.get_notes().unwrap();
    assert_eq!(notes.len(), 1);
    assert!(notes[0].is_synced());
}

#[tokio::test]
async fn offline_delete_reaches_server() {
    let harness = Harness::new();
    let engine = harness.device();

    let note = engine.create_note("temporary");
    engine.submit_note(note.clone()).await.unwrap();

    harness.server.set_offline(true);
    engine.delete_note(&note.local_id).await.unwrap();
    let local = engine.get_note(&note.local_id).unwrap().unwrap();
    assert_eq!(local.status(), SyncStatus::DeletePending);
    assert!(engine.visible_notes().unwrap().is_empty());

    // Edits on a tombstone change nothing.
    assert_eq!(
        engine.edit_note(&note.local_id, "resurrect").await.unwrap(),
        NoteSyncOutcome::Ignored
    );

    harness.server.set_offline(false);
    engine.flush().await.unwrap();
    assert!(harness.server.notes().is_empty());
    assert!(engine.get_notes().unwrap().is_empty());
}

#[tokio::test]
async fn notes_deleted_elsewhere_are_purged() {
    let harness = Harness::new();
    let phone = harness.device();
    let laptop = harness.device();

    let note = phone.create_note("shared");
    phone.submit_note(note.clone()).await.unwrap();
    laptop.refresh_notes().await.unwrap();
    let on_laptop = laptop.get_notes().unwrap();
    assert_eq!(on_laptop.len(), 1);
    assert_eq!(on_laptop[0].title, "shared");

    laptop.delete_note(&on_laptop[0].local_id).await.unwrap();
    assert!(harness.server.notes().is_empty());

    // The phone's update now hits 404 and the note goes away.
    let outcome = phone.edit_note(&note.local_id, "too late").await.unwrap();
    assert_eq!(outcome, NoteSyncOutcome::Removed);
    assert!(phone.get_notes().unwrap().is_empty());
}

#[tokio::test]
async fn refresh_takes_remote_titles_for_synced_notes() {
    let harness = Harness::new();
    let phone = harness.device();
    let laptop = harness.device();

    let note = phone.create_note("v1");
    phone.submit_note(note.clone()).await.unwrap();
    laptop.refresh_notes().await.unwrap();

    let laptop_id = laptop.get_notes().unwrap()[0].local_id.clone();
    laptop.edit_note(&laptop_id, "v2").await.unwrap();

    let report = phone.refresh_notes().await.unwrap();
    assert_eq!(report.updated, 1);
    assert_eq!(phone.get_note(&note.local_id).unwrap().unwrap().title, "v2");
}

#[tokio::test]
async fn refresh_keeps_pending_edits() {
    let harness = Harness::new();
    let engine = harness.device();

    let note = engine.create_note("mine");
    engine.submit_note(note.clone()).await.unwrap();

    harness.server.set_offline(true);
    engine.edit_note(&note.local_id, "mine, edited").await.unwrap();
    harness.server.set_offline(false);

    let report = engine.refresh_notes().await.unwrap();
    assert_eq!(report.kept, 1);
    let local = engine.get_note(&note.local_id).unwrap().unwrap();
    assert_eq!(local.title, "mine, edited");
    assert_eq!(local.status(), SyncStatus::EditPending);
}

#[tokio::test]
async fn failed_refresh_changes_nothing() {
    let harness = Harness::new();
    let engine = harness.device();
    let note = engine.create_note("stays");
    engine.submit_note(note).await.unwrap();

    harness.server.set_offline(true);
    let before = engine.get_notes().unwrap();
    let err = engine.refresh_notes().await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(engine.get_notes().unwrap(), before);
}
