//! User-level scenarios against the scripted gateway.

use notesync_engine::{
    EngineConfig, GatewayCall, GatewayOp, MockGateway, NoteService, NoteSyncOutcome,
    RemoteFailure, SyncEngine,
};
use notesync_protocol::SyncStatus;
use notesync_storage::InMemoryStore;
use std::sync::Arc;

type Engine = SyncEngine<InMemoryStore, Arc<MockGateway>>;

fn engine() -> (Arc<Engine>, Arc<MockGateway>) {
    let mock = Arc::new(MockGateway::new());
    let engine =
        SyncEngine::new(EngineConfig::default(), InMemoryStore::new(), Arc::clone(&mock)).unwrap();
    (Arc::new(engine), mock)
}

#[tokio::test]
async fn buy_milk_offline_then_flush() {
    let (engine, mock) = engine();
    mock.set_online(false);

    let note = engine.create_note("Buy milk");
    engine.submit_note(note.clone()).await.unwrap();
    assert_eq!(engine.get_notes().unwrap()[0].status(), SyncStatus::CreatedLocal);

    mock.set_online(true);
    engine.flush().await.unwrap();

    let stored = engine.get_note(&note.local_id).unwrap().unwrap();
    assert!(stored.remote_id.is_some());
    assert!(!stored.pending_edit);
    assert!(!stored.pending_delete);
}

#[tokio::test]
async fn edit_retried_after_one_transient_failure() {
    let (engine, mock) = engine();
    let note = engine.create_note("A");
    engine.submit_note(note.clone()).await.unwrap();

    mock.set_online(false);
    engine.edit_note(&note.local_id, "B").await.unwrap();
    mock.set_online(true);

    mock.fail_next(GatewayOp::Update, RemoteFailure::transient("503"));
    let first = engine.flush().await.unwrap();
    assert_eq!(first.deferred, 1);
    assert!(engine.get_note(&note.local_id).unwrap().unwrap().pending_edit);

    let second = engine.flush().await.unwrap();
    assert_eq!(second.synced, 1);
    let stored = engine.get_note(&note.local_id).unwrap().unwrap();
    assert!(!stored.pending_edit);
    assert_eq!(stored.title, "B");
    assert_eq!(mock.notes()[0].title, "B");
}

#[tokio::test]
async fn edits_before_first_sync_fold_into_one_create() {
    let (engine, mock) = engine();
    mock.set_online(false);

    let note = engine.create_note("first");
    engine.submit_note(note.clone()).await.unwrap();
    for title in ["second", "third"] {
        assert_eq!(
            engine.edit_note(&note.local_id, title).await.unwrap(),
            NoteSyncOutcome::Queued
        );
    }

    mock.set_online(true);
    engine.flush().await.unwrap();
    assert_eq!(
        mock.calls(),
        vec![GatewayCall::Create {
            local_id: note.local_id.clone(),
            title: "third".into(),
        }]
    );
}

#[tokio::test]
async fn delete_wins_over_pending_edit() {
    let (engine, mock) = engine();
    let note = engine.create_note("keep?");
    engine.submit_note(note.clone()).await.unwrap();
    mock.clear_calls();

    mock.set_online(false);
    engine.edit_note(&note.local_id, "edited").await.unwrap();
    engine.delete_note(&note.local_id).await.unwrap();
    mock.set_online(true);

    engine.flush().await.unwrap();
    assert_eq!(mock.count(GatewayOp::Update), 0);
    assert_eq!(mock.count(GatewayOp::Delete), 1);
    assert!(engine.get_notes().unwrap().is_empty());
    assert!(mock.notes().is_empty());
}

#[tokio::test]
async fn delete_is_idempotent() {
    let (engine, mock) = engine();
    let note = engine.create_note("twice");
    engine.submit_note(note.clone()).await.unwrap();

    mock.set_online(false);
    engine.delete_note(&note.local_id).await.unwrap();
    engine.delete_note(&note.local_id).await.unwrap();
    let tombstones = engine.get_notes().unwrap();
    assert_eq!(tombstones.len(), 1);
    assert_eq!(tombstones[0].status(), SyncStatus::DeletePending);

    mock.set_online(true);
    engine.flush().await.unwrap();
    assert_eq!(
        engine.delete_note(&note.local_id).await.unwrap(),
        NoteSyncOutcome::Removed
    );
    assert_eq!(mock.count(GatewayOp::Delete), 1);
}

#[tokio::test]
async fn refresh_brings_in_other_clients_notes() {
    let (engine, mock) = engine();
    let seeded = mock.seed("from the web");

    let report = engine.refresh_notes().await.unwrap();
    assert_eq!(report.inserted, 1);
    let notes = engine.get_notes().unwrap();
    assert_eq!(notes[0].remote_id.as_deref(), Some(seeded.id.as_str()));
    assert!(notes[0].is_synced());

    mock.rename(&seeded.id, "renamed on the web");
    engine.refresh_notes().await.unwrap();
    assert_eq!(engine.get_notes().unwrap()[0].title, "renamed on the web");

    mock.remove(&seeded.id);
    let report = engine.refresh_notes().await.unwrap();
    assert_eq!(report.purged, 1);
    assert!(engine.get_notes().unwrap().is_empty());
}

#[tokio::test]
async fn service_reports_through_tickets() {
    let mock = Arc::new(MockGateway::new());
    let service =
        NoteService::open(EngineConfig::default(), InMemoryStore::new(), Arc::clone(&mock))
            .unwrap();

    let note = service.create_note("ticketed");
    let outcome = service.submit_note(note.clone()).unwrap().settled().await.unwrap();
    assert_eq!(outcome, NoteSyncOutcome::Synced);

    mock.set_online(false);
    let outcome = service
        .edit_note(&note.local_id, "offline edit")
        .unwrap()
        .settled()
        .await
        .unwrap();
    assert!(matches!(outcome, NoteSyncOutcome::Deferred(_)));

    mock.set_online(true);
    let report = service.flush().settled().await.unwrap();
    assert_eq!(report.synced, 1);
    let refresh = service.refresh_notes().settled().await.unwrap();
    assert_eq!(refresh.fetched, 1);
}
