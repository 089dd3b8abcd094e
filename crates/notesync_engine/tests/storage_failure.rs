//! Storage failures are fatal to the operation and leave no half-applied state.

use notesync_engine::{EngineConfig, GatewayOp, MockGateway, SyncEngine, SyncError};
use notesync_storage::{InMemoryStore, LocalStore};
use notesync_testkit::FaultyStore;
use std::sync::Arc;

type Engine = SyncEngine<Arc<FaultyStore<InMemoryStore>>, Arc<MockGateway>>;

fn engine() -> (Arc<Engine>, Arc<FaultyStore<InMemoryStore>>, Arc<MockGateway>) {
    let store = Arc::new(FaultyStore::new(InMemoryStore::new()));
    let mock = Arc::new(MockGateway::new());
    let engine =
        SyncEngine::new(EngineConfig::default(), Arc::clone(&store), Arc::clone(&mock)).unwrap();
    (Arc::new(engine), store, mock)
}

#[tokio::test]
async fn failed_local_write_never_reaches_the_network() {
    let (engine, store, mock) = engine();
    store.set_fail_writes(true);

    let note = engine.create_note("unsaved");
    let err = engine.submit_note(note).await.unwrap_err();
    assert!(matches!(err, SyncError::Storage(_)));
    assert!(err.is_fatal());
    assert!(store.inner().is_empty().unwrap());
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn failed_completion_write_is_recovered_by_flush() {
    let (engine, store, mock) = engine();

    // The submit write succeeds, recording the create acknowledgement fails.
    store.fail_writes_after(1);
    let note = engine.create_note("acknowledged");
    assert!(engine.submit_note(note.clone()).await.is_err());
    assert_eq!(mock.notes().len(), 1);
    assert!(!engine.get_note(&note.local_id).unwrap().unwrap().is_remote());

    store.reset();
    engine.flush().await.unwrap();
    assert_eq!(mock.count(GatewayOp::Create), 2);
    assert_eq!(mock.notes().len(), 1);
    assert!(engine.get_note(&note.local_id).unwrap().unwrap().is_synced());
}

#[tokio::test]
async fn flush_surfaces_storage_errors() {
    let (engine, store, _mock) = engine();
    store.set_fail_reads(true);
    assert!(matches!(engine.flush().await, Err(SyncError::Storage(_))));
}

#[tokio::test]
async fn failed_edit_keeps_old_title() {
    let (engine, store, _mock) = engine();
    let note = engine.create_note("before");
    engine.submit_note(note.clone()).await.unwrap();

    store.set_fail_writes(true);
    assert!(engine.edit_note(&note.local_id, "after").await.is_err());
    store.reset();

    let local = engine.get_note(&note.local_id).unwrap().unwrap();
    assert_eq!(local.title, "before");
    assert!(local.is_synced());
}
