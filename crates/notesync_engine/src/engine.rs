//! The sync engine.

use crate::config::EngineConfig;
use crate::error::{SyncError, SyncResult};
use crate::gateway::{RemoteFailure, RemoteGateway, RemoteResult};
use crate::plan::RemoteOp;
use notesync_protocol::{Note, RemoteNote};
use notesync_storage::LocalStore;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex as LaneMutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Statistics about sync activity since the engine was created.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Completed flushes.
    pub flushes: u64,
    /// Successful refreshes.
    pub refreshes: u64,
    /// Remote calls issued.
    pub remote_attempts: u64,
    /// Remote calls that succeeded (including idempotent `NotFound`).
    pub remote_successes: u64,
    /// Remote calls that failed transiently.
    pub remote_failures: u64,
    /// Stale completions discarded by the version check.
    pub stale_completions: u64,
    /// Last remote failure.
    pub last_error: Option<String>,
    /// Time the last flush finished.
    pub last_flush: Option<Instant>,
}

/// How a note's lane pass ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteSyncOutcome {
    /// Local and remote agree.
    Synced,
    /// The note no longer exists locally.
    Removed,
    /// A remote failure left work queued for the next flush.
    Deferred(RemoteFailure),
    /// Work is queued but no remote call was due (an edit folded into a
    /// pending create).
    Queued,
    /// The intent had no effect (an edit on a tombstoned note).
    Ignored,
}

impl NoteSyncOutcome {
    /// Returns true if no remote work remains for the note.
    pub fn is_settled(&self) -> bool {
        matches!(self, NoteSyncOutcome::Synced | NoteSyncOutcome::Removed)
    }
}

/// Result of a flush.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Notes that needed work when the flush started.
    pub attempted: usize,
    /// Notes now in sync.
    pub synced: usize,
    /// Notes purged locally.
    pub removed: usize,
    /// Notes left pending after a remote failure.
    pub deferred: usize,
    /// Elapsed wall time.
    pub duration: Duration,
}

impl FlushReport {
    fn record(&mut self, outcome: &NoteSyncOutcome) {
        match outcome {
            NoteSyncOutcome::Synced => self.synced += 1,
            NoteSyncOutcome::Removed => self.removed += 1,
            NoteSyncOutcome::Deferred(_) | NoteSyncOutcome::Queued => self.deferred += 1,
            NoteSyncOutcome::Ignored => {}
        }
    }

    /// Returns true if every attempted note settled.
    pub fn is_complete(&self) -> bool {
        self.deferred == 0
    }
}

/// Result of a refresh merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Remote notes fetched.
    pub fetched: usize,
    /// Remote notes inserted locally.
    pub inserted: usize,
    /// Local notes that learned their `remote_id` from the listing.
    pub adopted: usize,
    /// Synced local notes that took the remote title.
    pub updated: usize,
    /// Local notes purged because the remote no longer has them.
    pub purged: usize,
    /// Local notes left alone because they are pending or were written
    /// while the refresh was in flight.
    pub kept: usize,
    /// Remote notes not inserted because this device deleted them.
    pub suppressed: usize,
}

/// Effect of recording an edit locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EditStaged {
    /// The note is known remotely; an update is due.
    Dispatch,
    /// No `remote_id` yet; the pending create will carry the title.
    Folded,
    /// The note is tombstoned; nothing changed.
    Ignored,
}

/// Effect of recording a delete locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeleteStaged {
    /// Tombstoned; a remote delete (or a purge after an in-flight create) is due.
    Tombstoned,
    /// Removed locally without any remote call.
    Removed,
    /// There was nothing to delete.
    Absent,
}

/// A note that left the local store and must not come back from a listing.
#[derive(Debug, Clone)]
struct Removal {
    local_id: String,
    remote_id: Option<String>,
    /// Sequence value when the note was removed.
    at: u64,
    /// The remote may still hold a copy nobody will delete.
    orphan: bool,
}

impl Removal {
    fn matches(&self, entry: &RemoteNote) -> bool {
        self.remote_id.as_deref() == Some(entry.id.as_str())
            || entry.local_id.as_deref() == Some(self.local_id.as_str())
    }
}

/// Registers a refresh in flight for as long as it lives.
struct RefreshMark<'a> {
    active: &'a Mutex<Vec<u64>>,
    started: u64,
}

impl Drop for RefreshMark<'_> {
    fn drop(&mut self) {
        let mut active = self.active.lock();
        if let Some(i) = active.iter().position(|s| *s == self.started) {
            active.swap_remove(i);
        }
    }
}

/// Offline-first sync engine.
///
/// Owns the local note state and reconciles it with the remote store.
///
/// # Concurrency
///
/// - Local read-modify-write sequences run under one short write lock that is
///   never held across an `await`
/// - Every note has a lane (an async mutex); remote calls for a note are only
///   issued while holding its lane, so at most one is in flight per note
/// - Every write to a record stamps a fresh `version` from one engine-wide
///   sequence; a completion is applied only against the version it was
///   issued for
/// - Removed notes are remembered until no refresh that started before the
///   removal is still running, so a stale listing cannot resurrect them
pub struct SyncEngine<S: LocalStore, G: RemoteGateway> {
    config: EngineConfig,
    store: S,
    gateway: G,
    write_lock: Mutex<()>,
    lanes: Mutex<HashMap<String, Arc<LaneMutex<()>>>>,
    sequence: AtomicU64,
    stats: RwLock<SyncStats>,
    removed: Mutex<Vec<Removal>>,
    refreshing: Mutex<Vec<u64>>,
}

impl<S: LocalStore, G: RemoteGateway> SyncEngine<S, G> {
    /// Creates an engine over a store and a gateway.
    ///
    /// The version sequence resumes after the highest version in the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn new(config: EngineConfig, store: S, gateway: G) -> SyncResult<Self> {
        let seed = store.list()?.iter().map(|n| n.version).max().unwrap_or(0);
        Ok(Self {
            config,
            store,
            gateway,
            write_lock: Mutex::new(()),
            lanes: Mutex::new(HashMap::new()),
            sequence: AtomicU64::new(seed),
            stats: RwLock::new(SyncStats::default()),
            removed: Mutex::new(Vec::new()),
            refreshing: Mutex::new(Vec::new()),
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the local store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the gateway.
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Returns a snapshot of the statistics.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Returns the latest version stamped.
    pub fn current_version(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    // ------------------------------------------------------------------
    // Public operations
    // ------------------------------------------------------------------

    /// Creates a local-only note. Touches neither the store nor the network.
    pub fn create_note(&self, title: impl Into<String>) -> Note {
        Note::new(title)
    }

    /// Persists a note and attempts its remote create.
    ///
    /// # Errors
    ///
    /// Returns an error only if the local store fails.
    pub async fn submit_note(&self, note: Note) -> SyncResult<NoteSyncOutcome> {
        let note = self.stage_submit(note)?;
        self.sync_note(&note.local_id).await
    }

    /// Changes a note's title and attempts the remote update.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NoteNotFound`] if the note does not exist, or a
    /// storage error.
    pub async fn edit_note(
        &self,
        local_id: &str,
        title: impl Into<String>,
    ) -> SyncResult<NoteSyncOutcome> {
        match self.stage_edit(local_id, title.into())? {
            EditStaged::Dispatch => self.sync_note(local_id).await,
            EditStaged::Folded => Ok(NoteSyncOutcome::Queued),
            EditStaged::Ignored => Ok(NoteSyncOutcome::Ignored),
        }
    }

    /// Deletes a note, remotely if it ever got there.
    ///
    /// Deleting a missing or already tombstoned note is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error only if the local store fails.
    pub async fn delete_note(&self, local_id: &str) -> SyncResult<NoteSyncOutcome> {
        match self.stage_delete(local_id)? {
            DeleteStaged::Tombstoned => self.sync_note(local_id).await,
            DeleteStaged::Removed | DeleteStaged::Absent => Ok(NoteSyncOutcome::Removed),
        }
    }

    /// Returns every local note, tombstones included, in insertion order.
    ///
    /// Never touches the network.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn get_notes(&self) -> SyncResult<Vec<Note>> {
        Ok(self.store.list()?)
    }

    /// Returns the notes a list view should show (tombstones hidden).
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn visible_notes(&self) -> SyncResult<Vec<Note>> {
        Ok(self
            .store
            .list()?
            .into_iter()
            .filter(Note::is_visible)
            .collect())
    }

    /// Returns one note.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn get_note(&self, local_id: &str) -> SyncResult<Option<Note>> {
        Ok(self.store.get(local_id)?)
    }

    /// Runs a lane pass for one note: issue its due remote operation and keep
    /// going while operations succeed.
    ///
    /// # Errors
    ///
    /// Returns an error only if the local store fails.
    pub async fn sync_note(&self, local_id: &str) -> SyncResult<NoteSyncOutcome> {
        let lane = self.lane(local_id);
        let outcome = {
            let _guard = lane.lock().await;
            self.run_lane(local_id).await
        };
        self.release_lane(local_id, lane);
        outcome
    }

    /// Re-attempts the due operation of every note that is not in sync.
    ///
    /// Distinct notes are synced concurrently, bounded by
    /// [`EngineConfig::flush_concurrency`]. Safe to call at any time and any
    /// number of times.
    ///
    /// # Errors
    ///
    /// Returns the first storage error hit by any note's pass.
    pub async fn flush(self: &Arc<Self>) -> SyncResult<FlushReport>
    where
        S: 'static,
        G: 'static,
    {
        let start = Instant::now();
        let pending: Vec<String> = self
            .store
            .list()?
            .into_iter()
            .filter(Note::needs_sync)
            .map(|n| n.local_id)
            .collect();

        let mut report = FlushReport {
            attempted: pending.len(),
            ..FlushReport::default()
        };
        debug!(notes = pending.len(), "flush started");

        let permits = Arc::new(Semaphore::new(self.config.flush_concurrency.max(1)));
        let mut tasks = JoinSet::new();
        for local_id in pending {
            let engine = Arc::clone(self);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| SyncError::Task(e.to_string()))?;
                engine.sync_note(&local_id).await
            });
        }

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(outcome)) => report.record(&outcome),
                Ok(Err(e)) => {
                    error!(error = %e, "note sync failed during flush");
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    error!(error = %e, "flush task failed");
                    first_error.get_or_insert(SyncError::Task(e.to_string()));
                }
            }
        }
        report.duration = start.elapsed();

        {
            let mut stats = self.stats.write();
            stats.flushes += 1;
            stats.last_flush = Some(Instant::now());
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        info!(
            attempted = report.attempted,
            synced = report.synced,
            removed = report.removed,
            deferred = report.deferred,
            "flush finished"
        );
        Ok(report)
    }

    /// Fetches the remote list and merges it into the local store.
    ///
    /// - Remote notes unknown locally are inserted as synced
    /// - A local note still lacking a `remote_id` whose `local_id` matches a
    ///   remote note adopts that `remote_id`
    /// - Synced local notes take the remote title
    /// - Synced or tombstoned local notes missing remotely are purged
    /// - Notes with a pending edit, and any note written after the refresh
    ///   started, are left untouched
    /// - Notes removed on this device after the refresh started are not
    ///   inserted again; a remote copy of a note deleted before its create
    ///   was acknowledged comes back as a tombstone so the next flush
    ///   deletes it
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Remote`] if the listing fails (nothing is changed
    /// locally), or a storage error.
    pub async fn refresh_notes(&self) -> SyncResult<RefreshReport> {
        let mark = self.begin_refresh();
        let started = mark.started;

        let remote = self.gateway.list_remote().await;
        let remote = match self.observe(remote) {
            Ok(remote) => remote,
            Err(failure) => {
                warn!(error = %failure, "refresh failed");
                return Err(failure.into());
            }
        };

        let report = self.merge_remote(started, remote)?;
        drop(mark);
        self.prune_removals();
        self.stats.write().refreshes += 1;
        info!(
            fetched = report.fetched,
            inserted = report.inserted,
            adopted = report.adopted,
            updated = report.updated,
            purged = report.purged,
            kept = report.kept,
            suppressed = report.suppressed,
            "refresh merged"
        );
        Ok(report)
    }

    // ------------------------------------------------------------------
    // Local staging
    // ------------------------------------------------------------------

    /// Persists a submitted note. Resubmitting a stored note is a no-op.
    pub(crate) fn stage_submit(&self, mut note: Note) -> SyncResult<Note> {
        let _w = self.write_lock.lock();
        if let Some(existing) = self.store.get(&note.local_id)? {
            debug!(local_id = %note.local_id, "note already submitted");
            return Ok(existing);
        }
        self.stamp(&mut note);
        self.store.put(note.clone())?;
        debug!(local_id = %note.local_id, version = note.version, "note submitted");
        Ok(note)
    }

    pub(crate) fn stage_edit(&self, local_id: &str, title: String) -> SyncResult<EditStaged> {
        let _w = self.write_lock.lock();
        let mut note = self
            .store
            .get(local_id)?
            .ok_or_else(|| SyncError::NoteNotFound(local_id.to_string()))?;

        if note.pending_delete {
            debug!(%local_id, "edit ignored on tombstoned note");
            return Ok(EditStaged::Ignored);
        }

        note.title = title;
        note.pending_edit = true;
        self.stamp(&mut note);
        let staged = if note.is_remote() {
            EditStaged::Dispatch
        } else {
            EditStaged::Folded
        };
        self.store.put(note)?;
        debug!(%local_id, ?staged, "edit recorded");
        Ok(staged)
    }

    pub(crate) fn stage_delete(&self, local_id: &str) -> SyncResult<DeleteStaged> {
        let _w = self.write_lock.lock();
        let Some(mut note) = self.store.get(local_id)? else {
            debug!(%local_id, "delete of unknown note");
            return Ok(DeleteStaged::Absent);
        };

        if note.pending_delete {
            return Ok(DeleteStaged::Tombstoned);
        }

        // A create that never left the device needs no remote delete. If the
        // lane is busy the create may be in flight, so keep a tombstone for
        // the lane to resolve.
        if !note.is_remote() && !self.lane_busy(local_id) {
            self.store.remove(local_id)?;
            self.remember(&note, true);
            debug!(%local_id, "unsynced note removed locally");
            return Ok(DeleteStaged::Removed);
        }

        note.pending_delete = true;
        self.stamp(&mut note);
        self.store.put(note)?;
        debug!(%local_id, "note tombstoned");
        Ok(DeleteStaged::Tombstoned)
    }

    // ------------------------------------------------------------------
    // Lane pass
    // ------------------------------------------------------------------

    async fn run_lane(&self, local_id: &str) -> SyncResult<NoteSyncOutcome> {
        loop {
            let Some(note) = self.store.get(local_id)? else {
                return Ok(NoteSyncOutcome::Removed);
            };

            let op = RemoteOp::plan(&note);
            let name = op.name();
            debug!(%local_id, op = name, version = note.version, "lane step");

            let step = match op {
                RemoteOp::None => return Ok(NoteSyncOutcome::Synced),
                RemoteOp::LocalPurge => {
                    self.purge_unsynced(local_id)?;
                    Ok(())
                }
                RemoteOp::Create => {
                    let result = self.gateway.create_remote(&note).await;
                    match self.observe(result) {
                        Ok(remote_id) => self.complete_create(&note, remote_id),
                        Err(failure) => Ok(Err(failure)),
                    }?
                }
                RemoteOp::Update { remote_id } => {
                    let result = self.gateway.update_remote(&remote_id, &note.title).await;
                    self.complete_update(&note, self.observe(result))?
                }
                RemoteOp::Delete { remote_id } => {
                    let result = self.gateway.delete_remote(&remote_id).await;
                    self.complete_delete(&note, self.observe(result))?
                }
            };

            if let Err(failure) = step {
                warn!(
                    %local_id,
                    op = name,
                    error = %failure,
                    "remote operation failed, will retry on next flush"
                );
                return Ok(NoteSyncOutcome::Deferred(failure));
            }
        }
    }

    fn complete_create(&self, issued: &Note, remote_id: String) -> SyncResult<RemoteResult<()>> {
        let _w = self.write_lock.lock();
        let Some(mut current) = self.store.get(&issued.local_id)? else {
            warn!(local_id = %issued.local_id, %remote_id, "create acknowledged for a purged note");
            let mut orphan = issued.clone();
            orphan.remote_id = Some(remote_id);
            self.remember(&orphan, true);
            return Ok(Ok(()));
        };

        if current.remote_id.is_none() {
            current.remote_id = Some(remote_id);
        }
        if current.version == issued.version {
            current.pending_edit = false;
        } else {
            self.stats.write().stale_completions += 1;
            if current.title != issued.title {
                current.pending_edit = true;
            }
        }
        self.stamp(&mut current);
        debug!(
            local_id = %current.local_id,
            remote_id = ?current.remote_id,
            pending_edit = current.pending_edit,
            "create acknowledged"
        );
        self.store.put(current)?;
        Ok(Ok(()))
    }

    fn complete_update(
        &self,
        issued: &Note,
        result: RemoteResult<()>,
    ) -> SyncResult<RemoteResult<()>> {
        match result {
            Ok(()) => {
                let _w = self.write_lock.lock();
                let Some(mut current) = self.store.get(&issued.local_id)? else {
                    return Ok(Ok(()));
                };
                if current.version != issued.version {
                    self.stats.write().stale_completions += 1;
                    debug!(local_id = %issued.local_id, "stale update completion");
                    return Ok(Ok(()));
                }
                current.pending_edit = false;
                self.stamp(&mut current);
                self.store.put(current)?;
                debug!(local_id = %issued.local_id, "update acknowledged");
                Ok(Ok(()))
            }
            Err(RemoteFailure::NotFound) => {
                info!(local_id = %issued.local_id, "note gone remotely, purging");
                self.purge(&issued.local_id)?;
                Ok(Ok(()))
            }
            Err(failure) => Ok(Err(failure)),
        }
    }

    fn complete_delete(
        &self,
        issued: &Note,
        result: RemoteResult<()>,
    ) -> SyncResult<RemoteResult<()>> {
        match result {
            Ok(()) | Err(RemoteFailure::NotFound) => {
                self.purge(&issued.local_id)?;
                debug!(local_id = %issued.local_id, "delete confirmed");
                Ok(Ok(()))
            }
            Err(failure) => Ok(Err(failure)),
        }
    }

    fn purge(&self, local_id: &str) -> SyncResult<()> {
        let _w = self.write_lock.lock();
        if let Some(note) = self.store.remove(local_id)? {
            self.remember(&note, false);
        }
        Ok(())
    }

    fn purge_unsynced(&self, local_id: &str) -> SyncResult<()> {
        let _w = self.write_lock.lock();
        if let Some(note) = self.store.get(local_id)? {
            if note.pending_delete && !note.is_remote() {
                self.store.remove(local_id)?;
                // The create that kept the lane busy may have landed.
                self.remember(&note, true);
                debug!(%local_id, "unsynced tombstone purged");
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Refresh merge
    // ------------------------------------------------------------------

    fn merge_remote(&self, started: u64, remote: Vec<RemoteNote>) -> SyncResult<RefreshReport> {
        let _w = self.write_lock.lock();
        let mut report = RefreshReport {
            fetched: remote.len(),
            ..RefreshReport::default()
        };

        let local = self.store.list()?;
        let by_remote: HashMap<&str, &Note> = local
            .iter()
            .filter_map(|n| n.remote_id.as_deref().map(|id| (id, n)))
            .collect();
        let by_local: HashMap<&str, &Note> =
            local.iter().map(|n| (n.local_id.as_str(), n)).collect();
        let remote_ids: HashSet<&str> = remote.iter().map(|r| r.id.as_str()).collect();
        let mut taken_ids: HashSet<String> = HashSet::new();
        let mut removed = self.removed.lock();
        let mut resolved: HashSet<usize> = HashSet::new();

        for entry in &remote {
            if let Some(existing) = by_remote.get(entry.id.as_str()) {
                if existing.version > started || !existing.is_synced() {
                    report.kept += 1;
                } else if existing.title != entry.title {
                    let mut note = (*existing).clone();
                    note.title = entry.title.clone();
                    self.stamp(&mut note);
                    self.store.put(note)?;
                    report.updated += 1;
                }
                continue;
            }

            let claimed = entry
                .local_id
                .as_deref()
                .and_then(|id| by_local.get(id))
                .filter(|n| n.remote_id.is_none());
            if let Some(existing) = claimed {
                if existing.version > started {
                    report.kept += 1;
                } else {
                    let mut note = (*existing).clone();
                    note.remote_id = Some(entry.id.clone());
                    self.stamp(&mut note);
                    debug!(local_id = %note.local_id, remote_id = %entry.id, "adopted remote id");
                    self.store.put(note)?;
                    report.adopted += 1;
                }
                continue;
            }

            if let Some(i) = removed.iter().position(|r| r.matches(entry)) {
                let removal = &removed[i];
                if removal.orphan {
                    let mut tombstone = Note {
                        local_id: removal.local_id.clone(),
                        remote_id: Some(entry.id.clone()),
                        title: entry.title.clone(),
                        created_at: entry.created_at,
                        pending_delete: true,
                        pending_edit: false,
                        version: 0,
                    };
                    self.stamp(&mut tombstone);
                    info!(
                        local_id = %tombstone.local_id,
                        remote_id = %entry.id,
                        "remote copy of a deleted note, scheduling delete"
                    );
                    taken_ids.insert(tombstone.local_id.clone());
                    self.store.put(tombstone)?;
                    resolved.insert(i);
                    report.suppressed += 1;
                    continue;
                }
                if removal.at > started {
                    debug!(remote_id = %entry.id, "skipping note removed during refresh");
                    report.suppressed += 1;
                    continue;
                }
            }

            let local_id = match entry.local_id.as_deref() {
                Some(id) if !by_local.contains_key(id) && !taken_ids.contains(id) => id.to_string(),
                _ => Uuid::new_v4().to_string(),
            };
            taken_ids.insert(local_id.clone());
            let mut note = Note {
                local_id,
                remote_id: Some(entry.id.clone()),
                title: entry.title.clone(),
                created_at: entry.created_at,
                pending_delete: false,
                pending_edit: false,
                version: 0,
            };
            self.stamp(&mut note);
            self.store.put(note)?;
            report.inserted += 1;
        }

        for note in &local {
            let Some(remote_id) = note.remote_id.as_deref() else {
                continue;
            };
            if remote_ids.contains(remote_id) {
                continue;
            }
            if note.version > started || (note.pending_edit && !note.pending_delete) {
                report.kept += 1;
                continue;
            }
            self.store.remove(&note.local_id)?;
            removed.push(Removal {
                local_id: note.local_id.clone(),
                remote_id: Some(remote_id.to_string()),
                at: self.sequence.fetch_add(1, Ordering::SeqCst) + 1,
                orphan: false,
            });
            debug!(local_id = %note.local_id, %remote_id, "purged note missing remotely");
            report.purged += 1;
        }

        // An orphan absent from a listing that began after its removal never
        // reached the remote.
        let mut index = 0;
        removed.retain(|r| {
            let matched = remote.iter().any(|entry| r.matches(entry));
            let keep = !resolved.contains(&index) && !(r.orphan && r.at <= started && !matched);
            index += 1;
            keep
        });

        Ok(report)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn stamp(&self, note: &mut Note) {
        note.version = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
    }

    fn observe<T>(&self, result: RemoteResult<T>) -> RemoteResult<T> {
        let mut stats = self.stats.write();
        stats.remote_attempts += 1;
        match &result {
            Ok(_) | Err(RemoteFailure::NotFound) => stats.remote_successes += 1,
            Err(failure) => {
                stats.remote_failures += 1;
                stats.last_error = Some(failure.to_string());
            }
        }
        result
    }

    /// Records a note that just left the store. Caller holds the write lock.
    fn remember(&self, note: &Note, orphan: bool) {
        let at = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        self.removed.lock().push(Removal {
            local_id: note.local_id.clone(),
            remote_id: note.remote_id.clone(),
            at,
            orphan,
        });
    }

    fn begin_refresh(&self) -> RefreshMark<'_> {
        let mut active = self.refreshing.lock();
        let started = self.current_version();
        active.push(started);
        RefreshMark {
            active: &self.refreshing,
            started,
        }
    }

    /// Forgets confirmed removals no running refresh can still be stale about.
    fn prune_removals(&self) {
        let floor = self
            .refreshing
            .lock()
            .iter()
            .copied()
            .min()
            .unwrap_or_else(|| self.current_version());
        self.removed.lock().retain(|r| r.orphan || r.at > floor);
    }

    fn lane(&self, local_id: &str) -> Arc<LaneMutex<()>> {
        let mut lanes = self.lanes.lock();
        Arc::clone(lanes.entry(local_id.to_string()).or_default())
    }

    fn release_lane(&self, local_id: &str, lane: Arc<LaneMutex<()>>) {
        let mut lanes = self.lanes.lock();
        // Only the map and this handle remain: nobody is waiting.
        if Arc::strong_count(&lane) == 2 {
            lanes.remove(local_id);
        }
    }

    fn lane_busy(&self, local_id: &str) -> bool {
        self.lanes
            .lock()
            .get(local_id)
            .is_some_and(|lane| lane.try_lock().is_err())
    }
}
