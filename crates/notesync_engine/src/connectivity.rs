//! Connectivity signal and the background flush worker.
//!
//! The outside world (a network monitor, a periodic background wake) tells the
//! engine "connectivity is likely back" through a [`ConnectivityHandle`]. A
//! [`FlushWorker`] listens and flushes. Signals coalesce: a burst of them while
//! a flush is running queues at most one more flush.

use crate::engine::SyncEngine;
use crate::gateway::RemoteGateway;
use notesync_storage::LocalStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, error, info};

/// Constructor for a connected handle/listener pair.
pub struct ConnectivitySignal;

impl ConnectivitySignal {
    /// Creates a signal. The handle starts in the online state.
    pub fn channel() -> (ConnectivityHandle, ConnectivityListener) {
        let (tx, rx) = mpsc::channel(1);
        let handle = ConnectivityHandle {
            tx,
            online: Arc::new(AtomicBool::new(true)),
        };
        (handle, ConnectivityListener { rx })
    }
}

/// Sending side of the connectivity signal. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ConnectivityHandle {
    tx: mpsc::Sender<()>,
    online: Arc<AtomicBool>,
}

impl ConnectivityHandle {
    /// Asks for a flush.
    ///
    /// Returns false if a flush is already queued (the signal coalesced) or
    /// the listener is gone.
    pub fn notify(&self) -> bool {
        self.tx.try_send(()).is_ok()
    }

    /// Records the connectivity state, signalling on offline → online.
    pub fn set_online(&self, online: bool) {
        let was_online = self.online.swap(online, Ordering::SeqCst);
        if online && !was_online {
            debug!("connectivity restored");
            self.notify();
        }
    }

    /// Returns the last recorded connectivity state.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

/// Receiving side of the connectivity signal.
#[derive(Debug)]
pub struct ConnectivityListener {
    rx: mpsc::Receiver<()>,
}

impl ConnectivityListener {
    /// Waits for the next signal. Returns false once every handle is dropped.
    pub async fn triggered(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }
}

/// Background task that flushes on every connectivity signal and on the
/// optional periodic wake.
///
/// After each flush it refreshes from the remote when
/// [`crate::EngineConfig::refresh_after_flush`] is set. The worker stops when
/// every [`ConnectivityHandle`] is dropped, on [`FlushWorker::shutdown`], or
/// when the `FlushWorker` itself is dropped.
pub struct FlushWorker {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
    passes: watch::Receiver<u64>,
}

impl FlushWorker {
    /// Spawns the worker on the current tokio runtime.
    pub fn spawn<S, G>(engine: Arc<SyncEngine<S, G>>, listener: ConnectivityListener) -> Self
    where
        S: LocalStore + 'static,
        G: RemoteGateway + 'static,
    {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (passes_tx, passes_rx) = watch::channel(0u64);
        let task = tokio::spawn(run(engine, listener, shutdown_rx, passes_tx));
        Self {
            shutdown: Some(shutdown_tx),
            task,
            passes: passes_rx,
        }
    }

    /// Number of completed flush passes.
    pub fn passes(&self) -> u64 {
        *self.passes.borrow()
    }

    /// Waits until at least `count` passes have completed or the worker stops.
    pub async fn wait_for_passes(&self, count: u64) {
        let mut passes = self.passes.clone();
        let _ = passes.wait_for(|p| *p >= count).await;
    }

    /// Returns true once the worker has stopped.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops the worker, letting a running pass finish first.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            error!(error = %e, "flush worker panicked");
        }
    }
}

async fn run<S, G>(
    engine: Arc<SyncEngine<S, G>>,
    mut listener: ConnectivityListener,
    mut shutdown: oneshot::Receiver<()>,
    passes: watch::Sender<u64>,
) where
    S: LocalStore + 'static,
    G: RemoteGateway + 'static,
{
    let mut wake = engine.config().wake_interval.map(wake_interval);
    info!(wake = ?engine.config().wake_interval, "flush worker started");

    loop {
        let reason = tokio::select! {
            _ = &mut shutdown => break,
            signalled = listener.triggered() => {
                if !signalled {
                    break;
                }
                "signal"
            }
            _ = next_wake(&mut wake) => "wake",
        };

        debug!(reason, "flush worker woke");
        match engine.flush().await {
            Ok(report) => debug!(
                synced = report.synced,
                deferred = report.deferred,
                "worker flush done"
            ),
            Err(e) => error!(error = %e, "worker flush failed"),
        }
        if engine.config().refresh_after_flush {
            // Failures are logged by the engine and retried on the next wake.
            let _ = engine.refresh_notes().await;
        }
        passes.send_modify(|p| *p += 1);
    }

    info!("flush worker stopped");
}

fn wake_interval(period: Duration) -> Interval {
    let start = tokio::time::Instant::now() + period;
    let mut interval = tokio::time::interval_at(start, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

async fn next_wake(wake: &mut Option<Interval>) {
    match wake {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
