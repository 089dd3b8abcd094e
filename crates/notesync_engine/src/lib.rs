//! # NoteSync Engine
//!
//! Offline-first note synchronization engine.
//!
//! This crate provides:
//! - [`SyncEngine`]: owns local note state, tracks unacknowledged mutations
//!   and reconciles with the remote store
//! - [`RemoteGateway`] abstraction with HTTP, mock and offline implementations
//! - [`ConnectivitySignal`] and [`FlushWorker`] for "connectivity is back"
//!   triggers and periodic wakes
//! - [`NoteService`], the façade a UI calls
//!
//! ## Sync Model
//!
//! Every mutation is applied to the local store first (optimistic update) and
//! flagged as pending. The remote operation owed by a note is derived from its
//! flags, so a retry after a failure or a restart issues the right call:
//!
//! ```text
//! CREATED_LOCAL  --create ok-->      SYNCED
//! SYNCED         --edit-->           EDIT_PENDING --update ok--> SYNCED
//! any            --delete-->         DELETE_PENDING --delete ok / 404--> purged
//! ```
//!
//! ## Key Invariants
//!
//! - Local persistence happens before any network attempt
//! - At most one remote operation per note is in flight
//! - A completion is applied only against the version it was issued for
//! - Delete wins over edit
//! - Refresh never overwrites a pending note
//! - Retries happen only on flush triggers, never in an unbounded loop

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod connectivity;
mod engine;
mod error;
mod gateway;
mod http;
mod mock;
mod plan;
mod service;

pub use config::{EngineConfig, HttpGatewayConfig};
pub use connectivity::{ConnectivityHandle, ConnectivityListener, ConnectivitySignal, FlushWorker};
pub use engine::{FlushReport, NoteSyncOutcome, RefreshReport, SyncEngine, SyncStats};
pub use error::{SyncError, SyncResult};
pub use gateway::{OfflineGateway, RemoteFailure, RemoteGateway, RemoteResult};
pub use http::{HttpClient, HttpGateway, LoopbackClient, LoopbackServer};
pub use mock::{GatewayCall, GatewayOp, MockGateway};
pub use plan::RemoteOp;
pub use service::{NoteService, SyncTicket};
