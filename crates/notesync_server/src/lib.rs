//! # NoteSync Server
//!
//! Reference note server for NoteSync.
//!
//! This crate provides:
//! - The REST endpoints (`GET /notes`, `POST /notes`, `PATCH /notes/{id}`,
//!   `DELETE /notes/{id}`) as a transport-neutral request handler
//! - In-memory note storage with idempotent create by `localId`
//! - Fault injection (offline mode, queued error statuses) for testing
//!   client retry behavior
//!
//! # Protocol
//!
//! - A create carries the client's `localId`; repeating it returns the stored
//!   note instead of a duplicate
//! - A missing note answers `404`, which clients treat as already deleted
//! - Malformed bodies answer `400`; injected and internal faults answer `5xx`

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod handler;
mod server;
mod store;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{HandlerContext, RequestHandler};
pub use server::{NoteServer, RequestCounts};
pub use store::NoteStore;
