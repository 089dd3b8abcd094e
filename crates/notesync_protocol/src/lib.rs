//! # NoteSync Protocol
//!
//! Note model, REST wire contract and codecs for NoteSync.
//!
//! This crate provides:
//! - [`Note`], the single synchronized entity, and its derived [`SyncStatus`]
//! - Title validation used by callers before handing text to the engine
//! - The REST contract ([`Route`], request/response bodies, [`HttpRequest`]/[`HttpResponse`])
//! - CBOR (local records) and JSON (wire) codecs
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod codec;
mod error;
mod messages;
mod note;
mod validation;

pub use codec::{decode_cbor, decode_json, encode_cbor, encode_json};
pub use error::{CodecError, CodecResult};
pub use messages::{
    CreateNoteRequest, ErrorBody, HttpRequest, HttpResponse, Method, RemoteNote, Route,
    UpdateNoteRequest,
};
pub use note::{Note, SyncStatus};
pub use validation::{validate_title, TitleError, MAX_TITLE_CHARS};
