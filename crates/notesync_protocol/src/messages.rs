//! REST wire contract.
//!
//! The remote store exposes four endpoints:
//!
//! | Method   | Path          | Body                   | Response        |
//! |----------|---------------|------------------------|-----------------|
//! | `GET`    | `/notes`      | -                      | `[RemoteNote]`  |
//! | `POST`   | `/notes`      | [`CreateNoteRequest`]  | [`RemoteNote`]  |
//! | `PATCH`  | `/notes/{id}` | [`UpdateNoteRequest`]  | [`RemoteNote`]  |
//! | `DELETE` | `/notes/{id}` | -                      | empty           |
//!
//! Bodies are JSON. A missing note answers `404`.

use crate::codec::{decode_json, encode_json};
use crate::error::CodecResult;
use crate::note::Note;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Collection path for notes.
const NOTES_PATH: &str = "/notes";

/// HTTP method used by the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
}

impl Method {
    /// Returns the canonical uppercase method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An endpoint of the note API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `GET /notes`
    ListNotes,
    /// `POST /notes`
    CreateNote,
    /// `PATCH /notes/{id}`
    UpdateNote(String),
    /// `DELETE /notes/{id}`
    DeleteNote(String),
}

impl Route {
    /// Returns the HTTP method of this route.
    pub fn method(&self) -> Method {
        match self {
            Route::ListNotes => Method::Get,
            Route::CreateNote => Method::Post,
            Route::UpdateNote(_) => Method::Patch,
            Route::DeleteNote(_) => Method::Delete,
        }
    }

    /// Returns the request path of this route.
    pub fn path(&self) -> String {
        match self {
            Route::ListNotes | Route::CreateNote => NOTES_PATH.to_string(),
            Route::UpdateNote(id) | Route::DeleteNote(id) => format!("{NOTES_PATH}/{id}"),
        }
    }

    /// Matches a method and path against the contract.
    ///
    /// Query strings are ignored. Returns `None` for anything the contract
    /// does not define.
    pub fn parse(method: Method, path: &str) -> Option<Self> {
        let path = path.split('?').next().unwrap_or(path);
        let path = path.trim_end_matches('/');
        let rest = path.strip_prefix(NOTES_PATH)?;

        if rest.is_empty() {
            return match method {
                Method::Get => Some(Route::ListNotes),
                Method::Post => Some(Route::CreateNote),
                _ => None,
            };
        }

        let id = rest.strip_prefix('/')?;
        if id.is_empty() || id.contains('/') {
            return None;
        }

        match method {
            Method::Patch => Some(Route::UpdateNote(id.to_string())),
            Method::Delete => Some(Route::DeleteNote(id.to_string())),
            _ => None,
        }
    }
}

/// Body of `POST /notes`.
///
/// `local_id` lets the server recognise a retried create for a note it
/// already holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteRequest {
    /// Client-generated identifier.
    pub local_id: String,
    /// Note text.
    pub title: String,
    /// Creation time on the client.
    pub created_at: DateTime<Utc>,
}

impl From<&Note> for CreateNoteRequest {
    fn from(note: &Note) -> Self {
        Self {
            local_id: note.local_id.clone(),
            title: note.title.clone(),
            created_at: note.created_at,
        }
    }
}

/// Body of `PATCH /notes/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateNoteRequest {
    /// New note text.
    pub title: String,
}

/// A note as the remote store reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteNote {
    /// Server-assigned identifier.
    #[serde(rename = "_id")]
    pub id: String,
    /// Note text.
    pub title: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Client identifier supplied at create time, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_id: Option<String>,
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable reason.
    pub error: String,
}

/// A transport-neutral HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Request method.
    pub method: Method,
    /// Path relative to the server base URL, starting with `/`.
    pub path: String,
    /// Optional JSON body.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Creates a request for a route without a body.
    pub fn new(route: &Route) -> Self {
        Self {
            method: route.method(),
            path: route.path(),
            body: None,
        }
    }

    /// Creates a request for a route with a JSON body.
    pub fn with_json<T: Serialize>(route: &Route, body: &T) -> CodecResult<Self> {
        Ok(Self {
            method: route.method(),
            path: route.path(),
            body: Some(encode_json(body)?),
        })
    }

    /// Decodes the JSON body.
    pub fn json<T: DeserializeOwned>(&self) -> CodecResult<T> {
        decode_json(self.body.as_deref().unwrap_or_default())
    }
}

/// A transport-neutral HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Response body (JSON or empty).
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response with an empty body.
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
        }
    }

    /// Creates a response with a JSON body.
    pub fn json<T: Serialize>(status: u16, body: &T) -> CodecResult<Self> {
        Ok(Self {
            status,
            body: encode_json(body)?,
        })
    }

    /// Creates an error response carrying an [`ErrorBody`].
    pub fn error(status: u16, message: impl Into<String>) -> Self {
        let body = ErrorBody {
            error: message.into(),
        };
        // ErrorBody is a single string field and always encodes.
        Self {
            status,
            body: encode_json(&body).unwrap_or_default(),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns true for `404 Not Found`.
    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    /// Decodes the JSON body.
    pub fn decode<T: DeserializeOwned>(&self) -> CodecResult<T> {
        decode_json(&self.body)
    }
}
