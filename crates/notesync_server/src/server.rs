//! Main note server.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::{HandlerContext, RequestHandler};
use crate::store::NoteStore;
use notesync_protocol::{
    CreateNoteRequest, HttpRequest, HttpResponse, RemoteNote, Route, UpdateNoteRequest,
};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Per-endpoint request counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestCounts {
    /// `GET /notes`
    pub list: u64,
    /// `POST /notes`
    pub create: u64,
    /// `PATCH /notes/{id}`
    pub update: u64,
    /// `DELETE /notes/{id}`
    pub delete: u64,
    /// Requests answered with an error status.
    pub errors: u64,
}

#[derive(Debug, Default)]
struct Counters {
    list: AtomicU64,
    create: AtomicU64,
    update: AtomicU64,
    delete: AtomicU64,
    errors: AtomicU64,
}

/// The note server.
///
/// Serves the REST contract from memory. Transport is left to the caller:
/// anything that can turn a request into an [`HttpRequest`] can call
/// [`NoteServer::handle`], including an in-process loopback client.
///
/// Faults can be injected to exercise client retry paths: take the server
/// offline (every request answers `503`) or queue error statuses for the
/// next requests.
///
/// # Example
///
/// ```
/// use notesync_protocol::{HttpRequest, Route};
/// use notesync_server::{NoteServer, ServerConfig};
///
/// let server = NoteServer::new(ServerConfig::default());
/// let response = server.handle(HttpRequest::new(&Route::ListNotes));
/// assert_eq!(response.status, 200);
/// ```
pub struct NoteServer {
    handler: RequestHandler,
    context: Arc<HandlerContext>,
    offline: AtomicBool,
    injected: Mutex<VecDeque<u16>>,
    counters: Counters,
}

impl NoteServer {
    /// Creates a new note server.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_store(config, Arc::new(NoteStore::new()))
    }

    /// Creates a note server over an existing store.
    pub fn with_store(config: ServerConfig, store: Arc<NoteStore>) -> Self {
        let context = Arc::new(HandlerContext::new(config, store));
        let handler = RequestHandler::new(Arc::clone(&context));
        Self {
            handler,
            context,
            offline: AtomicBool::new(false),
            injected: Mutex::new(VecDeque::new()),
            counters: Counters::default(),
        }
    }

    /// Handles one request.
    pub fn handle(&self, request: HttpRequest) -> HttpResponse {
        let method = request.method;
        let path = request.path.clone();

        let response = match self.dispatch(request) {
            Ok(response) => response,
            Err(e) => {
                if e.is_server_error() {
                    warn!(%method, %path, error = %e, "request failed");
                } else {
                    debug!(%method, %path, error = %e, "request rejected");
                }
                HttpResponse::error(e.status(), e.to_string())
            }
        };
        if !response.is_success() {
            self.counters.errors.fetch_add(1, Ordering::Relaxed);
        }
        response
    }

    fn dispatch(&self, request: HttpRequest) -> ServerResult<HttpResponse> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ServerError::Unavailable);
        }
        if let Some(status) = self.injected.lock().pop_front() {
            return Ok(HttpResponse::error(status, "injected failure"));
        }

        let route = Route::parse(request.method, &request.path).ok_or_else(|| {
            ServerError::NoRoute {
                method: request.method.to_string(),
                path: request.path.clone(),
            }
        })?;

        match route {
            Route::ListNotes => {
                self.counters.list.fetch_add(1, Ordering::Relaxed);
                let notes = self.handler.handle_list()?;
                json(200, &notes)
            }
            Route::CreateNote => {
                self.counters.create.fetch_add(1, Ordering::Relaxed);
                let body: CreateNoteRequest = request
                    .json()
                    .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;
                let (note, created) = self.handler.handle_create(body)?;
                json(if created { 201 } else { 200 }, &note)
            }
            Route::UpdateNote(id) => {
                self.counters.update.fetch_add(1, Ordering::Relaxed);
                let body: UpdateNoteRequest = request
                    .json()
                    .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;
                let note = self.handler.handle_update(&id, body)?;
                json(200, &note)
            }
            Route::DeleteNote(id) => {
                self.counters.delete.fetch_add(1, Ordering::Relaxed);
                self.handler.handle_delete(&id)?;
                Ok(HttpResponse::empty(204))
            }
        }
    }

    /// Simulates the server being unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Answers the next request with `status` instead of handling it.
    pub fn fail_next(&self, status: u16) {
        self.injected.lock().push_back(status);
    }

    /// Returns the request counters.
    pub fn request_counts(&self) -> RequestCounts {
        RequestCounts {
            list: self.counters.list.load(Ordering::Relaxed),
            create: self.counters.create.load(Ordering::Relaxed),
            update: self.counters.update.load(Ordering::Relaxed),
            delete: self.counters.delete.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
        }
    }

    /// Returns the stored notes.
    pub fn notes(&self) -> Vec<RemoteNote> {
        self.context.store.list()
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &Arc<NoteStore> {
        &self.context.store
    }
}

fn json<T: Serialize>(status: u16, body: &T) -> ServerResult<HttpResponse> {
    HttpResponse::json(status, body).map_err(|e| ServerError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use notesync_protocol::{ErrorBody, Method};

    fn create_request(local_id: &str, title: &str) -> HttpRequest {
        let body = CreateNoteRequest {
            local_id: local_id.into(),
            title: title.into(),
            created_at: Utc::now(),
        };
        HttpRequest::with_json(&Route::CreateNote, &body).unwrap()
    }

    #[test]
    fn server_lifecycle() {
        let server = NoteServer::new(ServerConfig::default());
        assert!(server.notes().is_empty());
        assert_eq!(server.request_counts(), RequestCounts::default());
    }

    #[test]
    fn full_rest_flow() {
        let server = NoteServer::new(ServerConfig::default());

        // 1. Create
        let response = server.handle(create_request("l1", "A"));
        assert_eq!(response.status, 201);
        let note: RemoteNote = response.decode().unwrap();

        // 2. Repeated create answers 200 with the same note
        let response = server.handle(create_request("l1", "A"));
        assert_eq!(response.status, 200);
        assert_eq!(response.decode::<RemoteNote>().unwrap().id, note.id);

        // 3. Update
        let route = Route::UpdateNote(note.id.clone());
        let update = HttpRequest::with_json(&route, &UpdateNoteRequest { title: "B".into() }).unwrap();
        assert_eq!(server.handle(update).status, 200);

        // 4. List
        let response = server.handle(HttpRequest::new(&Route::ListNotes));
        let notes: Vec<RemoteNote> = response.decode().unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "B");

        // 5. Delete, then delete again
        let delete = HttpRequest::new(&Route::DeleteNote(note.id.clone()));
        assert_eq!(server.handle(delete.clone()).status, 204);
        assert_eq!(server.handle(delete).status, 404);

        let counts = server.request_counts();
        assert_eq!(counts.create, 2);
        assert_eq!(counts.update, 1);
        assert_eq!(counts.delete, 2);
        assert_eq!(counts.list, 1);
        assert_eq!(counts.errors, 1);
    }

    #[test]
    fn malformed_body_is_bad_request() {
        let server = NoteServer::new(ServerConfig::default());
        let request = HttpRequest {
            method: Method::Post,
            path: "/notes".into(),
            body: Some(b"{".to_vec()),
        };
        let response = server.handle(request);
        assert_eq!(response.status, 400);
        assert!(response.decode::<ErrorBody>().is_ok());
    }

    #[test]
    fn unknown_route_is_404() {
        let server = NoteServer::new(ServerConfig::default());
        let request = HttpRequest {
            method: Method::Get,
            path: "/notes/abc".into(),
            body: None,
        };
        assert_eq!(server.handle(request).status, 404);
    }

    #[test]
    fn fault_injection() {
        let server = NoteServer::new(ServerConfig::default());

        server.set_offline(true);
        assert_eq!(server.handle(HttpRequest::new(&Route::ListNotes)).status, 503);
        server.set_offline(false);

        server.fail_next(500);
        assert_eq!(server.handle(create_request("l1", "A")).status, 500);
        assert!(server.notes().is_empty());
        assert_eq!(server.handle(create_request("l1", "A")).status, 201);
    }
}
