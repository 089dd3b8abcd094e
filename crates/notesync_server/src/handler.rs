//! Request handlers for the note endpoints.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::store::NoteStore;
use notesync_protocol::{CreateNoteRequest, RemoteNote, UpdateNoteRequest};
use std::sync::Arc;
use tracing::debug;

/// Context for request handling.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// Note storage (shared across all handlers).
    pub store: Arc<NoteStore>,
}

impl HandlerContext {
    /// Creates a new handler context.
    pub fn new(config: ServerConfig, store: Arc<NoteStore>) -> Self {
        Self { config, store }
    }

    fn check_title(&self, title: &str) -> ServerResult<()> {
        if title.trim().is_empty() {
            return Err(ServerError::InvalidRequest("title is blank".into()));
        }
        let len = title.chars().count();
        if len > self.config.max_title_len {
            return Err(ServerError::InvalidRequest(format!(
                "title too long: {len} > {}",
                self.config.max_title_len
            )));
        }
        Ok(())
    }
}

/// Handler for note requests.
pub struct RequestHandler {
    context: Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    /// Handles `POST /notes`.
    ///
    /// Returns the note and whether it was newly stored; a repeated create
    /// for the same `localId` returns the original note.
    pub fn handle_create(&self, request: CreateNoteRequest) -> ServerResult<(RemoteNote, bool)> {
        self.context.check_title(&request.title)?;
        if request.local_id.is_empty() {
            return Err(ServerError::InvalidRequest("localId is empty".into()));
        }
        let (note, created) = self
            .context
            .store
            .create(request, self.context.config.max_notes)?;
        debug!(id = %note.id, created, "create handled");
        Ok((note, created))
    }

    /// Handles `PATCH /notes/{id}`.
    pub fn handle_update(&self, id: &str, request: UpdateNoteRequest) -> ServerResult<RemoteNote> {
        self.context.check_title(&request.title)?;
        self.context.store.update(id, request.title)
    }

    /// Handles `DELETE /notes/{id}`.
    pub fn handle_delete(&self, id: &str) -> ServerResult<()> {
        self.context.store.delete(id).map(|_| ())
    }

    /// Handles `GET /notes`.
    pub fn handle_list(&self) -> ServerResult<Vec<RemoteNote>> {
        Ok(self.context.store.list())
    }
}
