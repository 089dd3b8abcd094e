//! HTTP gateway implementation.
//!
//! This module maps the gateway operations onto the REST contract. The actual
//! HTTP client is abstracted via a trait so the engine does not depend on a
//! particular HTTP library; the CLI plugs in `reqwest`, tests use
//! [`LoopbackClient`].

use crate::config::HttpGatewayConfig;
use crate::gateway::{RemoteFailure, RemoteGateway, RemoteResult};
use notesync_protocol::{
    CreateNoteRequest, ErrorBody, HttpRequest, HttpResponse, Note, RemoteNote, Route,
    UpdateNoteRequest,
};
use parking_lot::RwLock;
use serde::Serialize;
use std::future::Future;
use tracing::debug;

/// HTTP client abstraction.
///
/// `send` returns `Err` only when no response was received (connection
/// refused, TLS failure, ...). Non-2xx statuses are responses.
pub trait HttpClient: Send + Sync {
    /// Sends a request to an absolute URL.
    fn send(
        &self,
        url: &str,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, String>> + Send;

    /// Checks if the client is able to send at all.
    fn is_healthy(&self) -> bool {
        true
    }
}

/// REST gateway over an [`HttpClient`].
///
/// Status mapping: 2xx is success, 404 is [`RemoteFailure::NotFound`],
/// everything else (including timeouts and unreadable bodies) is
/// [`RemoteFailure::Transient`].
pub struct HttpGateway<C: HttpClient> {
    config: HttpGatewayConfig,
    client: C,
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpGateway<C> {
    /// Creates a new HTTP gateway.
    pub fn new(config: HttpGatewayConfig, client: C) -> Self {
        Self {
            config,
            client,
            last_error: RwLock::new(None),
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Returns the last failure message, cleared by the next answered request.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    fn fail(&self, message: String) -> RemoteFailure {
        *self.last_error.write() = Some(message.clone());
        RemoteFailure::transient(message)
    }

    async fn exchange(&self, request: HttpRequest) -> RemoteResult<HttpResponse> {
        if !self.client.is_healthy() {
            return Err(self.fail("http client unavailable".into()));
        }

        let method = request.method;
        let path = request.path.clone();
        let url = self.config.url(&path);
        debug!(%method, %url, "sending request");

        let response =
            match tokio::time::timeout(self.config.timeout, self.client.send(&url, request)).await
            {
                Err(_) => {
                    return Err(self.fail(format!(
                        "{method} {path} timed out after {:?}",
                        self.config.timeout
                    )))
                }
                Ok(Err(e)) => return Err(self.fail(format!("{method} {path}: {e}"))),
                Ok(Ok(response)) => response,
            };

        if response.is_success() {
            *self.last_error.write() = None;
            return Ok(response);
        }
        if response.is_not_found() {
            *self.last_error.write() = None;
            return Err(RemoteFailure::NotFound);
        }

        let reason = response
            .decode::<ErrorBody>()
            .map(|body| body.error)
            .unwrap_or_default();
        Err(self.fail(format!(
            "{method} {path} answered {}: {reason}",
            response.status
        )))
    }

    fn encode<T: Serialize>(&self, route: &Route, body: &T) -> RemoteResult<HttpRequest> {
        HttpRequest::with_json(route, body).map_err(|e| self.fail(e.to_string()))
    }
}

impl<C: HttpClient> RemoteGateway for HttpGateway<C> {
    async fn create_remote(&self, note: &Note) -> RemoteResult<String> {
        let request = self.encode(&Route::CreateNote, &CreateNoteRequest::from(note))?;
        let response = self.exchange(request).await.map_err(|failure| match failure {
            RemoteFailure::NotFound => RemoteFailure::transient("create endpoint not found"),
            other => other,
        })?;
        let created: RemoteNote = response
            .decode()
            .map_err(|e| self.fail(format!("bad create response: {e}")))?;
        Ok(created.id)
    }

    async fn update_remote(&self, remote_id: &str, title: &str) -> RemoteResult<()> {
        let body = UpdateNoteRequest {
            title: title.to_string(),
        };
        let request = self.encode(&Route::UpdateNote(remote_id.to_string()), &body)?;
        self.exchange(request).await.map(|_| ())
    }

    async fn delete_remote(&self, remote_id: &str) -> RemoteResult<()> {
        let request = HttpRequest::new(&Route::DeleteNote(remote_id.to_string()));
        self.exchange(request).await.map(|_| ())
    }

    async fn list_remote(&self) -> RemoteResult<Vec<RemoteNote>> {
        let response = self
            .exchange(HttpRequest::new(&Route::ListNotes))
            .await
            .map_err(|failure| match failure {
                RemoteFailure::NotFound => RemoteFailure::transient("list endpoint not found"),
                other => other,
            })?;
        response
            .decode()
            .map_err(|e| self.fail(format!("bad list response: {e}")))
    }
}

/// Trait for servers that can handle loopback requests.
pub trait LoopbackServer: Send + Sync {
    /// Handles a request and returns the response.
    fn handle(&self, request: HttpRequest) -> HttpResponse;
}

impl<F> LoopbackServer for F
where
    F: Fn(HttpRequest) -> HttpResponse + Send + Sync,
{
    fn handle(&self, request: HttpRequest) -> HttpResponse {
        self(request)
    }
}

/// A loopback HTTP client that routes requests directly to an in-process
/// server.
///
/// Useful for testing without actual network overhead. By default the
/// request keeps the path the gateway built; with a base URL the path is
/// re-derived from the absolute URL, and URLs outside that base are refused.
pub struct LoopbackClient<S: LoopbackServer> {
    server: S,
    base_url: Option<String>,
}

impl<S: LoopbackServer> LoopbackClient<S> {
    /// Creates a new loopback client connected to the given server.
    pub fn new(server: S) -> Self {
        Self {
            server,
            base_url: None,
        }
    }

    /// Creates a loopback client that serves only URLs under `base_url`.
    pub fn with_base_url(server: S, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            server,
            base_url: Some(base_url.trim_end_matches('/').to_string()),
        }
    }
}

impl<S: LoopbackServer> HttpClient for LoopbackClient<S> {
    async fn send(&self, url: &str, mut request: HttpRequest) -> Result<HttpResponse, String> {
        if let Some(base) = &self.base_url {
            let path = url
                .strip_prefix(base.as_str())
                .filter(|path| path.starts_with('/'))
                .ok_or_else(|| format!("{url} is not under {base}"))?;
            request.path = path.to_string();
        }
        Ok(self.server.handle(request))
    }
}
