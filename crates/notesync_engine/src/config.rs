//! Configuration for the sync engine and its HTTP gateway.

use std::time::Duration;

/// Configuration for a [`crate::SyncEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of notes synced concurrently during a flush.
    pub flush_concurrency: usize,
    /// Periodic background wake for the flush worker, if any.
    pub wake_interval: Option<Duration>,
    /// Whether the flush worker refreshes from the remote after each flush.
    pub refresh_after_flush: bool,
}

impl EngineConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            flush_concurrency: 8,
            wake_interval: None,
            refresh_after_flush: true,
        }
    }

    /// Sets the flush concurrency. Values below one are raised to one.
    pub fn with_flush_concurrency(mut self, concurrency: usize) -> Self {
        self.flush_concurrency = concurrency.max(1);
        self
    }

    /// Sets the periodic wake interval.
    pub fn with_wake_interval(mut self, interval: Duration) -> Self {
        self.wake_interval = Some(interval);
        self
    }

    /// Sets whether the flush worker refreshes after flushing.
    pub fn with_refresh_after_flush(mut self, refresh: bool) -> Self {
        self.refresh_after_flush = refresh;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for [`crate::HttpGateway`].
#[derive(Debug, Clone)]
pub struct HttpGatewayConfig {
    /// Base URL of the note server (e.g. `https://notes.example.com/api`).
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl HttpGatewayConfig {
    /// Creates a configuration for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Joins the base URL and a request path.
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
