//! Server configuration.

use notesync_protocol::MAX_TITLE_CHARS;

/// Configuration for the note server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum title length in characters.
    pub max_title_len: usize,
    /// Maximum number of stored notes.
    pub max_notes: usize,
}

impl ServerConfig {
    /// Creates a configuration with default limits.
    pub fn new() -> Self {
        Self {
            max_title_len: MAX_TITLE_CHARS,
            max_notes: 10_000,
        }
    }

    /// Sets the maximum title length.
    pub fn with_max_title_len(mut self, max: usize) -> Self {
        self.max_title_len = max;
        self
    }

    /// Sets the maximum number of stored notes.
    pub fn with_max_notes(mut self, max: usize) -> Self {
        self.max_notes = max;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}
