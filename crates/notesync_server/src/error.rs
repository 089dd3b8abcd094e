//! Error types for the note server.

use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the note server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Malformed body or invalid field.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No note with this id.
    #[error("note not found: {0}")]
    NoteNotFound(String),

    /// No endpoint for this method and path.
    #[error("no route for {method} {path}")]
    NoRoute {
        /// Request method.
        method: String,
        /// Request path.
        path: String,
    },

    /// The store is full.
    #[error("note limit reached: {0}")]
    CapacityExceeded(usize),

    /// The server is (simulated to be) unreachable.
    #[error("service unavailable")]
    Unavailable,

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServerError::InvalidRequest(_)
                | ServerError::NoteNotFound(_)
                | ServerError::NoRoute { .. }
                | ServerError::CapacityExceeded(_)
        )
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        matches!(self, ServerError::Unavailable | ServerError::Internal(_))
    }

    /// Returns the HTTP status for this error.
    pub fn status(&self) -> u16 {
        match self {
            ServerError::InvalidRequest(_) => 400,
            ServerError::NoteNotFound(_) | ServerError::NoRoute { .. } => 404,
            ServerError::CapacityExceeded(_) => 409,
            ServerError::Unavailable => 503,
            ServerError::Internal(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classification() {
        assert!(ServerError::InvalidRequest("bad".into()).is_client_error());
        assert!(ServerError::Internal("oops".into()).is_server_error());
        assert!(!ServerError::InvalidRequest("bad".into()).is_server_error());
        assert!(ServerError::Unavailable.is_server_error());
    }

    #[test]
    fn error_status() {
        assert_eq!(ServerError::NoteNotFound("r1".into()).status(), 404);
        assert_eq!(ServerError::CapacityExceeded(3).status(), 409);
        assert_eq!(ServerError::Unavailable.status(), 503);
        let err = ServerError::NoRoute {
            method: "PUT".into(),
            path: "/x".into(),
        };
        assert!(err.to_string().contains("PUT /x"));
    }
}
