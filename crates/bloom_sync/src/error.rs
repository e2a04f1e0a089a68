//! Error types for the sync layer.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while talking to the bloom API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The call never completed, so no status is available.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
    },

    /// The server answered with a non-success status.
    #[error("{message}")]
    Response {
        /// HTTP status code.
        status: u16,
        /// Server-supplied message, or a generic fallback.
        message: String,
    },

    /// The payload did not match the schema expected for the endpoint.
    #[error("schema error: {0}")]
    Schema(String),

    /// The request was rejected locally before it was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl SyncError {
    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a response error for `status`.
    ///
    /// Falls back to `API error: <status>` when the server gave no message.
    pub fn response(status: u16, message: Option<String>) -> Self {
        let message = message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("API error: {}", status));
        Self::Response { status, message }
    }

    /// Returns the HTTP status, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::Response { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if the call never reached the server.
    pub fn is_transport(&self) -> bool {
        matches!(self, SyncError::Transport { .. })
    }

    /// Returns true if the status says our credentials are no longer valid.
    pub fn invalidates_session(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Schema(err.to_string())
    }
}
