/// Error type for the client SDK

use taskhub_shared::dto::FieldError;

/// Errors surfaced by [`crate::TaskhubClient`] operations
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (connection refused, timeout, TLS, ...)
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a failure envelope
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Server-provided message
        message: String,
        /// Field-level validation errors, if any
        errors: Vec<FieldError>,
    },

    /// No session: the operation requires a logged-in client
    #[error("Not logged in")]
    NotLoggedIn,

    /// The refresh flow failed; local session state has been cleared
    /// and the caller must log in again
    #[error("Session expired")]
    SessionExpired,

    /// The server answered success but the body was not in the
    /// expected shape
    #[error("Unexpected response shape: {0}")]
    UnexpectedResponse(String),
}

impl ClientError {
    /// HTTP status of an API-level error, if this is one
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
