//! Typed errors for backend requests.
//!
//! Every request flow stores a [`ClientError`] in its view's failure state,
//! so the enum covers everything that can go wrong between pressing a
//! trigger and holding a decoded record: local input, transport, HTTP
//! status, and body decoding.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection, TLS, or timeout failures reported by reqwest.
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success status. Displays as the bare
    /// numeric code so a failed ingest reads `Ingest failed: 400`.
    #[error("{status}")]
    Status {
        status: u16,
        /// FastAPI's `{"detail": ...}` message, or the raw body text.
        detail: Option<String>,
    },

    /// A success response whose body did not match the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// Reading a local file selected for upload.
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A request URL that could not be built from the configured base.
    #[error("invalid request url: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// Extra detail worth showing under the failure line.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ClientError::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// HTTP status, for failures that carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
