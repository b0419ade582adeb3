//! Error types for the Planning Center Services client

use reqwest::StatusCode;

/// Result type alias for Planning Center operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when using the Planning Center client
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The API answered with a non-success status
    #[error("API returned {status} for {url}")]
    Transport { status: StatusCode, url: String },

    /// A named resource the caller requires does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// A record lacks a field every compatible API version provides
    #[error("Malformed {kind} record {id}: {field}")]
    MalformedRecord {
        kind: String,
        id: String,
        field: String,
    },

    /// Configuration error (from pcoconfig/anyhow)
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),
}

impl Error {
    /// Create a malformed-record error
    pub fn malformed(
        kind: impl Into<String>,
        id: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self::MalformedRecord {
            kind: kind.into(),
            id: id.into(),
            field: field.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Whether this error reports a non-success HTTP response
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}
