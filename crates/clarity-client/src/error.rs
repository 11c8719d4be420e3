use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LimsError {
    #[error("not found: {uri}")]
    NotFound { uri: String },

    #[error("transient failure for {uri}")]
    Transient {
        uri: String,
        /// HTTP status when the failure was a response (408/429/5xx);
        /// `None` for connect errors and client-side timeouts.
        status: Option<u16>,
        /// Server-requested wait, parsed from `Retry-After`.
        retry_after: Option<Duration>,
    },

    #[error("request for {uri} failed with status {status}")]
    Fatal { uri: String, status: u16 },

    #[error("failed to parse entity from {uri}: {source}")]
    Parse {
        uri: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected entity kind at {uri}: expected {expected}, got {got}")]
    UnexpectedKind {
        uri: String,
        expected: &'static str,
        got: &'static str,
    },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl LimsError {
    /// Whether a retry could plausibly succeed (timeouts, 5xx, 429).
    pub fn is_transient(&self) -> bool {
        matches!(self, LimsError::Transient { .. })
    }

    /// The uri the error is tagged with, when there is one.
    pub fn uri(&self) -> Option<&str> {
        match self {
            LimsError::NotFound { uri }
            | LimsError::Transient { uri, .. }
            | LimsError::Fatal { uri, .. }
            | LimsError::Parse { uri, .. }
            | LimsError::UnexpectedKind { uri, .. } => Some(uri),
            LimsError::Http(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, LimsError>;
