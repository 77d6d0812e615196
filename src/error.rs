//! Error taxonomy for the commentary pipeline.
//!
//! Configuration, transport and envelope failures propagate to the caller.
//! Malformed model output is not represented here: it is absorbed by the
//! fallback path (see [`crate::commentary::parse::ParseError`]).

use std::fmt;

pub type Result<T> = std::result::Result<T, CommentaryError>;

#[derive(Debug, thiserror::Error)]
pub enum CommentaryError {
    /// Missing or invalid credential/endpoint. Raised at construction time.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid style: {0}. Must be one of CASTER, ANALYST, FRIEND")]
    InvalidStyle(String),

    #[error("transport error ({kind}): {message}")]
    Transport {
        kind: TransportKind,
        message: String,
    },

    /// Endpoint answered with a non-success HTTP status.
    #[error("endpoint error {status}: {body}")]
    Endpoint { status: u16, body: String },

    /// Endpoint answered 200 but the envelope carried an `error` field.
    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// A request document handed to the pipeline could not be decoded.
    #[error("invalid request: {0}")]
    Request(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Timeout,
    Connect,
    Request,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransportKind::Timeout => "timeout",
            TransportKind::Connect => "connect",
            TransportKind::Request => "request",
        };
        f.write_str(label)
    }
}

impl CommentaryError {
    pub(crate) fn timeout(after: std::time::Duration) -> Self {
        CommentaryError::Transport {
            kind: TransportKind::Timeout,
            message: format!("timed out after {}ms", after.as_millis()),
        }
    }

    /// True for failures of the remote call itself (transport, status, upstream).
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            CommentaryError::Transport { .. }
                | CommentaryError::Endpoint { .. }
                | CommentaryError::Upstream(_)
        )
    }
}

impl From<reqwest::Error> for CommentaryError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportKind::Timeout
        } else if err.is_connect() {
            TransportKind::Connect
        } else {
            TransportKind::Request
        };
        CommentaryError::Transport {
            kind,
            message: err.to_string(),
        }
    }
}
