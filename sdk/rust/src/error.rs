//! Client error taxonomy.
//!
//! Non-OK envelopes are values ([`ClientResponse`](crate::ClientResponse)),
//! not errors. Errors are reserved for calls that produced no envelope:
//! transport failures, protocol violations and misuse of the route tree.

use std::time::Duration;

use switchyard::envelope::EnvelopeError;
use switchyard::path::PathError;
use switchyard::routing::Method;
use switchyard::wire::WireError;
use switchyard::StatusKey;
use thiserror::Error;

/// The server answered, but not in the envelope protocol.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("status code {0} is not in the status table")]
    UnknownStatus(u16),

    #[error("undecodable body: {0}")]
    Body(#[from] WireError),

    #[error("malformed envelope: {0}")]
    Envelope(#[from] EnvelopeError),
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("no route {method} {path} in the route manifest")]
    UnknownRoute { method: Method, path: String },

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("invalid header `{0}`")]
    InvalidHeader(String),

    #[error("this call has already been retried")]
    RetryExhausted,

    #[error("expected a success envelope, got {0}")]
    NotSuccess(StatusKey),

    #[error("response data does not fit the requested type: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    /// Transport and timeout failures, the ones a retry might fix.
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_) | ClientError::Timeout(_))
    }

    pub(crate) fn from_reqwest(error: reqwest::Error, timeout: Option<Duration>) -> Self {
        match timeout {
            Some(limit) if error.is_timeout() => ClientError::Timeout(limit),
            _ => ClientError::Transport(error),
        }
    }
}
