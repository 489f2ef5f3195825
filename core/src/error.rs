//! Error types for the SNPclip client.
//!
//! # Design
//! `InvalidArgument` covers every pre-flight check and is always raised
//! before any network I/O. `HttpStatus` and `Service` form the remote
//! class: the first for an error status on the main call, the second for a
//! message the service placed in the response body. A failed liveness probe
//! is not an error at all; see `ClipOutcome::Unavailable`.

use thiserror::Error;

/// Failure to complete an HTTP round-trip (DNS, connect, TLS, I/O).
#[derive(Debug, Clone, Error)]
#[error("transport failed for {url}: {message}")]
pub struct TransportError {
    pub url: String,
    pub message: String,
}

/// Errors returned by `SnpClipClient`.
#[derive(Debug, Error)]
pub enum ClipError {
    /// A caller-supplied argument failed validation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The main request came back with a 4xx/5xx status.
    #[error("remote error: HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// The service reported an error or warning inside the response body.
    #[error("remote error: {0}")]
    Service(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Reading or writing tab-delimited text failed.
    #[error("table error: {0}")]
    Table(#[from] csv::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClipError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        ClipError::InvalidArgument(msg.into())
    }

    /// True for failures attributable to the remote service.
    pub fn is_remote(&self) -> bool {
        matches!(self, ClipError::HttpStatus { .. } | ClipError::Service(_))
    }
}
