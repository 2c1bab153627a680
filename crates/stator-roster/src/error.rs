//! Error types for discovery registration.

use std::time::Duration;

use thiserror::Error;

/// Errors from the HTTP transport.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("http error: {0}")]
    Http(#[from] hyper::Error),

    #[error("failed to build request: {0}")]
    Request(#[from] http::Error),

    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("request cancelled")]
    Cancelled,
}

/// Errors returned by a registrar.
#[derive(Debug, Error)]
pub enum RegistrarError {
    /// Transport failures are relayed as-is.
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("failed to encode registration: {0}")]
    Encode(#[source] serde_json::Error),
}
