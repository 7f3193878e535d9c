//! Error types shared across `livecast`.
//!
//! None of these are fatal to a running hub: source and send failures are
//! logged and absorbed by the broker. Only `ServerError` escapes to `main`.

use thiserror::Error;

/// Failure to produce a snapshot for a topic.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request to upstream failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned status {status} for {endpoint}")]
    Status { endpoint: String, status: u16 },

    #[error("upstream returned a non-JSON body for {endpoint}")]
    NotJson { endpoint: String },

    #[error("required document {0} is unavailable")]
    Missing(String),
}

/// Failure to queue a frame on a client connection.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("connection {0} is closed")]
    Closed(String),
}

/// Startup and listener failures.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
