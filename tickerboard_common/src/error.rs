//! Error types shared between the server and the publisher.
//!
//! The `FeedError` enum unifies the failure cases of the ingestion pipeline (socket I/O,
//! JSON encoding, broker and pub/sub failures), allowing crates to propagate a single
//! error type.
use std::fmt::Display;
use std::io;

use thiserror::Error;

/// Unified error type shared by server and publisher.
#[derive(Error, Debug)]
pub enum FeedError {
    /// I/O error originating from the standard library or sockets.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Generic formatting/validation error with a human-readable message.
    #[error("Format error: {0}")]
    Format(String),

    /// Failure while encoding/decoding JSON via serde_json.
    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// A message transport (broker connection, pub/sub socket) failed.
    #[error("{transport} transport failure: {reason}")]
    Transport {
        /// Short transport name, e.g. `amqp`.
        transport: &'static str,
        /// Underlying cause rendered as text.
        reason: String,
    },
}

impl FeedError {
    /// Wrap a transport library error, tagging it with the transport name.
    pub fn transport(transport: &'static str, err: impl Display) -> Self {
        FeedError::Transport {
            transport,
            reason: err.to_string(),
        }
    }
}
