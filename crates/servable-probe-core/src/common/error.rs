//! Error types for a single readiness probe attempt.
//!
//! This module defines the central `Error` enum, which captures every way a
//! `Predict` call against the serving endpoint can fail. The poller inspects
//! these to decide between "ready" and "try again"; none of them are fatal on
//! their own.
//!
//! ## Error Cases
//! - `InvalidEndpoint`: The host/port pair does not form a valid URI.
//! - `Connect`: The channel could not be established (refused, unreachable,
//!   connect timeout).
//! - `Rpc`: The call reached the server and completed with a non-OK status.

use tonic::Status;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for probe attempts.
#[derive(Clone, thiserror::Error, Debug)]
pub enum Error {
    /// The endpoint URI could not be built.
    #[error("Invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// Transport-level failure before any RPC was issued.
    #[error("Failed to connect to {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    /// The server answered with a non-OK gRPC status.
    #[error("RPC failed with {}: {}", .0.code(), .0.message())]
    Rpc(#[from] Status),
}

impl Error {
    /// Returns the status message when the server produced one.
    ///
    /// Only [`Error::Rpc`] carries a message from the remote side; transport
    /// failures never contain the readiness marker.
    pub fn status_message(&self) -> Option<&str> {
        match self {
            Error::Rpc(status) => Some(status.message()),
            _ => None,
        }
    }
}
