//! Shared protocol bindings, constants and errors for `servable-probe`.
//!
//! ## Submodules
//!
//! - [`error`] - Error type returned by a single probe attempt.
//! - [`types`] - Default constants and the sentinel request builder.
//! - [`proto`] - Generated `tensorflow.serving` messages and gRPC stubs.

pub mod error;
pub mod types;

pub use error::{Error, Result};

pub mod proto {
    tonic::include_proto!("tensorflow.serving");
}
