//! Readiness polling for TensorFlow-Serving-compatible gRPC endpoints.
//!
//! ## Structure
//!
//! - [`config`] - CLI arguments and poller tunables.
//! - [`poller`] - The bounded retry loop (`ReadinessPoller`).
//! - [`sleep`] - Injectable delay between attempts.
//! - [`telemetry`] - Log subscriber and optional OpenTelemetry export.
//! - [`transport`] - The `Predict` call seam and its gRPC implementation.

pub mod config;
pub mod poller;
pub mod sleep;
pub mod telemetry;
pub mod transport;
