//! # Probe Defaults and Request Construction
//!
//! The constants here are the defaults for every tunable the poller exposes.
//! They match the behaviour expected by TensorFlow Serving test harnesses: one
//! attempt per second for a minute, with a generous per-call deadline.
//!
//! ## Constants
//!
//! - [`SENTINEL_MODEL_NAME`] - Model name that must not exist on the server
//! - [`READY_MARKER`] - Substring of the "not found" status message
//! - [`DEFAULT_MAX_ATTEMPTS`] / [`DEFAULT_POLL_INTERVAL`] - Retry budget
//! - [`DEFAULT_RPC_TIMEOUT`] / [`DEFAULT_CONNECT_TIMEOUT`] - Per-call limits

use crate::proto::{ModelSpec, PredictRequest};
use core::time::Duration;

/// Model name requested on every attempt. A live server rejects it with a
/// "Servable not found" style status.
pub const SENTINEL_MODEL_NAME: &str = "intentionally_missing_model";

/// Substring that identifies a server which is up and routing requests.
pub const READY_MARKER: &str = "Servable";

/// Number of sleep+call cycles before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;

/// Delay before each attempt.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Deadline for a single `Predict` call.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(600);

/// Deadline for establishing the channel.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Host probed when none is given.
pub const DEFAULT_HOST: &str = "localhost";

/// Builds a `PredictRequest` targeting `model_name` with no inputs, version or
/// signature.
pub fn sentinel_request(model_name: &str) -> PredictRequest {
    PredictRequest {
        model_spec: Some(ModelSpec {
            name: model_name.to_string(),
            ..Default::default()
        }),
        ..Default::default()
    }
}
