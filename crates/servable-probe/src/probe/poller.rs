//! Readiness polling against a serving endpoint.
//!
//! [`ReadinessPoller`] repeatedly asks the server to run a model that does not
//! exist. A server that is up and routing answers with a "not found" status
//! whose message contains the readiness marker (`"Servable"` for TensorFlow
//! Serving). Anything else, including a refused connection, means "not yet".
//!
//! ## Lifecycle
//!
//! ```text
//! WAITING --marker seen--------------> READY
//! WAITING --max_attempts spent-------> EXHAUSTED
//! ```
//!
//! Attempts are strictly sequential. Each one sleeps for `poll_interval`
//! first, then issues exactly one `Predict` call.

use crate::probe::{
    config::{PollerConfig, UnexpectedSuccessPolicy},
    sleep::{SleepProvider, TokioSleep},
    transport::{GrpcProbe, PredictProbe},
};
use servable_probe_core::{
    Error, Result,
    proto::PredictResponse,
    types::{DEFAULT_HOST, sentinel_request},
};

/// Why the poller decided the server is ready.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadySignal {
    /// The error message contained the readiness marker.
    Marker,
    /// The sentinel request succeeded outright.
    UnexpectedSuccess,
}

/// Final result of [`ReadinessPoller::wait_for_ready`].
#[derive(Clone, Debug)]
pub enum Readiness {
    /// The server is up. `attempts` is the number of cycles performed,
    /// including the successful one.
    Ready { attempts: u32, signal: ReadySignal },
    /// Every attempt was spent without seeing the marker.
    Exhausted {
        attempts: u32,
        last_error: Option<Error>,
    },
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Readiness::Ready { attempts, .. } | Readiness::Exhausted { attempts, .. } => *attempts,
        }
    }
}

/// Classification of a single attempt.
#[derive(Clone, Debug)]
pub enum AttemptOutcome {
    Ready,
    UnexpectedSuccess,
    Transient(Error),
}

/// Maps the result of one `Predict` call onto an [`AttemptOutcome`].
///
/// Only a status message containing `marker` counts. Transport failures never
/// do, even if their description happens to contain it.
pub fn classify(result: Result<PredictResponse>, marker: &str) -> AttemptOutcome {
    match result {
        Ok(_) => AttemptOutcome::UnexpectedSuccess,
        Err(err) => match err.status_message() {
            Some(message) if message.contains(marker) => AttemptOutcome::Ready,
            _ => AttemptOutcome::Transient(err),
        },
    }
}

/// Bounded, sequential readiness poller.
///
/// Holds no state between calls to [`wait_for_ready`](Self::wait_for_ready),
/// so a poller may be reused.
pub struct ReadinessPoller<P, S = TokioSleep> {
    probe: P,
    sleeper: S,
    config: PollerConfig,
}

impl<P, S> ReadinessPoller<P, S>
where
    P: PredictProbe,
    S: SleepProvider,
{
    pub fn new(probe: P, sleeper: S, config: PollerConfig) -> Self {
        Self {
            probe,
            sleeper,
            config,
        }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Polls until the server reports readiness or the attempt budget runs
    /// out.
    pub async fn wait_for_ready(&self) -> Readiness {
        let mut last_error = None;

        for attempt in 0..self.config.max_attempts {
            self.sleeper.sleep_for(self.config.poll_interval).await;
            let cycles = attempt + 1;

            match self.attempt(attempt).await {
                AttemptOutcome::Ready => {
                    tracing::info!(attempts = cycles, "Server is ready");
                    return Readiness::Ready {
                        attempts: cycles,
                        signal: ReadySignal::Marker,
                    };
                }
                AttemptOutcome::UnexpectedSuccess => match self.config.on_unexpected_success {
                    UnexpectedSuccessPolicy::Ready => {
                        tracing::warn!(
                            attempts = cycles,
                            model = %self.config.model_name,
                            "Sentinel model answered; treating server as ready"
                        );
                        return Readiness::Ready {
                            attempts: cycles,
                            signal: ReadySignal::UnexpectedSuccess,
                        };
                    }
                    UnexpectedSuccessPolicy::Ignore => {
                        tracing::debug!(attempt, "Sentinel model answered; ignoring");
                        last_error = None;
                    }
                },
                AttemptOutcome::Transient(err) => {
                    tracing::debug!(attempt, error = %err, "Server not ready yet");
                    last_error = Some(err);
                }
            }
        }

        tracing::warn!(
            attempts = self.config.max_attempts,
            "Server did not become ready"
        );
        Readiness::Exhausted {
            attempts: self.config.max_attempts,
            last_error,
        }
    }

    /// Runs one request+inspect step without sleeping.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn attempt(&self, attempt: u32) -> AttemptOutcome {
        let request = sentinel_request(&self.config.model_name);
        classify(
            self.probe.predict(request).await,
            &self.config.ready_marker,
        )
    }
}

impl ReadinessPoller<GrpcProbe, TokioSleep> {
    /// Builds a poller for `host:port` using the gRPC transport and the real
    /// timer.
    pub fn grpc(host: &str, port: u16, config: PollerConfig) -> Self {
        let probe = GrpcProbe::new(host, port)
            .with_rpc_timeout(config.rpc_timeout)
            .with_connect_timeout(config.connect_timeout);
        Self::new(probe, TokioSleep, config)
    }
}

/// Waits for a server on `localhost:<port>` with the default budget of 60
/// one-second attempts.
pub async fn wait_for_server_ready(port: u16) -> Readiness {
    ReadinessPoller::grpc(DEFAULT_HOST, port, PollerConfig::default())
        .wait_for_ready()
        .await
}
