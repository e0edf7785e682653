#![doc = include_str!("../README.md")]

pub mod probe;

pub use probe::{
    config::{PollerConfig, UnexpectedSuccessPolicy},
    poller::{AttemptOutcome, Readiness, ReadinessPoller, ReadySignal, wait_for_server_ready},
    sleep::{NoSleep, SleepProvider, TokioSleep},
    transport::{GrpcProbe, PredictProbe},
};
pub use servable_probe_core;
