use anyhow::bail;
use clap::{Parser, ValueEnum};
use core::time::Duration;
use crate::probe::transport::GrpcProbe;
use servable_probe_core::types::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_HOST, DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL,
    DEFAULT_RPC_TIMEOUT, READY_MARKER, SENTINEL_MODEL_NAME,
};

/// What to do when the sentinel request unexpectedly succeeds, i.e. a model
/// with the sentinel name really is loaded.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnexpectedSuccessPolicy {
    /// The server answered a `Predict` call, so it is up. Stop polling.
    #[default]
    Ready,
    /// Treat it like any other non-marker outcome and keep polling.
    Ignore,
}

/// Tunables for [`ReadinessPoller`](crate::probe::poller::ReadinessPoller).
///
/// `Default` reproduces the classic harness behaviour: 60 attempts, one second
/// apart, 600 second call deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    pub max_attempts: u32,
    pub poll_interval: Duration,
    pub rpc_timeout: Duration,
    pub connect_timeout: Duration,
    pub model_name: String,
    pub ready_marker: String,
    pub on_unexpected_success: UnexpectedSuccessPolicy,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            poll_interval: DEFAULT_POLL_INTERVAL,
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            model_name: SENTINEL_MODEL_NAME.to_string(),
            ready_marker: READY_MARKER.to_string(),
            on_unexpected_success: UnexpectedSuccessPolicy::default(),
        }
    }
}

impl PollerConfig {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_rpc_timeout(mut self, rpc_timeout: Duration) -> Self {
        self.rpc_timeout = rpc_timeout;
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn with_model_name(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }

    pub fn with_ready_marker(mut self, ready_marker: impl Into<String>) -> Self {
        self.ready_marker = ready_marker.into();
        self
    }

    pub fn with_unexpected_success(mut self, policy: UnexpectedSuccessPolicy) -> Self {
        self.on_unexpected_success = policy;
        self
    }
}

/// Command line for the `servable-probe` binary.
///
/// Only the port is required. Every other value has a default matching the
/// classic harness and can also be supplied through the environment (or a
/// `.env` file).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "servable-probe",
    version,
    about = "Waits until a TensorFlow Serving gRPC endpoint is ready"
)]
pub struct CliArgs {
    /// Port the serving endpoint listens on.
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    pub port: u16,

    /// Host the serving endpoint listens on.
    ///
    /// Environment variable: `PROBE_HOST`
    #[arg(long, env = "PROBE_HOST", default_value_t = String::from(DEFAULT_HOST))]
    pub host: String,

    /// Number of sleep+call cycles before giving up.
    ///
    /// Environment variable: `PROBE_MAX_ATTEMPTS`
    #[arg(long, env = "PROBE_MAX_ATTEMPTS", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,

    /// Delay before each attempt, in milliseconds.
    ///
    /// Environment variable: `PROBE_POLL_INTERVAL_MS`
    #[arg(long, env = "PROBE_POLL_INTERVAL_MS", default_value_t = DEFAULT_POLL_INTERVAL.as_millis() as u64)]
    pub poll_interval_ms: u64,

    /// Deadline for a single `Predict` call, in seconds.
    ///
    /// Environment variable: `PROBE_RPC_TIMEOUT_SECS`
    #[arg(long, env = "PROBE_RPC_TIMEOUT_SECS", default_value_t = DEFAULT_RPC_TIMEOUT.as_secs())]
    pub rpc_timeout_secs: u64,

    /// Deadline for establishing the channel, in seconds.
    ///
    /// Environment variable: `PROBE_CONNECT_TIMEOUT_SECS`
    #[arg(long, env = "PROBE_CONNECT_TIMEOUT_SECS", default_value_t = DEFAULT_CONNECT_TIMEOUT.as_secs())]
    pub connect_timeout_secs: u64,

    /// Model name to request. It must not exist on the server.
    ///
    /// Environment variable: `PROBE_MODEL_NAME`
    #[arg(long, env = "PROBE_MODEL_NAME", default_value_t = String::from(SENTINEL_MODEL_NAME))]
    pub model_name: String,

    /// Substring of the error message that signals readiness.
    ///
    /// Environment variable: `PROBE_READY_MARKER`
    #[arg(long, env = "PROBE_READY_MARKER", default_value_t = String::from(READY_MARKER))]
    pub ready_marker: String,

    /// How to treat a sentinel request that succeeds.
    ///
    /// Environment variable: `PROBE_ON_UNEXPECTED_SUCCESS`
    #[arg(long, env = "PROBE_ON_UNEXPECTED_SUCCESS", value_enum, default_value_t = UnexpectedSuccessPolicy::Ready)]
    pub on_unexpected_success: UnexpectedSuccessPolicy,
}

/// Validated configuration for one run of the binary.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub host: String,
    pub port: u16,
    pub poller: PollerConfig,
}

impl TryFrom<CliArgs> for ProbeConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.host.trim().is_empty() {
            bail!("PROBE_HOST must not be empty");
        }

        if let Err(err) = GrpcProbe::new(&args.host, args.port).build_endpoint() {
            bail!("PROBE_HOST `{}` cannot be probed: {}", args.host, err);
        }

        if args.max_attempts == 0 {
            bail!("PROBE_MAX_ATTEMPTS must be greater than 0");
        }

        if args.rpc_timeout_secs == 0 {
            bail!("PROBE_RPC_TIMEOUT_SECS must be greater than 0");
        }

        if args.connect_timeout_secs == 0 {
            bail!("PROBE_CONNECT_TIMEOUT_SECS must be greater than 0");
        }

        if args.model_name.is_empty() {
            bail!("PROBE_MODEL_NAME must not be empty");
        }

        if args.ready_marker.is_empty() {
            bail!("PROBE_READY_MARKER must not be empty");
        }

        let poller = PollerConfig::default()
            .with_max_attempts(args.max_attempts)
            .with_poll_interval(Duration::from_millis(args.poll_interval_ms))
            .with_rpc_timeout(Duration::from_secs(args.rpc_timeout_secs))
            .with_connect_timeout(Duration::from_secs(args.connect_timeout_secs))
            .with_model_name(args.model_name)
            .with_ready_marker(args.ready_marker)
            .with_unexpected_success(args.on_unexpected_success);

        Ok(Self {
            host: args.host,
            port: args.port,
            poller,
        })
    }
}
