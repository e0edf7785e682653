#![doc = include_str!("../README.md")]

use clap::Parser;
use servable_probe::probe::{
    config::{CliArgs, ProbeConfig},
    poller::{Readiness, ReadinessPoller, ReadySignal},
    telemetry::init_telemetry,
};
use std::process::ExitCode;
use tokio::signal;

const EXIT_EXHAUSTED: u8 = 1;
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load from .env
    let _ = dotenvy::dotenv();
    // Exits with a usage error before any network activity on bad arguments.
    let args = CliArgs::parse();
    let config = ProbeConfig::try_from(args)?;

    let providers = init_telemetry()?;
    log_startup_info(&config);

    let poller = ReadinessPoller::grpc(&config.host, config.port, config.poller.clone());

    let code = tokio::select! {
        readiness = poller.wait_for_ready() => report(&config, readiness),
        () = shutdown_signal() => {
            tracing::warn!("Interrupted before the server became ready");
            ExitCode::from(EXIT_INTERRUPTED)
        }
    };

    providers.shutdown();
    Ok(code)
}

fn report(config: &ProbeConfig, readiness: Readiness) -> ExitCode {
    match readiness {
        Readiness::Ready { signal, .. } => {
            if signal == ReadySignal::UnexpectedSuccess {
                println!(
                    "Server is ready (model `{}` unexpectedly exists)",
                    config.poller.model_name
                );
            } else {
                println!("Server is ready");
            }
            ExitCode::SUCCESS
        }
        Readiness::Exhausted {
            attempts,
            last_error,
        } => {
            match last_error {
                Some(err) => tracing::error!(
                    "{}:{} not ready after {} attempts, last error: {}",
                    config.host,
                    config.port,
                    attempts,
                    err
                ),
                None => tracing::error!(
                    "{}:{} not ready after {} attempts",
                    config.host,
                    config.port,
                    attempts
                ),
            }
            ExitCode::from(EXIT_EXHAUSTED)
        }
    }
}

fn log_startup_info(config: &ProbeConfig) {
    if cfg!(debug_assertions) {
        tracing::debug!("Probing {}:{} with full config: {:#?}", config.host, config.port, config);
    }
    tracing::info!(
        "Waiting for {}:{} ({} attempts, {:?} apart)",
        config.host,
        config.port,
        config.poller.max_attempts,
        config.poller.poll_interval
    );
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            // Without a handler we can only rely on Ctrl+C.
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }
}
