//! # Telemetry Features
//!
//! Log output always goes to stderr through `tracing_subscriber::fmt`, leaving
//! stdout for the readiness message. Spans can additionally be exported with
//! OpenTelemetry.
//!
//! ## Feature matrix
//!
//! - `otel`: Enables the OpenTelemetry tracer provider and tracing layer.
//! - `stdout`: Enables the stdout span exporter.
//! - `otlp`: Enables the OTLP/gRPC span exporter.
//!
//! ## Feature constraints
//!
//! - Exporters require `otel`.
//! - `stdout` and `otlp` can be enabled at the same time.
//!
//! ## OTLP configuration
//!
//! - `OTLP_ENDPOINT`: collector URL (required)
//! - `OTLP_COMPRESSION`: `gzip` or `zstd` (required)
//! - `OTLP_HEADERS`: optional `key=value,key=value` list sent as metadata
//!
//! ## Example usage
//!
//! ```bash
//! cargo run --features otel,stdout -- 8500
//! RUST_LOG=debug cargo run -- 8500
//! ```

#[cfg(all(feature = "stdout", not(feature = "otel")))]
compile_error!("The 'stdout' feature requires 'otel' to be enabled.");

#[cfg(all(feature = "otlp", not(feature = "otel")))]
compile_error!("The 'otlp' feature requires 'otel' to be enabled.");

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "otlp")]
use opentelemetry_otlp::{Compression, Protocol, WithExportConfig, WithTonicConfig};
#[cfg(feature = "otlp")]
use tonic::metadata::MetadataMap;
#[cfg(feature = "otlp")]
use tonic::transport::ClientTlsConfig;

#[cfg(feature = "otel")]
use opentelemetry::{InstrumentationScope, KeyValue, trace::TracerProvider};
#[cfg(feature = "otel")]
use opentelemetry_sdk::{Resource, propagation::TraceContextPropagator, trace as sdktrace};
#[cfg(feature = "otel")]
use opentelemetry_semantic_conventions as semvcns;

/// Handles that must outlive the run so pending spans can be flushed.
pub struct TelemetryProviders {
    #[cfg(feature = "otel")]
    pub tracer_provider: sdktrace::SdkTracerProvider,
}

impl TelemetryProviders {
    /// Flushes and shuts down exporters. Errors are reported on stderr only;
    /// telemetry must never change the probe's exit status.
    pub fn shutdown(self) {
        #[cfg(feature = "otel")]
        {
            if let Err(err) = self.tracer_provider.force_flush() {
                eprintln!("Error flushing traces: {:#?}", err);
            }
            if let Err(err) = self.tracer_provider.shutdown() {
                eprintln!("Error shutting down tracer: {:#?}", err);
            }
        }
    }
}

pub fn init_telemetry() -> anyhow::Result<TelemetryProviders> {
    #[cfg(feature = "otel")]
    opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());

    #[cfg(feature = "otel")]
    let tracer_provider = init_tracer()?;

    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_line_number(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_file(true)
                .compact(),
        );

    #[cfg(feature = "otel")]
    let registry = {
        let scope = InstrumentationScope::builder("servable-probe")
            .with_version(env!("CARGO_PKG_VERSION"))
            .with_schema_url(semvcns::SCHEMA_URL)
            .build();
        opentelemetry::global::set_tracer_provider(tracer_provider.clone());
        registry.with(
            tracing_opentelemetry::layer()
                .with_tracer(tracer_provider.tracer_with_scope(scope))
                .with_error_records_to_exceptions(true),
        )
    };

    registry.try_init()?;

    Ok(TelemetryProviders {
        #[cfg(feature = "otel")]
        tracer_provider,
    })
}

#[cfg(feature = "otlp")]
fn get_metadata(raw: Option<&str>) -> anyhow::Result<MetadataMap> {
    use anyhow::Context;
    use tonic::metadata::{AsciiMetadataKey, AsciiMetadataValue};

    let mut map = MetadataMap::new();
    let Some(raw) = raw else {
        return Ok(map);
    };
    for pair in raw.split(',').filter(|p| !p.trim().is_empty()) {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("invalid `OTLP_HEADERS` entry `{}`", pair))?;
        let key = AsciiMetadataKey::from_bytes(key.trim().as_bytes())
            .with_context(|| format!("invalid header name `{}`", key))?;
        let value: AsciiMetadataValue = value
            .trim()
            .parse()
            .with_context(|| format!("invalid header value for `{}`", key))?;
        map.insert(key, value);
    }
    Ok(map)
}

#[cfg(feature = "otel")]
fn resource() -> Resource {
    Resource::builder()
        .with_service_name("servable-probe")
        .with_schema_url(
            [KeyValue::new(
                semvcns::resource::SERVICE_VERSION,
                env!("CARGO_PKG_VERSION"),
            )],
            semvcns::SCHEMA_URL,
        )
        .build()
}

#[cfg(feature = "otel")]
fn init_tracer() -> anyhow::Result<sdktrace::SdkTracerProvider> {
    let builder = sdktrace::SdkTracerProvider::builder().with_resource(resource());

    #[cfg(feature = "stdout")]
    let builder = {
        use opentelemetry_stdout::SpanExporter;
        // The probe is short-lived; export spans as they end.
        builder.with_simple_exporter(SpanExporter::default())
    };

    #[cfg(feature = "otlp")]
    let builder = {
        use anyhow::Context;

        let metadata = get_metadata(std::env::var("OTLP_HEADERS").ok().as_deref())?;
        let endpoint = std::env::var("OTLP_ENDPOINT").context("missing `OTLP_ENDPOINT`")?;
        let compression = {
            use std::str::FromStr;
            let raw = std::env::var("OTLP_COMPRESSION")
                .context("missing `OTLP_COMPRESSION`")?
                .to_ascii_lowercase();
            Compression::from_str(&raw)?
        };
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_tls_config(ClientTlsConfig::new().with_native_roots())
            .with_metadata(metadata)
            .with_timeout(std::time::Duration::from_secs(10))
            .with_compression(compression)
            .with_endpoint(endpoint)
            .with_protocol(Protocol::Grpc)
            .build()
            .context("failed to build tracer exporter")?;

        let batch = sdktrace::BatchSpanProcessor::builder(exporter)
            .with_batch_config(
                sdktrace::BatchConfigBuilder::default()
                    .with_scheduled_delay(std::time::Duration::from_secs(1))
                    .with_max_queue_size(2048)
                    .build(),
            )
            .build();

        builder.with_span_processor(batch)
    };

    Ok(builder.build())
}
