//! Telemetry logic.
//! Support logging, optionally exported with OpenTelemetry.
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::{LogExporter, WithExportConfig};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::logs::{LogError, SdkLogger, SdkLoggerProvider};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::Telemetry;

const DEFAULT_FILTER: &str = "info";

fn ressources() -> Resource {
    Resource::builder().with_service_name("user-service").build()
}

/// Create OLTP exporter for logs.
pub fn setup_logging(
    endpoint: &str,
) -> Result<
    (
        OpenTelemetryTracingBridge<SdkLoggerProvider, SdkLogger>,
        SdkLoggerProvider,
    ),
    LogError,
> {
    let exporter = LogExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;
    let provider: SdkLoggerProvider = SdkLoggerProvider::builder()
        .with_resource(ressources())
        .with_batch_exporter(exporter)
        .build();
    let bridge = OpenTelemetryTracingBridge::new(&provider);

    Ok((bridge, provider))
}

/// Install the global subscriber.
///
/// Reads `RUST_LOG`, defaults to `info`. When an OTLP endpoint is set,
/// events are also exported and the returned provider must be kept alive
/// then shut down on exit to flush pending logs.
pub fn init(
    config: Option<&Telemetry>,
) -> Result<Option<SdkLoggerProvider>, LogError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr));

    match config.and_then(|t| t.otlp_endpoint.as_deref()) {
        Some(endpoint) => {
            let (bridge, provider) = setup_logging(endpoint)?;
            registry.with(bridge).init();
            tracing::info!(%endpoint, "exporting logs with OTLP");
            Ok(Some(provider))
        },
        None => {
            registry.init();
            Ok(None)
        },
    }
}
