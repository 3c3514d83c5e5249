//! Telemetry setup for OpenTelemetry integration

use anyhow::Result;
use tracing_subscriber::{Layer, Registry};

pub type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Build the OpenTelemetry layer if enabled
///
/// Returns `None` (and a note to report once logging is up) when
/// `OTEL_EXPORTER_OTLP_ENDPOINT` is unset or the `telemetry` feature is off.
///
/// # Environment Variables
///
/// - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (e.g., http://localhost:4317)
/// - `OTEL_SERVICE_NAME`: Service name (default: phonetool-daemon)
///
/// # Example
///
/// ```text
/// OTEL_EXPORTER_OTLP_ENDPOINT=http://localhost:4317 \
/// OTEL_SERVICE_NAME=phonetool-dev \
///     ./phonetool-daemon
/// ```
pub fn telemetry_layer() -> Result<(Option<BoxedLayer>, &'static str)> {
    let Ok(endpoint) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") else {
        return Ok((
            None,
            "OpenTelemetry not configured (OTEL_EXPORTER_OTLP_ENDPOINT not set)",
        ));
    };

    #[cfg(feature = "telemetry")]
    {
        let layer = otlp_layer(&endpoint)?;
        return Ok((Some(layer), "OpenTelemetry initialized"));
    }

    #[cfg(not(feature = "telemetry"))]
    {
        let _ = endpoint;
        return Ok((
            None,
            "OpenTelemetry endpoint set but feature 'telemetry' not enabled (rebuild with --features telemetry)",
        ));
    }
}

#[cfg(feature = "telemetry")]
fn otlp_layer(endpoint: &str) -> Result<BoxedLayer> {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::{runtime, trace::TracerProvider, Resource};

    let service_name =
        std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "phonetool-daemon".to_string());

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_resource(Resource::new(vec![KeyValue::new(
            "service.name",
            service_name,
        )]))
        .build();

    let tracer = provider.tracer("phonetool-daemon");
    opentelemetry::global::set_tracer_provider(provider);

    Ok(tracing_opentelemetry::layer().with_tracer(tracer).boxed())
}
