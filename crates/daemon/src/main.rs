//! PhoneTool daemon - Main Entry Point
//! Polls attached Android and Apple devices and logs every change

mod changes;
mod telemetry;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use phonetool_core::application::poller::constants::POLLER_STOP_TIMEOUT;
use phonetool_core::application::{DevicePoller, DeviceRegistry, ProbeConfig};
use phonetool_core::port::time_provider::SystemTimeProvider;
use phonetool_core::port::TimeProvider;
use phonetool_core::{LogFormat, Settings};
use phonetool_infra_system::{load_settings, SubprocessInvoker, ToolChecker, ToolResolver};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_LOG_FILTER: &str = "phonetool=info";
const LOG_FILE_PREFIX: &str = "phonetool-daemon.log";

/// Console layer plus optional rolling file and OpenTelemetry layers
///
/// The returned guard flushes the file writer and must live until exit.
fn init_logging(settings: &Settings) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))
        .context("Failed to create env filter")?;

    let mut layers: Vec<telemetry::BoxedLayer> = Vec::new();

    layers.push(match settings.log_format {
        // Production: JSON structured logging
        LogFormat::Json => fmt::layer().json().boxed(),
        // Development: Pretty formatting with colors
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
    });

    let guard = match &settings.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log dir {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            layers.push(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .boxed(),
            );
            Some(guard)
        }
        None => None,
    };

    let (otel, otel_note) = telemetry::telemetry_layer()?;
    if let Some(layer) = otel {
        layers.push(layer);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .init();

    tracing::debug!("{}", otel_note);
    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration (defaults -> phonetool.toml -> PHONETOOL_* env)
    let settings = load_settings(None).context("Failed to load settings")?;

    // 2. Initialize logging
    let _log_guard = init_logging(&settings)?;

    info!("PhoneTool daemon v{} starting...", VERSION);
    info!(
        tools_dir = ?settings.tools_dir,
        poll_interval_ms = settings.poll_interval_ms,
        probe_timeout_ms = settings.probe_timeout_ms,
        query_versions = settings.query_versions,
        "Settings loaded"
    );

    // 3. Check external tools (missing tools only degrade discovery)
    let resolver = ToolResolver::new(settings.tools_dir.clone());
    let tools = ToolChecker::new(resolver.clone()).check();
    tools.log_missing();

    // 4. Setup dependencies (DI wiring)
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let invoker = Arc::new(SubprocessInvoker::new(
        time_provider.clone(),
        resolver,
        settings.probe_timeout(),
    ));
    let registry = Arc::new(DeviceRegistry::new(time_provider));

    let poller = Arc::new(DevicePoller::with_default_probes(
        invoker,
        registry.clone(),
        ProbeConfig {
            timeout: settings.probe_timeout(),
            query_versions: settings.query_versions,
        },
        settings.poll_interval(),
    ));

    // 5. Subscribe before the first cycle so no set is missed
    let reporter = tokio::spawn(changes::report_changes(registry.subscribe()));

    // 6. Start discovery
    let handle = poller.start().context("Failed to start device poller")?;

    info!("System ready. Press Ctrl+C to shutdown");

    // 7. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");

    // 8. Graceful shutdown
    if let Err(e) = handle.stop_within(POLLER_STOP_TIMEOUT).await {
        warn!(error = %e, "Poller shutdown incomplete");
    }
    reporter.abort();

    info!("Shutdown complete.");

    Ok(())
}
