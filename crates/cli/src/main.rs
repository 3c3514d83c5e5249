//! PhoneTool CLI - list attached devices and run unlock/backup operations

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tabled::{Table, Tabled};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use phonetool_core::application::{DevicePoller, DeviceRegistry, OperationExecutor, ProbeConfig};
use phonetool_core::domain::{Device, DeviceSet, DomainError, Operation, OperationResult, Platform};
use phonetool_core::port::id_provider::UuidProvider;
use phonetool_core::port::time_provider::SystemTimeProvider;
use phonetool_core::port::TimeProvider;
use phonetool_core::Settings;
use phonetool_infra_system::{
    load_settings, SubprocessInvoker, ToolChecker, ToolFamily, ToolReport, ToolResolver,
};

#[derive(Parser)]
#[command(name = "phonetool")]
#[command(about = "Android and iOS device toolbox", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (defaults to the per-user phonetool.toml)
    #[arg(long, env = "PHONETOOL_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List attached devices (one discovery cycle)
    Devices {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Keep polling and print the device list whenever it changes
    Watch,

    /// Check which external tools are installed
    Doctor,

    /// Remove the Android screen lock (USB debugging must be enabled)
    Unlock {
        /// Device serial
        device_id: String,
    },

    /// Wipe user data through fastboot (device must be in fastboot mode)
    FactoryReset {
        /// Device serial
        device_id: String,
    },

    /// Show manual FRP bypass instructions
    Frp {
        /// Device serial
        device_id: String,
    },

    /// Back up WhatsApp data
    Backup {
        /// Device serial or UDID
        device_id: String,

        /// Destination folder (defaults to the configured backup dir)
        #[arg(long)]
        dest: Option<PathBuf>,
    },

    /// Restore WhatsApp data from a backup file (Android) or folder (iOS)
    Restore {
        /// Device serial or UDID
        device_id: String,

        /// Backup file or folder
        path: PathBuf,
    },
}

#[derive(Tabled)]
struct DeviceRow {
    id: String,
    platform: String,
    manufacturer: String,
    model: String,
    #[tabled(rename = "os")]
    os_version: String,
}

impl From<&Device> for DeviceRow {
    fn from(device: &Device) -> Self {
        Self {
            id: device.id.clone(),
            platform: device.platform.to_string(),
            manufacturer: device.manufacturer.to_string(),
            model: device.model.clone(),
            os_version: device.os_version.clone().unwrap_or_else(|| "-".to_string()),
        }
    }
}

#[derive(Tabled)]
struct ToolRow {
    family: String,
    tool: String,
    status: String,
    path: String,
}

/// Wiring shared by every command
struct App {
    settings: Settings,
    tools: ToolReport,
    poller: Arc<DevicePoller>,
    executor: OperationExecutor,
}

impl App {
    fn new(settings: Settings) -> Self {
        let resolver = ToolResolver::new(settings.tools_dir.clone());
        let tools = ToolChecker::new(resolver.clone()).check();

        let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
        let invoker = Arc::new(SubprocessInvoker::new(
            time_provider.clone(),
            resolver,
            settings.operation_timeout(),
        ));
        let registry = Arc::new(DeviceRegistry::new(time_provider.clone()));

        let poller = Arc::new(DevicePoller::with_default_probes(
            invoker.clone(),
            registry,
            ProbeConfig {
                timeout: settings.probe_timeout(),
                query_versions: settings.query_versions,
            },
            settings.poll_interval(),
        ));
        let executor = OperationExecutor::new(
            invoker,
            time_provider,
            Arc::new(UuidProvider),
            settings.operation_timeout(),
        );

        Self {
            settings,
            tools,
            poller,
            executor,
        }
    }

    /// Find a device in a fresh discovery cycle
    ///
    /// A device in fastboot mode is invisible to adb, so `fastboot_ok`
    /// accepts an unlisted serial as an Android device.
    async fn device(&self, device_id: &str, fastboot_ok: bool) -> Result<Device> {
        let set = self.poller.poll_once().await;
        match set.find(device_id) {
            Some(device) => Ok(device.clone()),
            None if fastboot_ok => Ok(Device::android(device_id, "")),
            None => Err(DomainError::DeviceNotFound(device_id.to_string()).into()),
        }
    }

    fn require(&self, family: ToolFamily) -> Result<()> {
        self.tools.ensure(family)?;
        Ok(())
    }

    async fn run(&self, device: &Device, operation: Operation) -> ExitCode {
        let result = self.executor.execute(device, operation).await;
        print_result(&result);
        exit_code(&result)
    }
}

/// Failed operations map to a non-zero exit code
fn exit_code(result: &OperationResult) -> ExitCode {
    if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_devices(set: &DeviceSet) {
    if set.is_empty() {
        println!("{}", "No devices attached".yellow());
        return;
    }
    let rows: Vec<DeviceRow> = set.iter().map(DeviceRow::from).collect();
    println!("{}", Table::new(rows));
}

fn print_result(result: &OperationResult) {
    if result.success {
        println!("{}", format!("✓ {}", result.message).green().bold());
    } else {
        println!("{}", format!("✗ {}", result.message).red().bold());
    }

    if let Some(path) = &result.output_path {
        println!("  {} {}", "Output:".bold(), path.display());
    }
    if let Some(instructions) = &result.manual_instructions {
        println!();
        println!("{}", instructions);
    }
    if !result.diagnostics.is_empty() {
        println!();
        println!("{}", "Details:".yellow().bold());
        for line in &result.diagnostics {
            println!("  {} {}", "•".yellow(), line);
        }
    }
}

fn print_tools(report: &ToolReport) {
    let rows: Vec<ToolRow> = report
        .families
        .iter()
        .flat_map(|family| {
            family.tools.iter().map(move |tool| ToolRow {
                family: family.family.to_string(),
                tool: tool.name.to_string(),
                status: if tool.is_found() {
                    "found".green().to_string()
                } else {
                    "missing".red().to_string()
                },
                path: tool
                    .path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "-".to_string()),
            })
        })
        .collect();
    println!("{}", Table::new(rows));

    for family in report.families.iter().filter(|f| !f.is_complete()) {
        println!();
        println!("{} {}", format!("{}:", family.family).yellow().bold(), family.family.guidance());
    }
}

async fn watch(app: &App) -> Result<()> {
    let registry = Arc::clone(app.poller.registry());
    let mut subscription = registry.subscribe();
    let handle = app.poller.start()?;

    println!("{}", "Watching for devices (Ctrl+C to stop)...".cyan().bold());

    let mut previous: Option<Arc<DeviceSet>> = None;
    loop {
        tokio::select! {
            next = subscription.recv() => {
                let Some(set) = next else { break };
                let changed = previous
                    .as_ref()
                    .map_or(true, |prev| prev.devices() != set.devices());
                if changed {
                    println!();
                    print_devices(&set);
                }
                previous = Some(set);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    handle
        .stop_within(phonetool_core::application::poller::constants::POLLER_STOP_TIMEOUT)
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Diagnostics go to stderr so stdout stays parseable
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new("phonetool=warn"))
                .context("Failed to create env filter")?,
        )
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let settings = load_settings(cli.config.as_deref()).context("Failed to load settings")?;
    let app = App::new(settings);

    let code = match cli.command {
        Commands::Devices { json } => {
            let set = app.poller.poll_once().await;
            if json {
                println!("{}", serde_json::to_string_pretty(set.devices())?);
            } else {
                print_devices(&set);
            }
            ExitCode::SUCCESS
        }

        Commands::Watch => {
            watch(&app).await?;
            ExitCode::SUCCESS
        }

        Commands::Doctor => {
            println!("{}", "External tools".cyan().bold());
            println!();
            print_tools(&app.tools);
            ExitCode::SUCCESS
        }

        Commands::Unlock { device_id } => {
            app.require(ToolFamily::AndroidBridge)?;
            let device = app.device(&device_id, false).await?;
            app.run(&device, Operation::RemoveScreenLock).await
        }

        Commands::FactoryReset { device_id } => {
            app.require(ToolFamily::Flashing)?;
            let device = app.device(&device_id, true).await?;
            app.run(&device, Operation::FactoryReset).await
        }

        Commands::Frp { device_id } => {
            let device = app.device(&device_id, false).await?;
            app.run(&device, Operation::FrpBypass).await
        }

        Commands::Backup { device_id, dest } => {
            let device = app.device(&device_id, false).await?;
            app.require(family_for(device.platform))?;
            let dest_dir = dest.unwrap_or_else(|| app.settings.backup_dir.clone());
            app.run(&device, Operation::BackupWhatsApp { dest_dir }).await
        }

        Commands::Restore { device_id, path } => {
            let device = app.device(&device_id, false).await?;
            app.require(family_for(device.platform))?;
            app.run(&device, Operation::RestoreWhatsApp { source: path })
                .await
        }
    };

    Ok(code)
}

fn family_for(platform: Platform) -> ToolFamily {
    match platform {
        Platform::Android => ToolFamily::AndroidBridge,
        Platform::Ios => ToolFamily::AppleDevice,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_follows_result() {
        assert_eq!(exit_code(&OperationResult::succeeded("done")), ExitCode::SUCCESS);
        assert_eq!(
            exit_code(&OperationResult::failed("Manual FRP bypass required.")),
            ExitCode::FAILURE
        );
    }
}
