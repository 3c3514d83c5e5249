// Android probe: `adb devices -l`

use super::{DeviceProbe, ProbeConfig, ProbeReport};
use crate::application::tools::{adb_args, ADB, PROP_ANDROID_RELEASE};
use crate::domain::{Device, Platform};
use crate::port::{Invocation, ProcessInvoker};
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

const HEADER_PREFIX: &str = "List";
const STATUS_DEVICE: &str = "device";
const MODEL_PREFIX: &str = "model:";

/// Parse `adb devices -l` output
///
/// A line is a device entry when one of its fields (after the serial) is the
/// `device` status token and it is not the `List of devices attached`
/// header. Unauthorized and offline entries are skipped, as is anything
/// else that does not match.
pub fn parse_device_list(output: &str) -> Vec<Device> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(HEADER_PREFIX))
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let (id, rest) = fields.split_first()?;
            if !rest.iter().any(|f| *f == STATUS_DEVICE) {
                return None;
            }
            let model = rest
                .iter()
                .find_map(|f| f.strip_prefix(MODEL_PREFIX))
                .unwrap_or_default();
            Some(Device::android(*id, model))
        })
        .collect()
}

pub struct AndroidProbe {
    invoker: Arc<dyn ProcessInvoker>,
    config: ProbeConfig,
}

impl AndroidProbe {
    pub fn new(invoker: Arc<dyn ProcessInvoker>, config: ProbeConfig) -> Self {
        Self { invoker, config }
    }

    async fn query_version(&self, device_id: &str) -> Option<String> {
        let invocation = Invocation::new(
            ADB,
            &adb_args(device_id, &format!("shell getprop {}", PROP_ANDROID_RELEASE)),
        )
        .with_timeout(self.config.timeout);

        match self.invoker.invoke(&invocation).await {
            Ok(out) if out.success() && !out.stdout.is_empty() => Some(out.stdout),
            Ok(out) => {
                debug!(device_id = %device_id, reason = %out.failure_summary(), "Android version query gave no answer");
                None
            }
            Err(e) => {
                debug!(device_id = %device_id, error = %e, "Android version query failed");
                None
            }
        }
    }
}

#[async_trait]
impl DeviceProbe for AndroidProbe {
    fn platform(&self) -> Platform {
        Platform::Android
    }

    async fn discover(&self) -> ProbeReport {
        let invocation = Invocation::new(ADB, "devices -l").with_timeout(self.config.timeout);

        let output = match self.invoker.invoke(&invocation).await {
            Ok(out) => out,
            Err(e) => {
                warn!(error = %e, "Android probe: adb unavailable");
                return ProbeReport::tool_failed(Platform::Android, e.to_string());
            }
        };

        if !output.success() {
            let reason = output.failure_summary();
            warn!(reason = %reason, "Android probe: adb devices failed");
            return ProbeReport::tool_failed(Platform::Android, reason);
        }

        let mut devices = parse_device_list(&output.stdout);

        if self.config.query_versions && !devices.is_empty() {
            let versions = join_all(devices.iter().map(|d| self.query_version(&d.id))).await;
            devices = devices
                .into_iter()
                .zip(versions)
                .map(|(device, version)| device.with_os_version(version))
                .collect();
        }

        debug!(count = devices.len(), "Android probe finished");
        ProbeReport::ok(Platform::Android, devices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::probe::ProbeStatus;
    use crate::domain::Manufacturer;
    use crate::port::process_invoker::mocks::{MockResponse, ScriptedInvoker};

    const LISTING: &str = "List of devices attached\n\
        ABC123         device usb:1-1 product:oriole model:Pixel_6 device:oriole transport_id:1\n\
        emulator-5554  device product:sdk_gphone64 model:sdk_gphone64_x86_64 device:emu64x transport_id:2\n\
        XYZ789         unauthorized usb:1-2 transport_id:3\n\
        OFF001         offline transport_id:4\n";

    #[test]
    fn test_parse_single_device() {
        let devices = parse_device_list("List of devices attached\nABC123 device model:Pixel_6\n");

        assert_eq!(devices.len(), 1);
        let d = &devices[0];
        assert_eq!(d.id, "ABC123");
        assert_eq!(d.manufacturer, Manufacturer::Android);
        assert_eq!(d.model, "Pixel_6");
        assert_eq!(d.platform, Platform::Android);
        assert!(d.os_version.is_none());
    }

    #[test]
    fn test_parse_only_ready_devices() {
        let devices = parse_device_list(LISTING);
        let ids: Vec<&str> = devices.iter().map(|d| d.id.as_str()).collect();

        assert_eq!(ids, vec!["ABC123", "emulator-5554"]);
        assert_eq!(devices[1].model, "sdk_gphone64_x86_64");
    }

    #[test]
    fn test_missing_model_is_empty() {
        let devices = parse_device_list("List of devices attached\r\nR58M123 device\r\n");
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].model, "");
    }

    #[test]
    fn test_first_model_field_wins() {
        let devices = parse_device_list("ABC device model:First model:Second");
        assert_eq!(devices[0].model, "First");
    }

    #[test]
    fn test_header_and_noise_are_skipped() {
        let output = "* daemon not running; starting now at tcp:5037\n\
            * daemon started successfully\n\
            List of devices attached\n\n";
        assert!(parse_device_list(output).is_empty());
        assert!(parse_device_list("").is_empty());
    }

    #[tokio::test]
    async fn test_discover_reports_tool_failure() {
        let invoker = Arc::new(ScriptedInvoker::new());
        let probe = AndroidProbe::new(invoker, ProbeConfig::default());

        let report = probe.discover().await;

        assert!(report.devices.is_empty());
        assert!(matches!(report.status, ProbeStatus::ToolFailed(_)));
    }

    #[tokio::test]
    async fn test_discover_non_zero_exit_is_tool_failure() {
        let invoker = Arc::new(
            ScriptedInvoker::new().on("adb devices -l", MockResponse::failure(1, "adb: server error")),
        );
        let probe = AndroidProbe::new(invoker, ProbeConfig::default());

        let report = probe.discover().await;

        assert_eq!(
            report.status,
            ProbeStatus::ToolFailed("exit 1: adb: server error".to_string())
        );
    }

    #[tokio::test]
    async fn test_discover_empty_listing_is_ok() {
        let invoker = Arc::new(
            ScriptedInvoker::new().on("adb devices -l", MockResponse::stdout("List of devices attached\n")),
        );
        let probe = AndroidProbe::new(invoker, ProbeConfig::default());

        let report = probe.discover().await;

        assert!(report.is_ok());
        assert!(report.devices.is_empty());
    }

    #[tokio::test]
    async fn test_discover_with_versions() {
        let invoker = Arc::new(
            ScriptedInvoker::new()
                .on("adb devices -l", MockResponse::stdout(LISTING))
                .on(
                    "adb -s ABC123 shell getprop ro.build.version.release",
                    MockResponse::stdout("14\n"),
                ),
        );
        let probe = AndroidProbe::new(
            invoker.clone(),
            ProbeConfig {
                query_versions: true,
                ..Default::default()
            },
        );

        let report = probe.discover().await;

        assert_eq!(report.devices.len(), 2);
        assert_eq!(report.devices[0].os_version.as_deref(), Some("14"));
        // Unscripted query fails to launch, version stays unset
        assert_eq!(report.devices[1].os_version, None);
        assert_eq!(invoker.call_count(), 3);
    }
}
