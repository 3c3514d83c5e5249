// Apple probe: `idevice_id -l` then `ideviceinfo` per UDID

use super::{DeviceProbe, ProbeConfig, ProbeReport};
use crate::application::poller::constants::IOS_MODEL_PLACEHOLDER;
use crate::application::tools::{IDEVICEINFO, IDEVICE_ID, KEY_PRODUCT_TYPE, KEY_PRODUCT_VERSION};
use crate::domain::{Device, Platform};
use crate::port::{Invocation, ProcessInvoker};
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

/// Parse `idevice_id -l` output: one UDID per non-empty line
pub fn parse_udid_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub struct IosProbe {
    invoker: Arc<dyn ProcessInvoker>,
    config: ProbeConfig,
}

impl IosProbe {
    pub fn new(invoker: Arc<dyn ProcessInvoker>, config: ProbeConfig) -> Self {
        Self { invoker, config }
    }

    /// Read one ideviceinfo key; None on any failure or blank answer
    async fn query_key(&self, udid: &str, key: &str) -> Option<String> {
        let invocation = Invocation::new(IDEVICEINFO, &format!("-u {} -k {}", udid, key))
            .with_timeout(self.config.timeout);

        match self.invoker.invoke(&invocation).await {
            Ok(out) if out.success() && !out.stdout.is_empty() => Some(out.stdout),
            Ok(out) => {
                debug!(udid = %udid, key = %key, reason = %out.failure_summary(), "ideviceinfo gave no answer");
                None
            }
            Err(e) => {
                debug!(udid = %udid, key = %key, error = %e, "ideviceinfo failed");
                None
            }
        }
    }

    async fn describe(&self, udid: String) -> Device {
        let model = self
            .query_key(&udid, KEY_PRODUCT_TYPE)
            .await
            .unwrap_or_else(|| IOS_MODEL_PLACEHOLDER.to_string());

        let version = if self.config.query_versions {
            self.query_key(&udid, KEY_PRODUCT_VERSION).await
        } else {
            None
        };

        Device::ios(udid, model).with_os_version(version)
    }
}

#[async_trait]
impl DeviceProbe for IosProbe {
    fn platform(&self) -> Platform {
        Platform::Ios
    }

    async fn discover(&self) -> ProbeReport {
        let invocation = Invocation::new(IDEVICE_ID, "-l").with_timeout(self.config.timeout);

        let output = match self.invoker.invoke(&invocation).await {
            Ok(out) => out,
            Err(e) => {
                warn!(error = %e, "Apple probe: idevice_id unavailable");
                return ProbeReport::tool_failed(Platform::Ios, e.to_string());
            }
        };

        if !output.success() {
            let reason = output.failure_summary();
            warn!(reason = %reason, "Apple probe: idevice_id failed");
            return ProbeReport::tool_failed(Platform::Ios, reason);
        }

        // Per-UDID queries run side by side; join_all keeps listing order
        let udids = parse_udid_list(&output.stdout);
        let devices = join_all(udids.into_iter().map(|udid| self.describe(udid))).await;

        debug!(count = devices.len(), "Apple probe finished");
        ProbeReport::ok(Platform::Ios, devices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::probe::ProbeStatus;
    use crate::domain::Manufacturer;
    use crate::port::process_invoker::mocks::{MockResponse, ScriptedInvoker};

    #[test]
    fn test_parse_udids() {
        let udids = parse_udid_list("00008030-AAA\n  \n00008101-BBB  \r\n");
        assert_eq!(udids, vec!["00008030-AAA", "00008101-BBB"]);
        assert!(parse_udid_list("\n\n").is_empty());
    }

    #[tokio::test]
    async fn test_failed_product_query_uses_placeholder() {
        let invoker = Arc::new(
            ScriptedInvoker::new().on("idevice_id -l", MockResponse::stdout("00008030-AAA\n")),
        );
        let probe = IosProbe::new(invoker, ProbeConfig::default());

        let report = probe.discover().await;

        assert!(report.is_ok());
        assert_eq!(report.devices.len(), 1);
        let d = &report.devices[0];
        assert_eq!(d.id, "00008030-AAA");
        assert_eq!(d.manufacturer, Manufacturer::Apple);
        assert_eq!(d.model, "iPhone/iPad");
        assert_eq!(d.platform, Platform::Ios);
    }

    #[tokio::test]
    async fn test_one_device_per_udid_despite_failures() {
        let invoker = Arc::new(
            ScriptedInvoker::new()
                .on("idevice_id -l", MockResponse::stdout("A1\nB2\nC3\n"))
                .on("ideviceinfo -u A1 -k ProductType", MockResponse::stdout("iPhone14,2"))
                .on("ideviceinfo -u B2 -k ProductType", MockResponse::Timeout)
                .on("ideviceinfo -u C3 -k ProductType", MockResponse::stdout("   ")),
        );
        let probe = IosProbe::new(invoker, ProbeConfig::default());

        let report = probe.discover().await;
        let models: Vec<(&str, &str)> = report
            .devices
            .iter()
            .map(|d| (d.id.as_str(), d.model.as_str()))
            .collect();

        assert_eq!(
            models,
            vec![
                ("A1", "iPhone14,2"),
                ("B2", "iPhone/iPad"),
                ("C3", "iPhone/iPad")
            ]
        );
    }

    #[tokio::test]
    async fn test_listing_tool_missing_degrades_to_empty() {
        let probe = IosProbe::new(Arc::new(ScriptedInvoker::new()), ProbeConfig::default());

        let report = probe.discover().await;

        assert!(report.devices.is_empty());
        assert!(matches!(report.status, ProbeStatus::ToolFailed(_)));
    }

    #[tokio::test]
    async fn test_versions_queried_when_enabled() {
        let invoker = Arc::new(
            ScriptedInvoker::new()
                .on("idevice_id -l", MockResponse::stdout("A1"))
                .on("ideviceinfo -u A1 -k ProductType", MockResponse::stdout("iPad13,4"))
                .on("ideviceinfo -u A1 -k ProductVersion", MockResponse::stdout("17.5.1")),
        );
        let probe = IosProbe::new(
            invoker,
            ProbeConfig {
                query_versions: true,
                ..Default::default()
            },
        );

        let report = probe.discover().await;

        assert_eq!(report.devices[0].model, "iPad13,4");
        assert_eq!(report.devices[0].os_version.as_deref(), Some("17.5.1"));
    }
}
