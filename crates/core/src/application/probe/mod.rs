// Probes - turn enumeration tool output into Device records
//
// A probe never fails: a broken or missing tool degrades to an empty
// report, but the report still says why so callers can tell the two apart.

pub mod android;
pub mod ios;

pub use android::AndroidProbe;
pub use ios::IosProbe;

use crate::domain::{Device, Platform};
use async_trait::async_trait;
use std::time::Duration;

/// Why a probe produced what it produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    /// Tool ran; zero devices is still Ok
    Ok,
    /// Tool could not be launched, timed out or exited non-zero
    ToolFailed(String),
}

/// Result of one probe run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub platform: Platform,
    pub devices: Vec<Device>,
    pub status: ProbeStatus,
}

impl ProbeReport {
    pub fn ok(platform: Platform, devices: Vec<Device>) -> Self {
        Self {
            platform,
            devices,
            status: ProbeStatus::Ok,
        }
    }

    pub fn tool_failed(platform: Platform, reason: impl Into<String>) -> Self {
        Self {
            platform,
            devices: Vec::new(),
            status: ProbeStatus::ToolFailed(reason.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ProbeStatus::Ok
    }
}

/// Probe options shared by both platforms
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Bound on every invocation a probe makes
    pub timeout: Duration,
    /// Issue an extra query per device for its OS version
    pub query_versions: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(
                crate::application::poller::constants::DEFAULT_PROBE_TIMEOUT_MS,
            ),
            query_versions: false,
        }
    }
}

/// Device probe port
#[async_trait]
pub trait DeviceProbe: Send + Sync {
    fn platform(&self) -> Platform;

    /// Enumerate attached devices; never errors
    async fn discover(&self) -> ProbeReport;
}
