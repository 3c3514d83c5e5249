// Device Domain Model

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Device identifier (adb serial or Apple UDID)
pub type DeviceId = String;

/// Platform kind of an attached device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Platform {
    Android,
    Ios,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Android => write!(f, "Android"),
            Platform::Ios => write!(f, "iOS"),
        }
    }
}

/// Manufacturer family reported for a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Manufacturer {
    Android,
    Apple,
}

impl std::fmt::Display for Manufacturer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Manufacturer::Android => write!(f, "Android"),
            Manufacturer::Apple => write!(f, "Apple"),
        }
    }
}

/// One attached device as seen by a single discovery cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub manufacturer: Manufacturer,
    /// Product name; empty when the tool did not report one
    pub model: String,
    pub platform: Platform,
    /// Only set when versions are queried explicitly
    pub os_version: Option<String>,
}

impl Device {
    pub fn android(id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            manufacturer: Manufacturer::Android,
            model: model.into(),
            platform: Platform::Android,
            os_version: None,
        }
    }

    pub fn ios(id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            manufacturer: Manufacturer::Apple,
            model: model.into(),
            platform: Platform::Ios,
            os_version: None,
        }
    }

    pub fn with_os_version(mut self, version: Option<String>) -> Self {
        self.os_version = version;
        self
    }
}

/// Complete snapshot of one discovery cycle
///
/// Immutable once built. The registry replaces it wholesale every cycle,
/// there is no diffing against the previous snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSet {
    /// Publish sequence number (0 = nothing published yet)
    pub generation: u64,
    /// Epoch ms when the cycle finished
    pub captured_at_ms: i64,
    devices: Vec<Device>,
}

impl DeviceSet {
    /// Build a snapshot, keeping the first device for any repeated id
    pub fn new(generation: u64, captured_at_ms: i64, devices: Vec<Device>) -> Self {
        let mut seen = HashSet::with_capacity(devices.len());
        let devices = devices
            .into_iter()
            .filter(|d| seen.insert(d.id.clone()))
            .collect();

        Self {
            generation,
            captured_at_ms,
            devices,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.devices.iter().map(|d| d.id.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Device> {
        self.devices.iter()
    }
}

impl<'a> IntoIterator for &'a DeviceSet {
    type Item = &'a Device;
    type IntoIter = std::slice::Iter<'a, Device>;

    fn into_iter(self) -> Self::IntoIter {
        self.devices.iter()
    }
}
