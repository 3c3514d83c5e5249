// Connect/disconnect reporting between consecutive device sets

use phonetool_core::application::DeviceSubscription;
use phonetool_core::domain::{Device, DeviceSet};
use std::sync::Arc;
use tracing::info;

/// Devices present in `current` but not `previous`, and ids that went away
pub fn diff<'a>(previous: &DeviceSet, current: &'a DeviceSet) -> (Vec<&'a Device>, Vec<String>) {
    let connected = current
        .iter()
        .filter(|d| previous.find(&d.id).is_none())
        .collect();
    let disconnected = previous
        .ids()
        .filter(|id| current.find(id).is_none())
        .map(str::to_string)
        .collect();

    (connected, disconnected)
}

/// Log every published set until the registry goes away
pub async fn report_changes(mut subscription: DeviceSubscription) {
    let mut previous = Arc::new(DeviceSet::empty());

    while let Some(set) = subscription.recv().await {
        let (connected, disconnected) = diff(&previous, &set);

        for device in connected {
            info!(
                device_id = %device.id,
                platform = %device.platform,
                model = %device.model,
                "Device connected"
            );
        }
        for id in disconnected {
            info!(device_id = %id, "Device disconnected");
        }

        info!(
            generation = set.generation,
            devices = set.len(),
            ids = ?set.ids().collect::<Vec<_>>(),
            "Device set published"
        );
        previous = set;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_reports_both_directions() {
        let before = DeviceSet::new(
            1,
            0,
            vec![Device::android("A", "Pixel_6"), Device::ios("U1", "iPhone14,2")],
        );
        let after = DeviceSet::new(
            2,
            0,
            vec![Device::ios("U1", "iPhone14,2"), Device::android("B", "SM_G991B")],
        );

        let (connected, disconnected) = diff(&before, &after);

        assert_eq!(connected, vec![&Device::android("B", "SM_G991B")]);
        assert_eq!(disconnected, vec!["A".to_string()]);
    }

    #[test]
    fn test_first_set_is_all_connects() {
        let first = DeviceSet::new(1, 0, vec![Device::android("A", "")]);
        let (connected, disconnected) = diff(&DeviceSet::empty(), &first);

        assert_eq!(connected.len(), 1);
        assert!(disconnected.is_empty());
    }

    #[test]
    fn test_unchanged_set_has_no_changes() {
        let set = DeviceSet::new(3, 0, vec![Device::android("A", "")]);
        let (connected, disconnected) = diff(&set, &set);

        assert!(connected.is_empty() && disconnected.is_empty());
    }
}
