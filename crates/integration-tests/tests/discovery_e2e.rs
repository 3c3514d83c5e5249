//! Discovery end-to-end tests
//!
//! Real SubprocessInvoker + DevicePoller against fake adb / idevice_id /
//! ideviceinfo scripts.

#![cfg(unix)]

mod support;

use phonetool_core::application::{DevicePoller, DeviceRegistry, PollerState, ProbeConfig};
use phonetool_core::domain::Device;
use phonetool_core::port::time_provider::SystemTimeProvider;
use std::sync::Arc;
use std::time::{Duration, Instant};
use support::FakeTools;

const ADB_LISTING: &str = r#"cat <<'OUT'
List of devices attached
ABC123               device usb:1-1 product:oriole model:Pixel_6 device:oriole transport_id:1
OFF1                 offline
UNAUTH9              unauthorized usb:1-2 transport_id:2

OUT"#;

const IDEVICE_LISTING: &str = r#"echo 00008030-AAA"#;

const IDEVICEINFO_ANSWERS: &str = r#"case "$4" in
  ProductType) echo iPhone14,2 ;;
  ProductVersion) echo 17.4.1 ;;
esac"#;

fn poller(tools: &FakeTools, probe_timeout: Duration, interval: Duration) -> Arc<DevicePoller> {
    let registry = Arc::new(DeviceRegistry::new(Arc::new(SystemTimeProvider)));
    Arc::new(DevicePoller::with_default_probes(
        tools.invoker(Duration::from_secs(10)),
        registry,
        ProbeConfig {
            timeout: probe_timeout,
            query_versions: false,
        },
        interval,
    ))
}

/// One cycle merges both platforms, Android first, ready devices only
#[tokio::test]
async fn test_cycle_lists_ready_devices_from_both_platforms() {
    let tools = FakeTools::new();
    tools.install("adb", ADB_LISTING);
    tools.install("idevice_id", IDEVICE_LISTING);
    tools.install("ideviceinfo", IDEVICEINFO_ANSWERS);

    let poller = poller(&tools, Duration::from_secs(5), Duration::from_secs(3));
    let set = poller.poll_once().await;

    assert_eq!(
        set.devices(),
        &[
            Device::android("ABC123", "Pixel_6"),
            Device::ios("00008030-AAA", "iPhone14,2"),
        ]
    );

    let calls = tools.calls();
    assert!(calls.contains(&"adb devices -l".to_string()));
    assert!(calls.contains(&"idevice_id -l".to_string()));
    assert!(calls.contains(&"ideviceinfo -u 00008030-AAA -k ProductType".to_string()));
}

/// Version queries populate os_version when enabled
#[tokio::test]
async fn test_version_query_fills_os_version() {
    let tools = FakeTools::new();
    tools.install("adb", r#"case "$*" in
  "devices -l") printf 'List of devices attached\nABC123 device model:Pixel_6\n' ;;
  *getprop*) echo 14 ;;
esac"#);
    tools.install("idevice_id", IDEVICE_LISTING);
    tools.install("ideviceinfo", IDEVICEINFO_ANSWERS);

    let registry = Arc::new(DeviceRegistry::new(Arc::new(SystemTimeProvider)));
    let poller = DevicePoller::with_default_probes(
        tools.invoker(Duration::from_secs(10)),
        registry,
        ProbeConfig {
            timeout: Duration::from_secs(5),
            query_versions: true,
        },
        Duration::from_secs(3),
    );

    let set = poller.poll_once().await;

    assert_eq!(
        set.find("ABC123").and_then(|d| d.os_version.clone()),
        Some("14".to_string())
    );
    assert_eq!(
        set.find("00008030-AAA").and_then(|d| d.os_version.clone()),
        Some("17.4.1".to_string())
    );
}

/// Failing listing tools give an empty set; the loop keeps running
#[tokio::test]
async fn test_failing_tools_degrade_to_empty_and_loop_continues() {
    let tools = FakeTools::new();
    tools.install("adb", "echo 'error: could not install *smartsocket* listener' >&2; exit 1");
    tools.install("idevice_id", "echo 'ERROR: Unable to retrieve device list!' >&2; exit 255");

    let poller = poller(&tools, Duration::from_secs(5), Duration::from_millis(50));
    let mut subscription = poller.registry().subscribe();
    let handle = poller.start().unwrap();

    let first = tokio::time::timeout(Duration::from_secs(5), subscription.recv())
        .await
        .unwrap()
        .unwrap();
    let second = tokio::time::timeout(Duration::from_secs(5), subscription.recv())
        .await
        .unwrap()
        .unwrap();

    assert!(first.is_empty() && second.is_empty());
    assert_eq!(second.generation, first.generation + 1);

    handle.stop_within(Duration::from_secs(5)).await.unwrap();
    assert_eq!(poller.state(), PollerState::Stopped);
}

/// A hanging tool is cut off at the probe timeout; the other platform still reports
#[tokio::test]
async fn test_hanging_tool_bounded_by_probe_timeout() {
    let tools = FakeTools::new();
    tools.install("adb", "exec sleep 30");
    tools.install("idevice_id", IDEVICE_LISTING);
    tools.install("ideviceinfo", IDEVICEINFO_ANSWERS);

    let poller = poller(&tools, Duration::from_millis(300), Duration::from_secs(3));

    let started = Instant::now();
    let set = poller.poll_once().await;

    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(set.devices(), &[Device::ios("00008030-AAA", "iPhone14,2")]);
}

/// Stopping mid-cycle abandons the in-flight invocation promptly
#[tokio::test]
async fn test_stop_during_hanging_cycle() {
    let tools = FakeTools::new();
    tools.install("adb", "exec sleep 30");
    tools.install("idevice_id", "exec sleep 30");

    let poller = poller(&tools, Duration::from_secs(60), Duration::from_secs(3));
    let handle = poller.start().unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let started = Instant::now();
    handle.stop_within(Duration::from_secs(5)).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(poller.registry().snapshot().generation, 0);
}

/// Subscribers see sets in publish order, snapshot matches the latest
#[tokio::test]
async fn test_subscriber_sees_sets_in_order() {
    let tools = FakeTools::new();
    tools.install("adb", ADB_LISTING);
    tools.install("idevice_id", "exit 0");

    let poller = poller(&tools, Duration::from_secs(5), Duration::from_millis(20));
    let mut subscription = poller.registry().subscribe();
    let handle = poller.start().unwrap();

    let mut generations = Vec::new();
    for _ in 0..3 {
        let set = tokio::time::timeout(Duration::from_secs(5), subscription.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(set.ids().collect::<Vec<_>>(), vec!["ABC123"]);
        generations.push(set.generation);
    }

    handle.stop_within(Duration::from_secs(5)).await.unwrap();

    assert_eq!(generations, vec![1, 2, 3]);
    assert!(poller.registry().snapshot().generation >= 3);
}
