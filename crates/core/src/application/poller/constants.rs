// Poller and invocation constants (no magic values)
use std::time::Duration;

/// Pause between two discovery cycles (3s)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3000;

/// Bound on a single probe invocation (15s)
/// An unresponsive tool must not stall discovery
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 15_000;

/// Bound on a single operation step (10 minutes)
/// adb backup waits for confirmation on the device screen
pub const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 600_000;

/// Time a timed-out child gets between SIGTERM and SIGKILL (2s)
pub const GRACEFUL_TERMINATE_TIMEOUT: Duration = Duration::from_secs(2);

/// Buffered device set notifications per subscriber
/// A slower subscriber loses the sets that overflow its buffer
pub const SUBSCRIBER_BUFFER: usize = 16;

/// Model reported when ideviceinfo cannot tell the product type
pub const IOS_MODEL_PLACEHOLDER: &str = "iPhone/iPad";

/// Time allowed for the poll task to wind down after stop (5s)
pub const POLLER_STOP_TIMEOUT: Duration = Duration::from_secs(5);
