// Device Registry - current snapshot plus change notifications

use crate::application::poller::constants::SUBSCRIBER_BUFFER;
use crate::domain::{Device, DeviceSet};
use crate::port::TimeProvider;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

/// Holds the current Device Set and fans every published set out to subscribers
///
/// The current set sits behind an `Arc` that is swapped in one step, so a
/// reader gets either the old or the new snapshot, never a mix.
pub struct DeviceRegistry {
    current: watch::Sender<Arc<DeviceSet>>,
    events: broadcast::Sender<Arc<DeviceSet>>,
    generation: AtomicU64,
    time_provider: Arc<dyn TimeProvider>,
}

impl DeviceRegistry {
    pub fn new(time_provider: Arc<dyn TimeProvider>) -> Self {
        let (current, _) = watch::channel(Arc::new(DeviceSet::empty()));
        let (events, _) = broadcast::channel(SUBSCRIBER_BUFFER);
        Self {
            current,
            events,
            generation: AtomicU64::new(0),
            time_provider,
        }
    }

    /// Current snapshot (empty with generation 0 before the first cycle)
    pub fn snapshot(&self) -> Arc<DeviceSet> {
        self.current.borrow().clone()
    }

    /// Look a device up in the current snapshot
    pub fn find(&self, id: &str) -> Option<Device> {
        self.current.borrow().find(id).cloned()
    }

    /// Every set published from now on, in publish order
    pub fn subscribe(&self) -> DeviceSubscription {
        DeviceSubscription {
            rx: self.events.subscribe(),
        }
    }

    /// Latest-value view; intermediate sets may be skipped
    pub fn watch(&self) -> watch::Receiver<Arc<DeviceSet>> {
        self.current.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    /// Build the next snapshot from one cycle's devices and publish it
    ///
    /// Never blocks: subscribers are buffered and slow ones lag.
    pub fn publish(&self, devices: Vec<Device>) -> Arc<DeviceSet> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let set = Arc::new(DeviceSet::new(
            generation,
            self.time_provider.now_millis(),
            devices,
        ));

        self.current.send_replace(Arc::clone(&set));
        // No subscribers is fine
        let delivered = self.events.send(Arc::clone(&set)).unwrap_or(0);

        debug!(
            generation = generation,
            devices = set.len(),
            subscribers = delivered,
            "Device set published"
        );
        set
    }
}

/// Buffered subscription to published Device Sets
pub struct DeviceSubscription {
    rx: broadcast::Receiver<Arc<DeviceSet>>,
}

impl DeviceSubscription {
    /// Next published set; None once the registry is gone
    ///
    /// A subscriber that fell behind skips the sets it missed and continues
    /// with the oldest one still buffered.
    pub async fn recv(&mut self) -> Option<Arc<DeviceSet>> {
        loop {
            match self.rx.recv().await {
                Ok(set) => return Some(set),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped = skipped, "Device subscriber lagged, skipping old sets");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of `recv`
    pub fn try_recv(&mut self) -> Option<Arc<DeviceSet>> {
        loop {
            match self.rx.try_recv() {
                Ok(set) => return Some(set),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}
