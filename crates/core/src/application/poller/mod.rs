// Poller - Device discovery loop

pub mod constants;
mod shutdown;

pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::probe::{
    AndroidProbe, DeviceProbe, IosProbe, ProbeConfig, ProbeStatus,
};
use crate::application::registry::DeviceRegistry;
use crate::domain::{DeviceSet, DomainError};
use crate::error::{AppError, Result};
use crate::port::ProcessInvoker;
use futures::future::join_all;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Poller lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Running,
    Stopped,
}

impl PollerState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => PollerState::Idle,
            1 => PollerState::Running,
            _ => PollerState::Stopped,
        }
    }
}

impl std::fmt::Display for PollerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PollerState::Idle => write!(f, "IDLE"),
            PollerState::Running => write!(f, "RUNNING"),
            PollerState::Stopped => write!(f, "STOPPED"),
        }
    }
}

/// Runs every probe each cycle and publishes the merged Device Set
///
/// Idle -> Running happens once; a stopped poller cannot be restarted.
pub struct DevicePoller {
    probes: Vec<Arc<dyn DeviceProbe>>,
    registry: Arc<DeviceRegistry>,
    interval: Duration,
    state: AtomicU8,
}

impl DevicePoller {
    pub fn new(
        probes: Vec<Arc<dyn DeviceProbe>>,
        registry: Arc<DeviceRegistry>,
        interval: Duration,
    ) -> Self {
        Self {
            probes,
            registry,
            interval,
            state: AtomicU8::new(PollerState::Idle as u8),
        }
    }

    /// Poller with the Android and Apple probes sharing one invoker
    pub fn with_default_probes(
        invoker: Arc<dyn ProcessInvoker>,
        registry: Arc<DeviceRegistry>,
        probe_config: ProbeConfig,
        interval: Duration,
    ) -> Self {
        let probes: Vec<Arc<dyn DeviceProbe>> = vec![
            Arc::new(AndroidProbe::new(Arc::clone(&invoker), probe_config.clone())),
            Arc::new(IosProbe::new(invoker, probe_config)),
        ];
        Self::new(probes, registry, interval)
    }

    pub fn state(&self) -> PollerState {
        PollerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Spawn the discovery loop
    ///
    /// Returns immediately. Fails with InvalidStateTransition when the poller
    /// was already started.
    pub fn start(self: &Arc<Self>) -> Result<PollerHandle> {
        if let Err(current) = self.state.compare_exchange(
            PollerState::Idle as u8,
            PollerState::Running as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            return Err(AppError::Domain(DomainError::InvalidStateTransition {
                from: PollerState::from_u8(current).to_string(),
                to: PollerState::Running.to_string(),
            }));
        }

        let (shutdown_tx, shutdown_rx) = shutdown_channel();
        let poller = Arc::clone(self);
        let task = tokio::spawn(async move { poller.run(shutdown_rx).await });

        Ok(PollerHandle {
            poller: Arc::clone(self),
            shutdown: shutdown_tx,
            task,
        })
    }

    /// Discovery loop: cycle, publish, sleep, until shutdown
    async fn run(self: Arc<Self>, mut shutdown: ShutdownToken) {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            probes = self.probes.len(),
            "Device poller started"
        );

        loop {
            if shutdown.is_shutdown() {
                break;
            }

            // Dropping the cycle future abandons in-flight invocations
            tokio::select! {
                set = self.poll_once() => {
                    debug!(generation = set.generation, devices = set.len(), "Poll cycle completed");
                }
                _ = shutdown.wait() => {
                    info!("Device poller interrupted during cycle");
                    break;
                }
            }

            tokio::select! {
                _ = sleep(self.interval) => {},
                _ = shutdown.wait() => break,
            }
        }

        self.mark_stopped();
        info!("Device poller stopped");
    }

    fn mark_stopped(&self) {
        self.state
            .store(PollerState::Stopped as u8, Ordering::SeqCst);
    }

    /// Run one discovery cycle and publish its result
    ///
    /// Probes run concurrently. A failing probe contributes no devices;
    /// the cycle itself never fails.
    pub async fn poll_once(&self) -> Arc<DeviceSet> {
        let reports = join_all(self.probes.iter().map(|p| p.discover())).await;

        let mut devices = Vec::new();
        for report in reports {
            if let ProbeStatus::ToolFailed(reason) = &report.status {
                debug!(platform = %report.platform, reason = %reason, "Probe degraded to empty");
            }
            devices.extend(report.devices);
        }

        self.registry.publish(devices)
    }
}

/// Stop handle for a running poller
pub struct PollerHandle {
    poller: Arc<DevicePoller>,
    shutdown: ShutdownSender,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Signal the loop and wait until it has exited
    pub async fn stop(self) -> Result<()> {
        self.shutdown.shutdown();
        self.task
            .await
            .map_err(|e| AppError::Internal(format!("poller task failed: {}", e)))
    }

    /// Like `stop`, but aborts the task if it does not exit within `limit`
    pub async fn stop_within(self, limit: Duration) -> Result<()> {
        self.shutdown.shutdown();
        let mut task = self.task;
        match tokio::time::timeout(limit, &mut task).await {
            Ok(joined) => {
                joined.map_err(|e| AppError::Internal(format!("poller task failed: {}", e)))
            }
            Err(_) => {
                warn!(limit_ms = limit.as_millis() as u64, "Poller did not stop in time, aborting");
                task.abort();
                self.poller.mark_stopped();
                Err(AppError::Internal(
                    "poller did not stop within the allowed time".to_string(),
                ))
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
