// Operation Executor - runs one operation recipe against one device

pub mod unlock;
pub mod whatsapp;

use crate::domain::{Device, DeviceId, DomainError, Operation, OperationResult, Platform};
use crate::port::{IdProvider, ProcessInvoker, TimeProvider};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn, Instrument};

/// Dispatches operations to their recipes
///
/// Operations for different devices run concurrently; operations for the
/// same device id queue behind a per-device lock.
pub struct OperationExecutor {
    invoker: Arc<dyn ProcessInvoker>,
    time_provider: Arc<dyn TimeProvider>,
    id_provider: Arc<dyn IdProvider>,
    step_timeout: Duration,
    device_locks: Mutex<HashMap<DeviceId, Arc<Mutex<()>>>>,
}

impl OperationExecutor {
    pub fn new(
        invoker: Arc<dyn ProcessInvoker>,
        time_provider: Arc<dyn TimeProvider>,
        id_provider: Arc<dyn IdProvider>,
        step_timeout: Duration,
    ) -> Self {
        Self {
            invoker,
            time_provider,
            id_provider,
            step_timeout,
            device_locks: Mutex::new(HashMap::new()),
        }
    }

    async fn lock_for(&self, device_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.device_locks.lock().await;
        Arc::clone(locks.entry(device_id.to_string()).or_default())
    }

    /// Forget the device lock once no other operation holds or waits on it
    async fn release(&self, device_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.device_locks.lock().await;
        drop(lock);
        if locks
            .get(device_id)
            .map_or(false, |entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(device_id);
        }
    }

    #[cfg(test)]
    async fn tracked_devices(&self) -> usize {
        self.device_locks.lock().await.len()
    }

    /// Run `operation` against `device`; failures come back as results
    pub async fn execute(&self, device: &Device, operation: Operation) -> OperationResult {
        let operation_id = self.id_provider.generate_id();
        let span = tracing::info_span!(
            "operation",
            operation_id = %operation_id,
            operation = %operation,
            device_id = %device.id,
            platform = %device.platform,
        );

        async {
            let lock = self.lock_for(&device.id).await;
            let result = {
                let _guard = lock.lock().await;
                info!("Operation started");
                self.dispatch(device, &operation).await
            };
            self.release(&device.id, lock).await;

            if result.success {
                info!(message = %result.message, "Operation succeeded");
            } else {
                warn!(
                    message = %result.message,
                    diagnostics = ?result.diagnostics,
                    "Operation did not succeed"
                );
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn dispatch(&self, device: &Device, operation: &Operation) -> OperationResult {
        let invoker = self.invoker.as_ref();
        let timeout = self.step_timeout;

        match (device.platform, operation) {
            (Platform::Android, Operation::RemoveScreenLock) => {
                unlock::remove_screen_lock(invoker, device, timeout).await
            }
            (Platform::Android, Operation::FactoryReset) => {
                unlock::factory_reset(invoker, timeout).await
            }
            (Platform::Android, Operation::FrpBypass) => unlock::frp_bypass(),
            (Platform::Android, Operation::BackupWhatsApp { dest_dir }) => {
                whatsapp::backup_android(
                    invoker,
                    self.time_provider.as_ref(),
                    device,
                    dest_dir,
                    timeout,
                )
                .await
            }
            (Platform::Android, Operation::RestoreWhatsApp { source }) => {
                whatsapp::restore_android(invoker, device, source, timeout).await
            }
            (Platform::Ios, Operation::BackupWhatsApp { dest_dir }) => {
                whatsapp::backup_ios(
                    invoker,
                    self.time_provider.as_ref(),
                    device,
                    dest_dir,
                    timeout,
                )
                .await
            }
            (Platform::Ios, Operation::RestoreWhatsApp { source }) => {
                whatsapp::restore_ios(invoker, device, source, timeout).await
            }
            (platform, op) => OperationResult::failed(
                DomainError::UnsupportedPlatform {
                    operation: op.to_string(),
                    platform: platform.to_string(),
                }
                .to_string(),
            ),
        }
    }
}
