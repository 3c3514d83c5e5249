// WhatsApp backup and restore (adb backup / idevicebackup2)
//
// The external tools produce the artifacts; success is judged by whether
// the expected file or folder exists afterwards.

use crate::application::recipe::{run_recipe, FailurePolicy, Recipe, Step};
use crate::application::tools::{ADB, IDEVICEBACKUP2};
use crate::domain::{Device, OperationResult};
use crate::port::{Invocation, ProcessInvoker, TimeProvider};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub const WHATSAPP_PACKAGE: &str = "com.whatsapp";

const RESTORE_SENT: &str = "Restore command sent. Watch device for prompts.";

/// `<dir>/whatsapp_<id>_<stamp>.ab`
pub fn android_backup_path(dest_dir: &Path, device_id: &str, stamp: &str) -> PathBuf {
    dest_dir.join(format!("whatsapp_{}_{}.ab", device_id, stamp))
}

/// `<dir>/ios_<id>_<stamp>`
pub fn ios_backup_path(dest_dir: &Path, device_id: &str, stamp: &str) -> PathBuf {
    dest_dir.join(format!("ios_{}_{}", device_id, stamp))
}

/// A path as one argv entry, untouched
fn path_arg(path: &Path) -> Result<String, OperationResult> {
    path.to_str().map(str::to_string).ok_or_else(|| {
        OperationResult::failed(format!("Path {} is not valid UTF-8.", path.display()))
    })
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

/// adb backup blocks until the user confirms on the device
pub async fn backup_android(
    invoker: &dyn ProcessInvoker,
    time_provider: &dyn TimeProvider,
    device: &Device,
    dest_dir: &Path,
    step_timeout: Duration,
) -> OperationResult {
    if let Err(e) = tokio::fs::create_dir_all(dest_dir).await {
        return OperationResult::failed(format!(
            "Backup folder {} could not be created: {}",
            dest_dir.display(),
            e
        ));
    }

    let path = android_backup_path(dest_dir, &device.id, &time_provider.file_stamp());
    let target = match path_arg(&path) {
        Ok(target) => target,
        Err(failed) => return failed,
    };
    let recipe = Recipe::new("backup_whatsapp_android", step_timeout).step(Step::new(
        "adb backup",
        Invocation::from_args(
            ADB,
            [
                "-s",
                device.id.as_str(),
                "backup",
                "-f",
                target.as_str(),
                "-apk",
                "-shared",
                WHATSAPP_PACKAGE,
            ],
        ),
        FailurePolicy::Abort,
    ));

    let run = run_recipe(invoker, &recipe).await;

    if is_file(&path).await {
        info!(device_id = %device.id, path = %path.display(), "Android backup written");
        OperationResult::succeeded(format!("Backup saved to {}", path.display()))
            .with_output_path(path)
    } else {
        OperationResult::failed("Backup failed. User may need to unlock device to confirm.")
            .with_diagnostics(run.diagnostics())
    }
}

pub async fn restore_android(
    invoker: &dyn ProcessInvoker,
    device: &Device,
    backup_file: &Path,
    step_timeout: Duration,
) -> OperationResult {
    if !is_file(backup_file).await {
        return OperationResult::failed("Backup file does not exist.");
    }
    let source = match path_arg(backup_file) {
        Ok(source) => source,
        Err(failed) => return failed,
    };

    let recipe = Recipe::new("restore_whatsapp_android", step_timeout).step(Step::new(
        "adb restore",
        Invocation::from_args(ADB, ["-s", device.id.as_str(), "restore", source.as_str()]),
        FailurePolicy::Abort,
    ));

    let run = run_recipe(invoker, &recipe).await;

    if run.completed() {
        OperationResult::succeeded(RESTORE_SENT)
    } else {
        OperationResult::failed("Restore command could not be sent.")
            .with_diagnostics(run.diagnostics())
    }
}

/// idevicebackup2 writes into `<backup path>/<udid>/`
pub async fn backup_ios(
    invoker: &dyn ProcessInvoker,
    time_provider: &dyn TimeProvider,
    device: &Device,
    dest_dir: &Path,
    step_timeout: Duration,
) -> OperationResult {
    let path = ios_backup_path(dest_dir, &device.id, &time_provider.file_stamp());
    let target = match path_arg(&path) {
        Ok(target) => target,
        Err(failed) => return failed,
    };
    if let Err(e) = tokio::fs::create_dir_all(&path).await {
        return OperationResult::failed(format!(
            "Backup folder {} could not be created: {}",
            path.display(),
            e
        ));
    }

    let recipe = Recipe::new("backup_whatsapp_ios", step_timeout).step(Step::new(
        "idevicebackup2 backup",
        Invocation::from_args(
            IDEVICEBACKUP2,
            ["-u", device.id.as_str(), "backup", target.as_str()],
        ),
        FailurePolicy::Abort,
    ));

    let run = run_recipe(invoker, &recipe).await;

    if is_dir(&path.join(&device.id)).await {
        info!(device_id = %device.id, path = %path.display(), "iOS backup written");
        OperationResult::succeeded(format!("Backup saved to {}", path.display()))
            .with_output_path(path)
    } else {
        // Failed attempts leave no folder behind
        if let Err(e) = tokio::fs::remove_dir_all(&path).await {
            warn!(path = %path.display(), error = %e, "Failed to remove backup folder");
        }
        OperationResult::failed("Backup failed. Is device unlocked and trusted?")
            .with_diagnostics(run.diagnostics())
    }
}

pub async fn restore_ios(
    invoker: &dyn ProcessInvoker,
    device: &Device,
    backup_folder: &Path,
    step_timeout: Duration,
) -> OperationResult {
    if !is_dir(backup_folder).await {
        return OperationResult::failed("Backup folder does not exist.");
    }
    let source = match path_arg(backup_folder) {
        Ok(source) => source,
        Err(failed) => return failed,
    };

    let recipe = Recipe::new("restore_whatsapp_ios", step_timeout).step(Step::new(
        "idevicebackup2 restore",
        Invocation::from_args(
            IDEVICEBACKUP2,
            ["-u", device.id.as_str(), "restore", source.as_str()],
        ),
        FailurePolicy::Abort,
    ));

    let run = run_recipe(invoker, &recipe).await;

    if run.completed() {
        OperationResult::succeeded(RESTORE_SENT)
    } else {
        OperationResult::failed("Restore command could not be sent.")
            .with_diagnostics(run.diagnostics())
    }
}
