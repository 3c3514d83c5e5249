// Android unlock operations (adb / fastboot)

use crate::application::recipe::{run_recipe, FailurePolicy, Recipe, Step};
use crate::application::tools::{adb_args, ADB, FASTBOOT};
use crate::domain::{Device, OperationResult};
use crate::port::{Invocation, ProcessInvoker};
use std::time::Duration;

/// Lock-screen credential files removed by the unlock recipe
pub const LOCK_FILES: [&str; 5] = [
    "/data/system/gesture.key",
    "/data/system/password.key",
    "/data/system/locksettings.db",
    "/data/system/locksettings.db-wal",
    "/data/system/locksettings.db-shm",
];

pub const FRP_INSTRUCTIONS: &str = "No universal automated FRP bypass is available for your device.
For some older models, you may try:
- Connect to WiFi, return to Welcome screen
- Tap Accessibility or Emergency Call, trigger any browser or YouTube loophole
- Use official Google Account recovery: https://accounts.google.com/signin/recovery

Otherwise, seek device-specific instructions on XDA or YouTube.";

/// Delete every lock file, then reboot
///
/// Only works with USB debugging enabled and the host authorized. Every
/// step continues on failure: a missing file is the normal case.
pub fn screen_lock_recipe(device_id: &str, step_timeout: Duration) -> Recipe {
    let recipe = LOCK_FILES.iter().fold(
        Recipe::new("remove_screen_lock", step_timeout),
        |recipe, path| {
            recipe.step(
                Step::new(
                    format!("rm {}", path),
                    Invocation::new(ADB, &adb_args(device_id, &format!("shell rm {}", path))),
                    FailurePolicy::Continue,
                )
                .tolerating("No such file"),
            )
        },
    );

    recipe.step(Step::new(
        "reboot",
        Invocation::new(ADB, &adb_args(device_id, "reboot")),
        FailurePolicy::Continue,
    ))
}

pub async fn remove_screen_lock(
    invoker: &dyn ProcessInvoker,
    device: &Device,
    step_timeout: Duration,
) -> OperationResult {
    let run = run_recipe(invoker, &screen_lock_recipe(&device.id, step_timeout)).await;

    // Best effort: success means the whole recipe ran, reboot included
    if run.completed() {
        OperationResult::succeeded("Screen lock files deleted (if present). Device is rebooting.")
            .with_diagnostics(run.diagnostics())
    } else {
        OperationResult::failed("Screen lock removal did not complete.")
            .with_diagnostics(run.diagnostics())
    }
}

/// `fastboot -w`; the device must already be in fastboot mode
pub fn factory_reset_recipe(step_timeout: Duration) -> Recipe {
    Recipe::new("factory_reset", step_timeout).step(Step::new(
        "fastboot -w",
        Invocation::new(FASTBOOT, "-w"),
        FailurePolicy::Abort,
    ))
}

pub async fn factory_reset(invoker: &dyn ProcessInvoker, step_timeout: Duration) -> OperationResult {
    let run = run_recipe(invoker, &factory_reset_recipe(step_timeout)).await;

    if run.completed() {
        OperationResult::succeeded("Fastboot -w command sent. If successful, device will be wiped.")
    } else {
        OperationResult::failed(
            "Fastboot -w could not be sent. Boot the device into fastboot mode and retry.",
        )
        .with_diagnostics(run.diagnostics())
    }
}

/// No automated path exists; hand the user the manual steps
pub fn frp_bypass() -> OperationResult {
    OperationResult::failed("Manual FRP bypass required.").with_manual_instructions(FRP_INSTRUCTIONS)
}
