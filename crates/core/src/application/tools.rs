// External tool names and fixed arguments

/// Android Debug Bridge
pub const ADB: &str = "adb";

/// Android flashing tool
pub const FASTBOOT: &str = "fastboot";

/// libimobiledevice: list attached UDIDs
pub const IDEVICE_ID: &str = "idevice_id";

/// libimobiledevice: query device properties
pub const IDEVICEINFO: &str = "ideviceinfo";

/// libimobiledevice: backup and restore
pub const IDEVICEBACKUP2: &str = "idevicebackup2";

/// ideviceinfo key holding the hardware model (e.g. iPhone14,2)
pub const KEY_PRODUCT_TYPE: &str = "ProductType";

/// ideviceinfo key holding the iOS version
pub const KEY_PRODUCT_VERSION: &str = "ProductVersion";

/// Android property holding the OS release
pub const PROP_ANDROID_RELEASE: &str = "ro.build.version.release";

/// Prefix all per-device adb arguments with the target serial
pub fn adb_args(device_id: &str, args: &str) -> String {
    format!("-s {} {}", device_id, args)
}
