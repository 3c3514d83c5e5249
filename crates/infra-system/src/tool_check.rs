// Tool lookup and presence check
// reason: tools may ship next to the app (tools_dir) or come from PATH

use phonetool_core::application::tools::{ADB, FASTBOOT, IDEVICEBACKUP2, IDEVICEINFO, IDEVICE_ID};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[cfg(windows)]
const EXE_SUFFIX: &str = ".exe";
#[cfg(not(windows))]
const EXE_SUFFIX: &str = "";

/// Resolves tool names to executables
#[derive(Debug, Clone, Default)]
pub struct ToolResolver {
    tools_dir: Option<PathBuf>,
}

impl ToolResolver {
    pub fn new(tools_dir: Option<PathBuf>) -> Self {
        Self { tools_dir }
    }

    pub fn tools_dir(&self) -> Option<&Path> {
        self.tools_dir.as_deref()
    }

    fn bundled(&self, name: &str) -> Option<PathBuf> {
        let dir = self.tools_dir.as_ref()?;
        let candidate = dir.join(format!("{}{}", name, EXE_SUFFIX));
        candidate.is_file().then_some(candidate)
    }

    /// What to hand to the OS: the bundled copy, else the bare name for PATH lookup
    pub fn program_for(&self, name: &str) -> PathBuf {
        self.bundled(name).unwrap_or_else(|| PathBuf::from(name))
    }

    /// Full path of the executable that would run, if any
    pub fn locate(&self, name: &str) -> Option<PathBuf> {
        self.bundled(name).or_else(|| search_path(name))
    }
}

fn search_path(name: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(format!("{}{}", name, EXE_SUFFIX)))
        .find(|candidate| candidate.is_file())
}

/// Groups of tools that ship together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ToolFamily {
    AndroidBridge,
    Flashing,
    AppleDevice,
}

impl ToolFamily {
    pub const ALL: [ToolFamily; 3] = [
        ToolFamily::AndroidBridge,
        ToolFamily::Flashing,
        ToolFamily::AppleDevice,
    ];

    pub fn tools(self) -> &'static [&'static str] {
        match self {
            ToolFamily::AndroidBridge => &[ADB],
            ToolFamily::Flashing => &[FASTBOOT],
            ToolFamily::AppleDevice => &[IDEVICE_ID, IDEVICEINFO, IDEVICEBACKUP2],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ToolFamily::AndroidBridge => "Android Debug Bridge",
            ToolFamily::Flashing => "Fastboot",
            ToolFamily::AppleDevice => "libimobiledevice",
        }
    }

    /// Install hint shown when the family is incomplete
    pub fn guidance(self) -> &'static str {
        match self {
            ToolFamily::AndroidBridge => {
                "Please download and extract platform-tools from Google, then copy adb and AdbWinApi.dll to the tools folder."
            }
            ToolFamily::Flashing => {
                "Please download and extract platform-tools from Google, then copy fastboot to the tools folder."
            }
            ToolFamily::AppleDevice => {
                "Please download libimobiledevice binaries and copy idevice_id, ideviceinfo and idevicebackup2 to the tools folder."
            }
        }
    }
}

impl std::fmt::Display for ToolFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Lookup result for a single tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolStatus {
    pub name: &'static str,
    pub path: Option<PathBuf>,
}

impl ToolStatus {
    pub fn is_found(&self) -> bool {
        self.path.is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FamilyReport {
    pub family: ToolFamily,
    pub tools: Vec<ToolStatus>,
}

impl FamilyReport {
    pub fn is_complete(&self) -> bool {
        self.tools.iter().all(ToolStatus::is_found)
    }

    pub fn missing(&self) -> Vec<&'static str> {
        self.tools
            .iter()
            .filter(|t| !t.is_found())
            .map(|t| t.name)
            .collect()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("{family} tools missing ({missing}). {guidance}")]
    Missing {
        family: ToolFamily,
        missing: String,
        guidance: &'static str,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolReport {
    pub families: Vec<FamilyReport>,
}

impl ToolReport {
    pub fn family(&self, family: ToolFamily) -> Option<&FamilyReport> {
        self.families.iter().find(|r| r.family == family)
    }

    pub fn all_present(&self) -> bool {
        self.families.iter().all(FamilyReport::is_complete)
    }

    /// Fail with install guidance unless every tool of `family` was found
    pub fn ensure(&self, family: ToolFamily) -> Result<(), ToolError> {
        match self.family(family) {
            Some(report) if report.is_complete() => Ok(()),
            Some(report) => Err(ToolError::Missing {
                family,
                missing: report.missing().join(", "),
                guidance: family.guidance(),
            }),
            None => Err(ToolError::Missing {
                family,
                missing: family.tools().join(", "),
                guidance: family.guidance(),
            }),
        }
    }

    /// Log incomplete families at warn
    pub fn log_missing(&self) {
        for report in self.families.iter().filter(|r| !r.is_complete()) {
            warn!(
                family = %report.family,
                missing = ?report.missing(),
                guidance = report.family.guidance(),
                "External tools missing"
            );
        }
    }
}

/// Checks which external tools resolve
pub struct ToolChecker {
    resolver: ToolResolver,
}

impl ToolChecker {
    pub fn new(resolver: ToolResolver) -> Self {
        Self { resolver }
    }

    pub fn check(&self) -> ToolReport {
        let families = ToolFamily::ALL
            .iter()
            .map(|&family| FamilyReport {
                family,
                tools: family
                    .tools()
                    .iter()
                    .map(|&name| {
                        let path = self.resolver.locate(name);
                        debug!(tool = name, path = ?path, "Tool lookup");
                        ToolStatus { name, path }
                    })
                    .collect(),
            })
            .collect();

        ToolReport { families }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn install(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_program_for_prefers_tools_dir() {
        let dir = tempfile::tempdir().unwrap();
        let adb = install(dir.path(), "adb");
        let resolver = ToolResolver::new(Some(dir.path().to_path_buf()));

        assert_eq!(resolver.program_for("adb"), adb);
        assert_eq!(resolver.program_for("fastboot"), PathBuf::from("fastboot"));
    }

    #[test]
    fn test_program_for_without_tools_dir_is_bare_name() {
        let resolver = ToolResolver::default();
        assert_eq!(resolver.program_for("idevice_id"), PathBuf::from("idevice_id"));
    }

    #[test]
    fn test_locate_falls_back_to_path() {
        let resolver = ToolResolver::default();
        // sh is on PATH on every unix test host
        assert!(resolver.locate("sh").is_some());
        assert!(resolver.locate("phonetool-no-such-tool").is_none());
    }

    #[test]
    fn test_check_reports_families() {
        let dir = tempfile::tempdir().unwrap();
        install(dir.path(), "idevice_id");
        install(dir.path(), "ideviceinfo");
        install(dir.path(), "idevicebackup2");

        let report = ToolChecker::new(ToolResolver::new(Some(dir.path().to_path_buf()))).check();

        assert_eq!(report.families.len(), 3);
        let apple = report.family(ToolFamily::AppleDevice).unwrap();
        assert!(apple.is_complete());
        assert!(apple.tools.iter().all(|t| t.path.as_ref().unwrap().starts_with(dir.path())));
        assert!(report.ensure(ToolFamily::AppleDevice).is_ok());
    }

    #[test]
    fn test_ensure_reports_missing_tools_with_guidance() {
        let dir = tempfile::tempdir().unwrap();
        install(dir.path(), "idevice_id");

        let report = ToolReport {
            families: vec![FamilyReport {
                family: ToolFamily::AppleDevice,
                tools: vec![
                    ToolStatus { name: IDEVICE_ID, path: Some(dir.path().join("idevice_id")) },
                    ToolStatus { name: IDEVICEINFO, path: None },
                    ToolStatus { name: IDEVICEBACKUP2, path: None },
                ],
            }],
        };

        let err = report.ensure(ToolFamily::AppleDevice).unwrap_err();
        let text = err.to_string();
        assert!(text.starts_with("libimobiledevice tools missing (ideviceinfo, idevicebackup2)."));
        assert!(text.contains("download libimobiledevice binaries"));
        assert!(!report.all_present());
    }
}
