//! Fake tool scripts for end-to-end tests
//!
//! Every script appends `<name> <args>` to a shared call log before running
//! its body, so tests can assert the exact invocation sequence.

#![allow(dead_code)]

use phonetool_core::port::time_provider::SystemTimeProvider;
use phonetool_infra_system::{SubprocessInvoker, ToolResolver};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub struct FakeTools {
    dir: TempDir,
    log: PathBuf,
}

impl FakeTools {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("calls.log");
        Self { dir, log }
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Write an executable `/bin/sh` script named `name`
    pub fn install(&self, name: &str, body: &str) {
        let path = self.dir.path().join(name);
        let script = format!(
            "#!/bin/sh\necho \"{} $*\" >> \"{}\"\n{}\n",
            name,
            self.log.display(),
            body
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    pub fn invoker(&self, default_timeout: Duration) -> Arc<SubprocessInvoker> {
        Arc::new(SubprocessInvoker::new(
            Arc::new(SystemTimeProvider),
            ToolResolver::new(Some(self.dir.path().to_path_buf())),
            default_timeout,
        ))
    }

    /// Logged invocations in call order
    pub fn calls(&self) -> Vec<String> {
        std::fs::read_to_string(&self.log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}
