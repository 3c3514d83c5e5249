// Runtime settings shared by the daemon and the CLI
// Loading (files, env, path expansion) lives in infra-system

use crate::application::poller::constants::{
    DEFAULT_OPERATION_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_PROBE_TIMEOUT_MS,
};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory searched for tool executables before PATH
    pub tools_dir: Option<PathBuf>,
    /// Default destination for backups
    pub backup_dir: PathBuf,
    pub poll_interval_ms: u64,
    pub probe_timeout_ms: u64,
    pub operation_timeout_ms: u64,
    /// Also ask every device for its OS version during discovery
    pub query_versions: bool,
    pub log_format: LogFormat,
    /// Rolling log files are written here when set (daemon only)
    pub log_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tools_dir: None,
            backup_dir: PathBuf::from("PhoneToolBackups"),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            operation_timeout_ms: DEFAULT_OPERATION_TIMEOUT_MS,
            query_versions: false,
            log_format: LogFormat::Pretty,
            log_dir: None,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(AppError::Config("poll_interval_ms must be > 0".to_string()));
        }
        if self.probe_timeout_ms == 0 {
            return Err(AppError::Config("probe_timeout_ms must be > 0".to_string()));
        }
        if self.operation_timeout_ms == 0 {
            return Err(AppError::Config(
                "operation_timeout_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        tokio_test::assert_ok!(settings.validate());
        assert_eq!(settings.poll_interval(), Duration::from_secs(3));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let settings = Settings {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(matches!(settings.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"query_versions": true, "log_format": "json"}"#).unwrap();
        assert!(settings.query_versions);
        assert_eq!(settings.log_format, LogFormat::Json);
        assert_eq!(settings.probe_timeout_ms, DEFAULT_PROBE_TIMEOUT_MS);
    }
}
