// Operation Domain Model

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// High-level action requested against one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Operation {
    RemoveScreenLock,
    FactoryReset,
    FrpBypass,
    /// Back up WhatsApp data into `dest_dir`
    BackupWhatsApp { dest_dir: PathBuf },
    /// Restore WhatsApp data from a backup file (Android) or folder (iOS)
    RestoreWhatsApp { source: PathBuf },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::RemoveScreenLock => "remove_screen_lock",
            Operation::FactoryReset => "factory_reset",
            Operation::FrpBypass => "frp_bypass",
            Operation::BackupWhatsApp { .. } => "backup_whatsapp",
            Operation::RestoreWhatsApp { .. } => "restore_whatsapp",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of any unlock/backup/restore action
///
/// Failures are reported here rather than raised, so callers can show the
/// message and guidance directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub success: bool,
    pub message: String,
    /// Only set when no automated path exists
    pub manual_instructions: Option<String>,
    pub output_path: Option<PathBuf>,
    /// Per-step failure details (step label plus stderr or error text)
    pub diagnostics: Vec<String>,
}

impl OperationResult {
    pub fn succeeded(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn with_manual_instructions(mut self, text: impl Into<String>) -> Self {
        self.manual_instructions = Some(text.into());
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Vec<String>) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}
