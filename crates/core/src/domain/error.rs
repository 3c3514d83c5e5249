// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid poller state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Operation {operation} is not supported on {platform}")]
    UnsupportedPlatform { operation: String, platform: String },
}

pub type Result<T> = std::result::Result<T, DomainError>;
