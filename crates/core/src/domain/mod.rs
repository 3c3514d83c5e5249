// Domain Layer - Devices, snapshots and operation outcomes

pub mod device;
pub mod error;
pub mod operation;

// Re-exports
pub use device::{Device, DeviceId, DeviceSet, Manufacturer, Platform};
pub use error::DomainError;
pub use operation::{Operation, OperationResult};
