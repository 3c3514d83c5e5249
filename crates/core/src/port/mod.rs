// Port Layer - Interfaces for external dependencies

pub mod id_provider; // For deterministic testing
pub mod process_invoker;
pub mod time_provider;

// Re-exports
pub use id_provider::IdProvider;
pub use process_invoker::{CapturedOutput, InvokeError, Invocation, ProcessInvoker};
pub use time_provider::TimeProvider;
