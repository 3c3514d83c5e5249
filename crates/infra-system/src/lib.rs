// PhoneTool Infrastructure - System Adapters
// Implements: ProcessInvoker, tool lookup, settings loading

pub mod settings_loader;
pub mod subprocess_invoker;
pub mod tool_check;

pub use settings_loader::load_settings;
pub use subprocess_invoker::SubprocessInvoker;
pub use tool_check::{ToolChecker, ToolError, ToolFamily, ToolReport, ToolResolver};
