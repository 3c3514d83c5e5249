// Application Layer - Discovery loop and operation use cases

pub mod operations;
pub mod poller;
pub mod probe;
pub mod recipe;
pub mod registry;
pub mod tools;

// Re-exports
pub use operations::OperationExecutor;
pub use poller::{shutdown_channel, DevicePoller, PollerHandle, PollerState, ShutdownSender, ShutdownToken};
pub use probe::{AndroidProbe, DeviceProbe, IosProbe, ProbeConfig, ProbeReport, ProbeStatus};
pub use recipe::{run_recipe, FailurePolicy, Recipe, RecipeRun, Step};
pub use registry::{DeviceRegistry, DeviceSubscription};
