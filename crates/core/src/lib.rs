// PhoneTool Core - Device discovery, registry and operation recipes
// NO process spawning here; adapters implement the ports (infra-system)

pub mod application;
pub mod domain;
pub mod error;
pub mod port;
pub mod settings;

pub use error::{AppError, Result};
pub use settings::{LogFormat, Settings};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
