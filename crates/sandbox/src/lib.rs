mod config;
mod error;
mod factory;
mod images;
mod sandbox;
mod types;

pub use config::{Mount, ResourceLimits, SandboxConfig};
pub use error::{Result, SandboxError};
pub use factory::SandboxFactory;
pub use images::ImageStore;
pub use sandbox::Sandbox;
pub use types::ProcessExit;
