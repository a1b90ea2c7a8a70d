mod args;
mod command;
mod config;
mod factory;
mod prerequisites;
mod process;
mod sandbox;

pub use args::{INVOCATION_LABEL, MANAGED_LABEL};
pub use command::CommandError;
pub use config::DockerConfig;
pub use factory::DockerFactory;
pub use sandbox::DockerSandbox;
