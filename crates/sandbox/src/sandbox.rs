use std::any::Any;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::ProcessExit;

/// One provisioned, single-use sandbox.
///
/// The `Any` bound allows `SandboxFactory::destroy()` to downcast
/// `Box<dyn Sandbox>` back to the concrete type for backend-specific cleanup.
#[async_trait]
pub trait Sandbox: Send + Sync + Any {
    // -- identity --
    fn id(&self) -> &str;

    // -- lifecycle --
    /// Start the sandbox in the background with its stdin channel open.
    async fn start(&mut self) -> Result<()>;
    /// Stop the sandbox's process immediately. Idempotent.
    async fn kill(&mut self) -> Result<()>;

    // -- io --
    /// Write `payload` to stdin and close it. Only one write is supported.
    async fn write_stdin(&mut self, payload: &[u8]) -> Result<()>;
    /// Wait for the sandbox to exit, returning `SandboxError::WaitTimeout`
    /// if it is still running after `timeout`.
    async fn wait_exit(&mut self, timeout: Duration) -> Result<ProcessExit>;
}
