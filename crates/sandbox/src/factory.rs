use async_trait::async_trait;

use crate::config::SandboxConfig;
use crate::error::Result;
use crate::sandbox::Sandbox;

#[async_trait]
pub trait SandboxFactory: Send + Sync {
    /// Human-readable name for this factory implementation (e.g. "docker").
    fn name(&self) -> &str;
    /// Verify the backend and initialize factory resources.
    /// Must be called before `create()` or `destroy()`.
    async fn startup(&mut self) -> Result<()>;
    /// Provision a new sandbox. The sandbox is not started.
    async fn create(&self, config: SandboxConfig) -> Result<Box<dyn Sandbox>>;
    /// Tear down a sandbox. Never fails; problems are logged.
    async fn destroy(&self, sandbox: Box<dyn Sandbox>);
    /// Force-remove a sandbox by id. Removing an id that no longer exists
    /// succeeds.
    async fn remove(&self, id: &str) -> Result<()>;
    /// Ids of every sandbox this backend created that still exists,
    /// including ones left behind by earlier processes.
    async fn list(&self) -> Result<Vec<String>>;
    /// Release all factory-level resources.
    /// Requires exclusive ownership: callers sharing via `Arc` must
    /// first recover ownership (e.g. `Arc::try_unwrap`) after all
    /// concurrent users have been dropped.
    async fn shutdown(&mut self);
}
