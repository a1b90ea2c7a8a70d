use std::path::Path;

use async_trait::async_trait;
use sandbox::{ImageStore, Sandbox, SandboxConfig, SandboxError, SandboxFactory};
use tracing::{debug, info, warn};

use crate::args;
use crate::command::exec;
use crate::config::DockerConfig;
use crate::prerequisites::{check_binary, check_prerequisites};
use crate::sandbox::DockerSandbox;

/// Creates sandboxes as containers through the Docker CLI.
pub struct DockerFactory {
    config: DockerConfig,
    host_cpus: u32,
    started: bool,
}

impl DockerFactory {
    /// Fails with `BackendNotAvailable` when the CLI cannot be found.
    /// The daemon is first contacted by `startup()`.
    pub fn new(config: DockerConfig) -> Result<Self, SandboxError> {
        let binary = check_binary(&config)?;
        Ok(Self {
            config: DockerConfig { binary },
            host_cpus: host_cpus(),
            started: false,
        })
    }

    fn docker(&self) -> &Path {
        &self.config.binary
    }

    async fn run(&self, args: &[String]) -> Result<String, crate::CommandError> {
        exec(self.docker(), &args::as_strs(args)).await
    }
}

/// CPUs visible to this process, used to cap per-container CPU limits.
fn host_cpus() -> u32 {
    std::thread::available_parallelism()
        .map(|n| u32::try_from(n.get()).unwrap_or(u32::MAX))
        .unwrap_or(1)
}

/// Reject configurations the CLI would fail on in less obvious ways.
fn validate(config: &SandboxConfig) -> Result<(), SandboxError> {
    let valid_name = config
        .name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric())
        && config
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if !valid_name {
        return Err(SandboxError::InvalidConfig(format!(
            "invalid container name: {:?}",
            config.name
        )));
    }
    if config.image.is_empty() {
        return Err(SandboxError::InvalidConfig("image must not be empty".into()));
    }
    if config.resources.cpu_count == 0 || config.resources.memory_mb == 0 {
        return Err(SandboxError::InvalidConfig(format!(
            "resource limits must be positive: {:?}",
            config.resources
        )));
    }
    if let Some(mount) = config.mounts.iter().find(|m| !m.guest_path.starts_with('/')) {
        return Err(SandboxError::InvalidConfig(format!(
            "mount target must be absolute: {}",
            mount.guest_path
        )));
    }
    Ok(())
}

#[async_trait]
impl SandboxFactory for DockerFactory {
    fn name(&self) -> &str {
        "docker"
    }

    async fn startup(&mut self) -> sandbox::Result<()> {
        if self.started {
            return Err(SandboxError::BackendNotAvailable(
                "factory already started".into(),
            ));
        }
        let version = check_prerequisites(&self.config).await?;
        self.started = true;
        info!(version = %version, binary = %self.docker().display(), "factory started");
        Ok(())
    }

    async fn create(&self, config: SandboxConfig) -> sandbox::Result<Box<dyn Sandbox>> {
        if !self.started {
            return Err(SandboxError::CreationFailed("factory not started".into()));
        }
        validate(&config)?;

        if config.resources.cpu_count > self.host_cpus {
            debug!(
                requested = config.resources.cpu_count,
                available = self.host_cpus,
                "capping cpu limit at host count"
            );
        }
        let create = args::create(&config, self.host_cpus);
        self.run(&create)
            .await
            .map_err(|e| SandboxError::CreationFailed(e.to_string()))?;

        info!(id = %config.name, image = %config.image, "sandbox created");
        Ok(Box::new(DockerSandbox::new(
            self.config.binary.clone(),
            &config,
        )))
    }

    async fn destroy(&self, sandbox: Box<dyn Sandbox>) {
        let mut sandbox = match (sandbox as Box<dyn std::any::Any>).downcast::<DockerSandbox>() {
            Ok(s) => *s,
            Err(_) => {
                warn!("destroy called with non-docker sandbox, ignoring");
                return;
            }
        };

        // Ensure the attach client is gone before removing the container.
        let _ = sandbox.kill().await;

        if let Err(e) = self.remove(&sandbox.id).await {
            warn!(id = %sandbox.id, error = %e, "failed to remove container");
            return;
        }
        info!(id = %sandbox.id, "sandbox destroyed");
    }

    async fn remove(&self, id: &str) -> sandbox::Result<()> {
        match self.run(&args::remove(id)).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => {
                debug!(id, "container already removed");
                Ok(())
            }
            Err(e) => Err(SandboxError::RemoveFailed(e.to_string())),
        }
    }

    async fn list(&self) -> sandbox::Result<Vec<String>> {
        let output = self
            .run(&args::list())
            .await
            .map_err(|e| SandboxError::ExecFailed(e.to_string()))?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect())
    }

    async fn shutdown(&mut self) {
        self.started = false;
        info!("factory shutdown complete");
    }
}

#[async_trait]
impl ImageStore for DockerFactory {
    async fn image_exists(&self, image: &str) -> sandbox::Result<bool> {
        match self.run(&args::image_inspect(image)).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(SandboxError::ImageFailed(e.to_string())),
        }
    }

    async fn build_image(&self, image: &str, context_dir: &Path) -> sandbox::Result<()> {
        info!(image, context = %context_dir.display(), "building image");
        let id = self
            .run(&args::build(image, context_dir))
            .await
            .map_err(|e| SandboxError::ImageFailed(e.to_string()))?;
        info!(image, id = %id, "image built");
        Ok(())
    }
}
