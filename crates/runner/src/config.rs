use std::path::{Path, PathBuf};
use std::time::Duration;

use engine::{DEFAULT_CPU_COUNT, DEFAULT_MEMORY_MB, DEFAULT_PROVISION_TIMEOUT, EngineConfig};
use sandbox::ResourceLimits;
use sandbox_docker::DockerConfig;
use serde::{Deserialize, Serialize};

use crate::error::{RunnerError, RunnerResult};

pub(crate) const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub(crate) const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerConfig {
    /// Container CLI. A bare name is looked up on `PATH`.
    pub docker_binary: PathBuf,
    pub memory_mb: u32,
    pub cpu_count: u32,
    /// Parent of per-invocation staging directories.
    pub staging_dir: Option<PathBuf>,
    /// Used when `invoke` is not given `--timeout-ms`.
    pub default_timeout_ms: u64,
    /// Upper bound on cleanup after SIGINT/SIGTERM.
    pub shutdown_grace_ms: u64,
    /// Bound on creating or starting one sandbox.
    pub provision_timeout_ms: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            docker_binary: PathBuf::from("docker"),
            memory_mb: DEFAULT_MEMORY_MB,
            cpu_count: DEFAULT_CPU_COUNT,
            staging_dir: None,
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            shutdown_grace_ms: DEFAULT_SHUTDOWN_GRACE_MS,
            provision_timeout_ms: u64::try_from(DEFAULT_PROVISION_TIMEOUT.as_millis())
                .unwrap_or(u64::MAX),
        }
    }
}

/// Load and validate a runner config from a YAML file.
///
/// Relative paths in the config are resolved against the config file's parent directory.
/// An empty file yields the defaults.
pub async fn load(path: &Path) -> RunnerResult<RunnerConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| RunnerError::Config(format!("read {}: {e}", path.display())))?;
    let mut config: RunnerConfig = if content.trim().is_empty() {
        RunnerConfig::default()
    } else {
        serde_yaml_ng::from_str(&content)
            .map_err(|e| RunnerError::Config(format!("parse {}: {e}", path.display())))?
    };
    if let Some(config_dir) = path.parent() {
        config.resolve_relative_paths(config_dir);
    }
    config.validate()?;
    Ok(config)
}

impl RunnerConfig {
    /// Resolve relative paths against `config_dir` (the directory containing the YAML file).
    ///
    /// A bare `docker_binary` such as `docker` is left alone for `PATH` lookup.
    fn resolve_relative_paths(&mut self, config_dir: &Path) {
        if self.docker_binary.is_relative() && self.docker_binary.components().count() > 1 {
            self.docker_binary = config_dir.join(&self.docker_binary);
        }
        if let Some(dir) = &mut self.staging_dir
            && dir.is_relative()
        {
            *dir = config_dir.join(&*dir);
        }
    }

    pub fn validate(&self) -> RunnerResult<()> {
        let mut errors = Vec::new();
        if self.memory_mb == 0 {
            errors.push("memory_mb must be positive");
        }
        if self.cpu_count == 0 {
            errors.push("cpu_count must be positive");
        }
        if self.default_timeout_ms == 0 {
            errors.push("default_timeout_ms must be positive");
        }
        if self.provision_timeout_ms == 0 {
            errors.push("provision_timeout_ms must be positive");
        }
        if self.docker_binary.as_os_str().is_empty() {
            errors.push("docker_binary must not be empty");
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(RunnerError::Config(errors.join("; ")))
        }
    }

    pub fn docker_config(&self) -> DockerConfig {
        DockerConfig {
            binary: self.docker_binary.clone(),
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            resources: ResourceLimits {
                cpu_count: self.cpu_count,
                memory_mb: self.memory_mb,
            },
            staging_dir: self.staging_dir.clone(),
            provision_timeout: Duration::from_millis(self.provision_timeout_ms),
        }
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}
