use std::path::PathBuf;
use std::time::Duration;

use sandbox::ResourceLimits;

pub const DEFAULT_CPU_COUNT: u32 = 4;
pub const DEFAULT_MEMORY_MB: u32 = 512;
pub const DEFAULT_PROVISION_TIMEOUT: Duration = Duration::from_secs(60);

/// Process-wide settings applied identically to every invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub resources: ResourceLimits,
    /// Parent of per-invocation staging directories. `None` uses the
    /// system temp directory.
    pub staging_dir: Option<PathBuf>,
    /// Bound on each backend call that creates or starts a sandbox.
    pub provision_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            resources: ResourceLimits {
                cpu_count: DEFAULT_CPU_COUNT,
                memory_mb: DEFAULT_MEMORY_MB,
            },
            staging_dir: None,
            provision_timeout: DEFAULT_PROVISION_TIMEOUT,
        }
    }
}
