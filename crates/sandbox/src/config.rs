use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLimits {
    pub cpu_count: u32,
    pub memory_mb: u32,
}

/// A host directory exposed inside the sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub host_path: PathBuf,
    pub guest_path: String,
    pub read_only: bool,
}

#[derive(Debug, Clone)]
pub struct SandboxConfig {
    pub id: uuid::Uuid,
    /// Backend-visible name. Must be unique among live sandboxes.
    pub name: String,
    pub image: String,
    pub env: Vec<(String, String)>,
    pub mounts: Vec<Mount>,
    pub resources: ResourceLimits,
}
