use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerConfig {
    /// Container CLI. A bare name is resolved on `PATH`.
    pub binary: PathBuf,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("docker"),
        }
    }
}
