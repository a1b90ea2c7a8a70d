use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("sandbox creation failed: {0}")]
    CreationFailed(String),

    #[error("sandbox start failed: {0}")]
    StartFailed(String),

    #[error("execution failed: {0}")]
    ExecFailed(String),

    #[error("sandbox did not exit within {0:?}")]
    WaitTimeout(Duration),

    #[error("image operation failed: {0}")]
    ImageFailed(String),

    #[error("sandbox removal failed: {0}")]
    RemoveFailed(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, SandboxError>;
