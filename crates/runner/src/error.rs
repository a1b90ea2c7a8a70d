#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    Input(String),

    #[error("sandbox error: {0}")]
    Sandbox(#[from] sandbox::SandboxError),

    #[error("engine error: {0}")]
    Engine(#[from] engine::EngineError),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type RunnerResult<T> = Result<T, RunnerError>;
