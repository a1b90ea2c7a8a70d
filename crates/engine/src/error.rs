use runtime_contract::ContractError;
use sandbox::SandboxError;

use crate::outcome::{FailureStage, Outcome};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("staging failed: {0}")]
    Staging(String),

    #[error("provisioning failed: {0}")]
    Provisioning(#[source] SandboxError),

    #[error("image unavailable: {0}")]
    Image(String),

    #[error("sandbox error: {0}")]
    Sandbox(#[from] SandboxError),

    #[error("protocol error: {0}")]
    Contract(#[from] ContractError),

    #[error("engine is shutting down")]
    ShuttingDown,

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl From<EngineError> for Outcome {
    fn from(err: EngineError) -> Self {
        let stage = match &err {
            EngineError::UnsupportedLanguage(language)
            | EngineError::Contract(ContractError::UnsupportedLanguage(language)) => {
                return Outcome::UnsupportedLanguage {
                    language: language.clone(),
                };
            }
            EngineError::Staging(_) => FailureStage::Staging,
            EngineError::Provisioning(_) => FailureStage::Provisioning,
            EngineError::Image(_) => FailureStage::Image,
            EngineError::Sandbox(_) => FailureStage::Sandbox,
            EngineError::ShuttingDown => FailureStage::Shutdown,
            EngineError::Contract(_) | EngineError::Internal(_) => FailureStage::Internal,
        };
        Outcome::infrastructure(stage, err.to_string())
    }
}
