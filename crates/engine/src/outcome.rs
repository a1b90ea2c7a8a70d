use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Where an infrastructure failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// Writing the function's code to the host.
    Staging,
    /// Creating or starting the sandbox.
    Provisioning,
    /// Checking or building the runtime image.
    Image,
    /// Talking to a running sandbox.
    Sandbox,
    /// The engine was shutting down.
    Shutdown,
    Internal,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Staging => f.write_str("staging"),
            Self::Provisioning => f.write_str("provisioning"),
            Self::Image => f.write_str("image"),
            Self::Sandbox => f.write_str("sandbox"),
            Self::Shutdown => f.write_str("shutdown"),
            Self::Internal => f.write_str("internal"),
        }
    }
}

/// Classified result of one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// The handler returned; `value` is its JSON result.
    Success { value: Value },
    /// The sandbox exited non-zero. `stderr` is passed through verbatim.
    RuntimeFailure { exit_code: i32, stderr: String },
    /// Exit status zero, but stdout was not exactly one JSON document.
    MalformedOutput { raw: String },
    Timeout,
    UnsupportedLanguage { language: String },
    InfrastructureError {
        stage: FailureStage,
        description: String,
    },
}

impl Outcome {
    /// Stable snake_case tag, identical to the serialized `kind`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::RuntimeFailure { .. } => "runtime_failure",
            Self::MalformedOutput { .. } => "malformed_output",
            Self::Timeout => "timeout",
            Self::UnsupportedLanguage { .. } => "unsupported_language",
            Self::InfrastructureError { .. } => "infrastructure_error",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub(crate) fn infrastructure(stage: FailureStage, description: impl Into<String>) -> Self {
        Self::InfrastructureError {
            stage,
            description: description.into(),
        }
    }
}

/// An [`Outcome`] plus bookkeeping about the run that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationReport {
    pub invocation_id: Uuid,
    pub function_id: String,
    /// Absent when the invocation was rejected before a name was assigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sandbox_name: Option<String>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub outcome: Outcome,
}
