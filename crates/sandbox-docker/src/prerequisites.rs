use std::path::PathBuf;

use sandbox::SandboxError;

use crate::args;
use crate::command::exec;
use crate::config::DockerConfig;

/// Locate the container CLI without contacting the daemon.
pub(crate) fn check_binary(config: &DockerConfig) -> Result<PathBuf, SandboxError> {
    which::which(&config.binary).map_err(|e| {
        SandboxError::BackendNotAvailable(format!(
            "container CLI not found: {} ({e})",
            config.binary.display()
        ))
    })
}

/// Verify that the CLI is installed and its daemon answers.
///
/// Collects all failures and returns them in a single `BackendNotAvailable`
/// error. On success returns the daemon's version string.
pub(crate) async fn check_prerequisites(config: &DockerConfig) -> Result<String, SandboxError> {
    let mut errors = Vec::new();

    let version = match check_binary(config) {
        Ok(binary) => check_daemon(&binary, &mut errors).await,
        Err(e) => {
            errors.push(e.to_string());
            None
        }
    };

    match version {
        Some(version) if errors.is_empty() => Ok(version),
        _ => Err(SandboxError::BackendNotAvailable(errors.join("; "))),
    }
}

async fn check_daemon(binary: &std::path::Path, errors: &mut Vec<String>) -> Option<String> {
    let version_args = args::server_version();
    match exec(binary, &args::as_strs(&version_args)).await {
        Ok(version) if !version.is_empty() => Some(version),
        Ok(_) => {
            errors.push("container daemon reported an empty server version".to_string());
            None
        }
        Err(e) => {
            errors.push(format!("container daemon unreachable: {}", e.detail));
            None
        }
    }
}
