use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::trace;

/// Error from a failed command.
#[derive(Debug, thiserror::Error)]
#[error("command failed: {command}\n{detail}")]
pub struct CommandError {
    pub command: String,
    pub detail: String,
}

impl CommandError {
    /// True when the container CLI reported that the target object is gone.
    pub fn is_not_found(&self) -> bool {
        let detail = self.detail.to_ascii_lowercase();
        detail.contains("no such container")
            || detail.contains("no such image")
            || detail.contains("no such object")
    }
}

/// Format a human-readable display string for a direct command invocation.
fn format_command_display(program: &Path, args: &[&str]) -> String {
    let program = program.display().to_string();
    let mut parts = Vec::with_capacity(args.len() + 1);
    parts.push(program.as_str());
    parts.extend_from_slice(args);
    parts.join(" ")
}

fn command(program: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args).stdin(Stdio::null()).kill_on_drop(true);
    cmd
}

/// Execute a command.
///
/// Invokes the program binary directly with the given arguments.
/// Returns trimmed stdout on success.
pub async fn exec(program: &Path, args: &[&str]) -> Result<String, CommandError> {
    let cmd_display = format_command_display(program, args);
    trace!(command = %cmd_display, "exec");

    let output = command(program, args)
        .output()
        .await
        .map_err(|e| CommandError {
            command: cmd_display.clone(),
            detail: e.to_string(),
        })?;

    if output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(stdout)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(CommandError {
            command: cmd_display,
            detail: stderr,
        })
    }
}
