use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use sandbox::{ProcessExit, Sandbox, SandboxConfig, SandboxError};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::args;
use crate::command::exec;
use crate::process::kill_process_group;

/// Per-stream capture limit. Output past this is read and discarded so the
/// container never blocks on a full pipe.
const MAX_STREAM_BYTES: u64 = 16 * 1024 * 1024;

/// How long to wait for the attach client to be reaped after SIGKILL.
const KILL_REAP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SandboxState {
    Created,
    Running,
    Exited,
    Stopped,
}

impl std::fmt::Display for SandboxState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => f.write_str("created"),
            Self::Running => f.write_str("running"),
            Self::Exited => f.write_str("exited"),
            Self::Stopped => f.write_str("stopped"),
        }
    }
}

/// A created container driven through an attached `docker start` client.
///
/// Killing the attach client does not stop the container itself;
/// `DockerFactory::destroy` force-removes it afterwards.
pub struct DockerSandbox {
    docker: PathBuf,
    /// Container name.
    pub(crate) id: String,
    state: SandboxState,
    process: Option<tokio::process::Child>,
    stdout: Option<JoinHandle<Vec<u8>>>,
    stderr: Option<JoinHandle<Vec<u8>>>,
}

impl DockerSandbox {
    pub(crate) fn new(docker: PathBuf, config: &SandboxConfig) -> Self {
        Self {
            docker,
            id: config.name.clone(),
            state: SandboxState::Created,
            process: None,
            stdout: None,
            stderr: None,
        }
    }

    fn not_running(&self) -> SandboxError {
        SandboxError::ExecFailed(format!("sandbox {} is {}", self.id, self.state))
    }

    async fn inspect_exit_code(&self) -> Result<i32, String> {
        let inspect = args::exit_code(&self.id);
        let raw = exec(&self.docker, &args::as_strs(&inspect))
            .await
            .map_err(|e| e.to_string())?;
        raw.parse::<i32>()
            .map_err(|e| format!("unexpected exit code {raw:?}: {e}"))
    }
}

async fn collect_stream<R>(reader: R) -> Vec<u8>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let mut limited = reader.take(MAX_STREAM_BYTES);
    if let Err(e) = limited.read_to_end(&mut buf).await {
        warn!(error = %e, "sandbox stream read failed");
        return buf;
    }
    let mut rest = limited.into_inner();
    match tokio::io::copy(&mut rest, &mut tokio::io::sink()).await {
        Ok(0) => {}
        Ok(dropped) => warn!(dropped, "sandbox output truncated"),
        Err(e) => warn!(error = %e, "sandbox stream drain failed"),
    }
    buf
}

async fn join_stream(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    match handle {
        Some(handle) => handle.await.unwrap_or_else(|e| {
            warn!(error = %e, "sandbox stream reader failed");
            Vec::new()
        }),
        None => Vec::new(),
    }
}

#[async_trait]
impl Sandbox for DockerSandbox {
    fn id(&self) -> &str {
        &self.id
    }

    async fn start(&mut self) -> sandbox::Result<()> {
        if self.state != SandboxState::Created {
            return Err(SandboxError::StartFailed(format!(
                "sandbox {} is {}",
                self.id, self.state
            )));
        }

        let start = args::start(&self.id);
        // process_group(0) lets kill() reach the client and anything it spawned.
        let mut child = tokio::process::Command::new(&self.docker)
            .args(&start)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                SandboxError::StartFailed(format!(
                    "failed to spawn {} start: {e}",
                    self.docker.display()
                ))
            })?;

        self.stdout = child.stdout.take().map(|s| tokio::spawn(collect_stream(s)));
        self.stderr = child.stderr.take().map(|s| tokio::spawn(collect_stream(s)));
        self.process = Some(child);
        self.state = SandboxState::Running;

        info!(id = %self.id, "sandbox started");
        Ok(())
    }

    async fn kill(&mut self) -> sandbox::Result<()> {
        if let Some(mut child) = self.process.take() {
            kill_process_group(&child);
            if tokio::time::timeout(KILL_REAP_TIMEOUT, child.wait())
                .await
                .is_err()
            {
                warn!(id = %self.id, "attach client did not exit after SIGKILL");
            }
        }
        for handle in [self.stdout.take(), self.stderr.take()].into_iter().flatten() {
            handle.abort();
        }
        if self.state != SandboxState::Stopped {
            self.state = SandboxState::Stopped;
            debug!(id = %self.id, "sandbox killed");
        }
        Ok(())
    }

    async fn write_stdin(&mut self, payload: &[u8]) -> sandbox::Result<()> {
        if self.state != SandboxState::Running {
            return Err(self.not_running());
        }
        let Some(child) = self.process.as_mut() else {
            return Err(self.not_running());
        };
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| SandboxError::ExecFailed(format!("stdin of {} already closed", self.id)))?;

        stdin
            .write_all(payload)
            .await
            .map_err(|e| SandboxError::ExecFailed(format!("write stdin of {}: {e}", self.id)))?;
        // Dropping the handle closes the pipe, which the container sees as EOF.
        drop(stdin);
        Ok(())
    }

    async fn wait_exit(&mut self, timeout: Duration) -> sandbox::Result<ProcessExit> {
        if self.state != SandboxState::Running {
            return Err(self.not_running());
        }
        let Some(child) = self.process.as_mut() else {
            return Err(self.not_running());
        };
        // Never leave stdin open while waiting; a container blocked on input
        // would otherwise only end at the deadline.
        drop(child.stdin.take());

        let status = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                return Err(SandboxError::ExecFailed(format!(
                    "wait for {}: {e}",
                    self.id
                )));
            }
            Err(_) => return Err(SandboxError::WaitTimeout(timeout)),
        };
        self.state = SandboxState::Exited;

        let stdout = join_stream(self.stdout.take()).await;
        let stderr = join_stream(self.stderr.take()).await;

        // The attach client mirrors the container's status, but it also exits
        // non-zero for its own failures, so the daemon's record wins.
        let exit_code = match self.inspect_exit_code().await {
            Ok(code) => code,
            Err(e) => {
                warn!(id = %self.id, error = %e, "inspect failed, using attach exit status");
                status.code().ok_or_else(|| {
                    SandboxError::ExecFailed(format!(
                        "attach client for {} terminated by signal",
                        self.id
                    ))
                })?
            }
        };

        debug!(id = %self.id, exit_code, stdout_bytes = stdout.len(), stderr_bytes = stderr.len(), "sandbox exited");
        Ok(ProcessExit {
            exit_code,
            stdout,
            stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use sandbox::ResourceLimits;
    use uuid::Uuid;

    use super::*;

    fn sandbox() -> DockerSandbox {
        let config = SandboxConfig {
            id: Uuid::new_v4(),
            name: "function-test-0000".into(),
            image: "img".into(),
            env: Vec::new(),
            mounts: Vec::new(),
            resources: ResourceLimits {
                cpu_count: 1,
                memory_mb: 64,
            },
        };
        DockerSandbox::new(PathBuf::from("/nonexistent/docker"), &config)
    }

    #[tokio::test]
    async fn collect_stream_reads_everything_below_cap() {
        let data = b"hello world".to_vec();
        let out = collect_stream(&data[..]).await;
        assert_eq!(out, data);
    }

    #[tokio::test]
    async fn collect_stream_truncates_at_cap() {
        let cap = usize::try_from(MAX_STREAM_BYTES).unwrap();
        let data = vec![b'x'; cap + 1024];
        let out = collect_stream(&data[..]).await;
        assert_eq!(out.len(), cap);
    }

    #[tokio::test]
    async fn io_before_start_is_rejected() {
        let mut sb = sandbox();
        let err = sb.write_stdin(b"{}").await.unwrap_err();
        assert!(err.to_string().contains("created"), "err was: {err}");
        let err = sb.wait_exit(Duration::from_millis(10)).await.unwrap_err();
        assert!(matches!(err, SandboxError::ExecFailed(_)));
    }

    #[tokio::test]
    async fn start_with_missing_binary_fails() {
        let mut sb = sandbox();
        let err = sb.start().await.unwrap_err();
        assert!(matches!(err, SandboxError::StartFailed(_)));
    }

    #[tokio::test]
    async fn kill_is_idempotent() {
        let mut sb = sandbox();
        sb.kill().await.unwrap();
        sb.kill().await.unwrap();
        assert_eq!(sb.state, SandboxState::Stopped);
        let err = sb.start().await.unwrap_err();
        assert!(err.to_string().contains("stopped"));
    }
}
