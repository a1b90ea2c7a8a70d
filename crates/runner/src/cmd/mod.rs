mod cleanup;
mod invoke;
mod prepare;

use std::sync::Arc;

use engine::Engine;
use sandbox::SandboxFactory;
use sandbox_docker::DockerFactory;
use tracing::warn;

use crate::config::RunnerConfig;
use crate::error::RunnerResult;

pub use cleanup::run_cleanup;
pub use invoke::{InvokeArgs, run_invoke};
pub use prepare::run_prepare;

/// Create and start the Docker backend.
async fn connect(config: &RunnerConfig) -> RunnerResult<DockerFactory> {
    let mut factory = DockerFactory::new(config.docker_config())?;
    factory.startup().await?;
    Ok(factory)
}

fn build_engine(factory: &Arc<DockerFactory>, config: &RunnerConfig) -> Engine {
    Engine::new(factory.clone(), factory.clone(), config.engine_config())
}

/// Shut the backend down. Every engine built on it must be dropped first.
async fn release(factory: Arc<DockerFactory>) {
    match Arc::try_unwrap(factory) {
        Ok(mut factory) => factory.shutdown().await,
        Err(_) => warn!("backend still in use, skipping factory shutdown"),
    }
}

/// Wait for SIGINT or SIGTERM and return its name.
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate()).ok();
    let mut sigint = signal(SignalKind::interrupt()).ok();

    tokio::select! {
        _ = recv_signal(&mut sigterm) => "SIGTERM",
        _ = recv_signal(&mut sigint) => "SIGINT",
    }
}

/// Await a signal if registered, or pend forever if registration failed.
async fn recv_signal(sig: &mut Option<tokio::signal::unix::Signal>) {
    match sig {
        Some(s) => {
            s.recv().await;
        }
        None => std::future::pending().await,
    }
}
