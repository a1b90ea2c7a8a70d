use std::process::ExitCode;

use sandbox::SandboxFactory;
use tracing::{info, warn};

use crate::config::RunnerConfig;
use crate::error::RunnerResult;

/// Force-remove every managed sandbox still present on the host, e.g. after
/// a crash. Also removes sandboxes of other `fnrun` processes running now.
pub async fn run_cleanup(config: &RunnerConfig) -> RunnerResult<ExitCode> {
    let mut factory = super::connect(config).await?;

    let names = match factory.list().await {
        Ok(names) => names,
        Err(e) => {
            factory.shutdown().await;
            return Err(e.into());
        }
    };

    let mut failed = 0usize;
    for name in &names {
        match factory.remove(name).await {
            Ok(()) => println!("{name}"),
            Err(e) => {
                warn!(sandbox = %name, error = %e, "failed to remove sandbox");
                failed += 1;
            }
        }
    }

    factory.shutdown().await;

    info!(removed = names.len() - failed, failed, "cleanup finished");
    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
