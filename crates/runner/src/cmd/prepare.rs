use std::process::ExitCode;
use std::sync::Arc;

use tracing::info;

use crate::config::RunnerConfig;
use crate::error::RunnerResult;

/// Verify the backend and make sure every runtime image exists.
pub async fn run_prepare(config: &RunnerConfig) -> RunnerResult<ExitCode> {
    let factory = Arc::new(super::connect(config).await?);
    let engine = super::build_engine(&factory, config);

    let images = engine.startup().await;
    drop(engine);
    super::release(factory).await;

    let images = images?;
    for image in &images {
        let state = if image.built { "built" } else { "present" };
        println!("{}\t{}\t{state}", image.language, image.image_name);
    }
    info!(count = images.len(), "runtime images ready");
    Ok(ExitCode::SUCCESS)
}
