use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use engine::{Engine, Invocation, InvocationReport};
use serde_json::Value;
use tracing::{info, warn};

use crate::config::RunnerConfig;
use crate::error::{RunnerError, RunnerResult};

/// Conventional exit status after SIGINT.
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Args)]
pub struct InvokeArgs {
    /// Runtime language (python or javascript)
    #[arg(long, short)]
    language: String,
    /// File containing the handler source
    #[arg(long)]
    code: PathBuf,
    /// Event as inline JSON [default: {}]
    #[arg(long, conflicts_with = "event_file")]
    event: Option<String>,
    /// File containing the event JSON
    #[arg(long)]
    event_file: Option<PathBuf>,
    /// Invocation timeout in milliseconds [default: from config]
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Function identifier used in the sandbox name
    #[arg(long, default_value = "local")]
    function_id: String,
    /// Function name exposed to the handler [default: code file stem]
    #[arg(long)]
    function_name: Option<String>,
    /// Only build the image for this language, on demand
    #[arg(long)]
    lazy_images: bool,
}

/// Run one function and print its report as JSON on stdout.
///
/// Exits 0 only for a successful outcome. SIGINT/SIGTERM abort the
/// invocation and remove its sandbox within the configured grace period.
pub async fn run_invoke(args: InvokeArgs, config: &RunnerConfig) -> RunnerResult<ExitCode> {
    let lazy_images = args.lazy_images;
    let invocation = build_invocation(args, config).await?;

    let factory = Arc::new(super::connect(config).await?);
    let engine = super::build_engine(&factory, config);

    let report = run_engine(&engine, invocation, lazy_images, config).await;
    drop(engine);
    super::release(factory).await;

    let Some(report) = report? else {
        return Ok(ExitCode::from(EXIT_INTERRUPTED));
    };

    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| RunnerError::Internal(format!("serialize report: {e}")))?;
    println!("{json}");

    Ok(if report.outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// `None` when a signal interrupted the invocation.
async fn run_engine(
    engine: &Engine,
    invocation: Invocation,
    lazy_images: bool,
    config: &RunnerConfig,
) -> RunnerResult<Option<InvocationReport>> {
    if !lazy_images {
        engine.startup().await?;
    }

    tokio::select! {
        report = engine.execute(invocation) => Ok(Some(report)),
        signal = super::wait_for_signal() => {
            info!(signal, "received signal, shutting down");
            if tokio::time::timeout(config.shutdown_grace(), engine.shutdown()).await.is_err() {
                warn!("shutdown grace period elapsed, run `fnrun cleanup` to remove leftovers");
            }
            Ok(None)
        }
    }
}

async fn build_invocation(args: InvokeArgs, config: &RunnerConfig) -> RunnerResult<Invocation> {
    let code = read_input(&args.code, "code").await?;
    let event_file = match &args.event_file {
        Some(path) => Some(read_input(path, "event file").await?),
        None => None,
    };
    let event = parse_event(args.event.as_deref(), event_file.as_deref())?;

    let timeout_ms = args.timeout_ms.unwrap_or(config.default_timeout_ms);
    if timeout_ms == 0 {
        return Err(RunnerError::Input("--timeout-ms must be positive".into()));
    }

    let function_name = args
        .function_name
        .unwrap_or_else(|| default_function_name(&args.code));

    Ok(Invocation {
        function_id: args.function_id,
        function_name,
        language: args.language,
        code,
        event,
        timeout_ms,
    })
}

async fn read_input(path: &Path, label: &str) -> RunnerResult<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| RunnerError::Input(format!("read {label} {}: {e}", path.display())))
}

/// Inline JSON wins over file contents; neither means an empty object.
fn parse_event(inline: Option<&str>, file: Option<&str>) -> RunnerResult<Value> {
    match inline.or(file) {
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| RunnerError::Input(format!("event is not valid JSON: {e}"))),
        None => Ok(Value::Object(serde_json::Map::new())),
    }
}

fn default_function_name(code: &Path) -> String {
    code.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or("function")
        .to_string()
}
