mod cmd;
mod config;
mod error;

use std::fmt;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

use crate::config::RunnerConfig;
use crate::error::RunnerResult;

struct Elapsed(Instant);

impl FormatTime for Elapsed {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> fmt::Result {
        let d = self.0.elapsed();
        let total_secs = d.as_secs();
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        let millis = d.subsec_millis();
        write!(w, "[{mins:02}:{secs:02}:{millis:03}]")
    }
}

#[derive(Parser)]
#[command(name = "fnrun", version, about = "Run untrusted functions in single-use containers")]
struct Cli {
    /// YAML config file
    #[arg(long, global = true, env = "FNRUN_CONFIG")]
    config: Option<PathBuf>,
    /// Container CLI binary (overrides the config file)
    #[arg(long, global = true, env = "FNRUN_DOCKER")]
    docker: Option<PathBuf>,
    /// Log at debug level (overrides RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Verify Docker and build any missing runtime images
    Prepare,
    /// Run one function and print its report as JSON
    Invoke(Box<cmd::InvokeArgs>),
    /// Remove sandboxes left behind by crashed processes
    Cleanup,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    // stdout is reserved for command output.
    tracing_subscriber::fmt()
        .with_timer(Elapsed(Instant::now()))
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn load_config(cli: &Cli) -> RunnerResult<RunnerConfig> {
    let mut config = match &cli.config {
        Some(path) => config::load(path).await?,
        None => RunnerConfig::default(),
    };
    if let Some(docker) = &cli.docker {
        config.docker_binary = docker.clone();
        config.validate()?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match load_config(&cli).await {
        Ok(config) => match cli.command {
            Command::Prepare => cmd::run_prepare(&config).await,
            Command::Invoke(args) => cmd::run_invoke(*args, &config).await,
            Command::Cleanup => cmd::run_cleanup(&config).await,
        },
        Err(e) => Err(e),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
