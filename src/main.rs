//! Yield Guard CLI
//!
//! Runs one interactive rebalancing cycle, or watches on a schedule.

use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use yield_guard::{AgentConfig, AgentRunner};

#[derive(Parser)]
#[command(name = "yield-guard")]
#[command(about = "Keeps idle treasury funds supplied to an Aave V3 pool")]
struct Cli {
    /// Run unattended cycles on a schedule
    #[arg(short, long)]
    watch: bool,

    /// Seconds between cycles in watch mode
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    interval: u64,

    /// Seed phrase or private key, overriding AGENT_SEED_PHRASE
    #[arg(long)]
    seed: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_logs);

    let config = match AgentConfig::from_env(cli.seed) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Configuration error");
            return ExitCode::FAILURE;
        }
    };

    let runner = AgentRunner::new(config);

    let result = if cli.watch {
        runner.watch(Duration::from_secs(cli.interval)).await
    } else {
        runner.run_once().await.map(|outcome| {
            info!(outcome = outcome.status(), "Done");
        })
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Agent failed");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
