use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use stats_bootstrap::TelemetryOptions;

#[derive(Parser, Debug)]
#[command(name = "mohaa-stats")]
#[command(version, about = "MOHAA telemetry ingestion server", long_about = None)]
struct Args {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also write daily-rotated JSON logs into this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Emit JSON logs on stdout
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _guard = stats_bootstrap::init_tracing(&TelemetryOptions {
        log_dir: args.log_dir,
        json: args.log_json,
    })?;

    stats_bootstrap::run_standalone(args.config).await
}
