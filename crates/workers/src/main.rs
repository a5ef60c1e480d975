use std::path::PathBuf;
use std::process::ExitCode;

use bsm_workers::config::load_from_file;
use bsm_workers::logging::init_tracing;
use bsm_workers::runner::{connect, run_with_interval};
use bsm_workers::{EngineKind, RunError, RunReport};
use clap::Parser;

/// Runs one batch program over a bounded interval.
#[derive(Parser, Debug)]
#[command(name = "bsm-runner", version, about = "Bedside monitor batch runner")]
struct Args {
    /// Interval start, in the configured datetime format (e.g. "21/06/12 18:26:00").
    #[arg(short = 's', long = "starttime")]
    start: String,

    /// Interval end (exclusive).
    #[arg(short = 'e', long = "endtime")]
    end: String,

    #[arg(short = 'p', long = "program", value_enum)]
    program: EngineKind,

    #[arg(long, default_value = "configs/config.json")]
    config: PathBuf,
}

async fn run(args: Args) -> Result<RunReport, RunError> {
    let config = load_from_file(&args.config)?;
    let stores = connect(&config).await?;
    run_with_interval(&config, args.program, &args.start, &args.end, &stores).await
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();
    let program = args.program;

    match run(args).await {
        Ok(report) => {
            println!("{report}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(program = %program, kind = e.kind(), error = %e, "run failed");
            eprintln!("{program} failed: {e}");
            ExitCode::FAILURE
        }
    }
}
