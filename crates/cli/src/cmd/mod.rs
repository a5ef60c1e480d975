mod aggregates;
mod alerts;
mod check;
pub(crate) mod helpers;
mod rules;
mod run;
mod setup;

use anyhow::Result;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Create the raw, aggregate and alert tables.
    Setup(setup::SetupArgs),
    /// Report which tables exist.
    Check,
    /// List the rule catalog.
    Rules,
    /// List persisted aggregates in an interval.
    Aggregates(RangeArgs),
    /// List persisted alerts in an interval.
    Alerts(RangeArgs),
    /// Run a batch program over an interval.
    Run(run::RunArgs),
}

/// Interval flags shared by the listing commands.
#[derive(clap::Args)]
pub struct RangeArgs {
    #[arg(short = 's', long = "starttime", help = "Interval start (configured datetime format)")]
    pub start: String,
    #[arg(short = 'e', long = "endtime", help = "Interval end, exclusive")]
    pub end: String,
}

pub async fn run(opts: crate::Opts) -> Result<()> {
    let mode = opts.output_mode();
    match opts.cmd {
        Commands::Setup(args) => setup::execute(args, mode, opts.config).await,
        Commands::Check => check::execute(mode, opts.config).await,
        Commands::Rules => rules::execute(mode, opts.config),
        Commands::Aggregates(args) => aggregates::execute(args, mode, opts.config).await,
        Commands::Alerts(args) => alerts::execute(args, mode, opts.config).await,
        Commands::Run(args) => run::execute(args, mode, opts.config).await,
    }
}
