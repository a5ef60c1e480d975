use anyhow::Result;
use clap::Args;

use bsm_workers::runner::run_program;
use bsm_workers::{EngineKind, RunReport};
use crate::output::{OutputMode, print_json, print_error, spinner, theme};
use super::helpers;

#[derive(Args)]
pub struct RunArgs {
    #[arg(short = 's', long = "starttime", help = "Interval start (configured datetime format)")]
    pub start: String,
    #[arg(short = 'e', long = "endtime", help = "Interval end, exclusive")]
    pub end: String,
    #[arg(short = 'p', long = "program", value_enum, help = "Batch program to run")]
    pub program: EngineKind,
}

pub async fn execute(args: RunArgs, mode: OutputMode, config_path: Option<String>) -> Result<()> {
    let cfg = helpers::load_config(config_path.as_deref())?;
    let range = helpers::parse_range(&cfg, &args.start, &args.end)?;
    let stores = helpers::connect(&cfg, mode).await?;

    let sp = match mode {
        OutputMode::Human => Some(spinner::create(&format!("Running {}...", args.program))),
        OutputMode::Json => None,
    };

    let result = run_program(&cfg, args.program, range, &stores).await;

    let report = match result {
        Ok(report) => {
            if let Some(sp) = sp {
                spinner::finish_ok(&sp, &format!("{} finished", args.program));
            }
            report
        }
        Err(e) => {
            if let Some(sp) = sp {
                spinner::finish_err(&sp, &format!("{} failed", args.program));
            }
            let kind = e.kind();
            let err = anyhow::Error::new(e);
            if mode == OutputMode::Human {
                print_error(&format!("run aborted ({kind})"), &err);
            }
            return Err(err);
        }
    };

    match mode {
        OutputMode::Json => print_json(&report)?,
        OutputMode::Human => print_report(&report),
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    theme::print_header("Run Report");
    match report {
        RunReport::Aggregates(r) => {
            theme::print_kv("Program", "aggregates");
            theme::print_kv("Readings scanned", &r.readings_scanned.to_string());
            theme::print_kv("Readings in range", &r.readings_in_range.to_string());
            theme::print_kv("Records written", &r.records_written.to_string());
            theme::print_kv_colored(
                "Buckets skipped",
                &r.buckets_skipped.to_string(),
                r.buckets_skipped == 0,
            );
        }
        RunReport::Rules(r) => {
            theme::print_kv("Program", "rules");
            theme::print_kv("Devices", &r.devices.to_string());
            theme::print_kv("Pairs evaluated", &r.pairs_evaluated.to_string());
            theme::print_kv("Breaching minutes", &r.breaches.to_string());
            theme::print_kv_colored("Alerts raised", &r.alerts_raised.to_string(), r.alerts_raised == 0);
            for alert in &r.alerts {
                theme::print_dim(&alert.message);
            }
        }
    }
    println!();
}
