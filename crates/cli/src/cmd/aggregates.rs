use anyhow::{Context, Result};

use bsm_workers::aggregator::AggregateRecord;
use crate::output::{OutputMode, print_json, print_success, build_table, theme};
use super::{helpers, RangeArgs};

pub async fn execute(args: RangeArgs, mode: OutputMode, config_path: Option<String>) -> Result<()> {
    let cfg = helpers::load_config(config_path.as_deref())?;
    let range = helpers::parse_range(&cfg, &args.start, &args.end)?;
    let stores = helpers::connect(&cfg, mode).await?;

    let records: Vec<AggregateRecord> = stores
        .aggregates
        .scan_by_time_range(range)
        .await
        .context("scanning aggregates")?
        .into_iter()
        .filter(|a| range.contains(a.bucket_start))
        .collect();

    match mode {
        OutputMode::Json => print_json(&records)?,
        OutputMode::Human => {
            if records.is_empty() {
                print_success("No aggregates in range");
                return Ok(());
            }
            theme::print_header("Per-minute Aggregates");
            let mut table =
                build_table(&["Minute", "Device", "Sensor", "Average", "Minimum", "Maximum"]);
            for r in &records {
                table.add_row(vec![
                    r.bucket_start.format(&cfg.datetime_format).to_string(),
                    r.device_id.clone(),
                    r.sensor_type.clone(),
                    r.average.to_string(),
                    r.minimum.to_string(),
                    r.maximum.to_string(),
                ]);
            }
            println!("{table}");
            theme::print_dim(&format!("{} record(s)", records.len()));
        }
    }

    Ok(())
}
