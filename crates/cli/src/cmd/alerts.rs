use anyhow::{Context, Result};

use bsm_workers::alert::AlertRecord;
use crate::output::{OutputMode, print_json, print_success, build_table, theme};
use super::{helpers, RangeArgs};

pub async fn execute(args: RangeArgs, mode: OutputMode, config_path: Option<String>) -> Result<()> {
    let cfg = helpers::load_config(config_path.as_deref())?;
    let range = helpers::parse_range(&cfg, &args.start, &args.end)?;
    let stores = helpers::connect(&cfg, mode).await?;

    let alerts: Vec<AlertRecord> = stores
        .alerts
        .scan_by_time_range(range)
        .await
        .context("scanning alerts")?
        .into_iter()
        .filter(|a| range.contains(a.breach_time))
        .collect();

    match mode {
        OutputMode::Json => print_json(&alerts)?,
        OutputMode::Human => {
            if alerts.is_empty() {
                print_success("No alerts in range");
                return Ok(());
            }
            theme::print_header("Breach Alerts");
            let mut table = build_table(&["Breach time", "Device", "Sensor", "Message"]);
            for a in &alerts {
                table.add_row(vec![
                    a.breach_time.format(&cfg.datetime_format).to_string(),
                    a.device_id.clone(),
                    a.sensor_type.clone(),
                    a.message.clone(),
                ]);
            }
            println!("{table}");
            theme::print_dim(&format!("{} alert(s)", alerts.len()));
        }
    }

    Ok(())
}
