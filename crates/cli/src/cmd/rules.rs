use anyhow::{Context, Result};

use bsm_workers::alert::RuleCatalog;
use crate::output::{OutputMode, print_json, print_success, build_table, theme};
use super::helpers;

pub fn execute(mode: OutputMode, config_path: Option<String>) -> Result<()> {
    let cfg = helpers::load_config(config_path.as_deref())?;
    let catalog = RuleCatalog::load_from_file(&cfg.rules_file)
        .with_context(|| format!("loading rules from {}", cfg.rules_file.display()))?;

    match mode {
        OutputMode::Json => print_json(&catalog.rules())?,
        OutputMode::Human => {
            if catalog.is_empty() {
                print_success("No rules defined");
                return Ok(());
            }
            theme::print_header("Threshold Rules");
            let mut table = build_table(&["Sensor", "Min avg", "Max avg", "Trigger count", "Active"]);
            for rule in catalog.rules() {
                let active = catalog
                    .rule_for(&rule.sensor_type)
                    .is_some_and(|first| std::ptr::eq(first, rule));
                table.add_row(vec![
                    rule.sensor_type.clone(),
                    rule.min_allowed_average.to_string(),
                    rule.max_allowed_average.to_string(),
                    rule.consecutive_trigger_count.to_string(),
                    if active { "yes".into() } else { "shadowed".into() },
                ]);
            }
            println!("{table}");
            theme::print_dim(&format!("source: {}", cfg.rules_file.display()));
        }
    }

    Ok(())
}
