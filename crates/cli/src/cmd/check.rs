use anyhow::{bail, Context, Result};

use bsm_workers::storage::setup::check_tables;
use bsm_workers::storage::TableKind;
use crate::output::{OutputMode, print_json, print_success, build_table, status_cell, theme};
use super::helpers;

pub async fn execute(mode: OutputMode, config_path: Option<String>) -> Result<()> {
    let cfg = helpers::load_config(config_path.as_deref())?;
    let stores = helpers::connect(&cfg, mode).await?;

    let statuses = check_tables(stores.admin.as_ref(), &TableKind::ALL, &cfg.retry_policy())
        .await
        .context("checking tables")?;
    let missing: Vec<&str> = statuses
        .iter()
        .filter(|s| !s.exists)
        .map(|s| s.table.as_str())
        .collect();

    match mode {
        OutputMode::Json => print_json(&statuses)?,
        OutputMode::Human => {
            let mut table = build_table(&["Kind", "Table", "Exists"]);
            for s in &statuses {
                table.add_row(vec![
                    comfy_table::Cell::new(&s.kind),
                    comfy_table::Cell::new(&s.table),
                    status_cell(if s.exists { "yes" } else { "no" }, s.exists),
                ]);
            }
            println!("{table}");
            if missing.is_empty() {
                print_success("All tables present");
            } else {
                theme::print_warning("Run `bsm setup` to create the missing tables");
            }
        }
    }

    if !missing.is_empty() {
        bail!("missing table(s): {}", missing.join(", "));
    }
    Ok(())
}
