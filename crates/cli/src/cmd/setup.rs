use anyhow::{Context, Result};
use clap::Args;

use bsm_workers::storage::setup::{create_tables, TableSelection};
use crate::output::{OutputMode, print_json, print_success, build_table, status_cell};
use super::helpers;

#[derive(Args)]
pub struct SetupArgs {
    #[arg(long, value_enum, default_value_t = TableSelection::All, help = "Table(s) to create")]
    pub tables: TableSelection,
}

pub async fn execute(args: SetupArgs, mode: OutputMode, config_path: Option<String>) -> Result<()> {
    let cfg = helpers::load_config(config_path.as_deref())?;
    let stores = helpers::connect(&cfg, mode).await?;

    let statuses = create_tables(stores.admin.as_ref(), args.tables.kinds(), &cfg.retry_policy())
        .await
        .context("creating tables")?;

    match mode {
        OutputMode::Json => print_json(&statuses)?,
        OutputMode::Human => {
            let mut table = build_table(&["Kind", "Table", "Status"]);
            for s in &statuses {
                let label = if s.created { "created" } else { "already exists" };
                table.add_row(vec![
                    comfy_table::Cell::new(&s.kind),
                    comfy_table::Cell::new(&s.table),
                    status_cell(label, true),
                ]);
            }
            println!("{table}");
            let created = statuses.iter().filter(|s| s.created).count();
            print_success(&format!("{created} table(s) created"));
        }
    }

    Ok(())
}
