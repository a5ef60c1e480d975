use bsm_common::retry::retry_async;
use bsm_common::time::TimeRange;

use crate::config::AppConfig;
use crate::error::RunError;
use crate::processor::{Engine, EngineKind, RunReport};
use crate::storage::postgres::create_pool;
use crate::storage::setup::require_tables;
use crate::storage::{PgStore, StoreError, Stores};

/// Opens the Postgres pool described by `config`, retrying per its policy.
pub async fn connect(config: &AppConfig) -> Result<Stores, RunError> {
    let retry = config.retry_policy();
    let pool = retry_async(&retry, "connect", || {
        create_pool(&config.database_url, config.max_connections)
    })
    .await
    .map_err(|e| RunError::DependencyUnavailable(StoreError::Database(e)))?;
    tracing::info!(max_connections = config.max_connections, "database pool ready");

    Ok(Stores::postgres(PgStore::new(
        pool,
        config.table_names(),
        config.scan_page_size,
    )))
}

/// Checks the engine's tables, then runs it over `range`.
pub async fn run_program(
    config: &AppConfig,
    kind: EngineKind,
    range: TimeRange,
    stores: &Stores,
) -> Result<RunReport, RunError> {
    require_tables(
        stores.admin.as_ref(),
        kind.required_tables(),
        &config.retry_policy(),
    )
    .await
    .map_err(RunError::DependencyUnavailable)?;

    let engine = Engine::build(kind, stores, config)?;
    tracing::info!(program = %kind, start = %range.start, end = %range.end, "starting run");
    let report = engine.run(range).await?;
    tracing::info!(program = %kind, "{report}");
    Ok(report)
}

/// Parses the interval with the configured format and runs `kind`.
pub async fn run_with_interval(
    config: &AppConfig,
    kind: EngineKind,
    start: &str,
    end: &str,
    stores: &Stores,
) -> Result<RunReport, RunError> {
    let range = TimeRange::parse(start, end, &config.datetime_format)?;
    run_program(config, kind, range, stores).await
}
