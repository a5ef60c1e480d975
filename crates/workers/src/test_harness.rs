//! Runs the aggregation and rule engines back to back against an
//! in-memory store. Used by tests and for dry runs of a rule catalog.

use bsm_common::retry::RetryPolicy;
use bsm_common::time::TimeRange;

use crate::aggregator::{AggregateRecord, AggregationEngine, AggregationReport};
use crate::alert::{AlertRecord, EvaluationReport, RuleCatalog, RuleEvaluator};
use crate::error::RunError;
use crate::reading::Reading;
use crate::storage::{MemoryStore, ReadingStore, StoreError};

pub struct HarnessResult {
    pub aggregation: AggregationReport,
    pub evaluation: Option<EvaluationReport>,
    pub aggregates: Vec<AggregateRecord>,
    pub alerts: Vec<AlertRecord>,
}

pub async fn seed(store: &MemoryStore, readings: &[Reading]) -> Result<(), StoreError> {
    for reading in readings {
        ReadingStore::insert(store, reading).await?;
    }
    Ok(())
}

/// Seeds `readings`, aggregates them and evaluates `catalog` over the
/// same range. An interval with no aggregates skips evaluation instead
/// of failing.
pub async fn run_pipeline(
    catalog: RuleCatalog,
    readings: &[Reading],
    range: TimeRange,
) -> Result<HarnessResult, RunError> {
    let store = MemoryStore::new();
    seed(&store, readings)
        .await
        .map_err(RunError::DependencyUnavailable)?;
    run_pipeline_on(&store, catalog, range, RetryPolicy::no_retry()).await
}

pub async fn run_pipeline_on(
    store: &MemoryStore,
    catalog: RuleCatalog,
    range: TimeRange,
    retry: RetryPolicy,
) -> Result<HarnessResult, RunError> {
    let shared = std::sync::Arc::new(store.clone());

    let aggregation = AggregationEngine::new(shared.clone(), shared.clone(), retry.clone())
        .run(range)
        .await?;

    let evaluator = RuleEvaluator::new(shared.clone(), shared, catalog, retry);
    let evaluation = match evaluator.run(range).await {
        Ok(report) => Some(report),
        Err(RunError::NoAggregates { .. }) => None,
        Err(e) => return Err(e),
    };

    Ok(HarnessResult {
        aggregation,
        evaluation,
        aggregates: store.all_aggregates(),
        alerts: store.all_alerts(),
    })
}
