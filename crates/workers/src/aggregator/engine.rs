use std::sync::Arc;

use bsm_common::retry::{retry_async_if, RetryPolicy};
use bsm_common::time::TimeRange;
use chrono::NaiveDateTime;
use serde::Serialize;

use super::bucket::{group_by_bucket, BucketKey, BucketStats};
use super::record::AggregateRecord;
use crate::error::{ComputationError, RunError};
use crate::reading::Reading;
use crate::storage::{AggregateStore, ReadingStore, StoreError};

/// Result of summarising a set of readings, before persistence.
#[derive(Debug, Clone, Default)]
pub struct AggregationOutcome {
    pub records: Vec<AggregateRecord>,
    pub skipped: Vec<(BucketKey, ComputationError)>,
}

/// Groups `readings` into minute buckets and summarises each one.
/// Buckets whose statistics cannot be computed are reported in
/// `skipped` rather than failing the whole set.
pub fn aggregate(readings: &[Reading], computed_at: NaiveDateTime) -> AggregationOutcome {
    let mut outcome = AggregationOutcome::default();
    for bucket in group_by_bucket(readings) {
        match BucketStats::compute(&bucket.values) {
            Ok(stats) => outcome
                .records
                .push(AggregateRecord::from_bucket(bucket.key, stats, computed_at)),
            Err(e) => outcome.skipped.push((bucket.key, e)),
        }
    }
    outcome
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregationReport {
    pub readings_scanned: usize,
    pub readings_in_range: usize,
    pub records_written: usize,
    pub buckets_skipped: usize,
    #[serde(skip)]
    pub records: Vec<AggregateRecord>,
}

pub struct AggregationEngine {
    readings: Arc<dyn ReadingStore>,
    aggregates: Arc<dyn AggregateStore>,
    retry: RetryPolicy,
}

impl AggregationEngine {
    pub fn new(
        readings: Arc<dyn ReadingStore>,
        aggregates: Arc<dyn AggregateStore>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            readings,
            aggregates,
            retry,
        }
    }

    /// Computes and persists the aggregates for every bucket with readings
    /// in `[range.start, range.end)`. The first record that cannot be
    /// persisted ends the run.
    pub async fn run(&self, range: TimeRange) -> Result<AggregationReport, RunError> {
        tracing::info!(start = %range.start, end = %range.end, "computing aggregates");

        let scanned = retry_async_if(
            &self.retry,
            "scan readings",
            || self.readings.scan_by_time_range(range),
            StoreError::is_retryable,
        )
        .await
        .map_err(RunError::DependencyUnavailable)?;

        let readings_scanned = scanned.len();
        let in_range: Vec<Reading> = scanned
            .into_iter()
            .filter(|r| range.contains(r.timestamp))
            .collect();
        tracing::debug!(readings_scanned, in_range = in_range.len(), "readings loaded");

        let computed_at = chrono::Local::now().naive_local();
        let outcome = aggregate(&in_range, computed_at);

        for (key, err) in &outcome.skipped {
            tracing::warn!(
                device_id = %key.device_id,
                sensor_type = %key.sensor_type,
                bucket_start = %key.bucket_start,
                error = %err,
                "skipping bucket"
            );
        }

        let mut report = AggregationReport {
            readings_scanned,
            readings_in_range: in_range.len(),
            records_written: 0,
            buckets_skipped: outcome.skipped.len(),
            records: Vec::with_capacity(outcome.records.len()),
        };

        for record in outcome.records {
            tracing::info!(
                device_id = %record.device_id,
                sensor_type = %record.sensor_type,
                bucket_start = %record.bucket_start,
                average = %record.average,
                minimum = %record.minimum,
                maximum = %record.maximum,
                "aggregate computed"
            );

            retry_async_if(
                &self.retry,
                "insert aggregate",
                || self.aggregates.insert(&record),
                StoreError::is_retryable,
            )
            .await
            .map_err(|source| RunError::Persistence {
                what: format!(
                    "aggregate {}/{} at {}",
                    record.device_id, record.sensor_type, record.bucket_start
                ),
                written: report.records_written,
                source,
            })?;

            report.records_written += 1;
            report.records.push(record);
        }

        tracing::info!(
            records = report.records_written,
            skipped = report.buckets_skipped,
            "aggregates computed and persisted"
        );
        Ok(report)
    }
}
