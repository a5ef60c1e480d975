use std::collections::BTreeSet;
use std::sync::Arc;

use bsm_common::retry::{retry_async_if, RetryPolicy};
use bsm_common::time::{MinuteWindows, TimeRange};
use chrono::NaiveDateTime;
use serde::Serialize;

use super::catalog::RuleCatalog;
use super::event::AlertRecord;
use super::rule::Rule;
use super::state::{BreachState, WindowObservation};
use crate::aggregator::AggregateRecord;
use crate::error::RunError;
use crate::storage::{AggregateStore, AlertStore, StoreError};

/// One minute of a pair walk.
#[derive(Debug, Clone)]
pub struct WindowStep<'a> {
    pub window: TimeRange,
    pub aggregate: Option<&'a AggregateRecord>,
    pub observation: WindowObservation,
    /// State after this window.
    pub state: BreachState,
}

/// Walks the one-minute windows of a range for a single device/sensor
/// pair, feeding each window's aggregate through a [`BreachState`].
///
/// `aggregates` must already be restricted to the pair and sorted by
/// `bucket_start`; the walk moves a single cursor forward through them.
/// When several fall in the same window the first one is used.
pub struct PairWalk<'a> {
    rule: &'a Rule,
    aggregates: &'a [AggregateRecord],
    cursor: usize,
    windows: MinuteWindows,
    state: BreachState,
}

impl<'a> PairWalk<'a> {
    pub fn new(rule: &'a Rule, aggregates: &'a [AggregateRecord], range: TimeRange) -> Self {
        Self {
            rule,
            aggregates,
            cursor: 0,
            windows: range.minute_windows(),
            state: BreachState::Idle,
        }
    }
}

impl<'a> Iterator for PairWalk<'a> {
    type Item = WindowStep<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let window = self.windows.next()?;
        let aggregates = self.aggregates;
        let pending = &aggregates[self.cursor..];
        let before = pending
            .iter()
            .take_while(|a| a.bucket_start < window.start)
            .count();
        let in_window = pending[before..]
            .iter()
            .take_while(|a| a.bucket_start < window.end)
            .count();
        self.cursor += before + in_window;
        let aggregate = pending[before..before + in_window].first();
        let observation = match aggregate {
            None => WindowObservation::Gap,
            Some(a) if self.rule.is_breached(a.average) => WindowObservation::Breach,
            Some(_) => WindowObservation::Within,
        };
        self.state = self
            .state
            .transition(observation, self.rule.consecutive_trigger_count);
        Some(WindowStep {
            window,
            aggregate,
            observation,
            state: self.state,
        })
    }
}

/// Alerts a pair would raise over `range`, without touching any store.
pub fn evaluate_pair(
    rule: &Rule,
    aggregates: &[AggregateRecord],
    range: TimeRange,
    raised_at: NaiveDateTime,
) -> Vec<AlertRecord> {
    PairWalk::new(rule, aggregates, range)
        .filter(|step| step.state.just_fired())
        .filter_map(|step| {
            step.aggregate
                .map(|a| AlertRecord::raise(rule, a, rule.consecutive_trigger_count, raised_at))
        })
        .collect()
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EvaluationReport {
    pub aggregates_scanned: usize,
    pub devices: usize,
    pub pairs_evaluated: usize,
    pub windows_observed: usize,
    pub breaches: usize,
    pub alerts_raised: usize,
    #[serde(skip)]
    pub alerts: Vec<AlertRecord>,
}

pub struct RuleEvaluator {
    aggregates: Arc<dyn AggregateStore>,
    alerts: Arc<dyn AlertStore>,
    catalog: RuleCatalog,
    retry: RetryPolicy,
}

impl RuleEvaluator {
    pub fn new(
        aggregates: Arc<dyn AggregateStore>,
        alerts: Arc<dyn AlertStore>,
        catalog: RuleCatalog,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            aggregates,
            alerts,
            catalog,
            retry,
        }
    }

    /// Evaluates every catalog rule for every device that has aggregates
    /// in `[range.start, range.end)`. Alerts are persisted as they are
    /// raised; a failed insert ends the run.
    pub async fn run(&self, range: TimeRange) -> Result<EvaluationReport, RunError> {
        tracing::info!(start = %range.start, end = %range.end, "detecting rule breaches");

        let scanned = retry_async_if(
            &self.retry,
            "scan aggregates",
            || self.aggregates.scan_by_time_range(range),
            StoreError::is_retryable,
        )
        .await
        .map_err(RunError::DependencyUnavailable)?;

        let aggregates_scanned = scanned.len();
        let in_range: Vec<AggregateRecord> = scanned
            .into_iter()
            .filter(|a| range.contains(a.bucket_start))
            .collect();
        if in_range.is_empty() {
            return Err(RunError::NoAggregates { range });
        }

        let devices: BTreeSet<&str> = in_range.iter().map(|a| a.device_id.as_str()).collect();
        let mut report = EvaluationReport {
            aggregates_scanned,
            devices: devices.len(),
            ..Default::default()
        };

        for device in &devices {
            for sensor in self.catalog.sensor_types() {
                let Some(rule) = self.catalog.rule_for(sensor) else {
                    continue;
                };
                let mut pair: Vec<AggregateRecord> = in_range
                    .iter()
                    .filter(|a| a.device_id == *device && a.sensor_type == sensor)
                    .cloned()
                    .collect();
                pair.sort_by_key(|a| a.bucket_start);
                self.walk_pair(device, rule, &pair, range, &mut report).await?;
            }
        }

        tracing::info!(
            devices = report.devices,
            pairs = report.pairs_evaluated,
            breaches = report.breaches,
            alerts = report.alerts_raised,
            "rule breach detection finished"
        );
        Ok(report)
    }

    async fn walk_pair(
        &self,
        device: &str,
        rule: &Rule,
        pair: &[AggregateRecord],
        range: TimeRange,
        report: &mut EvaluationReport,
    ) -> Result<(), RunError> {
        tracing::debug!(
            device_id = device,
            sensor_type = %rule.sensor_type,
            aggregates = pair.len(),
            "evaluating pair"
        );
        report.pairs_evaluated += 1;

        for step in PairWalk::new(rule, pair, range) {
            report.windows_observed += 1;
            let Some(aggregate) = step.aggregate else {
                tracing::debug!(
                    device_id = device,
                    sensor_type = %rule.sensor_type,
                    window_start = %step.window.start,
                    "no aggregate in window"
                );
                continue;
            };
            if step.observation != WindowObservation::Breach {
                continue;
            }

            report.breaches += 1;
            tracing::info!(
                device_id = device,
                sensor_type = %rule.sensor_type,
                bucket_start = %aggregate.bucket_start,
                average = %aggregate.average,
                consecutive = step.state.consecutive_breaches(),
                "rule breached"
            );

            if step.state.just_fired() {
                let raised_at = chrono::Local::now().naive_local();
                let alert =
                    AlertRecord::raise(rule, aggregate, rule.consecutive_trigger_count, raised_at);
                tracing::warn!(
                    device_id = device,
                    sensor_type = %rule.sensor_type,
                    breach_time = %alert.breach_time,
                    alert_id = %alert.id,
                    "{}",
                    alert.message
                );
                self.persist(&alert, report.alerts_raised).await?;
                report.alerts_raised += 1;
                report.alerts.push(alert);
            }
        }
        Ok(())
    }

    async fn persist(&self, alert: &AlertRecord, written: usize) -> Result<(), RunError> {
        retry_async_if(
            &self.retry,
            "insert alert",
            || self.alerts.insert(alert),
            StoreError::is_retryable,
        )
        .await
        .map_err(|source| RunError::Persistence {
            what: format!(
                "alert {}/{} at {}",
                alert.device_id, alert.sensor_type, alert.breach_time
            ),
            written,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, TableKind};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::time::Duration;

    fn at(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 6, 12)
            .unwrap()
            .and_hms_opt(18, minute, 0)
            .unwrap()
    }

    fn range(from: u32, to: u32) -> TimeRange {
        TimeRange::new(at(from), at(to)).unwrap()
    }

    fn agg(dev: &str, sensor: &str, avg: i64, minute: u32) -> AggregateRecord {
        let average = Decimal::new(avg * 100, 2);
        AggregateRecord {
            device_id: dev.into(),
            sensor_type: sensor.into(),
            average,
            minimum: average,
            maximum: average,
            bucket_start: at(minute),
            computed_at: at(minute),
        }
    }

    fn hr_rule(trigger: u32) -> Rule {
        Rule::new("hr", Decimal::from(60), Decimal::from(100), trigger)
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            max_elapsed: Duration::from_secs(5),
            initial_delay: Duration::from_millis(1),
            backoff_factor: 1.0,
            jitter_fraction: 0.0,
        }
    }

    #[test]
    fn single_alert_at_second_minute() {
        let aggs = vec![agg("D1", "hr", 110, 26), agg("D1", "hr", 115, 27), agg("D1", "hr", 90, 28)];
        let rule = hr_rule(2);
        let steps: Vec<_> = PairWalk::new(&rule, &aggs, range(26, 29)).collect();

        let alerts = evaluate_pair(&rule, &aggs, range(26, 29), at(40));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].breach_time, at(27));
        assert_eq!(steps[2].state.consecutive_breaches(), 0);
    }

    #[test]
    fn n_breaches_yield_n_div_t_alerts() {
        let aggs: Vec<_> = (0..7).map(|m| agg("D1", "hr", 120, 20 + m)).collect();
        let alerts = evaluate_pair(&hr_rule(3), &aggs, range(20, 27), at(40));
        let times: Vec<_> = alerts.iter().map(|a| a.breach_time).collect();
        assert_eq!(times, vec![at(22), at(25)]);
    }

    #[test]
    fn gap_does_not_reset_streak() {
        let aggs = vec![agg("D1", "hr", 120, 20), agg("D1", "hr", 120, 23)];
        let alerts = evaluate_pair(&hr_rule(2), &aggs, range(20, 25), at(40));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].breach_time, at(23));
    }

    #[test]
    fn in_band_averages_never_alert() {
        let aggs: Vec<_> = (0..10).map(|m| agg("D1", "hr", 61 + m as i64 * 4, 20 + m)).collect();
        let alerts = evaluate_pair(&hr_rule(1), &aggs, range(20, 30), at(40));
        assert!(alerts.is_empty());
    }

    #[test]
    fn first_aggregate_in_window_used() {
        let mut second = agg("D1", "hr", 120, 20);
        second.bucket_start = at(20) + chrono::Duration::seconds(30);
        let aggs = vec![agg("D1", "hr", 80, 20), second];
        let rule = hr_rule(1);
        let steps: Vec<_> = PairWalk::new(&rule, &aggs, range(20, 21)).collect();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].observation, WindowObservation::Within);
    }

    #[test]
    fn stale_and_duplicate_aggregates_skipped() {
        let mut late_dup = agg("D1", "hr", 80, 21);
        late_dup.bucket_start = at(21) + chrono::Duration::seconds(45);
        let aggs = vec![
            agg("D1", "hr", 130, 18),
            agg("D1", "hr", 120, 21),
            late_dup,
            agg("D1", "hr", 125, 22),
        ];
        let rule = hr_rule(2);
        let steps: Vec<_> = PairWalk::new(&rule, &aggs, range(20, 24)).collect();
        let seen: Vec<_> = steps.iter().map(|s| s.aggregate.map(|a| a.bucket_start)).collect();
        assert_eq!(seen, vec![None, Some(at(21)), Some(at(22)), None]);
        assert!(steps[2].state.just_fired());
    }

    #[test]
    fn day_long_walk_fires_every_trigger_count() {
        let day_start = at(0);
        let aggs: Vec<_> = (0..1440)
            .map(|m| {
                let mut a = agg("D1", "hr", 120, 0);
                a.bucket_start = day_start + chrono::Duration::minutes(m);
                a
            })
            .collect();
        let day = TimeRange::new(day_start, day_start + chrono::Duration::hours(24)).unwrap();
        let alerts = evaluate_pair(&hr_rule(5), &aggs, day, at(0));
        assert_eq!(alerts.len(), 288);
        assert_eq!(alerts[0].breach_time, day_start + chrono::Duration::minutes(4));
    }

    #[test]
    fn walk_covers_every_minute() {
        let rule = hr_rule(2);
        let steps: Vec<_> = PairWalk::new(&rule, &[], range(20, 25)).collect();
        assert_eq!(steps.len(), 5);
        assert!(steps.iter().all(|s| s.observation == WindowObservation::Gap));
    }

    async fn seeded(aggs: &[AggregateRecord]) -> MemoryStore {
        let store = MemoryStore::new();
        for a in aggs {
            AggregateStore::insert(&store, a).await.unwrap();
        }
        store
    }

    fn evaluator(store: &MemoryStore, catalog: RuleCatalog) -> RuleEvaluator {
        let shared = Arc::new(store.clone());
        RuleEvaluator::new(shared.clone(), shared, catalog, fast_retry())
    }

    #[tokio::test]
    async fn persists_alerts_per_device() {
        let store = seeded(&[
            agg("D2", "hr", 110, 26),
            agg("D2", "hr", 115, 27),
            agg("D1", "hr", 70, 26),
            agg("D1", "spo2", 80, 26),
        ])
        .await;
        let catalog = RuleCatalog::new(vec![
            hr_rule(2),
            Rule::new("spo2", Decimal::from(94), Decimal::from(100), 1),
        ])
        .unwrap();

        let report = evaluator(&store, catalog).run(range(26, 30)).await.unwrap();
        assert_eq!(report.devices, 2);
        assert_eq!(report.pairs_evaluated, 4);
        assert_eq!(report.alerts_raised, 2);

        let alerts = store.all_alerts();
        assert_eq!(alerts.len(), 2);
        assert_eq!((alerts[0].device_id.as_str(), alerts[0].sensor_type.as_str()), ("D1", "spo2"));
        assert_eq!((alerts[1].device_id.as_str(), alerts[1].breach_time), ("D2", at(27)));
    }

    #[tokio::test]
    async fn sensor_without_rule_ignored() {
        let store = seeded(&[agg("D1", "temp", 500, 26)]).await;
        let catalog = RuleCatalog::new(vec![hr_rule(1)]).unwrap();
        let report = evaluator(&store, catalog).run(range(26, 30)).await.unwrap();
        assert_eq!(report.alerts_raised, 0);
        assert_eq!(report.breaches, 0);
    }

    #[tokio::test]
    async fn no_aggregates_is_error() {
        let store = seeded(&[agg("D1", "hr", 120, 30)]).await;
        let catalog = RuleCatalog::new(vec![hr_rule(1)]).unwrap();
        let err = evaluator(&store, catalog).run(range(26, 30)).await.unwrap_err();
        assert!(matches!(err, RunError::NoAggregates { .. }));
    }

    #[tokio::test]
    async fn failed_alert_insert_aborts() {
        let store = seeded(&[agg("D1", "hr", 120, 26), agg("D2", "hr", 120, 26)]).await;
        store.fail_next_inserts(100);
        let catalog = RuleCatalog::new(vec![hr_rule(1)]).unwrap();
        let err = evaluator(&store, catalog).run(range(26, 30)).await.unwrap_err();
        assert!(matches!(err, RunError::Persistence { written: 0, .. }));
        assert_eq!(store.alert_count(), 0);
    }

    #[tokio::test]
    async fn scan_retried_then_succeeds() {
        let store = seeded(&[agg("D1", "hr", 120, 26)]).await;
        store.fail_next_scans(2);
        let catalog = RuleCatalog::new(vec![hr_rule(1)]).unwrap();
        let report = evaluator(&store, catalog).run(range(26, 30)).await.unwrap();
        assert_eq!(report.alerts_raised, 1);
    }

    #[tokio::test]
    async fn missing_alert_table_is_persistence_error() {
        let store = seeded(&[agg("D1", "hr", 120, 26)]).await;
        store.drop_table(TableKind::Alerts);
        let catalog = RuleCatalog::new(vec![hr_rule(1)]).unwrap();
        let err = evaluator(&store, catalog).run(range(26, 30)).await.unwrap_err();
        assert!(matches!(err, RunError::Persistence { .. }));
    }
}
