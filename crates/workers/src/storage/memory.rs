use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bsm_common::time::TimeRange;
use chrono::NaiveDateTime;
use dashmap::{DashMap, DashSet};
use uuid::Uuid;

use super::{
    AggregateStore, AlertStore, ReadingStore, StoreError, TableAdmin, TableKind, TableNames,
};
use crate::aggregator::{AggregateRecord, BucketKey};
use crate::alert::AlertRecord;
use crate::reading::Reading;

type ReadingKey = (String, String, NaiveDateTime);

/// In-process backend for tests and dry runs. Clones share state.
#[derive(Clone)]
pub struct MemoryStore {
    names: TableNames,
    tables: Arc<DashSet<TableKind>>,
    readings: Arc<DashMap<ReadingKey, Reading>>,
    aggregates: Arc<DashMap<BucketKey, AggregateRecord>>,
    alerts: Arc<DashMap<Uuid, AlertRecord>>,
    failing_inserts: Arc<AtomicU32>,
    failing_scans: Arc<AtomicU32>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// A store with every table already present.
    pub fn new() -> Self {
        let store = Self::without_tables();
        for kind in TableKind::ALL {
            store.tables.insert(kind);
        }
        store
    }

    pub fn without_tables() -> Self {
        Self {
            names: TableNames::default(),
            tables: Arc::new(DashSet::new()),
            readings: Arc::new(DashMap::new()),
            aggregates: Arc::new(DashMap::new()),
            alerts: Arc::new(DashMap::new()),
            failing_inserts: Arc::new(AtomicU32::new(0)),
            failing_scans: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn drop_table(&self, kind: TableKind) {
        self.tables.remove(&kind);
    }

    /// The next `n` inserts fail with [`StoreError::Unavailable`].
    pub fn fail_next_inserts(&self, n: u32) {
        self.failing_inserts.store(n, Ordering::SeqCst);
    }

    /// The next `n` scans fail with [`StoreError::Unavailable`].
    pub fn fail_next_scans(&self, n: u32) {
        self.failing_scans.store(n, Ordering::SeqCst);
    }

    pub fn aggregate_count(&self) -> usize {
        self.aggregates.len()
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.len()
    }

    pub fn all_aggregates(&self) -> Vec<AggregateRecord> {
        let mut out: Vec<AggregateRecord> = self.aggregates.iter().map(|r| r.value().clone()).collect();
        out.sort_by(|a, b| a.key().cmp(&b.key()));
        out
    }

    pub fn all_alerts(&self) -> Vec<AlertRecord> {
        let mut out: Vec<AlertRecord> = self.alerts.iter().map(|r| r.value().clone()).collect();
        out.sort_by(|a, b| {
            (a.breach_time, &a.device_id, &a.sensor_type).cmp(&(b.breach_time, &b.device_id, &b.sensor_type))
        });
        out
    }

    fn check_table(&self, kind: TableKind) -> Result<(), StoreError> {
        if self.tables.contains(&kind) {
            Ok(())
        } else {
            Err(StoreError::MissingTable(self.names.name(kind).to_string()))
        }
    }

    fn take_failure(counter: &AtomicU32) -> Result<(), StoreError> {
        let remaining = counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if remaining {
            Err(StoreError::Unavailable("injected failure".into()))
        } else {
            Ok(())
        }
    }

    fn before_insert(&self, kind: TableKind) -> Result<(), StoreError> {
        self.check_table(kind)?;
        Self::take_failure(&self.failing_inserts)
    }

    fn before_scan(&self, kind: TableKind) -> Result<(), StoreError> {
        self.check_table(kind)?;
        Self::take_failure(&self.failing_scans)
    }
}

fn within(range: &TimeRange, ts: NaiveDateTime) -> bool {
    ts >= range.start && ts <= range.end
}

#[async_trait]
impl ReadingStore for MemoryStore {
    async fn scan_by_time_range(&self, range: TimeRange) -> Result<Vec<Reading>, StoreError> {
        self.before_scan(TableKind::Raw)?;
        let mut out: Vec<Reading> = self
            .readings
            .iter()
            .filter(|r| within(&range, r.value().timestamp))
            .map(|r| r.value().clone())
            .collect();
        out.sort_by(|a, b| {
            (a.timestamp, &a.device_id, &a.sensor_type).cmp(&(b.timestamp, &b.device_id, &b.sensor_type))
        });
        Ok(out)
    }

    async fn insert(&self, reading: &Reading) -> Result<(), StoreError> {
        self.before_insert(TableKind::Raw)?;
        let key = (
            reading.device_id.clone(),
            reading.sensor_type.clone(),
            reading.timestamp,
        );
        self.readings.insert(key, reading.clone());
        Ok(())
    }
}

#[async_trait]
impl AggregateStore for MemoryStore {
    async fn insert(&self, record: &AggregateRecord) -> Result<(), StoreError> {
        self.before_insert(TableKind::Aggregates)?;
        self.aggregates.insert(record.key(), record.clone());
        Ok(())
    }

    async fn scan_by_time_range(
        &self,
        range: TimeRange,
    ) -> Result<Vec<AggregateRecord>, StoreError> {
        self.before_scan(TableKind::Aggregates)?;
        let mut out: Vec<AggregateRecord> = self
            .aggregates
            .iter()
            .filter(|r| within(&range, r.value().bucket_start))
            .map(|r| r.value().clone())
            .collect();
        out.sort_by(|a, b| a.key().cmp(&b.key()));
        Ok(out)
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn insert(&self, record: &AlertRecord) -> Result<(), StoreError> {
        self.before_insert(TableKind::Alerts)?;
        self.alerts.insert(record.id, record.clone());
        Ok(())
    }

    async fn scan_by_time_range(&self, range: TimeRange) -> Result<Vec<AlertRecord>, StoreError> {
        self.before_scan(TableKind::Alerts)?;
        Ok(self
            .all_alerts()
            .into_iter()
            .filter(|a| within(&range, a.breach_time))
            .collect())
    }
}

#[async_trait]
impl TableAdmin for MemoryStore {
    fn table_name(&self, kind: TableKind) -> String {
        self.names.name(kind).to_string()
    }

    async fn table_exists(&self, kind: TableKind) -> Result<bool, StoreError> {
        Ok(self.tables.contains(&kind))
    }

    async fn create_table(&self, kind: TableKind) -> Result<bool, StoreError> {
        Ok(self.tables.insert(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn at(minute: u32, second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 6, 12)
            .unwrap()
            .and_hms_opt(18, minute, second)
            .unwrap()
    }

    fn range(from: u32, to: u32) -> TimeRange {
        TimeRange::new(at(from, 0), at(to, 0)).unwrap()
    }

    #[tokio::test]
    async fn reading_scan_is_inclusive_and_sorted() {
        let store = MemoryStore::new();
        for (dev, m) in [("D2", 27), ("D1", 26), ("D1", 30), ("D1", 31)] {
            ReadingStore::insert(&store, &Reading::new(dev, "hr", Decimal::from(70), at(m, 0)))
                .await
                .unwrap();
        }
        let found = ReadingStore::scan_by_time_range(&store, range(26, 30)).await.unwrap();
        let devices: Vec<_> = found.iter().map(|r| (r.device_id.as_str(), r.timestamp)).collect();
        assert_eq!(devices, vec![("D1", at(26, 0)), ("D2", at(27, 0)), ("D1", at(30, 0))]);
    }

    #[tokio::test]
    async fn missing_table_reported() {
        let store = MemoryStore::new();
        store.drop_table(TableKind::Alerts);
        let err = AlertStore::scan_by_time_range(&store, range(0, 1)).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingTable(ref t) if t == "bsm_alerts"));
        assert!(!store.table_exists(TableKind::Alerts).await.unwrap());
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let store = MemoryStore::new();
        store.fail_next_inserts(1);
        let reading = Reading::new("D1", "hr", Decimal::from(70), at(26, 0));
        assert!(ReadingStore::insert(&store, &reading).await.is_err());
        assert!(ReadingStore::insert(&store, &reading).await.is_ok());
    }

    #[tokio::test]
    async fn create_table_reports_whether_created() {
        let store = MemoryStore::without_tables();
        assert!(store.create_table(TableKind::Raw).await.unwrap());
        assert!(!store.create_table(TableKind::Raw).await.unwrap());
    }
}
