use async_trait::async_trait;
use bsm_common::time::TimeRange;

use super::PgStore;
use crate::aggregator::AggregateRecord;
use crate::storage::page::{collect_pages, ScanCursor};
use crate::storage::{AggregateStore, StoreError};

impl PgStore {
    async fn aggregates_page(
        &self,
        range: TimeRange,
        cursor: Option<ScanCursor>,
    ) -> Result<Vec<AggregateRecord>, StoreError> {
        let sql = format!(
            r#"SELECT device_id, sensor_type, average, minimum, maximum, bucket_start, computed_at
               FROM "{table}"
               WHERE bucket_start >= $1 AND bucket_start <= $2
                 AND ($3::timestamp IS NULL
                      OR (bucket_start, device_id, sensor_type) > ($3::timestamp, $4::text, $5::text))
               ORDER BY bucket_start, device_id, sensor_type
               LIMIT $6"#,
            table = self.names.aggregates
        );
        let (after_ts, after_device, after_sensor) = match cursor {
            Some(c) => (Some(c.time), Some(c.device_id), Some(c.tiebreak)),
            None => (None, None, None),
        };
        let rows = sqlx::query_as::<_, AggregateRecord>(&sql)
            .bind(range.start)
            .bind(range.end)
            .bind(after_ts)
            .bind(after_device)
            .bind(after_sensor)
            .bind(self.page_size)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

#[async_trait]
impl AggregateStore for PgStore {
    async fn insert(&self, record: &AggregateRecord) -> Result<(), StoreError> {
        let sql = format!(
            r#"INSERT INTO "{table}"
               (device_id, sensor_type, bucket_start, average, minimum, maximum, computed_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               ON CONFLICT (device_id, sensor_type, bucket_start) DO UPDATE SET
                   average = EXCLUDED.average,
                   minimum = EXCLUDED.minimum,
                   maximum = EXCLUDED.maximum,
                   computed_at = EXCLUDED.computed_at"#,
            table = self.names.aggregates
        );
        sqlx::query(&sql)
            .bind(&record.device_id)
            .bind(&record.sensor_type)
            .bind(record.bucket_start)
            .bind(record.average)
            .bind(record.minimum)
            .bind(record.maximum)
            .bind(record.computed_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn scan_by_time_range(
        &self,
        range: TimeRange,
    ) -> Result<Vec<AggregateRecord>, StoreError> {
        collect_pages(
            self.page_size as usize,
            |r: &AggregateRecord| ScanCursor {
                time: r.bucket_start,
                device_id: r.device_id.clone(),
                tiebreak: r.sensor_type.clone(),
            },
            |cursor| self.aggregates_page(range, cursor),
        )
        .await
    }
}
