use async_trait::async_trait;
use bsm_common::time::TimeRange;

use super::PgStore;
use crate::reading::Reading;
use crate::storage::page::{collect_pages, ScanCursor};
use crate::storage::{ReadingStore, StoreError};

impl PgStore {
    async fn readings_page(
        &self,
        range: TimeRange,
        cursor: Option<ScanCursor>,
    ) -> Result<Vec<Reading>, StoreError> {
        let sql = format!(
            r#"SELECT device_id, sensor_type, value, ts FROM "{table}"
               WHERE ts >= $1 AND ts <= $2
                 AND ($3::timestamp IS NULL
                      OR (ts, device_id, sensor_type) > ($3::timestamp, $4::text, $5::text))
               ORDER BY ts, device_id, sensor_type
               LIMIT $6"#,
            table = self.names.raw
        );
        let (after_ts, after_device, after_sensor) = match cursor {
            Some(c) => (Some(c.time), Some(c.device_id), Some(c.tiebreak)),
            None => (None, None, None),
        };
        let rows = sqlx::query_as::<_, Reading>(&sql)
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
impl ReadingStore for PgStore {
    async fn scan_by_time_range(&self, range: TimeRange) -> Result<Vec<Reading>, StoreError> {
        collect_pages(
            self.page_size as usize,
            |r: &Reading| ScanCursor {
                time: r.timestamp,
                device_id: r.device_id.clone(),
                tiebreak: r.sensor_type.clone(),
            },
            |cursor| self.readings_page(range, cursor),
        )
        .await
    }

    async fn insert(&self, reading: &Reading) -> Result<(), StoreError> {
        let sql = format!(
            r#"INSERT INTO "{table}" (device_id, sensor_type, value, ts)
               VALUES ($1, $2, $3, $4)
               ON CONFLICT (device_id, sensor_type, ts) DO UPDATE SET value = EXCLUDED.value"#,
            table = self.names.raw
        );
        sqlx::query(&sql)
            .bind(&reading.device_id)
            .bind(&reading.sensor_type)
            .bind(reading.value)
            .bind(reading.timestamp)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
