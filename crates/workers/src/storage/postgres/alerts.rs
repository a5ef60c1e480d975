use async_trait::async_trait;
use bsm_common::time::TimeRange;

use super::PgStore;
use crate::alert::AlertRecord;
use crate::storage::page::{collect_pages, ScanCursor};
use crate::storage::{AlertStore, StoreError};

impl PgStore {
    async fn alerts_page(
        &self,
        range: TimeRange,
        cursor: Option<ScanCursor>,
    ) -> Result<Vec<AlertRecord>, StoreError> {
        let sql = format!(
            r#"SELECT id, device_id, sensor_type, message, breach_time, raised_at
               FROM "{table}"
               WHERE breach_time >= $1 AND breach_time <= $2
                 AND ($3::timestamp IS NULL
                      OR (breach_time, device_id, id::text) > ($3::timestamp, $4::text, $5::text))
               ORDER BY breach_time, device_id, id::text
               LIMIT $6"#,
            table = self.names.alerts
        );
        let (after_ts, after_device, after_id) = match cursor {
            Some(c) => (Some(c.time), Some(c.device_id), Some(c.tiebreak)),
            None => (None, None, None),
        };
        let rows = sqlx::query_as::<_, AlertRecord>(&sql)
            .bind(range.start)
            .bind(range.end)
            .bind(after_ts)
            .bind(after_device)
            .bind(after_id)
            .bind(self.page_size)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

#[async_trait]
impl AlertStore for PgStore {
    async fn insert(&self, record: &AlertRecord) -> Result<(), StoreError> {
        let sql = format!(
            r#"INSERT INTO "{table}" (id, device_id, sensor_type, message, breach_time, raised_at)
               VALUES ($1, $2, $3, $4, $5, $6)
               ON CONFLICT (id) DO NOTHING"#,
            table = self.names.alerts
        );
        sqlx::query(&sql)
            .bind(record.id)
            .bind(&record.device_id)
            .bind(&record.sensor_type)
            .bind(&record.message)
            .bind(record.breach_time)
            .bind(record.raised_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn scan_by_time_range(&self, range: TimeRange) -> Result<Vec<AlertRecord>, StoreError> {
        collect_pages(
            self.page_size as usize,
            |r: &AlertRecord| ScanCursor {
                time: r.breach_time,
                device_id: r.device_id.clone(),
                tiebreak: r.id.to_string(),
            },
            |cursor| self.alerts_page(range, cursor),
        )
        .await
    }
}
