use async_trait::async_trait;

use super::PgStore;
use crate::storage::{StoreError, TableAdmin, TableKind};

fn create_statement(kind: TableKind, table: &str) -> String {
    match kind {
        TableKind::Raw => format!(
            r#"CREATE TABLE IF NOT EXISTS "{table}" (
                   device_id   TEXT      NOT NULL,
                   sensor_type TEXT      NOT NULL,
                   value       NUMERIC   NOT NULL,
                   ts          TIMESTAMP NOT NULL,
                   PRIMARY KEY (device_id, sensor_type, ts)
               );
               CREATE INDEX IF NOT EXISTS "{table}_ts_idx"
                   ON "{table}" (ts, device_id, sensor_type);"#
        ),
        TableKind::Aggregates => format!(
            r#"CREATE TABLE IF NOT EXISTS "{table}" (
                   device_id    TEXT      NOT NULL,
                   sensor_type  TEXT      NOT NULL,
                   bucket_start TIMESTAMP NOT NULL,
                   average      NUMERIC   NOT NULL,
                   minimum      NUMERIC   NOT NULL,
                   maximum      NUMERIC   NOT NULL,
                   computed_at  TIMESTAMP NOT NULL,
                   PRIMARY KEY (device_id, sensor_type, bucket_start)
               );
               CREATE INDEX IF NOT EXISTS "{table}_bucket_idx"
                   ON "{table}" (bucket_start, device_id, sensor_type);"#
        ),
        TableKind::Alerts => format!(
            r#"CREATE TABLE IF NOT EXISTS "{table}" (
                   id          UUID      PRIMARY KEY,
                   device_id   TEXT      NOT NULL,
                   sensor_type TEXT      NOT NULL,
                   message     TEXT      NOT NULL,
                   breach_time TIMESTAMP NOT NULL,
                   raised_at   TIMESTAMP NOT NULL
               );
               CREATE INDEX IF NOT EXISTS "{table}_breach_idx"
                   ON "{table}" (breach_time, device_id);"#
        ),
    }
}

#[async_trait]
impl TableAdmin for PgStore {
    fn table_name(&self, kind: TableKind) -> String {
        self.names.name(kind).to_string()
    }

    async fn table_exists(&self, kind: TableKind) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (
                 SELECT 1 FROM information_schema.tables
                 WHERE table_schema = current_schema() AND table_name = $1
             )",
        )
        .bind(self.names.name(kind))
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn create_table(&self, kind: TableKind) -> Result<bool, StoreError> {
        if self.table_exists(kind).await? {
            return Ok(false);
        }
        let sql = create_statement(kind, self.names.name(kind));
        sqlx::raw_sql(&sql).execute(&self.pool).await?;
        Ok(true)
    }
}
