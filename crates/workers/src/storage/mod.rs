mod memory;
pub mod page;
pub mod postgres;
pub mod setup;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bsm_common::time::TimeRange;

use crate::aggregator::AggregateRecord;
use crate::alert::AlertRecord;
use crate::reading::Reading;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),
    #[error("table '{0}' does not exist; run `bsm setup` to create it")]
    MissingTable(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Connectivity and server-side failures are worth another attempt;
    /// schema and decoding problems are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Database(sqlx::Error::Database(db)) => {
                !db.code().is_some_and(|code| is_permanent_sqlstate(&code))
            }
            Self::Database(e) => !matches!(
                e,
                sqlx::Error::RowNotFound
                    | sqlx::Error::ColumnNotFound(_)
                    | sqlx::Error::ColumnDecode { .. }
                    | sqlx::Error::Decode(_)
                    | sqlx::Error::TypeNotFound { .. }
                    | sqlx::Error::Configuration(_)
            ),
            Self::MissingTable(_) => false,
            Self::Unavailable(_) => true,
        }
    }
}

/// SQLSTATE classes a retry cannot fix: data exceptions (22), integrity
/// violations (23) and syntax or access rule violations (42), which
/// includes `42P01` undefined table.
fn is_permanent_sqlstate(code: &str) -> bool {
    matches!(code.get(..2), Some("22" | "23" | "42"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableKind {
    Raw,
    Aggregates,
    Alerts,
}

impl TableKind {
    pub const ALL: [TableKind; 3] = [TableKind::Raw, TableKind::Aggregates, TableKind::Alerts];
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Raw => "raw",
            Self::Aggregates => "aggregates",
            Self::Alerts => "alerts",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    pub raw: String,
    pub aggregates: String,
    pub alerts: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            raw: "bsm_data".into(),
            aggregates: "bsm_agg_data".into(),
            alerts: "bsm_alerts".into(),
        }
    }
}

impl TableNames {
    pub fn name(&self, kind: TableKind) -> &str {
        match kind {
            TableKind::Raw => &self.raw,
            TableKind::Aggregates => &self.aggregates,
            TableKind::Alerts => &self.alerts,
        }
    }
}

/// Raw samples. Scans include both ends of the range.
#[async_trait]
pub trait ReadingStore: Send + Sync {
    async fn scan_by_time_range(&self, range: TimeRange) -> Result<Vec<Reading>, StoreError>;
    async fn insert(&self, reading: &Reading) -> Result<(), StoreError>;
}

/// Per-minute aggregates keyed by (device, sensor, bucket_start); an
/// insert with an existing key overwrites it. Scans filter on
/// `bucket_start` and include both ends of the range.
#[async_trait]
pub trait AggregateStore: Send + Sync {
    async fn insert(&self, record: &AggregateRecord) -> Result<(), StoreError>;
    async fn scan_by_time_range(&self, range: TimeRange)
        -> Result<Vec<AggregateRecord>, StoreError>;
}

/// Breach alerts. Scans filter on `breach_time`, both ends included.
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn insert(&self, record: &AlertRecord) -> Result<(), StoreError>;
    async fn scan_by_time_range(&self, range: TimeRange) -> Result<Vec<AlertRecord>, StoreError>;
}

#[async_trait]
pub trait TableAdmin: Send + Sync {
    fn table_name(&self, kind: TableKind) -> String;
    async fn table_exists(&self, kind: TableKind) -> Result<bool, StoreError>;
    /// Creates the table if missing. Returns `true` when it was created.
    async fn create_table(&self, kind: TableKind) -> Result<bool, StoreError>;
}

/// The external collaborators an engine run talks to.
#[derive(Clone)]
pub struct Stores {
    pub readings: Arc<dyn ReadingStore>,
    pub aggregates: Arc<dyn AggregateStore>,
    pub alerts: Arc<dyn AlertStore>,
    pub admin: Arc<dyn TableAdmin>,
}

impl Stores {
    pub fn postgres(store: PgStore) -> Self {
        let store = Arc::new(store);
        Self {
            readings: store.clone(),
            aggregates: store.clone(),
            alerts: store.clone(),
            admin: store,
        }
    }

    pub fn memory(store: MemoryStore) -> Self {
        let store = Arc::new(store);
        Self {
            readings: store.clone(),
            aggregates: store.clone(),
            alerts: store.clone(),
            admin: store,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    #[derive(Debug, thiserror::Error)]
    #[error("server error {code}")]
    struct ServerError {
        code: &'static str,
    }

    impl sqlx::error::DatabaseError for ServerError {
        fn message(&self) -> &str {
            "server error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.code))
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::Other
        }
    }

    fn server_error(code: &'static str) -> StoreError {
        StoreError::Database(sqlx::Error::Database(Box::new(ServerError { code })))
    }

    #[test]
    fn missing_table_not_retryable() {
        assert!(!StoreError::MissingTable("bsm_data".into()).is_retryable());
    }

    #[test]
    fn unavailable_retryable() {
        assert!(StoreError::Unavailable("timeout".into()).is_retryable());
    }

    #[test]
    fn pool_timeout_retryable_decode_not() {
        assert!(StoreError::Database(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(!StoreError::Database(sqlx::Error::RowNotFound).is_retryable());
    }

    #[test]
    fn undefined_table_not_retryable() {
        assert!(!server_error("42P01").is_retryable());
        assert!(!server_error("42703").is_retryable());
        assert!(!server_error("23505").is_retryable());
    }

    #[test]
    fn transient_server_errors_retryable() {
        assert!(server_error("40001").is_retryable());
        assert!(server_error("57P03").is_retryable());
        assert!(server_error("53300").is_retryable());
    }

    #[test]
    fn table_names_by_kind() {
        let names = TableNames::default();
        assert_eq!(names.name(TableKind::Raw), "bsm_data");
        assert_eq!(names.name(TableKind::Aggregates), "bsm_agg_data");
        assert_eq!(names.name(TableKind::Alerts), "bsm_alerts");
    }
}
