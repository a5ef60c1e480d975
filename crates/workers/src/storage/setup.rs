use bsm_common::retry::{retry_async_if, RetryPolicy};
use serde::Serialize;

use super::{StoreError, TableAdmin, TableKind};

/// Which tables a setup run should touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TableSelection {
    #[default]
    All,
    Raw,
    Aggregates,
    Alerts,
}

impl TableSelection {
    pub fn kinds(&self) -> &'static [TableKind] {
        match self {
            Self::All => &TableKind::ALL,
            Self::Raw => &[TableKind::Raw],
            Self::Aggregates => &[TableKind::Aggregates],
            Self::Alerts => &[TableKind::Alerts],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableStatus {
    pub kind: String,
    pub table: String,
    pub exists: bool,
    pub created: bool,
}

/// Fails with [`StoreError::MissingTable`] on the first required table
/// that is absent.
pub async fn require_tables(
    admin: &dyn TableAdmin,
    kinds: &[TableKind],
    retry: &RetryPolicy,
) -> Result<(), StoreError> {
    for &kind in kinds {
        let name = admin.table_name(kind);
        tracing::debug!(table = %name, "checking table");
        let exists = retry_async_if(
            retry,
            "table_exists",
            || admin.table_exists(kind),
            StoreError::is_retryable,
        )
        .await?;
        if !exists {
            tracing::error!(table = %name, "required table is missing");
            return Err(StoreError::MissingTable(name));
        }
    }
    Ok(())
}

pub async fn check_tables(
    admin: &dyn TableAdmin,
    kinds: &[TableKind],
    retry: &RetryPolicy,
) -> Result<Vec<TableStatus>, StoreError> {
    let mut out = Vec::with_capacity(kinds.len());
    for &kind in kinds {
        let exists = retry_async_if(
            retry,
            "table_exists",
            || admin.table_exists(kind),
            StoreError::is_retryable,
        )
        .await?;
        out.push(TableStatus {
            kind: kind.to_string(),
            table: admin.table_name(kind),
            exists,
            created: false,
        });
    }
    Ok(out)
}

/// Creates each missing table; tables that already exist are left as is.
pub async fn create_tables(
    admin: &dyn TableAdmin,
    kinds: &[TableKind],
    retry: &RetryPolicy,
) -> Result<Vec<TableStatus>, StoreError> {
    let mut out = Vec::with_capacity(kinds.len());
    for &kind in kinds {
        let table = admin.table_name(kind);
        let created = retry_async_if(
            retry,
            "create_table",
            || admin.create_table(kind),
            StoreError::is_retryable,
        )
        .await?;
        if created {
            tracing::info!(%table, "table created");
        } else {
            tracing::info!(%table, "table already exists");
        }
        out.push(TableStatus {
            kind: kind.to_string(),
            table,
            exists: true,
            created,
        });
    }
    Ok(out)
}
