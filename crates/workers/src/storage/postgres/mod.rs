mod aggregates;
mod alerts;
mod pool;
mod readings;
mod schema;

use sqlx::PgPool;

use super::TableNames;

pub use pool::create_pool;

/// Postgres-backed reading, aggregate and alert stores sharing one pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    names: TableNames,
    page_size: i64,
}

impl PgStore {
    pub fn new(pool: PgPool, names: TableNames, page_size: u32) -> Self {
        Self {
            pool,
            names,
            page_size: i64::from(page_size.max(1)),
        }
    }
}
