use bsm_common::time::{TimeError, TimeRange};

use crate::config::LoadError;
use crate::storage::StoreError;

/// Failure of a whole engine run. Every variant aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("configuration: {0}")]
    Configuration(#[from] LoadError),

    #[error("interval: {0}")]
    Interval(#[from] TimeError),

    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(#[source] StoreError),

    #[error("failed to persist {what} ({written} written before the failure): {source}")]
    Persistence {
        what: String,
        written: usize,
        #[source]
        source: StoreError,
    },

    #[error("no aggregates found between {} and {}; try a different time range", .range.start, .range.end)]
    NoAggregates { range: TimeRange },
}

impl RunError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) | Self::Interval(_) => "configuration",
            Self::DependencyUnavailable(_) => "dependency_unavailable",
            Self::Persistence { .. } => "persistence",
            Self::NoAggregates { .. } => "no_data",
        }
    }
}

/// A single bucket could not be summarised. The bucket is skipped and
/// the run continues.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ComputationError {
    #[error("bucket has no readings")]
    EmptyBucket,

    #[error("decimal overflow while computing the {0}")]
    Overflow(&'static str),
}
