mod bucket;
mod engine;
mod record;

pub use bucket::{group_by_bucket, round_2dp, Bucket, BucketKey, BucketStats};
pub use engine::{aggregate, AggregationEngine, AggregationOutcome, AggregationReport};
pub use record::AggregateRecord;
