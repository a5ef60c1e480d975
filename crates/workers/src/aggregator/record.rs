use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::bucket::{BucketKey, BucketStats};

/// Summary of one device/sensor over one minute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AggregateRecord {
    pub device_id: String,
    pub sensor_type: String,
    pub average: Decimal,
    pub minimum: Decimal,
    pub maximum: Decimal,
    pub bucket_start: NaiveDateTime,
    pub computed_at: NaiveDateTime,
}

impl AggregateRecord {
    pub fn from_bucket(key: BucketKey, stats: BucketStats, computed_at: NaiveDateTime) -> Self {
        Self {
            device_id: key.device_id,
            sensor_type: key.sensor_type,
            average: stats.average,
            minimum: stats.minimum,
            maximum: stats.maximum,
            bucket_start: key.bucket_start,
            computed_at,
        }
    }

    pub fn key(&self) -> BucketKey {
        BucketKey {
            bucket_start: self.bucket_start,
            device_id: self.device_id.clone(),
            sensor_type: self.sensor_type.clone(),
        }
    }

    pub fn stats(&self) -> BucketStats {
        BucketStats {
            average: self.average,
            minimum: self.minimum,
            maximum: self.maximum,
        }
    }
}
