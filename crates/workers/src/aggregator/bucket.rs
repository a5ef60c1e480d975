use bsm_common::time::truncate_to_minute;
use chrono::NaiveDateTime;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::ComputationError;
use crate::reading::Reading;

/// Grouping key. Field order is the sort order: minute first, then
/// device, then sensor.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketKey {
    pub bucket_start: NaiveDateTime,
    pub device_id: String,
    pub sensor_type: String,
}

impl BucketKey {
    pub fn of(reading: &Reading) -> Self {
        Self {
            bucket_start: truncate_to_minute(reading.timestamp),
            device_id: reading.device_id.clone(),
            sensor_type: reading.sensor_type.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub key: BucketKey,
    pub values: Vec<Decimal>,
}

/// Sorts readings by bucket key (stable) and splits them into one
/// contiguous group per key.
pub fn group_by_bucket(readings: &[Reading]) -> Vec<Bucket> {
    let mut keyed: Vec<(BucketKey, Decimal)> =
        readings.iter().map(|r| (BucketKey::of(r), r.value)).collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    let mut buckets: Vec<Bucket> = Vec::new();
    for (key, value) in keyed {
        match buckets.last_mut() {
            Some(bucket) if bucket.key == key => bucket.values.push(value),
            _ => buckets.push(Bucket {
                key,
                values: vec![value],
            }),
        }
    }
    buckets
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketStats {
    pub average: Decimal,
    pub minimum: Decimal,
    pub maximum: Decimal,
}

impl BucketStats {
    pub fn compute(values: &[Decimal]) -> Result<Self, ComputationError> {
        let (first, rest) = values.split_first().ok_or(ComputationError::EmptyBucket)?;

        let mut sum = *first;
        let mut minimum = *first;
        let mut maximum = *first;
        for v in rest {
            sum = sum.checked_add(*v).ok_or(ComputationError::Overflow("sum"))?;
            minimum = minimum.min(*v);
            maximum = maximum.max(*v);
        }
        let average = sum
            .checked_div(Decimal::from(values.len()))
            .ok_or(ComputationError::Overflow("average"))?;

        Ok(Self {
            average: round_2dp(average),
            minimum: round_2dp(minimum),
            maximum: round_2dp(maximum),
        })
    }
}

/// Rounds half-to-even and pins the scale to two places, so `72` is
/// stored as `72.00`.
pub fn round_2dp(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
    rounded.rescale(2);
    rounded
}
