use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single sample emitted by a bedside monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Reading {
    pub device_id: String,
    pub sensor_type: String,
    pub value: Decimal,
    #[sqlx(rename = "ts")]
    pub timestamp: NaiveDateTime,
}

impl Reading {
    pub fn new(
        device_id: impl Into<String>,
        sensor_type: impl Into<String>,
        value: Decimal,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            sensor_type: sensor_type.into(),
            value,
            timestamp,
        }
    }
}
