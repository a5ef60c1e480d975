use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Threshold rule for one sensor type. The average of a minute must stay
/// within `[min_allowed_average, max_allowed_average]`; leaving that band
/// for `consecutive_trigger_count` observed minutes raises an alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(rename = "type")]
    pub sensor_type: String,
    #[serde(rename = "avg_min")]
    pub min_allowed_average: Decimal,
    #[serde(rename = "avg_max")]
    pub max_allowed_average: Decimal,
    #[serde(rename = "trigger_count")]
    pub consecutive_trigger_count: u32,
}

impl Rule {
    pub fn new(
        sensor_type: impl Into<String>,
        min_allowed_average: Decimal,
        max_allowed_average: Decimal,
        consecutive_trigger_count: u32,
    ) -> Self {
        Self {
            sensor_type: sensor_type.into(),
            min_allowed_average,
            max_allowed_average,
            consecutive_trigger_count,
        }
    }

    /// Bounds are inclusive: an average equal to either bound is fine.
    pub fn is_breached(&self, average: Decimal) -> bool {
        average < self.min_allowed_average || average > self.max_allowed_average
    }
}
