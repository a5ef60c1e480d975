use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::rule::Rule;
use crate::aggregator::AggregateRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AlertRecord {
    pub id: Uuid,
    pub device_id: String,
    pub sensor_type: String,
    pub message: String,
    /// `bucket_start` of the aggregate that completed the streak.
    pub breach_time: NaiveDateTime,
    pub raised_at: NaiveDateTime,
}

impl AlertRecord {
    pub fn raise(
        rule: &Rule,
        trigger: &AggregateRecord,
        breaches: u32,
        raised_at: NaiveDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            device_id: trigger.device_id.clone(),
            sensor_type: rule.sensor_type.clone(),
            message: breach_message(rule, trigger, breaches),
            breach_time: trigger.bucket_start,
            raised_at,
        }
    }
}

pub fn breach_message(rule: &Rule, trigger: &AggregateRecord, breaches: u32) -> String {
    format!(
        "Warning! {breaches} consecutive breach(es) on device {} for sensor {} at {}: \
         average {} outside allowed range [{}, {}]",
        trigger.device_id,
        rule.sensor_type,
        trigger.bucket_start,
        trigger.average,
        rule.min_allowed_average,
        rule.max_allowed_average,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn trigger() -> AggregateRecord {
        let at = NaiveDate::from_ymd_opt(2021, 6, 12)
            .unwrap()
            .and_hms_opt(18, 27, 0)
            .unwrap();
        AggregateRecord {
            device_id: "BSM_G101".into(),
            sensor_type: "hr".into(),
            average: Decimal::new(11500, 2),
            minimum: Decimal::new(11000, 2),
            maximum: Decimal::new(12000, 2),
            bucket_start: at,
            computed_at: at,
        }
    }

    #[test]
    fn message_names_device_sensor_and_bounds() {
        let rule = Rule::new("hr", Decimal::from(60), Decimal::from(100), 2);
        let msg = breach_message(&rule, &trigger(), 2);
        assert!(msg.contains("BSM_G101"));
        assert!(msg.contains("sensor hr"));
        assert!(msg.contains("115.00"));
        assert!(msg.contains("[60, 100]"));
        assert!(msg.contains("2021-06-12 18:27:00"));
    }

    #[test]
    fn raise_uses_bucket_start_as_breach_time() {
        let rule = Rule::new("hr", Decimal::from(60), Decimal::from(100), 2);
        let t = trigger();
        let a = AlertRecord::raise(&rule, &t, 2, t.computed_at);
        let b = AlertRecord::raise(&rule, &t, 2, t.computed_at);
        assert_eq!(a.breach_time, t.bucket_start);
        assert_ne!(a.id, b.id);
    }
}
