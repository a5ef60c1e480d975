use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::rule::Rule;
use crate::config::LoadError;

#[derive(Debug, Deserialize)]
struct CatalogFile {
    rules: Vec<Rule>,
}

/// Ordered set of threshold rules, as listed in `rules.json`.
#[derive(Debug, Clone, Default)]
pub struct RuleCatalog {
    rules: Vec<Rule>,
}

impl RuleCatalog {
    pub fn new(rules: Vec<Rule>) -> Result<Self, LoadError> {
        for (i, rule) in rules.iter().enumerate() {
            validate_rule(i, rule)?;
        }
        Ok(Self { rules })
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let content = fs::read_to_string(path.as_ref())?;
        let catalog = Self::load_from_str(&content)?;
        tracing::debug!(
            path = %path.as_ref().display(),
            rules = catalog.rules.len(),
            "rule catalog loaded"
        );
        Ok(catalog)
    }

    pub fn load_from_str(content: &str) -> Result<Self, LoadError> {
        let file: CatalogFile = serde_json::from_str(content)?;
        Self::new(file.rules)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First rule listed for `sensor_type`; later duplicates are ignored.
    pub fn rule_for(&self, sensor_type: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.sensor_type == sensor_type)
    }

    /// Distinct sensor types in catalog order.
    pub fn sensor_types(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.rules
            .iter()
            .map(|r| r.sensor_type.as_str())
            .filter(|t| seen.insert(*t))
            .collect()
    }
}

fn validate_rule(index: usize, rule: &Rule) -> Result<(), LoadError> {
    let invalid = |msg: String| Err(LoadError::Validation(format!("rules[{index}]: {msg}")));

    if rule.sensor_type.trim().is_empty() {
        return invalid("type must not be empty".into());
    }
    if rule.consecutive_trigger_count == 0 {
        return invalid(format!("trigger_count for '{}' must be at least 1", rule.sensor_type));
    }
    if rule.min_allowed_average > rule.max_allowed_average {
        return invalid(format!(
            "avg_min {} is greater than avg_max {} for '{}'",
            rule.min_allowed_average, rule.max_allowed_average, rule.sensor_type
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "rules": [
            {"type": "hr", "avg_min": 60, "avg_max": 100, "trigger_count": 2},
            {"type": "spo2", "avg_min": 94, "avg_max": 100, "trigger_count": 3},
            {"type": "hr", "avg_min": 0, "avg_max": 1, "trigger_count": 1}
        ]
    }"#;

    #[test]
    fn first_rule_wins_on_duplicates() {
        let catalog = RuleCatalog::load_from_str(SAMPLE).unwrap();
        let hr = catalog.rule_for("hr").unwrap();
        assert_eq!(hr.max_allowed_average, Decimal::from(100));
        assert_eq!(hr.consecutive_trigger_count, 2);
    }

    #[test]
    fn sensor_types_deduplicated_in_order() {
        let catalog = RuleCatalog::load_from_str(SAMPLE).unwrap();
        assert_eq!(catalog.sensor_types(), vec!["hr", "spo2"]);
        assert_eq!(catalog.rules().len(), 3);
    }

    #[test]
    fn unknown_sensor_has_no_rule() {
        let catalog = RuleCatalog::load_from_str(SAMPLE).unwrap();
        assert!(catalog.rule_for("temp").is_none());
    }

    #[test]
    fn zero_trigger_count_rejected() {
        let err = RuleCatalog::load_from_str(
            r#"{"rules":[{"type":"hr","avg_min":60,"avg_max":100,"trigger_count":0}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::Validation(ref m) if m.contains("trigger_count")));
    }

    #[test]
    fn inverted_bounds_rejected() {
        let err = RuleCatalog::load_from_str(
            r#"{"rules":[{"type":"hr","avg_min":100,"avg_max":60,"trigger_count":1}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::Validation(ref m) if m.contains("rules[0]")));
    }

    #[test]
    fn missing_field_is_parse_error() {
        let err = RuleCatalog::load_from_str(r#"{"rules":[{"type":"hr","avg_min":60}]}"#)
            .unwrap_err();
        assert!(matches!(err, LoadError::Parse(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(SAMPLE.as_bytes()).unwrap();
        let catalog = RuleCatalog::load_from_file(f.path()).unwrap();
        assert!(!catalog.is_empty());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = RuleCatalog::load_from_file("/nonexistent/rules.json").unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }
}
