#[cfg(test)]
mod tests {
    use crate::cmd::helpers;

    fn write_config(dir: &tempfile::TempDir, body: &str) -> String {
        let path = dir.path().join("config.json");
        std::fs::write(&path, body).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn default_config_path_not_empty() {
        let path = helpers::default_config_path();
        assert!(!path.to_string_lossy().is_empty());
    }

    #[test]
    fn load_config_missing_file() {
        let result = helpers::load_config(Some("/nonexistent/config.json"));
        let err = result.unwrap_err();
        assert!(err.to_string().contains("/nonexistent/config.json"));
    }

    #[test]
    fn load_config_from_tempfile() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"{"database_url": "postgres://localhost/bsm", "alert_table": "icu_alerts"}"#,
        );
        let cfg = helpers::load_config(Some(&path)).unwrap();
        assert_eq!(cfg.alert_table, "icu_alerts");
        assert_eq!(cfg.raw_data_table, "bsm_data");
    }

    #[test]
    fn parse_range_uses_configured_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"{"database_url": "postgres://x", "datetime_format": "%Y-%m-%d %H:%M"}"#,
        );
        let cfg = helpers::load_config(Some(&path)).unwrap();
        let range = helpers::parse_range(&cfg, "2021-06-12 18:26", "2021-06-12 18:30").unwrap();
        assert_eq!((range.end - range.start).num_minutes(), 4);
    }

    #[test]
    fn parse_range_error_mentions_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, r#"{"database_url": "postgres://x"}"#);
        let cfg = helpers::load_config(Some(&path)).unwrap();
        let err = helpers::parse_range(&cfg, "yesterday", "today").unwrap_err();
        assert!(err.to_string().contains("%y/%m/%d %H:%M:%S"));
    }
}
