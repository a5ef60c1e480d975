use std::path::Path;

use super::schema::AppConfig;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("validation: {0}")]
    Validation(String),
}

pub fn load_from_file(path: &Path) -> Result<AppConfig, LoadError> {
    let contents = std::fs::read_to_string(path)?;
    let mut cfg: AppConfig = serde_json::from_str(&contents)?;
    apply_env_overrides(&mut cfg);
    validate(&cfg)?;
    Ok(cfg)
}

pub fn load_from_str(json: &str) -> Result<AppConfig, LoadError> {
    let cfg: AppConfig = serde_json::from_str(json)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// `DATABASE_URL` wins over the file.
pub fn apply_env_overrides(cfg: &mut AppConfig) {
    if let Ok(url) = std::env::var("DATABASE_URL") {
        if !url.is_empty() {
            cfg.database_url = url;
        }
    }
}

const MAX_BACKOFF_FACTOR: f64 = 10.0;

fn validate(cfg: &AppConfig) -> Result<(), LoadError> {
    if cfg.database_url.is_empty() {
        return Err(LoadError::Validation(
            "database_url must be set (or DATABASE_URL exported)".into(),
        ));
    }

    let tables = [
        ("raw_data_table", &cfg.raw_data_table),
        ("aggregate_data_table", &cfg.aggregate_data_table),
        ("alert_table", &cfg.alert_table),
    ];
    for (key, name) in tables {
        if !is_identifier(name) {
            return Err(LoadError::Validation(format!(
                "{key} '{name}' is not a valid table name"
            )));
        }
    }
    if cfg.raw_data_table == cfg.aggregate_data_table
        || cfg.raw_data_table == cfg.alert_table
        || cfg.aggregate_data_table == cfg.alert_table
    {
        return Err(LoadError::Validation("table names must be distinct".into()));
    }

    if cfg.datetime_format.trim().is_empty() {
        return Err(LoadError::Validation("datetime_format must not be empty".into()));
    }
    if cfg.scan_page_size == 0 {
        return Err(LoadError::Validation("scan_page_size must be > 0".into()));
    }
    if cfg.max_connections == 0 {
        return Err(LoadError::Validation("max_connections must be > 0".into()));
    }
    if cfg.retry.max_attempts == 0 {
        return Err(LoadError::Validation("retry.max_attempts must be > 0".into()));
    }
    if !(1.0..=MAX_BACKOFF_FACTOR).contains(&cfg.retry.backoff_factor) {
        return Err(LoadError::Validation(format!(
            "retry.backoff_factor must be within [1, {MAX_BACKOFF_FACTOR}]"
        )));
    }
    if !(0.0..=1.0).contains(&cfg.retry.jitter_fraction) {
        return Err(LoadError::Validation(
            "retry.jitter_fraction must be within [0, 1]".into(),
        ));
    }
    Ok(())
}

/// Table names are spliced into SQL, so only plain identifiers pass.
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
