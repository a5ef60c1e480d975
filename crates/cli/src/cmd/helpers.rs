use anyhow::{Context, Result};
use bsm_common::time::TimeRange;
use bsm_workers::config::{load_from_file, AppConfig};
use bsm_workers::runner;
use bsm_workers::storage::Stores;
use std::path::PathBuf;

use crate::output::{spinner, OutputMode};

pub fn default_config_path() -> PathBuf {
    std::env::var_os("BSM_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("configs/config.json"))
}

pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let path = config_path
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);

    tracing::debug!(path = %path.display(), "loading config");
    load_from_file(&path).with_context(|| format!("loading config from {}", path.display()))
}

pub fn parse_range(cfg: &AppConfig, start: &str, end: &str) -> Result<TimeRange> {
    TimeRange::parse(start, end, &cfg.datetime_format)
        .with_context(|| format!("expected instants like '{}'", cfg.datetime_format))
}

pub async fn connect(cfg: &AppConfig, mode: OutputMode) -> Result<Stores> {
    let sp = match mode {
        OutputMode::Human => Some(spinner::create("Connecting to database...")),
        OutputMode::Json => None,
    };

    let result = runner::connect(cfg).await;

    if let Some(sp) = sp {
        match &result {
            Ok(_) => spinner::finish_clear(&sp),
            Err(_) => spinner::finish_err(&sp, "Database unreachable"),
        }
    }

    result.context("connecting to database")
}
