use std::fmt;
use std::str::FromStr;

use bsm_common::time::TimeRange;
use serde::Serialize;

use crate::aggregator::{AggregationEngine, AggregationReport};
use crate::alert::{EvaluationReport, RuleCatalog, RuleEvaluator};
use crate::config::AppConfig;
use crate::error::RunError;
use crate::storage::{Stores, TableKind};

/// The batch programs a run can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum EngineKind {
    /// Raw readings to per-minute aggregates.
    Aggregates,
    /// Aggregates to threshold breach alerts.
    Rules,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aggregates => "aggregates",
            Self::Rules => "rules",
        }
    }

    /// Tables that must exist before the engine may start.
    pub fn required_tables(&self) -> &'static [TableKind] {
        match self {
            Self::Aggregates => &[TableKind::Raw, TableKind::Aggregates],
            Self::Rules => &[TableKind::Aggregates, TableKind::Alerts],
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown program '{0}', expected 'aggregates' or 'rules'")]
pub struct UnknownEngine(pub String);

impl FromStr for EngineKind {
    type Err = UnknownEngine;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aggregates" | "aggregator" => Ok(Self::Aggregates),
            "rules" | "rulealert" => Ok(Self::Rules),
            _ => Err(UnknownEngine(s.to_string())),
        }
    }
}

pub enum Engine {
    Aggregates(AggregationEngine),
    Rules(RuleEvaluator),
}

impl Engine {
    /// Wires an engine to its stores. The rules engine also loads the
    /// rule catalog named by the config.
    pub fn build(kind: EngineKind, stores: &Stores, config: &AppConfig) -> Result<Self, RunError> {
        let retry = config.retry_policy();
        match kind {
            EngineKind::Aggregates => Ok(Self::Aggregates(AggregationEngine::new(
                stores.readings.clone(),
                stores.aggregates.clone(),
                retry,
            ))),
            EngineKind::Rules => {
                let catalog = RuleCatalog::load_from_file(&config.rules_file)?;
                if catalog.is_empty() {
                    tracing::warn!(path = %config.rules_file.display(), "rule catalog is empty");
                }
                Ok(Self::Rules(RuleEvaluator::new(
                    stores.aggregates.clone(),
                    stores.alerts.clone(),
                    catalog,
                    retry,
                )))
            }
        }
    }

    pub async fn run(&self, range: TimeRange) -> Result<RunReport, RunError> {
        match self {
            Self::Aggregates(engine) => engine.run(range).await.map(RunReport::Aggregates),
            Self::Rules(engine) => engine.run(range).await.map(RunReport::Rules),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "program", rename_all = "snake_case")]
pub enum RunReport {
    Aggregates(AggregationReport),
    Rules(EvaluationReport),
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aggregates(r) => write!(
                f,
                "aggregates: {} readings scanned, {} in range, {} records written, {} buckets skipped",
                r.readings_scanned, r.readings_in_range, r.records_written, r.buckets_skipped
            ),
            Self::Rules(r) => write!(
                f,
                "rules: {} devices, {} pairs, {} breaches, {} alerts raised",
                r.devices, r.pairs_evaluated, r.breaches, r.alerts_raised
            ),
        }
    }
}
