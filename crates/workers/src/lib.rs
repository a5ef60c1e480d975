pub mod aggregator;
pub mod alert;
pub mod config;
pub mod error;
pub mod logging;
pub mod processor;
pub mod reading;
pub mod runner;
pub mod storage;
pub mod test_harness;

pub use error::{ComputationError, RunError};
pub use processor::{Engine, EngineKind, RunReport};
pub use reading::Reading;
