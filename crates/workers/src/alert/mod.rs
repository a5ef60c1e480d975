mod catalog;
mod evaluator;
mod event;
mod rule;
mod state;

pub use catalog::RuleCatalog;
pub use evaluator::{evaluate_pair, EvaluationReport, PairWalk, RuleEvaluator, WindowStep};
pub use event::{breach_message, AlertRecord};
pub use rule::Rule;
pub use state::{BreachState, WindowObservation};
