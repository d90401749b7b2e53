pub mod bandit;
pub mod heuristic;
pub mod overrides;

pub use bandit::BanditEngine;
pub use heuristic::CategoricalRules;
pub use overrides::{OverrideDecision, OverrideRuleSet};
