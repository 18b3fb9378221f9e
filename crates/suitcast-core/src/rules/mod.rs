//! Rule learning: an unbounded ranked pool per suit, a quarantine of rules
//! that recently lost, and the bounded active set selected from both.

pub mod active;
pub mod pool;
pub mod quarantine;

pub use active::{ActiveRuleSet, MAX_ACTIVE_RULES, RULES_PER_SUIT, SelectOutcome, select_active};
pub use pool::{MIN_OBSERVATIONS, Rule, RulePool};
pub use quarantine::{Quarantine, QuarantineEntry};
