//! Fixpoint evaluation of derived-predicate rules over an extensional state.
//!
//! Two interchangeable engines are provided. [`NaiveEngine`] re-runs every rule against the full
//! state until a complete pass derives nothing; [`SemiNaiveEngine`] only joins against facts that
//! are new since the previous iteration. Both reach the same fixpoint.

pub mod naive;
pub mod semi_naive;

pub use naive::NaiveEngine;
pub use semi_naive::SemiNaiveEngine;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::{
    middleware::Facts,
    rules::{RegistryRecord, Stratum},
};

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum EvaluationStrategy {
    #[default]
    Naive,
    SemiNaive,
}

/// Counters reported by one fixpoint computation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FixpointStats {
    /// Full passes (naive) or delta iterations (semi-naive), including the final empty one.
    pub passes: usize,
    /// Number of facts added to the state.
    pub derived: usize,
}

/// The generic interface for a bottom-up rule evaluator.
pub trait FixpointEngine {
    /// Saturates `facts` with the rules of every derived predicate classified as `stratum`.
    /// Facts are only ever added.
    fn apply_rules(&self, facts: &mut Facts, record: &RegistryRecord, stratum: Stratum)
        -> FixpointStats;
}

/// Runs the engine selected by `strategy`.
pub fn apply_rules(
    facts: &mut Facts,
    record: &RegistryRecord,
    stratum: Stratum,
    strategy: EvaluationStrategy,
) -> FixpointStats {
    match strategy {
        EvaluationStrategy::Naive => NaiveEngine.apply_rules(facts, record, stratum),
        EvaluationStrategy::SemiNaive => SemiNaiveEngine.apply_rules(facts, record, stratum),
    }
}
