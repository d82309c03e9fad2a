//! Greedy policy search driven by an external value/solvability model.

mod config;
mod controller;
mod error;
mod scorer;

use std::sync::Arc;

pub use config::{CycleHandling, SearchConfig};
pub use controller::{Evaluation, FastPath, Outcome, PolicySearch, SearchResult, Trace};
pub use error::PolicyError;
pub use scorer::{is_solvable, EncodedBatch, ScoreOutput, Scorer};

use crate::{
    planning::Problem,
    rules::{RegistryRecord, RuleRegistry},
    solver::{Augmenter, EvaluationStrategy},
};

/// Loads the rules of the problem's domain and runs one search. A domain without rules is
/// searched over its base facts only.
pub fn solve<S: Scorer>(
    problem: &mut Problem,
    registry: &RuleRegistry,
    strategy: EvaluationStrategy,
    scorer: S,
    config: SearchConfig,
) -> crate::Result<SearchResult> {
    let strata = problem.base_strata();
    let record = registry
        .load(&problem.domain, &mut problem.language, &strata)?
        .unwrap_or_else(|| RegistryRecord::empty(&problem.domain));
    let augmenter = Augmenter::new(Arc::new(record)).with_strategy(strategy);
    let search = PolicySearch::new(problem, augmenter, scorer, config)?;
    Ok(search.run()?)
}
