use std::{collections::HashSet, time::Instant};

use log::{debug, trace, warn};
use strum_macros::Display;

use super::{
    is_solvable, CycleHandling, EncodedBatch, PolicyError, Scorer, SearchConfig,
};
use crate::{
    middleware::Facts,
    planning::{successors, Problem, State},
    rules::{BaseStrata, Stratum},
    solver::Augmenter,
};

/// Why a search run stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Outcome {
    Goal,
    MaxLength,
    DeadEnd,
    Cycle,
    /// The fast path proved the current state unsolvable.
    Unsolvable,
    TimeLimit,
}

/// A pluggable closed-form solvability test, consulted before the scorer at every step.
pub trait FastPath {
    /// `Some(true)` if `state` is known to be solved, `Some(false)` if it is known to be
    /// unsolvable, `None` to continue the search.
    fn check(&self, problem: &Problem, state: &State) -> Option<bool>;
}

/// The trajectory of a run. `states` and `values` start with the initial state, so they always
/// hold one entry more than `actions`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Trace {
    pub actions: Vec<usize>,
    pub states: Vec<State>,
    pub values: Vec<f32>,
}

impl Trace {
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SearchResult {
    pub trace: Trace,
    pub outcome: Outcome,
    /// Number of candidate states sent to the scorer.
    pub evaluations: usize,
}

impl SearchResult {
    pub fn reached_goal(&self) -> bool {
        self.outcome == Outcome::Goal
    }

    /// Names of the chosen actions, in order.
    pub fn plan<'a>(&self, problem: &'a Problem) -> Vec<&'a str> {
        self.trace
            .actions
            .iter()
            .filter_map(|&idx| problem.actions.get(idx))
            .map(|a| a.name.as_str())
            .collect()
    }
}

/// Scorer verdict on one state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Evaluation {
    pub value: f32,
    pub solvable: bool,
    /// `value`, plus the unsolvable weight if the state was classified unsolvable.
    pub penalized: f32,
}

/// Greedy one-step lookahead over the successors of the current state, ranked by an external
/// [`Scorer`].
///
/// Everything that does not depend on the current state (the goal denotation and the
/// saturated static facts) is computed once, on construction.
pub struct PolicySearch<'a, S> {
    problem: &'a Problem,
    augmenter: Augmenter,
    scorer: S,
    config: SearchConfig,
    fast_path: Option<Box<dyn FastPath + 'a>>,
    strata: BaseStrata,
    goal: Facts,
    static_facts: Facts,
}

impl<'a, S: Scorer> PolicySearch<'a, S> {
    pub fn new(
        problem: &'a Problem,
        augmenter: Augmenter,
        scorer: S,
        config: SearchConfig,
    ) -> Result<Self, PolicyError> {
        let strata = problem.base_strata();
        let goal = problem.goal_denotation()?;
        let static_facts = augmenter.augment(
            &problem.static_facts(&problem.initial, &strata),
            Stratum::Static,
            &goal,
        );
        debug!(
            "Prepared search for '{}': {} goal facts, {} static facts",
            problem.name,
            goal.len(),
            static_facts.len()
        );
        Ok(Self {
            problem,
            augmenter,
            scorer,
            config,
            fast_path: None,
            strata,
            goal,
            static_facts,
        })
    }

    pub fn with_fast_path(mut self, fast_path: impl FastPath + 'a) -> Self {
        self.fast_path = Some(Box::new(fast_path));
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// The saturated extensional state of `state`: the cached static facts plus the state's
    /// dynamic atoms, closed under the dynamic rules with the goal injected.
    pub fn augment_state(&self, state: &State) -> Facts {
        let mut working = self.static_facts.clone();
        working.extend_from(&self.problem.dynamic_facts(state, &self.strata));
        self.augmenter
            .augment(&working, Stratum::Dynamic, &self.goal)
    }

    /// `state` completed with the static atoms of the initial state. States described only by
    /// their fluents (as in FDR queries) need these before preconditions can be checked.
    pub fn with_static_atoms(&self, state: &State) -> State {
        let fixed = self
            .problem
            .initial
            .atoms()
            .filter(|a| !self.strata.dynamic_predicates.contains(&a.predicate));
        State::new(state.atoms().chain(fixed).cloned())
    }

    /// Scores `states` in a single scorer call.
    pub fn evaluate(&self, states: &[&State]) -> Result<Vec<Evaluation>, PolicyError> {
        let augmented: Vec<Facts> = states.iter().map(|s| self.augment_state(s)).collect();
        let batch = EncodedBatch::encode(
            &augmented,
            &self.goal,
            self.problem.language.num_objects(),
        );
        let output = self.scorer.score(&batch)?;
        if output.values.len() != states.len() || output.solvability.len() != states.len() {
            return Err(PolicyError::ShapeMismatch {
                expected: states.len(),
                values: output.values.len(),
                solvability: output.solvability.len(),
            });
        }

        Ok(output
            .values
            .iter()
            .zip(&output.solvability)
            .map(|(&value, &logit)| {
                let solvable = is_solvable(logit);
                let penalized = if solvable {
                    value
                } else {
                    value + self.config.unsolvable_weight
                };
                Evaluation {
                    value,
                    solvable,
                    penalized,
                }
            })
            .collect())
    }

    /// Applicable actions of `state` with their penalized values, best first. Equal values keep
    /// action order.
    pub fn rank_successors(&self, state: &State) -> Result<Vec<(usize, f32)>, PolicyError> {
        let candidates = successors(state, &self.problem.actions);
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let states: Vec<&State> = candidates.iter().map(|(_, s)| s).collect();
        let evaluations = self.evaluate(&states)?;
        let mut ranked: Vec<(usize, f32)> = candidates
            .iter()
            .zip(&evaluations)
            .map(|((action, _), eval)| (*action, eval.penalized))
            .collect();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
        Ok(ranked)
    }

    /// Runs the search from the problem's initial state.
    pub fn run(&self) -> Result<SearchResult, PolicyError> {
        let started = Instant::now();
        let problem = self.problem;
        let mut current = problem.initial.clone();
        let mut trace = Trace {
            states: vec![current.clone()],
            ..Default::default()
        };

        let seed = self
            .evaluate(&[&current])
            .map_err(|e| e.at_step(0, &trace))?;
        trace.values.extend(seed.first().map(|e| e.value));

        let mut closed: HashSet<State> = HashSet::new();
        let mut evaluations = 0;
        let outcome = loop {
            if problem.is_goal(&current) {
                break Outcome::Goal;
            }
            if trace.len() >= self.config.max_length {
                break Outcome::MaxLength;
            }
            if let Some(limit) = self.config.time_limit_ms {
                if started.elapsed().as_millis() >= u128::from(limit) {
                    break Outcome::TimeLimit;
                }
            }
            if self.config.cycles == CycleHandling::Detect && closed.contains(&current) {
                break Outcome::Cycle;
            }
            closed.insert(current.clone());

            if let Some(fast_path) = &self.fast_path {
                match fast_path.check(problem, &current) {
                    Some(true) => break Outcome::Goal,
                    Some(false) => break Outcome::Unsolvable,
                    None => {}
                }
            }

            let mut candidates = successors(&current, &problem.actions);
            if self.config.cycles == CycleHandling::Avoid {
                candidates.retain(|(_, s)| !closed.contains(s));
            }
            if candidates.is_empty() {
                break Outcome::DeadEnd;
            }

            let step = trace.len() + 1;
            let states: Vec<&State> = candidates.iter().map(|(_, s)| s).collect();
            let scored = self
                .evaluate(&states)
                .map_err(|e| e.at_step(step, &trace))?;
            evaluations += scored.len();
            for ((action, _), eval) in candidates.iter().zip(&scored) {
                trace!(
                    "  {} -> {} (solvable: {})",
                    problem.actions[*action].name,
                    eval.penalized,
                    eval.solvable
                );
            }
            if scored.iter().all(|e| !e.solvable) {
                warn!(
                    "Step {}: all {} candidates classified unsolvable",
                    step,
                    scored.len()
                );
            }

            let best = select(&scored);
            let (action, next) = candidates.swap_remove(best);
            debug!(
                "Step {}: {} (value {})",
                step, problem.actions[action].name, scored[best].value
            );
            trace.actions.push(action);
            trace.states.push(next.clone());
            trace.values.push(scored[best].value);
            current = next;
        };

        debug!(
            "Search on '{}' ended with {} after {} actions and {} evaluations",
            problem.name,
            outcome,
            trace.len(),
            evaluations
        );
        Ok(SearchResult {
            trace,
            outcome,
            evaluations,
        })
    }
}

/// Index of the minimum penalized value under `f32::total_cmp`, the order `rank_successors`
/// sorts by; the first one wins on ties.
fn select(evaluations: &[Evaluation]) -> usize {
    let mut best = 0;
    for (idx, eval) in evaluations.iter().enumerate().skip(1) {
        if eval.penalized.total_cmp(&evaluations[best].penalized).is_lt() {
            best = idx;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evals(values: &[f32]) -> Vec<Evaluation> {
        values
            .iter()
            .map(|&value| Evaluation {
                value,
                solvable: true,
                penalized: value,
            })
            .collect()
    }

    #[test]
    fn test_select_orders_like_ranking() {
        assert_eq!(select(&evals(&[f32::NAN, 3.0, 1.0])), 2);
        assert_eq!(select(&evals(&[2.0, 1.0, 1.0])), 1);
        assert_eq!(select(&evals(&[f32::NAN, f32::NAN])), 0);

        let values = [f32::NAN, 3.0, 1.0, f32::INFINITY];
        let mut ranked: Vec<(usize, f32)> = values.iter().copied().enumerate().collect();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
        assert_eq!(select(&evals(&values)), ranked[0].0);
    }
}
