//! Implements a semi-naive bottom-up evaluation engine.
//!
//! The engine iteratively applies the rules of one stratum to a [`Facts`] store until no new
//! facts can be derived, signifying that a fixed point has been reached. It derives exactly the
//! facts the naive engine derives.

use log::{debug, log_enabled, trace, Level};

use super::{FixpointEngine, FixpointStats};
use crate::{
    middleware::{Facts, ObjectId, Relation},
    rules::{unify, RegistryRecord, Rule, Stratum},
};

/// A variable assignment, indexed by the rule's variable slots.
pub type Bindings = Vec<Option<ObjectId>>;

/// Implements a semi-naive evaluation engine.
///
/// This engine evaluates rules iteratively, using the deltas from one iteration to find new
/// facts in the next, which avoids re-deriving the same facts on every pass.
pub struct SemiNaiveEngine;

impl FixpointEngine for SemiNaiveEngine {
    /// The core semi-naive evaluation loop.
    ///
    /// In each iteration we only consider joins where at least one of the participating
    /// relations is restricted to the `delta` of the *previous* iteration. Every fact already in
    /// the state counts as new for the first iteration, so that iteration is a full naive pass.
    ///
    /// 1. Seed the state with the heads of body-less rules.
    /// 2. Compute a `new_delta` by joining rules against `delta` and the cumulative facts.
    /// 3. Replace `delta` with `new_delta`; stop once it is empty.
    fn apply_rules(
        &self,
        facts: &mut Facts,
        record: &RegistryRecord,
        stratum: Stratum,
    ) -> FixpointStats {
        let rules: Vec<&Rule> = record
            .derived_in(stratum)
            .flat_map(|d| d.rules.iter())
            .collect();
        let mut stats = FixpointStats::default();
        if rules.is_empty() {
            return stats;
        }

        stats.derived += self.seed_initial_facts(&rules, facts);
        let mut delta = facts.clone();

        loop {
            stats.passes += 1;
            let new_delta = self.perform_iteration(&rules, facts, &delta);

            if log_enabled!(Level::Trace) {
                for (p, rel) in new_delta.iter() {
                    trace!("Iteration {} – Δ {} size = {}", stats.passes, p, rel.len());
                }
            }

            if new_delta.is_empty() {
                break;
            }
            stats.derived += new_delta.len();
            delta = new_delta;
        }

        debug!(
            "{} fixpoint of '{}' after {} iterations, {} new facts",
            stratum, record.domain, stats.passes, stats.derived
        );
        stats
    }
}

impl SemiNaiveEngine {
    /// Adds the (all-constant) heads of body-less rules, returning how many were new.
    fn seed_initial_facts(&self, rules: &[&Rule], facts: &mut Facts) -> usize {
        rules
            .iter()
            .filter(|r| r.body.is_empty())
            .filter_map(|r| Some((r.head.predicate, r.project_head(&[])?)))
            .filter(|(pred, tuple)| facts.insert(*pred, tuple.clone()))
            .count()
    }

    /// Performs a single iteration, returning the facts that are new in it. New facts are added
    /// to `facts` immediately, so later rules of the same iteration already see them.
    fn perform_iteration(&self, rules: &[&Rule], facts: &mut Facts, delta: &Facts) -> Facts {
        let mut new_delta = Facts::new();
        for rule in rules {
            if rule.body.is_empty() {
                continue; // Seed facts are not re-evaluated.
            }
            for bindings in self.join_rule_body(rule, facts, delta) {
                let Some(tuple) = rule.project_head(&bindings) else {
                    continue;
                };
                if facts.insert(rule.head.predicate, tuple.clone()) {
                    trace!("New fact derived by {}: {:?}", rule, tuple);
                    new_delta.insert(rule.head.predicate, tuple);
                }
            }
        }
        new_delta
    }

    /// To derive a *new* fact, at least one body atom must be matched against a delta fact.
    /// For each body position whose predicate has delta facts, join the body with that one
    /// atom restricted to `delta` and every other atom against `facts`.
    fn join_rule_body(&self, rule: &Rule, facts: &Facts, delta: &Facts) -> Vec<Bindings> {
        let delta_positions: Vec<usize> = rule
            .body
            .iter()
            .enumerate()
            .filter(|(_, atom)| {
                delta
                    .relation(atom.predicate)
                    .is_some_and(|rel| !rel.is_empty())
            })
            .map(|(idx, _)| idx)
            .collect();

        let mut all_bindings = Vec::new();
        for delta_idx in delta_positions {
            all_bindings.extend(self.perform_join(rule, delta_idx, facts, delta));
        }
        all_bindings
    }

    /// Nested-loop join of the body, left to right, with atom `delta_idx` restricted to `delta`.
    fn perform_join(
        &self,
        rule: &Rule,
        delta_idx: usize,
        facts: &Facts,
        delta: &Facts,
    ) -> Vec<Bindings> {
        let empty = Relation::new();
        let mut current: Vec<Bindings> = vec![vec![None; rule.num_variables()]];

        for (idx, atom) in rule.body.iter().enumerate() {
            let source = if idx == delta_idx { delta } else { facts };
            let relation = source.relation(atom.predicate).unwrap_or(&empty);

            let mut next = Vec::new();
            for bindings in &current {
                for tuple in relation {
                    let mut extended = bindings.clone();
                    if unify(&mut extended, atom, tuple) {
                        next.push(extended);
                    }
                }
            }

            // If this atom produced no compatible bindings, the rule fails early.
            if next.is_empty() {
                return Vec::new();
            }
            current = next;
        }
        current
    }
}
