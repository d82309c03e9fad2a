//! Naive bottom-up evaluation.
//!
//! Every rule body is joined as the full Cartesian product of its atoms' denotations, which is
//! exponential in the body length. Rule bodies are expected to stay short.

use itertools::Itertools;
use log::{debug, trace};

use super::{FixpointEngine, FixpointStats};
use crate::{
    middleware::{Facts, Tuple},
    rules::{unify, RegistryRecord, Rule, Stratum},
};

pub struct NaiveEngine;

impl FixpointEngine for NaiveEngine {
    fn apply_rules(
        &self,
        facts: &mut Facts,
        record: &RegistryRecord,
        stratum: Stratum,
    ) -> FixpointStats {
        let derived_predicates: Vec<_> = record.derived_in(stratum).collect();
        let mut stats = FixpointStats::default();
        if derived_predicates.is_empty() {
            return stats;
        }

        loop {
            stats.passes += 1;
            let mut changed = false;
            for derived in &derived_predicates {
                // Keep firing this predicate's rules until none of them adds a fact.
                loop {
                    let mut fired = false;
                    for rule in &derived.rules {
                        let added = fire(rule, facts);
                        if added > 0 {
                            trace!("{} derived {} facts", rule, added);
                            stats.derived += added;
                            fired = true;
                        }
                    }
                    if !fired {
                        break;
                    }
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        debug!(
            "{} fixpoint of '{}' after {} passes, {} new facts",
            stratum, record.domain, stats.passes, stats.derived
        );
        stats
    }
}

/// Fires `rule` once against the current state, returning the number of new facts.
fn fire(rule: &Rule, facts: &mut Facts) -> usize {
    derive(rule, facts)
        .into_iter()
        .filter(|tuple| facts.insert(rule.head.predicate, tuple.clone()))
        .count()
}

/// All head tuples produced by `rule` over `facts` that are not yet present.
pub(super) fn derive(rule: &Rule, facts: &Facts) -> Vec<Tuple> {
    if rule.body.is_empty() {
        // Body-less rules are facts with an all-constant head.
        return rule
            .project_head(&[])
            .filter(|tuple| !facts.contains(rule.head.predicate, tuple))
            .into_iter()
            .collect();
    }

    // A missing predicate denotes the empty set, which empties the whole product.
    let denotations: Vec<Vec<&Tuple>> = rule
        .body
        .iter()
        .map(|atom| {
            facts
                .relation(atom.predicate)
                .map(|rel| rel.iter().collect())
                .unwrap_or_default()
        })
        .collect();
    if denotations.iter().any(|d| d.is_empty()) {
        return Vec::new();
    }

    denotations
        .into_iter()
        .map(|d| d.into_iter())
        .multi_cartesian_product()
        .filter_map(|combination| {
            let mut bindings = vec![None; rule.num_variables()];
            for (atom, tuple) in rule.body.iter().zip(&combination) {
                if !unify(&mut bindings, atom, tuple) {
                    return None;
                }
            }
            rule.project_head(&bindings)
        })
        .filter(|tuple| !facts.contains(rule.head.predicate, tuple))
        .collect()
}
