//! State augmentation: saturate a state with derived facts while temporarily injecting
//! auxiliary facts (such as the goal denotation) that rules may use but that must not be
//! reported as part of the state.

use std::{collections::BTreeSet, sync::Arc};

use log::trace;

use super::engine::{apply_rules, EvaluationStrategy};
use crate::{
    middleware::Facts,
    rules::{RegistryRecord, Stratum},
};

#[derive(Clone, Debug)]
pub struct Augmenter {
    record: Arc<RegistryRecord>,
    strategy: EvaluationStrategy,
}

impl Augmenter {
    pub fn new(record: Arc<RegistryRecord>) -> Self {
        Self {
            record,
            strategy: EvaluationStrategy::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: EvaluationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn record(&self) -> &RegistryRecord {
        &self.record
    }

    pub fn strategy(&self) -> EvaluationStrategy {
        self.strategy
    }

    /// Returns `state` extended with every fact the `stratum` rules derive from it together
    /// with `additional`.
    ///
    /// Facts of `additional` are retracted afterwards: predicates that only `additional`
    /// introduced are dropped entirely, and for predicates the state already had, exactly the
    /// injected tuples that were not already in the state are removed. Facts derived *from*
    /// injected tuples stay.
    pub fn augment(&self, state: &Facts, stratum: Stratum, additional: &Facts) -> Facts {
        let mut working = state.clone();
        let mut introduced = BTreeSet::new();
        let mut injected = Facts::new();
        for (pred, relation) in additional.iter() {
            if !working.has_predicate(*pred) {
                introduced.insert(*pred);
            }
            working.declare(*pred);
            for tuple in relation {
                if working.insert(*pred, tuple.clone()) {
                    injected.insert(*pred, tuple.clone());
                }
            }
        }

        let stats = apply_rules(&mut working, &self.record, stratum, self.strategy);
        trace!(
            "Augmented {} facts with {} derived ({} injected)",
            state.len(),
            stats.derived,
            injected.len()
        );

        for pred in &introduced {
            working.remove_predicate(*pred);
        }
        for (pred, tuple) in injected.atoms() {
            if !introduced.contains(&pred) {
                working.remove(pred, tuple);
            }
        }
        working
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        middleware::Language,
        test_utils::{facts, load_record, render},
    };

    const BLOCKS: &str = r#"{
        "blocks": {
            "rules": {
                "above/2": [
                    ["above(X,Y)", ["on(X,Y)"]],
                    ["above(X,Z)", ["on(X,Y)", "above(Y,Z)"]]
                ],
                "wants-on/1": [["wants-on(X)", ["on_goal(X,Y)"]]],
                "misplaced/1": [["misplaced(X)", ["on_goal(X,Y)", "clear(X)"]]]
            }
        }
    }"#;

    fn setup() -> (Language, Augmenter) {
        let mut lang = Language::new();
        let on = lang.declare_predicate("on", 2).unwrap();
        lang.declare_predicate("clear", 1).unwrap();
        lang.goal_predicate(on).unwrap();
        let record = load_record(BLOCKS, "blocks", &mut lang, &["on", "clear"]);
        (lang, Augmenter::new(Arc::new(record)))
    }

    #[test]
    fn test_augment_without_additional_only_adds() {
        let (mut lang, augmenter) = setup();
        let state = facts(&mut lang, &["on(a,b)", "on(b,c)", "clear(a)"]);
        let augmented = augmenter.augment(&state, Stratum::Dynamic, &Facts::new());

        assert!(state.is_subset_of(&augmented));
        assert_eq!(
            render(&lang, &augmented, "above"),
            vec!["above(a, b)", "above(a, c)", "above(b, c)"]
        );

        // Dropping every predicate the input did not have restores it exactly.
        let mut restored = augmented.clone();
        let extra: Vec<_> = restored
            .predicates()
            .filter(|p| !state.has_predicate(*p))
            .collect();
        for pred in extra {
            restored.remove_predicate(pred);
        }
        assert_eq!(restored, state);
    }

    #[test]
    fn test_injected_predicates_are_retracted() {
        let (mut lang, augmenter) = setup();
        let state = facts(&mut lang, &["clear(a)", "on(a,b)"]);
        let goal = facts(&mut lang, &["on_goal(a,c)", "on_goal(b,a)"]);

        let augmented = augmenter.augment(&state, Stratum::Dynamic, &goal);
        assert!(render(&lang, &augmented, "on_goal").is_empty());
        assert!(!augmented.has_predicate(lang.predicate_id("on_goal").unwrap()));
        assert_eq!(render(&lang, &augmented, "misplaced"), vec!["misplaced(a)"]);
        assert_eq!(render(&lang, &augmented, "above"), vec!["above(a, b)"]);
    }

    #[test]
    fn test_goal_only_rules_run_in_static_stratum() {
        let (mut lang, augmenter) = setup();
        let goal = facts(&mut lang, &["on_goal(a,c)"]);
        let augmented = augmenter.augment(&Facts::new(), Stratum::Static, &goal);
        assert_eq!(render(&lang, &augmented, "wants-on"), vec!["wants-on(a)"]);
        assert!(render(&lang, &augmented, "above").is_empty());
    }

    #[test]
    fn test_preexisting_predicate_keeps_original_tuples() {
        let (mut lang, augmenter) = setup();
        let state = facts(&mut lang, &["on(a,b)"]);
        let additional = facts(&mut lang, &["on(a,b)", "on(c,d)"]);

        let augmented = augmenter.augment(&state, Stratum::Dynamic, &additional);
        assert_eq!(render(&lang, &augmented, "on"), vec!["on(a, b)"]);
        assert_eq!(
            render(&lang, &augmented, "above"),
            vec!["above(a, b)", "above(c, d)"]
        );
    }

    #[test]
    fn test_strategies_produce_same_augmentation() {
        let (mut lang, augmenter) = setup();
        let state = facts(&mut lang, &["on(a,b)", "on(b,c)", "on(c,d)", "clear(a)"]);
        let goal = facts(&mut lang, &["on_goal(a,d)"]);
        let naive = augmenter.augment(&state, Stratum::Dynamic, &goal);
        let semi = augmenter
            .clone()
            .with_strategy(EvaluationStrategy::SemiNaive)
            .augment(&state, Stratum::Dynamic, &goal);
        assert_eq!(naive, semi);
    }
}
