//! The contract with the external value/solvability model.
//!
//! States are scored in batches. A batch flattens every state's facts into one index list per
//! predicate, shifting each state's object ids by the number of objects in the states before it,
//! so objects from different states never alias within a single call.

use std::{collections::BTreeMap, sync::Arc};

use log::trace;

use crate::middleware::{Facts, Language, ObjectId, PredicateId};

/// Batched, offset-shifted encoding of a list of extensional states.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EncodedBatch {
    /// Flat argument indices per predicate. Nullary facts contribute their state index.
    pub relations: BTreeMap<PredicateId, Vec<usize>>,
    /// Object count of every state, in batch order.
    pub object_counts: Vec<usize>,
}

impl EncodedBatch {
    /// Encodes `states` with `goal` appended to each of them. Every state shares the object
    /// universe of one problem, of size `num_objects`.
    pub fn encode(states: &[Facts], goal: &Facts, num_objects: usize) -> Self {
        let mut batch = EncodedBatch {
            relations: BTreeMap::new(),
            object_counts: vec![num_objects; states.len()],
        };
        let mut offset = 0;
        for (idx, state) in states.iter().enumerate() {
            for (pred, tuple) in state.atoms().chain(goal.atoms()) {
                let flat = batch.relations.entry(pred).or_default();
                if tuple.is_empty() {
                    flat.push(idx);
                } else {
                    flat.extend(tuple.iter().map(|o| o.index() + offset));
                }
            }
            offset += num_objects;
        }
        trace!(
            "Encoded {} states over {} predicates",
            batch.len(),
            batch.relations.len()
        );
        batch
    }

    /// Number of states in the batch.
    pub fn len(&self) -> usize {
        self.object_counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.object_counts.is_empty()
    }

    /// Start of each state's object range.
    pub fn offsets(&self) -> Vec<usize> {
        self.object_counts
            .iter()
            .scan(0, |acc, count| {
                let offset = *acc;
                *acc += count;
                Some(offset)
            })
            .collect()
    }

    /// Splits the batch back into per-state facts. Arities are taken from `language`;
    /// predicates it does not know are skipped, as are entries that fall outside every state's
    /// object range.
    pub fn decode(&self, language: &Language) -> Vec<Facts> {
        let offsets = self.offsets();
        let mut states = vec![Facts::new(); self.len()];
        for (pred, flat) in &self.relations {
            let Some((_, predicate)) = language.predicates().nth(pred.0 as usize) else {
                continue;
            };
            let arity = predicate.arity;
            if arity == 0 {
                for &idx in flat {
                    if let Some(state) = states.get_mut(idx) {
                        state.insert(*pred, Vec::new());
                    }
                }
                continue;
            }
            for chunk in flat.chunks_exact(arity) {
                // The owning state is the last one whose range starts at or before the first
                // argument.
                let Some(idx) = offsets.partition_point(|&o| o <= chunk[0]).checked_sub(1) else {
                    continue;
                };
                let range = offsets[idx]..offsets[idx] + self.object_counts[idx];
                if !chunk.iter().all(|x| range.contains(x)) {
                    trace!("Skipping {:?} of {}: outside state {}", chunk, pred, idx);
                    continue;
                }
                let tuple = chunk
                    .iter()
                    .map(|x| ObjectId((x - range.start) as u32))
                    .collect();
                states[idx].insert(*pred, tuple);
            }
        }
        states
    }
}

/// Raw model outputs, one entry per batched state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScoreOutput {
    /// Estimated cost to go; lower is better.
    pub values: Vec<f32>,
    pub solvability: Vec<f32>,
}

/// An external model scoring batches of states. Must be deterministic for reproducible traces.
pub trait Scorer {
    fn score(&self, batch: &EncodedBatch) -> anyhow::Result<ScoreOutput>;
}

impl<S: Scorer + ?Sized> Scorer for &S {
    fn score(&self, batch: &EncodedBatch) -> anyhow::Result<ScoreOutput> {
        (**self).score(batch)
    }
}

impl<S: Scorer + ?Sized> Scorer for Box<S> {
    fn score(&self, batch: &EncodedBatch) -> anyhow::Result<ScoreOutput> {
        (**self).score(batch)
    }
}

impl<S: Scorer + ?Sized> Scorer for Arc<S> {
    fn score(&self, batch: &EncodedBatch) -> anyhow::Result<ScoreOutput> {
        (**self).score(batch)
    }
}

/// Rounds the sigmoid of a solvability logit. A logit of exactly zero rounds down.
pub fn is_solvable(logit: f32) -> bool {
    1.0 / (1.0 + (-logit).exp()) > 0.5
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_utils::facts;

    #[test]
    fn test_offsets_keep_states_disjoint() {
        let mut lang = Language::new();
        lang.declare_predicate("on", 2).unwrap();
        lang.declare_predicate("handempty", 0).unwrap();
        lang.declare_predicate("on_goal", 2).unwrap();
        lang.object("a");
        lang.object("b");
        lang.object("c");
        let first = facts(&mut lang, &["on(a,b)", "handempty"]);
        let second = facts(&mut lang, &["on(b,c)"]);
        let goal = facts(&mut lang, &["on_goal(a,c)"]);

        let batch = EncodedBatch::encode(&[first.clone(), second.clone()], &goal, 3);
        assert_eq!(batch.object_counts, vec![3, 3]);
        assert_eq!(batch.offsets(), vec![0, 3]);

        let on = lang.predicate_id("on").unwrap();
        let on_goal = lang.predicate_id("on_goal").unwrap();
        let handempty = lang.predicate_id("handempty").unwrap();
        assert_eq!(batch.relations[&on], vec![0, 1, 4, 5]);
        assert_eq!(batch.relations[&on_goal], vec![0, 2, 3, 5]);
        assert_eq!(batch.relations[&handempty], vec![0]);

        let decoded = batch.decode(&lang);
        let mut expected_first = first;
        expected_first.extend_from(&goal);
        let mut expected_second = second;
        expected_second.extend_from(&goal);
        assert_eq!(decoded, vec![expected_first, expected_second]);
    }

    #[test]
    fn test_decode_skips_malformed_entries() {
        let mut lang = Language::new();
        let on = lang.declare_predicate("on", 2).unwrap();
        let at = lang.declare_predicate("at", 1).unwrap();

        // No states at all, yet relations are present.
        let orphan = EncodedBatch {
            relations: [(on, vec![0, 1])].into(),
            object_counts: Vec::new(),
        };
        assert!(orphan.decode(&lang).is_empty());

        // `[4, 1]` straddles two states, `7` lies past the last one, and the trailing `5` is an
        // incomplete tuple.
        let batch = EncodedBatch {
            relations: [(on, vec![0, 1, 4, 1, 3, 5, 5]), (at, vec![7, 2])].into(),
            object_counts: vec![3, 3],
        };
        let decoded = batch.decode(&lang);
        assert_eq!(decoded.len(), 2);
        assert!(decoded[0].contains(on, &[ObjectId(0), ObjectId(1)]));
        assert!(decoded[0].contains(at, &[ObjectId(2)]));
        assert!(decoded[1].contains(on, &[ObjectId(0), ObjectId(2)]));
        assert_eq!(decoded[0].len() + decoded[1].len(), 3);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let mut lang = Language::new();
        lang.declare_predicate("at", 1).unwrap();
        let states = vec![facts(&mut lang, &["at(x)"]), facts(&mut lang, &["at(y)"])];
        assert_eq!(
            EncodedBatch::encode(&states, &Facts::new(), 2),
            EncodedBatch::encode(&states, &Facts::new(), 2)
        );
    }

    #[test]
    fn test_sigmoid_rounding() {
        assert!(is_solvable(0.1));
        assert!(!is_solvable(0.0));
        assert!(!is_solvable(-3.0));
        assert!(!is_solvable(f32::NAN));
    }
}
