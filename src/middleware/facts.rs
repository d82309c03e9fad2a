use std::collections::{btree_map, BTreeMap, BTreeSet};

use super::{ObjectId, PredicateId};

/// A ground tuple of object handles.
pub type Tuple = Vec<ObjectId>;
/// The denotation of a single predicate.
pub type Relation = BTreeSet<Tuple>;

/// Extensional state: for every predicate, the set of tuples that hold.
///
/// Set semantics throughout, so re-adding a fact is a no-op. Ordered containers keep iteration
/// (and hence batch encoding and rule evaluation) deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Facts {
    relations: BTreeMap<PredicateId, Relation>,
}

impl Facts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a fact, returning `true` if it was not already present.
    pub fn insert(&mut self, predicate: PredicateId, tuple: Tuple) -> bool {
        self.relations.entry(predicate).or_default().insert(tuple)
    }

    /// Makes `predicate` present (possibly with an empty denotation).
    pub fn declare(&mut self, predicate: PredicateId) {
        self.relations.entry(predicate).or_default();
    }

    pub fn contains(&self, predicate: PredicateId, tuple: &[ObjectId]) -> bool {
        self.relations
            .get(&predicate)
            .is_some_and(|rel| rel.contains(tuple))
    }

    pub fn has_predicate(&self, predicate: PredicateId) -> bool {
        self.relations.contains_key(&predicate)
    }

    pub fn relation(&self, predicate: PredicateId) -> Option<&Relation> {
        self.relations.get(&predicate)
    }

    pub fn remove(&mut self, predicate: PredicateId, tuple: &[ObjectId]) -> bool {
        self.relations
            .get_mut(&predicate)
            .is_some_and(|rel| rel.remove(tuple))
    }

    pub fn remove_predicate(&mut self, predicate: PredicateId) -> Option<Relation> {
        self.relations.remove(&predicate)
    }

    pub fn predicates(&self) -> impl Iterator<Item = PredicateId> + '_ {
        self.relations.keys().copied()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, PredicateId, Relation> {
        self.relations.iter()
    }

    /// Iterates every ground fact in predicate order.
    pub fn atoms(&self) -> impl Iterator<Item = (PredicateId, &Tuple)> + '_ {
        self.relations
            .iter()
            .flat_map(|(p, rel)| rel.iter().map(move |t| (*p, t)))
    }

    /// Total number of facts across all predicates.
    pub fn len(&self) -> usize {
        self.relations.values().map(|rel| rel.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Merges every fact of `other` into `self`. Returns the number of facts that were new.
    pub fn extend_from(&mut self, other: &Facts) -> usize {
        let mut added = 0;
        for (pred, rel) in &other.relations {
            let target = self.relations.entry(*pred).or_default();
            for tuple in rel {
                if target.insert(tuple.clone()) {
                    added += 1;
                }
            }
        }
        added
    }

    /// `true` if every fact of `self` also holds in `other`.
    pub fn is_subset_of(&self, other: &Facts) -> bool {
        self.relations.iter().all(|(pred, rel)| match other.relation(*pred) {
            Some(theirs) => rel.is_subset(theirs),
            None => rel.is_empty(),
        })
    }
}

impl FromIterator<(PredicateId, Tuple)> for Facts {
    fn from_iter<I: IntoIterator<Item = (PredicateId, Tuple)>>(iter: I) -> Self {
        let mut facts = Facts::new();
        for (pred, tuple) in iter {
            facts.insert(pred, tuple);
        }
        facts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn o(i: u32) -> ObjectId {
        ObjectId(i)
    }

    #[test]
    fn test_set_semantics() {
        let p = PredicateId(0);
        let mut facts = Facts::new();
        assert!(facts.insert(p, vec![o(0), o(1)]));
        assert!(!facts.insert(p, vec![o(0), o(1)]));
        assert_eq!(facts.len(), 1);
        assert!(facts.contains(p, &[o(0), o(1)]));
        assert!(!facts.contains(PredicateId(1), &[o(0)]));
    }

    #[test]
    fn test_extend_and_subset() {
        let p = PredicateId(0);
        let q = PredicateId(1);
        let small: Facts = [(p, vec![o(0)])].into_iter().collect();
        let mut big: Facts = [(q, vec![o(2)])].into_iter().collect();
        assert!(!small.is_subset_of(&big));
        assert_eq!(big.extend_from(&small), 1);
        assert_eq!(big.extend_from(&small), 0);
        assert!(small.is_subset_of(&big));
        assert_eq!(big.atoms().count(), 2);
    }

    #[test]
    fn test_declared_predicate_is_present_but_empty() {
        let p = PredicateId(3);
        let mut facts = Facts::new();
        facts.declare(p);
        assert!(facts.has_predicate(p));
        assert!(facts.is_empty());
        assert!(facts.is_subset_of(&Facts::new()));
    }
}
