//! Derived-predicate rules: the compiled rule representation, the JSON rule registry and the
//! static/dynamic stratifier.

pub mod error;
pub mod registry;
pub mod stratify;

use std::fmt;

pub use error::RegistryError;
pub use registry::{RegistryRecord, RuleEntry, RuleFile, RuleRegistry};
pub use stratify::{BaseStrata, Stratum};

use crate::middleware::{ObjectId, PredicateId};

/// A rule argument, classified once at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Term {
    /// Index into the owning rule's variable table.
    Variable(usize),
    Constant(ObjectId),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleAtom {
    pub predicate: PredicateId,
    pub terms: Vec<Term>,
}

/// A compiled Horn rule `head :- body`. Only positive, conjunctive bodies are supported.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rule {
    pub head: RuleAtom,
    pub body: Vec<RuleAtom>,
    /// Variable names, indexed by [`Term::Variable`].
    pub variables: Vec<String>,
    /// Source text, kept for diagnostics.
    pub source: String,
}

impl Rule {
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// Instantiates the head under a complete assignment.
    pub fn project_head(&self, bindings: &[Option<ObjectId>]) -> Option<Vec<ObjectId>> {
        self.head
            .terms
            .iter()
            .map(|term| match term {
                Term::Constant(c) => Some(*c),
                Term::Variable(v) => bindings[*v],
            })
            .collect()
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

/// Extends `bindings` so that `atom` matches `tuple`. Returns `false` on a unification failure
/// (a variable already bound to a different object, or a constant that does not match), in
/// which case `bindings` may have been partially extended and must be discarded.
pub fn unify(bindings: &mut [Option<ObjectId>], atom: &RuleAtom, tuple: &[ObjectId]) -> bool {
    for (term, value) in atom.terms.iter().zip(tuple) {
        match term {
            Term::Constant(c) => {
                if c != value {
                    return false;
                }
            }
            Term::Variable(v) => match bindings[*v] {
                Some(bound) if bound != *value => return false,
                Some(_) => {}
                None => bindings[*v] = Some(*value),
            },
        }
    }
    true
}
