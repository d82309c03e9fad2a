//! The middleware holds the interned vocabulary shared by every layer: the [`Language`] of
//! predicates and objects, and the extensional state ([`Facts`]) that rules are evaluated over.

mod facts;

use std::{collections::HashMap, fmt};

pub use facts::*;
use serde::{Deserialize, Serialize};

/// Suffix reserved for the predicates that hold the goal denotation.
pub const GOAL_SUFFIX: &str = "_goal";

/// Interned predicate handle. Only meaningful together with the [`Language`] that issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PredicateId(pub u32);

/// Interned object handle. Ids are dense, so `ObjectId(i)` is the `i`-th declared object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

impl ObjectId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PredicateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Predicate {
    pub name: String,
    pub arity: usize,
}

impl Predicate {
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
        }
    }

    /// The registry key of this predicate, `name/arity`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.name, self.arity)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LanguageError {
    #[error("predicate '{name}' already declared with arity {declared}, not {requested}")]
    ArityConflict {
        name: String,
        declared: usize,
        requested: usize,
    },
    #[error("unknown predicate '{0}'")]
    UnknownPredicate(String),
    #[error("unknown object '{0}'")]
    UnknownObject(String),
}

/// Typed vocabulary of one planning problem: predicates with their arities and the object
/// universe. Names are interned once; everything downstream works on the integer handles.
#[derive(Clone, Debug, Default)]
pub struct Language {
    predicates: Vec<Predicate>,
    predicate_ids: HashMap<String, PredicateId>,
    objects: Vec<String>,
    object_ids: HashMap<String, ObjectId>,
}

impl Language {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a predicate, returning the existing handle if it was already declared with the
    /// same arity. Predicates are immutable once declared.
    pub fn declare_predicate(
        &mut self,
        name: &str,
        arity: usize,
    ) -> Result<PredicateId, LanguageError> {
        if let Some(&id) = self.predicate_ids.get(name) {
            let declared = self.predicates[id.0 as usize].arity;
            if declared != arity {
                return Err(LanguageError::ArityConflict {
                    name: name.to_string(),
                    declared,
                    requested: arity,
                });
            }
            return Ok(id);
        }
        let id = PredicateId(self.predicates.len() as u32);
        self.predicates.push(Predicate::new(name, arity));
        self.predicate_ids.insert(name.to_string(), id);
        Ok(id)
    }

    /// Interns an object name.
    pub fn object(&mut self, name: &str) -> ObjectId {
        if let Some(&id) = self.object_ids.get(name) {
            return id;
        }
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(name.to_string());
        self.object_ids.insert(name.to_string(), id);
        id
    }

    pub fn predicate_id(&self, name: &str) -> Option<PredicateId> {
        self.predicate_ids.get(name).copied()
    }

    pub fn object_id(&self, name: &str) -> Option<ObjectId> {
        self.object_ids.get(name).copied()
    }

    pub fn lookup_predicate(&self, name: &str) -> Result<PredicateId, LanguageError> {
        self.predicate_id(name)
            .ok_or_else(|| LanguageError::UnknownPredicate(name.to_string()))
    }

    pub fn lookup_object(&self, name: &str) -> Result<ObjectId, LanguageError> {
        self.object_id(name)
            .ok_or_else(|| LanguageError::UnknownObject(name.to_string()))
    }

    pub fn predicate(&self, id: PredicateId) -> &Predicate {
        &self.predicates[id.0 as usize]
    }

    pub fn arity(&self, id: PredicateId) -> usize {
        self.predicate(id).arity
    }

    pub fn object_name(&self, id: ObjectId) -> &str {
        &self.objects[id.index()]
    }

    pub fn predicates(&self) -> impl Iterator<Item = (PredicateId, &Predicate)> {
        self.predicates
            .iter()
            .enumerate()
            .map(|(i, p)| (PredicateId(i as u32), p))
    }

    pub fn num_objects(&self) -> usize {
        self.objects.len()
    }

    /// Declares the goal-tagged companion `name_goal` of `id`, with the same arity.
    pub fn goal_predicate(&mut self, id: PredicateId) -> Result<PredicateId, LanguageError> {
        let Predicate { name, arity } = self.predicate(id).clone();
        self.declare_predicate(&format!("{}{}", name, GOAL_SUFFIX), arity)
    }

    /// Renders `pred(a, b)` for diagnostics.
    pub fn display_atom(&self, predicate: PredicateId, args: &[ObjectId]) -> String {
        format!(
            "{}({})",
            self.predicate(predicate).name,
            args.iter()
                .map(|o| self.object_name(*o))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}
