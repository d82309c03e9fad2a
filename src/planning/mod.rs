//! Grounded STRIPS planning problems: atoms, states, actions and successor generation.
//!
//! Parsing and grounding PDDL happens elsewhere; this module only holds the result.

mod builder;
mod successors;

use std::{collections::BTreeSet, fmt};

pub(crate) use builder::ground_atom;
pub use builder::{PlanningError, ProblemBuilder};
pub use successors::successors;

use crate::{
    middleware::{Facts, Language, PredicateId, Tuple, GOAL_SUFFIX},
    rules::BaseStrata,
};

/// A ground atom.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Atom {
    pub predicate: PredicateId,
    pub args: Tuple,
}

impl Atom {
    pub fn new(predicate: PredicateId, args: Tuple) -> Self {
        Self { predicate, args }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Literal {
    pub atom: Atom,
    pub positive: bool,
}

impl Literal {
    pub fn positive(atom: Atom) -> Self {
        Self {
            atom,
            positive: true,
        }
    }

    pub fn negative(atom: Atom) -> Self {
        Self {
            atom,
            positive: false,
        }
    }
}

/// A planning state: the set of true ground atoms. Hashable, so it can live in a closed set.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct State {
    atoms: BTreeSet<Atom>,
}

impl State {
    pub fn new(atoms: impl IntoIterator<Item = Atom>) -> Self {
        Self {
            atoms: atoms.into_iter().collect(),
        }
    }

    pub fn contains(&self, atom: &Atom) -> bool {
        self.atoms.contains(atom)
    }

    /// `true` if every literal of the conjunction holds.
    pub fn satisfies(&self, condition: &[Literal]) -> bool {
        condition
            .iter()
            .all(|lit| self.contains(&lit.atom) == lit.positive)
    }

    /// Applies delete effects, then add effects.
    pub fn apply(&self, action: &GroundAction) -> State {
        let mut atoms = self.atoms.clone();
        for atom in &action.delete {
            atoms.remove(atom);
        }
        atoms.extend(action.add.iter().cloned());
        State { atoms }
    }

    pub fn atoms(&self) -> impl Iterator<Item = &Atom> {
        self.atoms.iter()
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// The state as an extensional state, grouped by predicate.
    pub fn to_facts(&self) -> Facts {
        self.atoms
            .iter()
            .map(|a| (a.predicate, a.args.clone()))
            .collect()
    }

    pub fn display<'a>(&'a self, language: &'a Language) -> DisplayState<'a> {
        DisplayState {
            state: self,
            language,
        }
    }
}

pub struct DisplayState<'a> {
    state: &'a State,
    language: &'a Language,
}

impl fmt::Display for DisplayState<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let atoms: Vec<String> = self
            .state
            .atoms()
            .map(|a| self.language.display_atom(a.predicate, &a.args))
            .collect();
        write!(f, "{{{}}}", atoms.join(", "))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GroundAction {
    pub name: String,
    pub precondition: Vec<Literal>,
    pub add: Vec<Atom>,
    pub delete: Vec<Atom>,
}

impl GroundAction {
    pub fn is_applicable(&self, state: &State) -> bool {
        state.satisfies(&self.precondition)
    }
}

/// A grounded planning problem.
#[derive(Clone, Debug)]
pub struct Problem {
    pub domain: String,
    pub name: String,
    pub language: Language,
    /// Grounded actions, in a fixed order; successors and action ids follow it.
    pub actions: Vec<GroundAction>,
    pub initial: State,
    pub goal: Vec<Literal>,
}

impl Problem {
    pub fn is_goal(&self, state: &State) -> bool {
        state.satisfies(&self.goal)
    }

    /// Classifies the declared predicates: those touched by some action effect are dynamic,
    /// all others static.
    pub fn base_strata(&self) -> BaseStrata {
        let dynamic_predicates: BTreeSet<PredicateId> = self
            .actions
            .iter()
            .flat_map(|a| a.add.iter().chain(&a.delete))
            .map(|atom| atom.predicate)
            .collect();
        let static_predicates = self
            .language
            .predicates()
            .map(|(id, _)| id)
            .filter(|id| !dynamic_predicates.contains(id))
            .collect();
        BaseStrata {
            static_predicates,
            dynamic_predicates,
        }
    }

    /// The goal denotation: `p_goal(args)` for every positive goal literal `p(args)`. Goal
    /// predicates are declared when the problem is built.
    pub fn goal_denotation(&self) -> Result<Facts, PlanningError> {
        let mut facts = Facts::new();
        for lit in self.goal.iter().filter(|l| l.positive) {
            let name = &self.language.predicate(lit.atom.predicate).name;
            let goal_pred = self
                .language
                .lookup_predicate(&format!("{}{}", name, GOAL_SUFFIX))?;
            facts.insert(goal_pred, lit.atom.args.clone());
        }
        Ok(facts)
    }

    /// Static part of a state: every atom whose predicate no action changes.
    pub fn static_facts(&self, state: &State, strata: &BaseStrata) -> Facts {
        state
            .atoms()
            .filter(|a| !strata.dynamic_predicates.contains(&a.predicate))
            .map(|a| (a.predicate, a.args.clone()))
            .collect()
    }

    /// Dynamic part of a state.
    pub fn dynamic_facts(&self, state: &State, strata: &BaseStrata) -> Facts {
        state
            .atoms()
            .filter(|a| strata.dynamic_predicates.contains(&a.predicate))
            .map(|a| (a.predicate, a.args.clone()))
            .collect()
    }
}
