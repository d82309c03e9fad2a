use thiserror::Error;

use super::{Atom, GroundAction, Literal, Problem, State};
use crate::{
    lang::{parse_atom, AtomExpr, ParseError},
    middleware::{Language, LanguageError, GOAL_SUFFIX},
};

#[derive(Error, Debug)]
pub enum PlanningError {
    #[error(transparent)]
    Language(#[from] LanguageError),

    #[error("failed to parse atom: {0}")]
    Parse(#[from] ParseError),

    #[error("atom '{atom}' has {found} arguments, but '{predicate}' has arity {expected}")]
    ArityMismatch {
        atom: String,
        predicate: String,
        expected: usize,
        found: usize,
    },
}

/// Assembles a [`Problem`] from textual ground atoms, e.g. the output of an external grounder.
///
/// Literals may be negated with a `not ` prefix. Objects are interned on first use.
#[derive(Debug)]
pub struct ProblemBuilder {
    domain: String,
    name: String,
    language: Language,
    actions: Vec<GroundAction>,
    initial: Vec<Atom>,
    goal: Vec<Literal>,
}

impl ProblemBuilder {
    pub fn new(domain: &str, name: &str) -> Self {
        Self {
            domain: domain.to_string(),
            name: name.to_string(),
            language: Language::new(),
            actions: Vec::new(),
            initial: Vec::new(),
            goal: Vec::new(),
        }
    }

    pub fn predicate(mut self, name: &str, arity: usize) -> Result<Self, PlanningError> {
        self.language.declare_predicate(name, arity)?;
        Ok(self)
    }

    pub fn objects(mut self, names: &[&str]) -> Self {
        for name in names {
            self.language.object(name);
        }
        self
    }

    pub fn action(
        mut self,
        name: &str,
        precondition: &[&str],
        add: &[&str],
        delete: &[&str],
    ) -> Result<Self, PlanningError> {
        let action = GroundAction {
            name: name.to_string(),
            precondition: self.literals(precondition)?,
            add: self.atoms(add)?,
            delete: self.atoms(delete)?,
        };
        self.actions.push(action);
        Ok(self)
    }

    pub fn initial(mut self, atoms: &[&str]) -> Result<Self, PlanningError> {
        let atoms = self.atoms(atoms)?;
        self.initial.extend(atoms);
        Ok(self)
    }

    pub fn goal(mut self, literals: &[&str]) -> Result<Self, PlanningError> {
        let literals = self.literals(literals)?;
        self.goal.extend(literals);
        Ok(self)
    }

    /// Declares the `_goal` companion of every predicate and returns the problem.
    pub fn build(mut self) -> Result<Problem, PlanningError> {
        let base: Vec<_> = self
            .language
            .predicates()
            .filter(|(_, p)| !p.name.ends_with(GOAL_SUFFIX))
            .map(|(id, _)| id)
            .collect();
        for id in base {
            self.language.goal_predicate(id)?;
        }
        Ok(Problem {
            domain: self.domain,
            name: self.name,
            language: self.language,
            actions: self.actions,
            initial: State::new(self.initial),
            goal: self.goal,
        })
    }

    fn atoms(&mut self, texts: &[&str]) -> Result<Vec<Atom>, PlanningError> {
        texts
            .iter()
            .map(|t| ground_atom(&mut self.language, &parse_atom(t)?))
            .collect()
    }

    fn literals(&mut self, texts: &[&str]) -> Result<Vec<Literal>, PlanningError> {
        texts
            .iter()
            .map(|t| match t.trim().strip_prefix("not ") {
                Some(rest) => Ok(Literal::negative(ground_atom(
                    &mut self.language,
                    &parse_atom(rest)?,
                )?)),
                None => Ok(Literal::positive(ground_atom(
                    &mut self.language,
                    &parse_atom(t)?,
                )?)),
            })
            .collect()
    }
}

/// Interns a parsed ground atom against `language`. The predicate must be declared.
pub(crate) fn ground_atom(language: &mut Language, expr: &AtomExpr) -> Result<Atom, PlanningError> {
    let predicate = language.lookup_predicate(&expr.predicate)?;
    let expected = language.arity(predicate);
    if expected != expr.arity() {
        return Err(PlanningError::ArityMismatch {
            atom: expr.to_string(),
            predicate: expr.predicate.clone(),
            expected,
            found: expr.arity(),
        });
    }
    let args = expr.args.iter().map(|a| language.object(a)).collect();
    Ok(Atom::new(predicate, args))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_declares_goal_predicates() {
        let problem = ProblemBuilder::new("blocks", "p")
            .predicate("on", 2)
            .unwrap()
            .predicate("clear", 1)
            .unwrap()
            .initial(&["on(a,b)", "clear(a)"])
            .unwrap()
            .goal(&["on(b,a)", "not clear(b)"])
            .unwrap()
            .build()
            .unwrap();

        assert!(problem.language.predicate_id("on_goal").is_some());
        assert!(problem.language.predicate_id("clear_goal").is_some());
        assert_eq!(problem.goal.len(), 2);
        assert!(!problem.goal[1].positive);

        // Only positive goal literals are denoted.
        let denotation = problem.goal_denotation().unwrap();
        assert_eq!(denotation.len(), 1);
        let on_goal = problem.language.predicate_id("on_goal").unwrap();
        let (a, b) = (
            problem.language.object_id("a").unwrap(),
            problem.language.object_id("b").unwrap(),
        );
        assert!(denotation.contains(on_goal, &[b, a]));
    }

    #[test]
    fn test_builder_rejects_bad_atoms() {
        let builder = ProblemBuilder::new("d", "p").predicate("on", 2).unwrap();
        assert!(matches!(
            builder.initial(&["on(a)"]),
            Err(PlanningError::ArityMismatch { found: 1, .. })
        ));
        let builder = ProblemBuilder::new("d", "p");
        assert!(matches!(
            builder.initial(&["on(a,b)"]),
            Err(PlanningError::Language(LanguageError::UnknownPredicate(_)))
        ));
        let builder = ProblemBuilder::new("d", "p").predicate("on", 2).unwrap();
        assert!(matches!(
            builder.goal(&["on(a,"]),
            Err(PlanningError::Parse(_))
        ));
    }
}
