use std::fmt;

/// An atom as written in a rule file: a predicate name and raw argument tokens. Whether a token
/// is a variable or a constant is decided later, when rules are compiled.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AtomExpr {
    pub predicate: String,
    pub args: Vec<String>,
}

impl AtomExpr {
    pub fn new<I, S>(predicate: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            predicate: predicate.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }
}

impl fmt::Display for AtomExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.predicate, self.args.join(","))
    }
}

/// One entry of an FDR variable's value table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FdrValue {
    Atom(AtomExpr),
    Negated(AtomExpr),
    NoneOfThose,
}

impl FdrValue {
    /// The ground atom made true by this value, if any.
    pub fn positive_atom(&self) -> Option<&AtomExpr> {
        match self {
            FdrValue::Atom(a) => Some(a),
            FdrValue::Negated(_) | FdrValue::NoneOfThose => None,
        }
    }
}
