use thiserror::Error;

use crate::{lang::ParseError, middleware::LanguageError};

/// Configuration errors in a rule file. All of them are raised while the registry is loaded,
/// before any state is evaluated.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("circular rule deferral: {}", chain.join(" -> "))]
    CircularDeferral { chain: Vec<String> },

    #[error("domain '{from}' defers to unknown domain '{to}'")]
    UnknownDeferral { from: String, to: String },

    #[error("malformed rule key '{0}', expected 'name/arity'")]
    MalformedKey(String),

    #[error("rule head '{head}' does not match its key '{key}'")]
    HeadMismatch { key: String, head: String },

    #[error("predicate '{predicate}' has arity {expected}, but is used with {found} arguments")]
    ArityMismatch {
        predicate: String,
        expected: usize,
        found: usize,
    },

    #[error("rule '{rule}' references undeclared predicate '{predicate}'")]
    UnknownPredicate { predicate: String, rule: String },

    #[error("head variable '{variable}' of rule '{rule}' does not occur in its body")]
    UnboundHeadVariable { variable: String, rule: String },

    #[error("failed to parse rule atom: {0}")]
    Parse(#[from] ParseError),

    #[error("invalid rule file: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Language(#[from] LanguageError),
}
