//! Textual front-end: the atom syntax shared by rule files (`above(X, Y)`) and FDR value tables
//! (`Atom on(a, b)`).

pub mod ast;
pub mod parser;

pub use ast::{AtomExpr, FdrValue};
pub use parser::{parse_atom, parse_fdr_value, ParseError, Rule};
