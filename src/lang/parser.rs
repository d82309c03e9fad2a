use pest::{iterators::Pair, Parser};
use pest_derive::Parser;

use super::ast::{AtomExpr, FdrValue};

// Link to the grammar file
#[derive(Parser)]
#[grammar = "lang/grammar.pest"]
pub struct AtomParser;

#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("Pest parsing error: {0}")]
    Pest(#[from] Box<pest::error::Error<Rule>>),
    #[error("unexpected {rule:?} in '{input}'")]
    Unexpected { rule: Rule, input: String },
}

// Implement From so `?` can convert the original error to the Boxed version
impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        ParseError::Pest(Box::new(err))
    }
}

/// Parses a single atom such as `on(X, b)`. Bare identifiers and `p()` are nullary atoms.
pub fn parse_atom(input: &str) -> Result<AtomExpr, ParseError> {
    let document = AtomParser::parse(Rule::atom_document, input.trim())?
        .next()
        .ok_or_else(|| unexpected(Rule::atom_document, input))?;
    let atom = document
        .into_inner()
        .find(|p| p.as_rule() == Rule::atom)
        .ok_or_else(|| unexpected(Rule::atom, input))?;
    build_atom(atom, input)
}

/// Parses one value line of an FDR variable table.
pub fn parse_fdr_value(input: &str) -> Result<FdrValue, ParseError> {
    let document = AtomParser::parse(Rule::fdr_value, input.trim())?
        .next()
        .ok_or_else(|| unexpected(Rule::fdr_value, input))?;
    for pair in document.into_inner() {
        match pair.as_rule() {
            Rule::none_value => return Ok(FdrValue::NoneOfThose),
            Rule::negated_atom | Rule::positive_atom => {
                let negated = pair.as_rule() == Rule::negated_atom;
                let atom = pair
                    .into_inner()
                    .find(|p| p.as_rule() == Rule::atom)
                    .ok_or_else(|| unexpected(Rule::atom, input))?;
                let atom = build_atom(atom, input)?;
                return Ok(if negated {
                    FdrValue::Negated(atom)
                } else {
                    FdrValue::Atom(atom)
                });
            }
            _ => {}
        }
    }
    Err(unexpected(Rule::fdr_value, input))
}

fn build_atom(pair: Pair<'_, Rule>, input: &str) -> Result<AtomExpr, ParseError> {
    let mut inner = pair.into_inner();
    let predicate = inner
        .next()
        .filter(|p| p.as_rule() == Rule::identifier)
        .ok_or_else(|| unexpected(Rule::identifier, input))?
        .as_str()
        .to_string();
    let args = match inner.next() {
        Some(list) if list.as_rule() == Rule::term_list => list
            .into_inner()
            .map(|term| term.as_str().to_string())
            .collect(),
        Some(other) => return Err(unexpected(other.as_rule(), input)),
        None => Vec::new(),
    };
    Ok(AtomExpr { predicate, args })
}

fn unexpected(rule: Rule, input: &str) -> ParseError {
    ParseError::Unexpected {
        rule,
        input: input.to_string(),
    }
}
