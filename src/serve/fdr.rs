use std::io::BufRead;

use log::{debug, trace};

use super::ProtocolError;
use crate::{
    lang::parse_fdr_value,
    middleware::Language,
    planning::{ground_atom, Atom, State},
};

/// Value tables of a finite-domain representation: for every variable, the ground atom each of
/// its values makes true (`None` for negated atoms and "none of those").
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FdrTranslator {
    variables: Vec<Vec<Option<Atom>>>,
}

impl FdrTranslator {
    /// Reads the header: the variable count, then per variable its value count followed by one
    /// line per value. Objects are interned into `language`; predicates must already be known.
    pub fn read_header<R: BufRead>(
        reader: &mut R,
        language: &mut Language,
    ) -> Result<Self, ProtocolError> {
        let mut lines = HeaderLines { reader, line: 0 };
        let num_variables = lines.count()?;
        let mut variables = Vec::with_capacity(num_variables);
        for var in 0..num_variables {
            let num_values = lines.count()?;
            let mut values = Vec::with_capacity(num_values);
            for _ in 0..num_values {
                let (line, text) = lines.next()?;
                let value = parse_fdr_value(&text).map_err(|e| ProtocolError::BadHeader {
                    line,
                    reason: e.to_string(),
                })?;
                let atom = value
                    .positive_atom()
                    .map(|expr| ground_atom(language, expr))
                    .transpose()
                    .map_err(|e| ProtocolError::BadHeader {
                        line,
                        reason: e.to_string(),
                    })?;
                values.push(atom);
            }
            trace!("Variable {} has {} values", var, values.len());
            variables.push(values);
        }
        debug!("Read FDR header with {} variables", variables.len());
        Ok(Self { variables })
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// Builds the state described by one query line of per-variable value indices.
    pub fn translate(&self, query: &str) -> Result<State, ProtocolError> {
        let indices = query
            .split_whitespace()
            .map(|tok| {
                tok.parse::<usize>().map_err(|_| ProtocolError::BadQuery {
                    query: query.to_string(),
                    reason: format!("'{}' is not a value index", tok),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if indices.len() != self.variables.len() {
            return Err(ProtocolError::BadQuery {
                query: query.to_string(),
                reason: format!(
                    "expected {} values, got {}",
                    self.variables.len(),
                    indices.len()
                ),
            });
        }

        let mut atoms = Vec::new();
        for (var, (values, &idx)) in self.variables.iter().zip(&indices).enumerate() {
            let value = values.get(idx).ok_or_else(|| ProtocolError::BadQuery {
                query: query.to_string(),
                reason: format!(
                    "variable {} has {} values, index {} is out of range",
                    var,
                    values.len(),
                    idx
                ),
            })?;
            atoms.extend(value.clone());
        }
        Ok(State::new(atoms))
    }
}

struct HeaderLines<'r, R> {
    reader: &'r mut R,
    line: usize,
}

impl<R: BufRead> HeaderLines<'_, R> {
    fn next(&mut self) -> Result<(usize, String), ProtocolError> {
        let mut buf = String::new();
        if self.reader.read_line(&mut buf)? == 0 {
            return Err(ProtocolError::UnexpectedEof { line: self.line + 1 });
        }
        self.line += 1;
        Ok((self.line, buf.trim().to_string()))
    }

    fn count(&mut self) -> Result<usize, ProtocolError> {
        let (line, text) = self.next()?;
        text.parse().map_err(|_| ProtocolError::BadHeader {
            line,
            reason: format!("expected a count, got '{}'", text),
        })
    }
}
