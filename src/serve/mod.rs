//! Line-oriented serving mode: a client sends a finite-domain variable table once, then one state
//! per line, and gets back the applicable actions ranked by the policy.

mod fdr;

use std::io::{self, BufRead, Write};

pub use fdr::FdrTranslator;
use log::{debug, info};
use thiserror::Error;

use crate::{
    middleware::Language,
    policy::{PolicyError, PolicySearch, Scorer},
};

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("malformed header at line {line}: {reason}")]
    BadHeader { line: usize, reason: String },

    #[error("header ended early, at line {line}")]
    UnexpectedEof { line: usize },

    #[error("malformed query '{query}': {reason}")]
    BadQuery { query: String, reason: String },

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Reads the FDR header from `reader` and acknowledges it with `OK`.
pub fn handshake<R: BufRead, W: Write>(
    reader: &mut R,
    writer: &mut W,
    language: &mut Language,
) -> Result<FdrTranslator, ProtocolError> {
    let translator = FdrTranslator::read_header(reader, language)?;
    writeln!(writer, "OK")?;
    writer.flush()?;
    info!(
        "Accepted FDR header with {} variables",
        translator.num_variables()
    );
    Ok(translator)
}

/// Answers queries until `reader` is exhausted. Query states only carry the atoms of the value
/// tables; the problem's static atoms are added back before successors are generated. Each reply is one line of `<action> <value>`
/// pairs, best first, or an empty line if no action applies. Returns the number of queries
/// answered.
pub fn serve<R: BufRead, W: Write, S: Scorer>(
    search: &PolicySearch<'_, S>,
    translator: &FdrTranslator,
    reader: R,
    mut writer: W,
) -> Result<usize, ProtocolError> {
    let mut answered = 0;
    for line in reader.lines() {
        let line = line?;
        let state = search.with_static_atoms(&translator.translate(&line)?);
        let ranked = search.rank_successors(&state)?;
        let reply = ranked
            .iter()
            .map(|(action, value)| format!("{} {}", action, value))
            .collect::<Vec<_>>()
            .join(" ");
        debug!("Query {}: {} applicable actions", answered, ranked.len());
        writeln!(writer, "{}", reply)?;
        writer.flush()?;
        answered += 1;
    }
    info!("Session ended after {} queries", answered);
    Ok(answered)
}
