use thiserror::Error;

use super::Trace;
use crate::planning::PlanningError;

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("scorer failed: {0}")]
    Scorer(#[from] anyhow::Error),

    #[error(
        "scorer returned {values} values and {solvability} solvability logits for a batch of {expected} states"
    )]
    ShapeMismatch {
        expected: usize,
        values: usize,
        solvability: usize,
    },

    #[error(transparent)]
    Planning(#[from] PlanningError),

    /// A failure in the middle of a run, with everything accumulated before it.
    #[error("search aborted at step {step} after {} actions: {source}", .trace.actions.len())]
    Aborted {
        step: usize,
        trace: Box<Trace>,
        source: Box<PolicyError>,
    },
}

impl PolicyError {
    pub(super) fn at_step(self, step: usize, trace: &Trace) -> Self {
        PolicyError::Aborted {
            step,
            trace: Box::new(trace.clone()),
            source: Box::new(self),
        }
    }

    /// The partial trace of an aborted run.
    pub fn trace(&self) -> Option<&Trace> {
        match self {
            PolicyError::Aborted { trace, .. } => Some(trace),
            _ => None,
        }
    }
}
