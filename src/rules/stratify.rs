//! Static/dynamic stratification of derived predicates.
//!
//! A derived predicate is dynamic if any of its rules mentions a dynamic predicate, and static
//! otherwise. Classification is a one-way promotion (static to dynamic) iterated to a fixpoint;
//! it terminates because the dynamic set only grows and is bounded by the number of derived
//! predicates.

use std::collections::BTreeSet;

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use super::RegistryRecord;
use crate::middleware::PredicateId;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Stratum {
    /// Unaffected by action effects; evaluated once per problem.
    Static,
    /// May change from state to state.
    Dynamic,
}

/// Caller-supplied classification of the base (non-derived) predicates.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BaseStrata {
    pub static_predicates: BTreeSet<PredicateId>,
    pub dynamic_predicates: BTreeSet<PredicateId>,
}

impl RegistryRecord {
    /// Classifies every derived predicate, seeding the classification with `base`.
    pub fn stratify(&mut self, base: &BaseStrata) {
        let mut static_predicates = base.static_predicates.clone();
        let mut dynamic_predicates = base.dynamic_predicates.clone();

        let mut passes = 0;
        loop {
            passes += 1;
            let mut changed = false;
            for derived in self.rules.values() {
                let depends_on_dynamic = derived.rules.iter().any(|rule| {
                    rule.body
                        .iter()
                        .any(|atom| dynamic_predicates.contains(&atom.predicate))
                });
                if depends_on_dynamic {
                    if dynamic_predicates.insert(derived.id) {
                        trace!("Promoting {} to dynamic", derived.key);
                        static_predicates.remove(&derived.id);
                        changed = true;
                    }
                } else if !dynamic_predicates.contains(&derived.id) {
                    static_predicates.insert(derived.id);
                }
            }
            if !changed {
                break;
            }
        }

        self.static_predicates = static_predicates;
        self.dynamic_predicates = dynamic_predicates;
        debug!(
            "Stratified '{}' in {} passes: {} static, {} dynamic derived predicates",
            self.domain,
            passes,
            self.derived_in(Stratum::Static).count(),
            self.derived_in(Stratum::Dynamic).count()
        );
    }
}
