//! The JSON rule registry.
//!
//! A rule file maps a domain key to either a `defer-to` pointer at another domain, or a table of
//! rules keyed by `name/arity`:
//!
//! ```json
//! {
//!   "blocks":      { "rules": { "above/2": [["above(X,Y)", ["on(X,Y)"]],
//!                                           ["above(X,Z)", ["on(X,Y)", "above(Y,Z)"]]] } },
//!   "blocks-4ops": { "defer-to": "blocks" }
//! }
//! ```

use std::{
    collections::{BTreeMap, BTreeSet},
    io::Read,
};

use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{stratify::BaseStrata, Rule, RuleAtom, Stratum, Term};
use crate::{
    lang::{parse_atom, AtomExpr},
    middleware::{Language, LanguageError, PredicateId},
    rules::RegistryError,
};

/// A rule as stored on disk: `[head, [body atoms...]]`.
pub type RuleSpec = (String, Vec<String>);

/// The on-disk rule file: domain key to entry.
pub type RuleFile = BTreeMap<String, RuleEntry>;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RuleEntry {
    /// Use the rules of another domain instead.
    #[serde(rename = "defer-to", default, skip_serializing_if = "Option::is_none")]
    pub defer_to: Option<String>,
    /// Rules keyed by the `name/arity` of the predicate they define.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<BTreeMap<String, Vec<RuleSpec>>>,
}

#[derive(Clone, Debug, Default)]
pub struct RuleRegistry {
    domains: RuleFile,
}

impl RuleRegistry {
    pub fn new(domains: RuleFile) -> Self {
        Self { domains }
    }

    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, RegistryError> {
        Ok(Self::new(serde_json::from_reader(reader)?))
    }

    pub fn domains(&self) -> impl Iterator<Item = &str> {
        self.domains.keys().map(String::as_str)
    }

    /// Follows `defer-to` pointers starting at `key` and returns the rule table that ends the
    /// chain. `Ok(None)` means there is nothing to do: the domain is unknown or has no rules.
    pub fn resolve(
        &self,
        key: &str,
    ) -> Result<Option<(&str, &BTreeMap<String, Vec<RuleSpec>>)>, RegistryError> {
        let mut chain: Vec<String> = Vec::new();
        let mut current = key;
        loop {
            if chain.iter().any(|k| k == current) {
                chain.push(current.to_string());
                return Err(RegistryError::CircularDeferral { chain });
            }
            let Some((stored, entry)) = self.domains.get_key_value(current) else {
                return match chain.last() {
                    None => Ok(None),
                    Some(from) => Err(RegistryError::UnknownDeferral {
                        from: from.clone(),
                        to: current.to_string(),
                    }),
                };
            };
            chain.push(current.to_string());
            match &entry.defer_to {
                Some(next) => current = next.as_str(),
                None => {
                    if chain.len() > 1 {
                        debug!("Rules for '{}' resolved via {}", key, chain.join(" -> "));
                    }
                    return Ok(entry.rules.as_ref().map(|rules| (stored.as_str(), rules)));
                }
            }
        }
    }

    /// Resolves, compiles and stratifies the rules of `key` against `language`.
    pub fn load(
        &self,
        key: &str,
        language: &mut Language,
        base: &BaseStrata,
    ) -> Result<Option<RegistryRecord>, RegistryError> {
        let Some((domain, rules)) = self.resolve(key)? else {
            return Ok(None);
        };
        let mut record = RegistryRecord::compile(domain, rules, language)?;
        record.stratify(base);
        Ok(Some(record))
    }
}

/// All rules defining one derived predicate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DerivedPredicate {
    pub id: PredicateId,
    pub key: String,
    pub rules: Vec<Rule>,
}

/// The compiled, stratified rules of one domain. Read-only once stratified, so it can be shared
/// between concurrent searches.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistryRecord {
    pub domain: String,
    /// Keyed by `name/arity`, which fixes the evaluation order.
    pub rules: BTreeMap<String, DerivedPredicate>,
    pub arities: BTreeMap<String, usize>,
    pub static_predicates: BTreeSet<PredicateId>,
    pub dynamic_predicates: BTreeSet<PredicateId>,
}

impl RegistryRecord {
    /// A record with no rules; augmentation with it is the identity.
    pub fn empty(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            ..Default::default()
        }
    }

    /// Compiles a rule table. Every derived predicate is declared in `language` first, so rules
    /// may reference each other (and themselves) in any order.
    pub fn compile(
        domain: &str,
        rules: &BTreeMap<String, Vec<RuleSpec>>,
        language: &mut Language,
    ) -> Result<Self, RegistryError> {
        let mut declared = Vec::with_capacity(rules.len());
        for key in rules.keys() {
            let (name, arity) = parse_key(key)?;
            let id = language
                .declare_predicate(name, arity)
                .map_err(arity_conflict)?;
            declared.push((key, id, name, arity));
        }

        let mut record = Self::empty(domain);
        for (key, id, name, arity) in declared {
            let compiled = rules[key]
                .iter()
                .map(|(head, body)| compile_rule(language, name, arity, head, body))
                .collect::<Result<Vec<_>, _>>()?;
            record.arities.insert(name.to_string(), arity);
            record.rules.insert(
                key.clone(),
                DerivedPredicate {
                    id,
                    key: key.clone(),
                    rules: compiled,
                },
            );
        }
        debug!(
            "Compiled {} rules for {} derived predicates of '{}'",
            record.num_rules(),
            record.rules.len(),
            domain
        );
        Ok(record)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn num_rules(&self) -> usize {
        self.rules.values().map(|d| d.rules.len()).sum()
    }

    pub fn classification(&self, predicate: PredicateId) -> Option<Stratum> {
        if self.dynamic_predicates.contains(&predicate) {
            Some(Stratum::Dynamic)
        } else if self.static_predicates.contains(&predicate) {
            Some(Stratum::Static)
        } else {
            None
        }
    }

    /// The derived predicates of `stratum`, in key order.
    pub fn derived_in(&self, stratum: Stratum) -> impl Iterator<Item = &DerivedPredicate> {
        self.rules
            .values()
            .filter(move |d| self.classification(d.id) == Some(stratum))
    }
}

fn parse_key(key: &str) -> Result<(&str, usize), RegistryError> {
    key.rsplit_once('/')
        .and_then(|(name, arity)| Some((name, arity.parse().ok()?)))
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| RegistryError::MalformedKey(key.to_string()))
}

fn arity_conflict(e: LanguageError) -> RegistryError {
    match e {
        LanguageError::ArityConflict {
            name,
            declared,
            requested,
        } => RegistryError::ArityMismatch {
            predicate: name,
            expected: declared,
            found: requested,
        },
        other => other.into(),
    }
}

/// Variables start with an uppercase letter or `_`; every other token names an object.
fn is_variable(token: &str) -> bool {
    token.starts_with('_') || token.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}

fn compile_rule(
    language: &mut Language,
    name: &str,
    arity: usize,
    head: &str,
    body: &[String],
) -> Result<Rule, RegistryError> {
    let source = format!("{} :- {}", head, body.join(", "));
    let head_expr = parse_atom(head)?;
    if head_expr.predicate != name {
        return Err(RegistryError::HeadMismatch {
            key: format!("{}/{}", name, arity),
            head: head.to_string(),
        });
    }
    if head_expr.arity() != arity {
        return Err(RegistryError::ArityMismatch {
            predicate: name.to_string(),
            expected: arity,
            found: head_expr.arity(),
        });
    }

    let mut variables = Vec::new();
    let body = body
        .iter()
        .map(|atom| compile_atom(language, &parse_atom(atom)?, &mut variables, &source))
        .collect::<Result<Vec<_>, _>>()?;
    let bound = variables.len();
    let head = compile_atom(language, &head_expr, &mut variables, &source)?;
    if let Some(variable) = variables.get(bound) {
        return Err(RegistryError::UnboundHeadVariable {
            variable: variable.clone(),
            rule: source,
        });
    }

    Ok(Rule {
        head,
        body,
        variables,
        source,
    })
}

fn compile_atom(
    language: &mut Language,
    expr: &AtomExpr,
    variables: &mut Vec<String>,
    source: &str,
) -> Result<RuleAtom, RegistryError> {
    let predicate =
        language
            .predicate_id(&expr.predicate)
            .ok_or_else(|| RegistryError::UnknownPredicate {
                predicate: expr.predicate.clone(),
                rule: source.to_string(),
            })?;
    let expected = language.arity(predicate);
    if expected != expr.arity() {
        return Err(RegistryError::ArityMismatch {
            predicate: expr.predicate.clone(),
            expected,
            found: expr.arity(),
        });
    }
    let terms = expr
        .args
        .iter()
        .map(|token| {
            if is_variable(token) {
                let slot = match variables.iter().position(|v| v == token) {
                    Some(slot) => slot,
                    None => {
                        variables.push(token.clone());
                        variables.len() - 1
                    }
                };
                Term::Variable(slot)
            } else {
                Term::Constant(language.object(token))
            }
        })
        .collect();
    Ok(RuleAtom { predicate, terms })
}
