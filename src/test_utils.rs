//! Shared fixtures for the unit tests.

use std::collections::{HashSet, VecDeque};

use crate::{
    lang::parse_atom,
    middleware::{Facts, Language, GOAL_SUFFIX},
    planning::{successors, Atom, Problem, ProblemBuilder, State},
    policy::{EncodedBatch, ScoreOutput, Scorer},
    rules::{BaseStrata, RegistryRecord, RuleRegistry},
};

/// Builds an extensional state from atom strings, interning objects as needed. Every predicate
/// must already be declared.
pub fn facts(language: &mut Language, atoms: &[&str]) -> Facts {
    let mut facts = Facts::new();
    for text in atoms {
        let atom = parse_atom(text).unwrap();
        let pred = language.predicate_id(&atom.predicate).unwrap();
        let tuple = atom.args.iter().map(|a| language.object(a)).collect();
        facts.insert(pred, tuple);
    }
    facts
}

/// Renders every fact of `predicate` as `pred(a, b)` strings, sorted.
pub fn render(language: &Language, facts: &Facts, predicate: &str) -> Vec<String> {
    let Some(pred) = language.predicate_id(predicate) else {
        return Vec::new();
    };
    let mut out: Vec<String> = facts
        .relation(pred)
        .map(|rel| {
            rel.iter()
                .map(|t| language.display_atom(pred, t))
                .collect()
        })
        .unwrap_or_default();
    out.sort();
    out
}

/// Loads the rules of `domain` from `json`, treating the given base predicates as dynamic and
/// every other declared predicate as static.
pub fn load_record(
    json: &str,
    domain: &str,
    language: &mut Language,
    dynamic: &[&str],
) -> RegistryRecord {
    let mut base = BaseStrata::default();
    for (id, pred) in language.predicates() {
        if dynamic.contains(&pred.name.as_str()) {
            base.dynamic_predicates.insert(id);
        } else {
            base.static_predicates.insert(id);
        }
    }
    RuleRegistry::from_json(json)
        .unwrap()
        .load(domain, language, &base)
        .unwrap()
        .unwrap()
}

/// Three-block blocksworld, grounded in a fixed order: `pickup`/`putdown` per block, then every
/// `stack` pair, then every `unstack` pair. All blocks start on the table.
pub fn blocks(goal: &[&str]) -> Problem {
    let names = ["a", "b", "c"];
    let mut builder = ProblemBuilder::new("blocks", "three")
        .predicate("on", 2)
        .unwrap()
        .predicate("ontable", 1)
        .unwrap()
        .predicate("clear", 1)
        .unwrap()
        .predicate("holding", 1)
        .unwrap()
        .predicate("handempty", 0)
        .unwrap()
        .objects(&names);
    for x in names {
        builder = builder
            .action(
                &format!("pickup({x})"),
                &[&format!("clear({x})"), &format!("ontable({x})"), "handempty"],
                &[&format!("holding({x})")],
                &[&format!("clear({x})"), &format!("ontable({x})"), "handempty"],
            )
            .unwrap()
            .action(
                &format!("putdown({x})"),
                &[&format!("holding({x})")],
                &[&format!("clear({x})"), &format!("ontable({x})"), "handempty"],
                &[&format!("holding({x})")],
            )
            .unwrap();
    }
    let pairs: Vec<(&str, &str)> = names
        .iter()
        .flat_map(|x| names.iter().map(move |y| (*x, *y)))
        .filter(|(x, y)| x != y)
        .collect();
    for (x, y) in &pairs {
        builder = builder
            .action(
                &format!("stack({x},{y})"),
                &[&format!("holding({x})"), &format!("clear({y})")],
                &[&format!("on({x},{y})"), &format!("clear({x})"), "handempty"],
                &[&format!("holding({x})"), &format!("clear({y})")],
            )
            .unwrap();
    }
    for (x, y) in &pairs {
        builder = builder
            .action(
                &format!("unstack({x},{y})"),
                &[&format!("on({x},{y})"), &format!("clear({x})"), "handempty"],
                &[&format!("holding({x})"), &format!("clear({y})")],
                &[&format!("on({x},{y})"), &format!("clear({x})"), "handempty"],
            )
            .unwrap();
    }
    builder
        .initial(&[
            "ontable(a)",
            "ontable(b)",
            "ontable(c)",
            "clear(a)",
            "clear(b)",
            "clear(c)",
            "handempty",
        ])
        .unwrap()
        .goal(goal)
        .unwrap()
        .build()
        .unwrap()
}

/// Independent switches `x`, `y`, `z`; `flip(s)` turns `s` on and is only applicable while it
/// is off.
pub fn switches(goal: &[&str]) -> Problem {
    let mut builder = ProblemBuilder::new("switches", "three")
        .predicate("on", 1)
        .unwrap()
        .objects(&["x", "y", "z"]);
    for s in ["x", "y", "z"] {
        let atom = format!("on({s})");
        builder = builder
            .action(&format!("flip({s})"), &[&format!("not {atom}")], &[&atom], &[])
            .unwrap();
    }
    builder.goal(goal).unwrap().build().unwrap()
}

/// Two locations `a` and `b` connected both ways, and an unreachable `c` as the goal.
pub fn two_state_loop() -> Problem {
    ProblemBuilder::new("loop", "ab")
        .predicate("at", 1)
        .unwrap()
        .objects(&["a", "b", "c"])
        .action("go(a,b)", &["at(a)"], &["at(b)"], &["at(a)"])
        .unwrap()
        .action("go(b,a)", &["at(b)"], &["at(a)"], &["at(b)"])
        .unwrap()
        .initial(&["at(a)"])
        .unwrap()
        .goal(&["at(c)"])
        .unwrap()
        .build()
        .unwrap()
}

/// Scores every decoded state of a batch with a closure returning `(value, solvability logit)`.
pub struct FnScorer<F> {
    language: Language,
    f: F,
}

impl<F: Fn(&Language, &Facts) -> (f32, f32)> FnScorer<F> {
    pub fn new(language: &Language, f: F) -> Self {
        Self {
            language: language.clone(),
            f,
        }
    }
}

impl<F: Fn(&Language, &Facts) -> (f32, f32)> Scorer for FnScorer<F> {
    fn score(&self, batch: &EncodedBatch) -> anyhow::Result<ScoreOutput> {
        let (values, solvability) = batch
            .decode(&self.language)
            .iter()
            .map(|facts| (self.f)(&self.language, facts))
            .unzip();
        Ok(ScoreOutput {
            values,
            solvability,
        })
    }
}

/// Value = number of goal facts not yet satisfied; every state is solvable.
pub fn goal_count(language: &Language, facts: &Facts) -> (f32, f32) {
    let unmet = facts
        .atoms()
        .filter(|(pred, tuple)| {
            let name = &language.predicate(*pred).name;
            match name.strip_suffix(GOAL_SUFFIX) {
                Some(base) => language
                    .predicate_id(base)
                    .map_or(true, |b| !facts.contains(b, tuple)),
                None => false,
            }
        })
        .count();
    (unmet as f32, 1.0)
}

/// Scores states by their exact distance to the goal, found by breadth-first search. Unsolvable
/// states get a negative logit. Derived facts are ignored.
pub struct OracleScorer {
    problem: Problem,
}

impl OracleScorer {
    pub fn new(problem: &Problem) -> Self {
        Self {
            problem: problem.clone(),
        }
    }

    fn distance(&self, start: State) -> Option<usize> {
        let mut seen = HashSet::from([start.clone()]);
        let mut queue = VecDeque::from([(start, 0)]);
        while let Some((state, dist)) = queue.pop_front() {
            if self.problem.is_goal(&state) {
                return Some(dist);
            }
            for (_, next) in successors(&state, &self.problem.actions) {
                if seen.insert(next.clone()) {
                    queue.push_back((next, dist + 1));
                }
            }
        }
        None
    }
}

impl Scorer for OracleScorer {
    fn score(&self, batch: &EncodedBatch) -> anyhow::Result<ScoreOutput> {
        let strata = self.problem.base_strata();
        let mut output = ScoreOutput::default();
        for facts in batch.decode(&self.problem.language) {
            let dynamic = facts
                .atoms()
                .filter(|(pred, _)| strata.dynamic_predicates.contains(pred))
                .map(|(pred, tuple)| Atom::new(pred, tuple.clone()));
            let fixed = self
                .problem
                .initial
                .atoms()
                .filter(|a| !strata.dynamic_predicates.contains(&a.predicate))
                .cloned();
            let state = State::new(dynamic.chain(fixed));
            let (value, logit) = match self.distance(state) {
                Some(d) => (d as f32, 1.0),
                None => (0.0, -1.0),
            };
            output.values.push(value);
            output.solvability.push(logit);
        }
        Ok(output)
    }
}
