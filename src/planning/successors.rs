use log::trace;

use super::{GroundAction, State};

/// Applicable actions of `state` with their resulting states, in the order of `actions`.
/// Each entry carries the action's index into `actions`.
pub fn successors(state: &State, actions: &[GroundAction]) -> Vec<(usize, State)> {
    let successors: Vec<_> = actions
        .iter()
        .enumerate()
        .filter(|(_, action)| action.is_applicable(state))
        .map(|(idx, action)| (idx, state.apply(action)))
        .collect();
    trace!(
        "{} of {} actions applicable",
        successors.len(),
        actions.len()
    );
    successors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planning::ProblemBuilder;

    #[test]
    fn test_successors_follow_action_order() {
        let problem = ProblemBuilder::new("switches", "p")
            .predicate("on", 1)
            .unwrap()
            .action("turn-on-b", &["not on(b)"], &["on(b)"], &[])
            .unwrap()
            .action("turn-off-a", &["on(a)"], &[], &["on(a)"])
            .unwrap()
            .action("turn-on-a", &["not on(a)"], &["on(a)"], &[])
            .unwrap()
            .initial(&["on(a)"])
            .unwrap()
            .build()
            .unwrap();

        let next = successors(&problem.initial, &problem.actions);
        let ids: Vec<usize> = next.iter().map(|(i, _)| *i).collect();
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(next[0].1.len(), 2);
        assert!(next[1].1.is_empty());
    }

    #[test]
    fn test_effects_are_set_idempotent() {
        let problem = ProblemBuilder::new("d", "p")
            .predicate("on", 1)
            .unwrap()
            .action("noop", &[], &["on(a)"], &["on(a)"])
            .unwrap()
            .initial(&["on(a)"])
            .unwrap()
            .build()
            .unwrap();
        // Delete-then-add keeps the atom; applying twice is stable.
        let once = problem.initial.apply(&problem.actions[0]);
        assert_eq!(once, problem.initial);
        assert_eq!(once.apply(&problem.actions[0]), once);
    }
}
