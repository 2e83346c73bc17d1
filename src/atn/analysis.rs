//! LL(1) lookahead analysis over the automaton.
//!
//! Predicates are seen through. Reaching the end of the rule the analysis
//! started in adds [`EPSILON`] to the result.

use rustc_hash::FxHashSet;

use super::interval_set::{EOF, EPSILON, IntervalSet};
use super::state::{StateId, StateKind, Transition};
use super::Atn;

/// Tokens that can follow `start` without leaving its rule
pub fn next_tokens(atn: &Atn, start: StateId) -> IntervalSet {
    let (min, max) = atn.symbol_bounds();
    let mut look = IntervalSet::new();
    let mut seen: FxHashSet<(StateId, Vec<(StateId, usize)>)> = FxHashSet::default();
    // (state, local call stack of (follow state, called rule))
    let mut work: Vec<(StateId, Vec<(StateId, usize)>)> = vec![(start, Vec::new())];

    while let Some((s, stack)) = work.pop() {
        if !seen.insert((s, stack.clone())) {
            continue;
        }
        let state = atn.state(s);
        if state.kind == StateKind::RuleStop {
            match stack.split_last() {
                None => look.add(EPSILON),
                Some((&(follow, _), rest)) => work.push((follow, rest.to_vec())),
            }
            continue;
        }
        for t in &state.transitions {
            match t {
                Transition::Rule {
                    target,
                    rule,
                    follow,
                    ..
                } => {
                    if stack.iter().any(|(_, called)| called == rule) {
                        continue;
                    }
                    let mut next = stack.clone();
                    next.push((*follow, *rule));
                    work.push((*target, next));
                }
                t if t.is_epsilon() => work.push((t.target(), stack.clone())),
                t => {
                    if let Some(set) = t.label(min, max) {
                        look.add_all(&set);
                    }
                }
            }
        }
    }
    look
}

/// Tokens expected at `state` given the follow states of the active rule
/// invocations, innermost first. Running off the outermost rule adds EOF.
pub fn expected_tokens(
    atn: &Atn,
    state: StateId,
    follows: impl IntoIterator<Item = StateId>,
) -> IntervalSet {
    let mut following = next_tokens(atn, state);
    if !following.contains(EPSILON) {
        return following;
    }
    let mut expected = following.clone();
    expected.remove(EPSILON);
    for follow in follows {
        if !following.contains(EPSILON) {
            break;
        }
        following = next_tokens(atn, follow);
        expected.add_all(&following);
        expected.remove(EPSILON);
    }
    if following.contains(EPSILON) {
        expected.add(EOF);
    }
    expected
}
