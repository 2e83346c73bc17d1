//! Full-context LL(*) alternative prediction.
//!
//! Simulates every alternative of a decision in parallel, starting from the
//! parser's real invocation stack, until the surviving configurations agree
//! on one alternative. Precedence guards of left-recursive rules are
//! evaluated against the precedence of the invocation each configuration is
//! in, so operator loops climb and stop the way the parser will.

use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::atn::{Atn, EOF, StateId, StateKind, Transition};

/// One frame of a rule invocation stack
#[derive(Debug, PartialEq, Eq, Hash)]
pub(crate) struct StackNode {
    pub return_state: StateId,
    /// Precedence of the invocation control returns to
    pub precedence: u32,
    pub parent: Option<Rc<StackNode>>,
}

pub(crate) type Stack = Option<Rc<StackNode>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Config {
    state: StateId,
    alt: usize,
    precedence: u32,
    stack: Stack,
    /// Calls entered since the decision, minus returns
    nesting: i32,
    /// Returned out of the rule that owns the decision
    left_decision_rule: bool,
}

#[derive(Debug, Default)]
struct ConfigSet {
    configs: Vec<Config>,
    visited: FxHashSet<(StateId, usize, Stack)>,
}

impl ConfigSet {
    fn alts(&self) -> Vec<usize> {
        let mut alts: Vec<usize> = self.configs.iter().map(|c| c.alt).collect();
        alts.sort_unstable();
        alts.dedup();
        alts
    }
}

/// Prediction failed: no alternative can continue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NoViableAlt {
    /// Lookahead depth (0 = current token) of the first token that ruled
    /// out every alternative
    pub offending: usize,
}

pub(crate) struct Predictor<'a> {
    atn: &'a Atn,
    max_lookahead: usize,
}

impl<'a> Predictor<'a> {
    pub fn new(atn: &'a Atn, max_lookahead: usize) -> Self {
        Self { atn, max_lookahead }
    }

    /// Choose the 1-based alternative of `decision`. `lookahead` yields the
    /// token types from the current token on; it must end with EOF.
    pub fn predict(
        &self,
        decision: StateId,
        stack: &Stack,
        precedence: u32,
        lookahead: &[i32],
    ) -> Result<usize, NoViableAlt> {
        let mut closure = ConfigSet::default();
        for (i, t) in self.atn.state(decision).transitions.iter().enumerate() {
            let config = Config {
                state: t.target(),
                alt: i + 1,
                precedence,
                stack: stack.clone(),
                nesting: 0,
                left_decision_rule: false,
            };
            self.closure(config, &mut closure);
        }

        let (min, max) = self.atn.symbol_bounds();
        let mut depth = 0;
        loop {
            let symbol = lookahead.get(depth).copied().unwrap_or(EOF);
            let mut reach = ConfigSet::default();
            for config in &closure.configs {
                let state = self.atn.state(config.state);
                if state.kind == StateKind::RuleStop {
                    if symbol == EOF {
                        reach.configs.push(config.clone());
                    }
                    continue;
                }
                for t in &state.transitions {
                    if t.matches(symbol, min, max) {
                        let next = Config {
                            state: t.target(),
                            ..config.clone()
                        };
                        self.closure(next, &mut reach);
                    }
                }
            }

            if reach.configs.is_empty() {
                return self
                    .finished_entry_rule(&closure)
                    .ok_or(NoViableAlt { offending: depth });
            }
            let alts = reach.alts();
            if alts.len() == 1 {
                return Ok(alts[0]);
            }
            if let Some(alt) = resolves_to_one(&reach) {
                return Ok(alt);
            }
            if symbol == EOF || depth + 1 >= self.max_lookahead {
                if symbol != EOF {
                    tracing::debug!(depth, ?alts, "prediction lookahead limit hit");
                }
                return Ok(alts[0]);
            }
            closure = reach;
            depth += 1;
        }
    }

    /// Lowest alternative that reached the end of the decision's rule,
    /// used when the next token fits nowhere
    fn finished_entry_rule(&self, closure: &ConfigSet) -> Option<usize> {
        closure
            .configs
            .iter()
            .filter(|c| {
                c.left_decision_rule
                    || (self.atn.state(c.state).kind == StateKind::RuleStop && c.stack.is_none())
            })
            .map(|c| c.alt)
            .min()
    }

    fn closure(&self, config: Config, set: &mut ConfigSet) {
        if !set
            .visited
            .insert((config.state, config.alt, config.stack.clone()))
        {
            return;
        }
        let state = self.atn.state(config.state);

        if state.kind == StateKind::RuleStop {
            match &config.stack {
                // Ran off the start rule; only EOF can follow
                None => set.configs.push(config),
                Some(frame) => {
                    let next = Config {
                        state: frame.return_state,
                        alt: config.alt,
                        precedence: frame.precedence,
                        stack: frame.parent.clone(),
                        nesting: config.nesting - 1,
                        left_decision_rule: config.left_decision_rule || config.nesting == 0,
                    };
                    self.closure(next, set);
                }
            }
            return;
        }

        if !state.only_epsilon() {
            set.configs.push(config.clone());
        }

        for t in &state.transitions {
            match t {
                Transition::Rule {
                    target,
                    follow,
                    precedence,
                    ..
                } => {
                    let frame = StackNode {
                        return_state: *follow,
                        precedence: config.precedence,
                        parent: config.stack.clone(),
                    };
                    let next = Config {
                        state: *target,
                        precedence: *precedence,
                        stack: Some(Rc::new(frame)),
                        nesting: config.nesting + 1,
                        ..config.clone()
                    };
                    self.closure(next, set);
                }
                Transition::Precedence { target, precedence } => {
                    if *precedence >= config.precedence {
                        let next = Config {
                            state: *target,
                            ..config.clone()
                        };
                        self.closure(next, set);
                    }
                }
                Transition::Epsilon { target }
                | Transition::Predicate { target, .. }
                | Transition::Action { target, .. } => {
                    let next = Config {
                        state: *target,
                        ..config.clone()
                    };
                    self.closure(next, set);
                }
                _ => {}
            }
        }
    }
}

/// When every group of configurations sharing a state and stack has the
/// same lowest alternative, that alternative wins
fn resolves_to_one(reach: &ConfigSet) -> Option<usize> {
    let mut groups: FxHashMap<(StateId, &Stack), usize> = FxHashMap::default();
    for c in &reach.configs {
        let min = groups.entry((c.state, &c.stack)).or_insert(c.alt);
        *min = (*min).min(c.alt);
    }
    let mut mins = groups.values().copied();
    let first = mins.next()?;
    mins.all(|alt| alt == first).then_some(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{GrammarCompiler, GrammarDefinition, LoadOutcome};
    use std::path::Path;
    use std::sync::Arc;

    fn parser(grammar: &str) -> Arc<GrammarDefinition> {
        match GrammarCompiler::new().load_source(Path::new("T.g4"), grammar) {
            LoadOutcome::Ready(pair) => pair.parser,
            LoadOutcome::Invalid(diags) => panic!("grammar failed: {diags:?}"),
        }
    }

    /// Block-start decision of a rule with several alternatives
    fn decision_of(atn: &Atn, rule: usize) -> StateId {
        let start = atn.state(atn.rule_start[rule]);
        let block = start.transitions[0].target();
        assert!(atn.state(block).is_decision());
        block
    }

    fn types(grammar: &GrammarDefinition, names: &[&str]) -> Vec<i32> {
        let mut out: Vec<i32> = names
            .iter()
            .map(|n| grammar.vocabulary.token_type(n).expect("token defined"))
            .collect();
        out.push(EOF);
        out
    }

    #[test]
    fn test_predicts_with_long_lookahead() {
        let g = parser("grammar T; s : A+ B | A+ C ; A : 'a' ; B : 'b' ; C : 'c' ;");
        let decision = decision_of(&g.atn, 0);
        let predictor = Predictor::new(&g.atn, 100);
        assert_eq!(predictor.predict(decision, &None, 0, &types(&g, &["A", "A", "A", "C"])), Ok(2));
        assert_eq!(predictor.predict(decision, &None, 0, &types(&g, &["A", "B"])), Ok(1));
    }

    #[test]
    fn test_no_viable_alternative_depth() {
        let g = parser("grammar T; s : A B | A C ; A : 'a' ; B : 'b' ; C : 'c' ;");
        let decision = decision_of(&g.atn, 0);
        let predictor = Predictor::new(&g.atn, 100);
        let err = predictor.predict(decision, &None, 0, &types(&g, &["A", "A"]));
        assert_eq!(err, Err(NoViableAlt { offending: 1 }));
    }

    #[test]
    fn test_ambiguity_resolves_to_lowest_alt() {
        let g = parser("grammar T; s : A | A ; A : 'a' ;");
        let decision = decision_of(&g.atn, 0);
        let predictor = Predictor::new(&g.atn, 100);
        assert_eq!(predictor.predict(decision, &None, 0, &types(&g, &["A"])), Ok(1));
    }
}
