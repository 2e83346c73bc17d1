//! Automaton states and transitions.

use std::fmt;

use text_size::TextRange;

use super::interval_set::IntervalSet;

/// Identifier of a state inside one [`Atn`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateId(u32);

impl StateId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    Basic,
    RuleStart,
    RuleStop,
    BlockStart,
    BlockEnd,
    StarLoopEntry,
    StarLoopBack,
    PlusBlockStart,
    PlusLoopBack,
    LoopEnd,
    TokensStart,
}

/// Commands executed when a lexer rule accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LexerAction {
    Skip,
    More,
    Channel(i32),
    Type(i32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Epsilon {
        target: StateId,
    },
    /// Call of `rule`; control resumes at `follow` when it returns
    Rule {
        target: StateId,
        rule: usize,
        follow: StateId,
        precedence: u32,
    },
    Atom {
        target: StateId,
        label: i32,
    },
    Range {
        target: StateId,
        from: i32,
        to: i32,
    },
    Set {
        target: StateId,
        set: IntervalSet,
    },
    NotSet {
        target: StateId,
        set: IntervalSet,
    },
    Wildcard {
        target: StateId,
    },
    /// Semantic predicate; the interpreter treats it as always true
    Predicate {
        target: StateId,
        rule: usize,
    },
    /// `precpred(_ctx, precedence)` guard of a rewritten left-recursive rule
    Precedence {
        target: StateId,
        precedence: u32,
    },
    /// Embedded action, or lexer command when `lexer_action` is set
    Action {
        target: StateId,
        lexer_action: Option<usize>,
    },
}

impl Transition {
    pub fn target(&self) -> StateId {
        match self {
            Transition::Epsilon { target }
            | Transition::Rule { target, .. }
            | Transition::Atom { target, .. }
            | Transition::Range { target, .. }
            | Transition::Set { target, .. }
            | Transition::NotSet { target, .. }
            | Transition::Wildcard { target }
            | Transition::Predicate { target, .. }
            | Transition::Precedence { target, .. }
            | Transition::Action { target, .. } => *target,
        }
    }

    pub fn is_epsilon(&self) -> bool {
        matches!(
            self,
            Transition::Epsilon { .. }
                | Transition::Rule { .. }
                | Transition::Predicate { .. }
                | Transition::Precedence { .. }
                | Transition::Action { .. }
        )
    }

    /// Whether this transition consumes `symbol`, for a symbol space of
    /// `[min, max]` (wildcards and negated sets are bounded by it).
    pub fn matches(&self, symbol: i32, min: i32, max: i32) -> bool {
        match self {
            Transition::Atom { label, .. } => *label == symbol,
            Transition::Range { from, to, .. } => *from <= symbol && symbol <= *to,
            Transition::Set { set, .. } => set.contains(symbol),
            Transition::NotSet { set, .. } => {
                symbol >= min && symbol <= max && !set.contains(symbol)
            }
            Transition::Wildcard { .. } => symbol >= min && symbol <= max,
            _ => false,
        }
    }

    /// The set of symbols this transition consumes, if it consumes any
    pub fn label(&self, min: i32, max: i32) -> Option<IntervalSet> {
        match self {
            Transition::Atom { label, .. } => Some(IntervalSet::of(*label)),
            Transition::Range { from, to, .. } => Some(IntervalSet::of_range(*from, *to)),
            Transition::Set { set, .. } => Some(set.clone()),
            Transition::NotSet { set, .. } => Some(set.complement(min, max)),
            Transition::Wildcard { .. } => Some(IntervalSet::of_range(min, max)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtnState {
    pub id: StateId,
    pub kind: StateKind,
    /// Index of the owning rule
    pub rule: usize,
    pub transitions: Vec<Transition>,
    /// Decision number, for states that choose between transitions
    pub decision: Option<usize>,
    pub non_greedy: bool,
    /// Star-loop entry of a rewritten left-recursive rule
    pub precedence_decision: bool,
    /// Grammar-source range of the terminal matched from this state
    pub terminal: Option<TextRange>,
}

impl AtnState {
    pub fn only_epsilon(&self) -> bool {
        self.transitions.iter().all(Transition::is_epsilon)
    }

    pub fn is_decision(&self) -> bool {
        self.decision.is_some()
    }
}
