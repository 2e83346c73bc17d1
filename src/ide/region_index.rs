//! Automaton state → grammar source location.
//!
//! Only the terminals a parser matches tokens with are indexed: string
//! literals, token references and sets. A set's members share the set's
//! state, so they carry none of their own.

use rustc_hash::FxHashMap;
use text_size::{TextRange, TextSize};

use crate::atn::StateId;
use crate::grammar::{Element, ElementKind, GrammarDefinition};

/// Grammar text that declared a terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceToken {
    pub range: TextRange,
    /// Index of the rule the terminal appears in
    pub rule: usize,
}

impl SourceToken {
    pub fn offset(&self) -> TextSize {
        self.range.start()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionIndex {
    regions: FxHashMap<StateId, SourceToken>,
}

impl RegionIndex {
    pub fn build(parser: &GrammarDefinition) -> Self {
        let mut regions = FxHashMap::default();
        for rule in parser.rules.values() {
            for alt in &rule.alts {
                for element in &alt.elements {
                    index_element(element, rule.index, false, &mut regions);
                }
            }
        }
        tracing::debug!(grammar = %parser.name, regions = regions.len(), "built region index");
        Self { regions }
    }

    pub fn get(&self, state: StateId) -> Option<&SourceToken> {
        self.regions.get(&state)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StateId, &SourceToken)> + '_ {
        self.regions.iter().map(|(state, token)| (*state, token))
    }
}

fn index_element(
    element: &Element,
    rule: usize,
    in_set: bool,
    regions: &mut FxHashMap<StateId, SourceToken>,
) {
    if element.is_terminal() {
        match element.atn_state {
            Some(state) => {
                regions.insert(
                    state,
                    SourceToken {
                        range: element.range,
                        rule,
                    },
                );
            }
            None if in_set => {}
            None => tracing::warn!(
                rule,
                range = ?element.range,
                "terminal element has no automaton state"
            ),
        }
    }
    let is_set = matches!(element.kind, ElementKind::Set { .. });
    for child in element.children() {
        index_element(child, rule, is_set, regions);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{GrammarCompiler, LoadOutcome};
    use std::path::Path;

    #[test]
    fn test_every_terminal_state_maps_back_to_its_text() {
        let source = "grammar T; s : ID '=' (INT | ID) ';' ; ID : [a-z]+ ; INT : [0-9]+ ;";
        let LoadOutcome::Ready(pair) = GrammarCompiler::new().load_source(Path::new("T.g4"), source)
        else {
            panic!("grammar should load");
        };
        let index = RegionIndex::build(&pair.parser);
        let texts: Vec<&str> = {
            let mut regions: Vec<_> = index.iter().map(|(_, t)| *t).collect();
            regions.sort_by_key(|t| t.range.start());
            regions
                .into_iter()
                .map(|t| &source[t.range])
                .collect()
        };
        assert_eq!(texts, ["ID", "'='", "(INT | ID)", "';'"]);
        assert!(index.iter().all(|(_, t)| t.rule == 0));
    }
}
