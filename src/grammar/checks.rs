//! Semantic checks over a lowered rule table.
//!
//! These run after lowering and before the automaton is built. Anything
//! that would make the interpreters loop without consuming input (empty
//! tokens, empty loop bodies, left recursion) is rejected here.

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use super::diagnostics::{DiagnosticCollector, codes};
use super::model::{Alternative, Element, ElementKind, Rule};
use super::vocabulary::Vocabulary;
use crate::atn::LexerAction;

pub type RuleTable = IndexMap<SmolStr, Rule>;

/// Report references to rules missing from the table. In lexer grammars
/// these are token references.
pub fn check_references(rules: &RuleTable, diags: &mut DiagnosticCollector) {
    for rule in rules.values() {
        for element in rule.elements() {
            let ElementKind::RuleRef { name, .. } = &element.kind else {
                continue;
            };
            if rules.contains_key(name) {
                continue;
            }
            if rule.is_lexer {
                diags.error(
                    element.range,
                    codes::UNDEFINED_TOKEN,
                    format!("reference to undefined rule: {name}"),
                );
            } else {
                diags.error(
                    element.range,
                    codes::UNDEFINED_RULE,
                    format!("reference to undefined rule: {name}"),
                );
            }
        }
    }
}

// ============================================================================
// EMPTY MATCHES
// ============================================================================

/// Names of rules that can match the empty string
pub fn nullable_rules(rules: &RuleTable) -> FxHashSet<SmolStr> {
    let mut nullable = FxHashSet::default();
    loop {
        let before = nullable.len();
        for rule in rules.values() {
            if !nullable.contains(&rule.name) && alts_nullable(&rule.alts, &nullable) {
                nullable.insert(rule.name.clone());
            }
        }
        if nullable.len() == before {
            return nullable;
        }
    }
}

fn alts_nullable(alts: &[Alternative], nullable: &FxHashSet<SmolStr>) -> bool {
    alts.iter()
        .any(|alt| alt.elements.iter().all(|e| element_nullable(e, nullable)))
}

fn element_nullable(element: &Element, nullable: &FxHashSet<SmolStr>) -> bool {
    match &element.kind {
        ElementKind::StringLiteral { chars, .. } => chars.is_empty(),
        ElementKind::RuleRef { name, .. } => nullable.contains(name),
        ElementKind::Predicate | ElementKind::Action | ElementKind::PrecedencePredicate { .. } => {
            true
        }
        ElementKind::Optional { .. } | ElementKind::Star { .. } => true,
        ElementKind::Block { alts } | ElementKind::Plus { alts, .. } => {
            alts_nullable(alts, nullable)
        }
        ElementKind::TokenRef { .. }
        | ElementKind::Set { .. }
        | ElementKind::CharSet { .. }
        | ElementKind::Range { .. }
        | ElementKind::Wildcard => false,
    }
}

/// Report tokens and loop bodies that can match nothing
pub fn check_empty_matches(rules: &RuleTable, diags: &mut DiagnosticCollector) {
    let nullable = nullable_rules(rules);
    for rule in rules.values() {
        if rule.is_lexer && !rule.fragment && nullable.contains(&rule.name) {
            diags.error(
                rule.name_range,
                codes::EPSILON_TOKEN,
                format!("non-fragment lexer rule {} can match the empty string", rule.name),
            );
        }
        for element in rule.elements() {
            let body = match &element.kind {
                ElementKind::Star { alts, .. } | ElementKind::Plus { alts, .. } => alts,
                _ => continue,
            };
            if alts_nullable(body, &nullable) {
                diags.error(
                    element.range,
                    codes::EPSILON_CLOSURE,
                    format!(
                        "rule {} contains a closure with at least one alternative that can match an empty string",
                        rule.name
                    ),
                );
            }
        }
    }
}

// ============================================================================
// LEFT RECURSION
// ============================================================================

/// Rules reachable at the left edge of `alts` without consuming input
fn left_refs(alts: &[Alternative], nullable: &FxHashSet<SmolStr>, out: &mut Vec<SmolStr>) {
    for alt in alts {
        for element in &alt.elements {
            match &element.kind {
                ElementKind::RuleRef { name, .. } => out.push(name.clone()),
                ElementKind::Block { alts }
                | ElementKind::Optional { alts, .. }
                | ElementKind::Star { alts, .. }
                | ElementKind::Plus { alts, .. } => left_refs(alts, nullable, out),
                _ => {}
            }
            if !element_nullable(element, nullable) {
                break;
            }
        }
    }
}

/// Report rules that can reach themselves without consuming input. Direct
/// left recursion has already been rewritten at this point, so whatever
/// remains is indirect or unrewritable.
pub fn check_left_recursion(rules: &RuleTable, diags: &mut DiagnosticCollector) {
    let nullable = nullable_rules(rules);
    let edges: Vec<Vec<usize>> = rules
        .values()
        .map(|rule| {
            let mut names = Vec::new();
            left_refs(&rule.alts, &nullable, &mut names);
            names
                .iter()
                .filter_map(|name| rules.get_index_of(name))
                .collect()
        })
        .collect();

    let reach = |from: usize| -> FxHashSet<usize> {
        let mut seen = FxHashSet::default();
        let mut work: Vec<usize> = edges[from].clone();
        while let Some(r) = work.pop() {
            if seen.insert(r) {
                work.extend(edges[r].iter().copied());
            }
        }
        seen
    };

    let reachable: Vec<FxHashSet<usize>> = (0..edges.len()).map(reach).collect();
    let mut reported: FxHashSet<usize> = FxHashSet::default();
    for (index, rule) in rules.values().enumerate() {
        if reported.contains(&index) || !reachable[index].contains(&index) {
            continue;
        }
        let mut cycle: Vec<usize> = reachable[index]
            .iter()
            .copied()
            .filter(|&other| reachable[other].contains(&index))
            .collect();
        cycle.sort_unstable();
        let names: Vec<&str> = cycle
            .iter()
            .filter_map(|&i| rules.get_index(i).map(|(name, _)| name.as_str()))
            .collect();
        reported.extend(cycle);
        let message = if names.len() == 1 {
            format!("rule {} is left recursive but cannot be rewritten", rule.name)
        } else {
            format!(
                "the following sets of rules are mutually left-recursive [{}]",
                names.join(", ")
            )
        };
        diags.error(rule.name_range, codes::LEFT_RECURSION, message);
    }
}

// ============================================================================
// LEXER COMMANDS
// ============================================================================

/// Resolve `-> command` lists into lexer actions against the vocabulary
pub fn resolve_commands(
    rules: &mut RuleTable,
    vocabulary: &Vocabulary,
    diags: &mut DiagnosticCollector,
) {
    for rule in rules.values_mut() {
        for alt in &mut rule.alts {
            let mut actions = Vec::with_capacity(alt.commands.len());
            for command in &alt.commands {
                let arg = command.arg.as_deref();
                let action = match (command.name.as_str(), arg) {
                    ("skip", None) => Some(LexerAction::Skip),
                    ("more", None) => Some(LexerAction::More),
                    ("channel", Some(arg)) => {
                        let channel = arg.parse::<i32>().ok().or_else(|| vocabulary.channel(arg));
                        if channel.is_none() {
                            diags.error(
                                command.range,
                                codes::INVALID_COMMAND,
                                format!("channel {arg} is not defined"),
                            );
                        }
                        channel.map(LexerAction::Channel)
                    }
                    ("type", Some(arg)) => {
                        let ty = vocabulary.token_type(arg);
                        if ty.is_none() {
                            diags.error(
                                command.range,
                                codes::INVALID_COMMAND,
                                format!("token type {arg} is not defined"),
                            );
                        }
                        ty.map(LexerAction::Type)
                    }
                    ("mode" | "pushMode" | "popMode", _) => {
                        diags.error(
                            command.range,
                            codes::UNSUPPORTED,
                            format!("lexer command {} is not supported", command.name),
                        );
                        None
                    }
                    ("skip" | "more" | "channel" | "type", _) => {
                        diags.error(
                            command.range,
                            codes::INVALID_COMMAND,
                            format!("wrong number of arguments for lexer command {}", command.name),
                        );
                        None
                    }
                    (name, _) => {
                        diags.error(
                            command.range,
                            codes::INVALID_COMMAND,
                            format!("lexer command {name} does not exist"),
                        );
                        None
                    }
                };
                actions.extend(action);
            }
            alt.lexer_actions = actions;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use text_size::TextRange;

    use crate::grammar::model::CommandSpec;

    fn el(kind: ElementKind) -> Element {
        Element::new(kind, TextRange::default())
    }

    fn rule_ref(name: &str) -> Element {
        el(ElementKind::RuleRef {
            name: SmolStr::new(name),
            precedence: 0,
        })
    }

    fn token(name: &str) -> Element {
        el(ElementKind::TokenRef {
            name: SmolStr::new(name),
        })
    }

    fn rule(name: &str, is_lexer: bool, alts: Vec<Vec<Element>>) -> Rule {
        Rule {
            index: 0,
            name: SmolStr::new(name),
            is_lexer,
            fragment: false,
            range: TextRange::default(),
            name_range: TextRange::default(),
            alts: alts
                .into_iter()
                .map(|elements| Alternative::new(elements, TextRange::default()))
                .collect(),
            precedence_rule: false,
        }
    }

    fn table(rules: Vec<Rule>) -> RuleTable {
        rules
            .into_iter()
            .enumerate()
            .map(|(i, mut r)| {
                r.index = i;
                (r.name.clone(), r)
            })
            .collect()
    }

    fn codes_of(diags: &DiagnosticCollector) -> Vec<&str> {
        diags.diagnostics().iter().map(|d| d.code.as_ref()).collect()
    }

    fn collector() -> DiagnosticCollector {
        DiagnosticCollector::new(Path::new("T.g4"), "")
    }

    #[test]
    fn test_undefined_rule() {
        let rules = table(vec![rule("s", false, vec![vec![rule_ref("missing")]])]);
        let mut diags = collector();
        check_references(&rules, &mut diags);
        assert_eq!(codes_of(&diags), vec![codes::UNDEFINED_RULE]);
    }

    #[test]
    fn test_mutual_left_recursion() {
        let rules = table(vec![
            rule("a", false, vec![vec![rule_ref("b"), token("X")]]),
            rule("b", false, vec![vec![rule_ref("a")], vec![token("Y")]]),
            rule("c", false, vec![vec![token("X"), rule_ref("c")]]),
        ]);
        let mut diags = collector();
        check_left_recursion(&rules, &mut diags);
        assert_eq!(codes_of(&diags), vec![codes::LEFT_RECURSION]);
        assert!(diags.diagnostics()[0].message.contains("[a, b]"));
    }

    #[test]
    fn test_left_recursion_through_nullable_prefix() {
        let optional = el(ElementKind::Optional {
            alts: vec![Alternative::new(vec![token("X")], TextRange::default())],
            greedy: true,
        });
        let rules = table(vec![rule("a", false, vec![vec![optional, rule_ref("a")]])]);
        let mut diags = collector();
        check_left_recursion(&rules, &mut diags);
        assert_eq!(codes_of(&diags), vec![codes::LEFT_RECURSION]);
    }

    #[test]
    fn test_empty_token_and_closure() {
        let star = |inner: Element| {
            el(ElementKind::Star {
                alts: vec![Alternative::new(vec![inner], TextRange::default())],
                greedy: true,
                precedence_loop: false,
            })
        };
        let rules = table(vec![
            rule("WS", true, vec![vec![star(el(ElementKind::Wildcard))]]),
            rule("s", false, vec![vec![star(el(ElementKind::Action))]]),
        ]);
        let mut diags = collector();
        check_empty_matches(&rules, &mut diags);
        assert_eq!(codes_of(&diags), vec![codes::EPSILON_TOKEN, codes::EPSILON_CLOSURE]);
    }

    #[test]
    fn test_resolve_commands() {
        let mut vocab = Vocabulary::new();
        let id = vocab.define_token("ID");
        let comments = vocab.define_channel("COMMENTS");
        let mut ws = rule("WS", true, vec![vec![el(ElementKind::Wildcard)]]);
        let command = |name: &str, arg: Option<&str>| CommandSpec {
            name: SmolStr::new(name),
            arg: arg.map(SmolStr::new),
            range: TextRange::default(),
        };
        ws.alts[0].commands = vec![
            command("channel", Some("COMMENTS")),
            command("channel", Some("HIDDEN")),
            command("type", Some("ID")),
            command("skip", None),
            command("pushMode", Some("X")),
            command("frobnicate", None),
        ];
        let mut rules = table(vec![ws]);
        let mut diags = collector();
        resolve_commands(&mut rules, &vocab, &mut diags);
        assert_eq!(
            rules["WS"].alts[0].lexer_actions,
            vec![
                LexerAction::Channel(comments),
                LexerAction::Channel(1),
                LexerAction::Type(id),
                LexerAction::Skip,
            ]
        );
        assert_eq!(codes_of(&diags), vec![codes::UNSUPPORTED, codes::INVALID_COMMAND]);
    }
}
