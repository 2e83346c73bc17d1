//! Rewrite of directly left-recursive parser rules into precedence-climbing
//! form.
//!
//! ```text
//! e : e '*' e | e '+' e | '-' e | INT ;
//! ```
//! becomes
//! ```text
//! e : ( '-' e[3] | INT )
//!     ( {precpred 4}? '*' e[5]
//!     | {precpred 3}? '+' e[4]
//!     )* ;
//! ```
//! Alternative `i` of `n` has precedence `n - i + 1`. The trailing
//! recursive reference of a binary alternative is called with the next
//! precedence (one higher unless the alternative is `<assoc=right>`).

use smol_str::SmolStr;
use text_size::TextRange;

use super::model::{Alternative, Assoc, Element, ElementKind, Rule};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AltShape {
    /// `e op e`
    Binary,
    /// `e op`
    Suffix,
    /// `op e`
    Prefix,
    Other,
}

fn is_self_ref(element: Option<&Element>, name: &str) -> bool {
    matches!(
        element.map(|e| &e.kind),
        Some(ElementKind::RuleRef { name: n, .. }) if n == name
    )
}

fn shape(alt: &Alternative, name: &str) -> AltShape {
    let first = is_self_ref(alt.elements.first(), name);
    let last = alt.elements.len() > 1 && is_self_ref(alt.elements.last(), name);
    match (first, last) {
        (true, true) => AltShape::Binary,
        (true, false) => AltShape::Suffix,
        (false, true) => AltShape::Prefix,
        (false, false) => AltShape::Other,
    }
}

/// Whether the rule has at least one alternative starting with a reference
/// to itself
pub fn is_directly_left_recursive(rule: &Rule) -> bool {
    !rule.is_lexer
        && rule
            .alts
            .iter()
            .any(|alt| is_self_ref(alt.elements.first(), &rule.name))
}

fn set_last_precedence(alt: &mut Alternative, precedence: u32) {
    if let Some(Element {
        kind: ElementKind::RuleRef { precedence: p, .. },
        ..
    }) = alt.elements.last_mut()
    {
        *p = precedence;
    }
}

/// Rewrite a directly left-recursive rule in place. Returns `false` if the
/// rule has no left-recursive alternatives or nothing but them.
pub fn rewrite(rule: &mut Rule) -> bool {
    if !is_directly_left_recursive(rule) {
        return false;
    }
    let name: SmolStr = rule.name.clone();
    let n = rule.alts.len() as u32;

    let original = rule.alts.clone();
    let mut primary: Vec<Alternative> = Vec::new();
    let mut loops: Vec<Alternative> = Vec::new();

    for (i, alt) in std::mem::take(&mut rule.alts).into_iter().enumerate() {
        let precedence = n - i as u32;
        let next_precedence = match alt.assoc {
            Assoc::Left => precedence + 1,
            Assoc::Right => precedence,
        };
        match shape(&alt, &name) {
            AltShape::Binary | AltShape::Suffix => {
                let binary = shape(&alt, &name) == AltShape::Binary;
                let guard_range = TextRange::empty(alt.range.start());
                let mut rest = alt;
                rest.elements.remove(0);
                if binary {
                    set_last_precedence(&mut rest, next_precedence);
                }
                rest.elements.insert(
                    0,
                    Element::new(ElementKind::PrecedencePredicate { precedence }, guard_range),
                );
                loops.push(rest);
            }
            AltShape::Prefix => {
                let mut alt = alt;
                set_last_precedence(&mut alt, precedence);
                primary.push(alt);
            }
            AltShape::Other => primary.push(alt),
        }
    }

    if primary.is_empty() {
        // Nothing to start from; the untouched alternatives keep their left
        // edge so the left-recursion check reports the rule
        rule.alts = original;
        return false;
    }

    let range = rule.range;
    let primary_block = Element::new(ElementKind::Block { alts: primary }, range);
    let loop_block = Element::new(
        ElementKind::Star {
            alts: loops,
            greedy: true,
            precedence_loop: true,
        },
        range,
    );
    rule.alts = vec![Alternative::new(vec![primary_block, loop_block], range)];
    rule.precedence_rule = true;
    tracing::debug!(rule = %rule.name, "rewrote left-recursive rule");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use text_size::TextSize;

    fn el(kind: ElementKind) -> Element {
        Element::new(kind, TextRange::default())
    }

    fn rule_ref(name: &str) -> Element {
        el(ElementKind::RuleRef {
            name: SmolStr::new(name),
            precedence: 0,
        })
    }

    fn lit(text: &str) -> Element {
        el(ElementKind::StringLiteral {
            raw: SmolStr::new(format!("'{text}'")),
            chars: text.chars().map(|c| c as u32).collect(),
        })
    }

    fn alt(elements: Vec<Element>) -> Alternative {
        Alternative::new(elements, TextRange::empty(TextSize::new(7)))
    }

    fn expr_rule(alts: Vec<Alternative>) -> Rule {
        Rule {
            index: 0,
            name: SmolStr::new("e"),
            is_lexer: false,
            fragment: false,
            range: TextRange::default(),
            name_range: TextRange::default(),
            alts,
            precedence_rule: false,
        }
    }

    fn precedences(alt: &Alternative) -> (Option<u32>, Option<u32>) {
        let guard = match alt.elements.first().map(|e| &e.kind) {
            Some(ElementKind::PrecedencePredicate { precedence }) => Some(*precedence),
            _ => None,
        };
        let last = match alt.elements.last().map(|e| &e.kind) {
            Some(ElementKind::RuleRef { precedence, .. }) => Some(*precedence),
            _ => None,
        };
        (guard, last)
    }

    #[test]
    fn test_rewrite_binary_prefix_and_primary() {
        let mut rule = expr_rule(vec![
            alt(vec![rule_ref("e"), lit("*"), rule_ref("e")]),
            alt(vec![rule_ref("e"), lit("+"), rule_ref("e")]),
            alt(vec![lit("-"), rule_ref("e")]),
            alt(vec![el(ElementKind::TokenRef {
                name: SmolStr::new("INT"),
            })]),
        ]);
        assert!(rewrite(&mut rule));
        assert!(rule.precedence_rule);
        assert_eq!(rule.alts.len(), 1);

        let [primary, star] = rule.alts[0].elements.as_slice() else {
            panic!("expected primary block and loop");
        };
        let ElementKind::Block { alts: primary } = &primary.kind else {
            panic!("expected block");
        };
        assert_eq!(primary.len(), 2);
        assert_eq!(precedences(&primary[0]), (None, Some(2)));

        let ElementKind::Star {
            alts: loops,
            precedence_loop,
            ..
        } = &star.kind
        else {
            panic!("expected star");
        };
        assert!(*precedence_loop);
        assert_eq!(precedences(&loops[0]), (Some(4), Some(5)));
        assert_eq!(precedences(&loops[1]), (Some(3), Some(4)));
        // guard, operator, operand
        assert_eq!(loops[0].elements.len(), 3);
        assert_eq!(loops[0].elements[0].range, TextRange::empty(TextSize::new(7)));
    }

    #[test]
    fn test_right_assoc_keeps_precedence() {
        let mut pow = alt(vec![rule_ref("e"), lit("^"), rule_ref("e")]);
        pow.assoc = Assoc::Right;
        let mut rule = expr_rule(vec![pow, alt(vec![lit("x")])]);
        assert!(rewrite(&mut rule));
        let ElementKind::Star { alts, .. } = &rule.alts[0].elements[1].kind else {
            panic!("expected star");
        };
        assert_eq!(precedences(&alts[0]), (Some(2), Some(2)));
    }

    #[test]
    fn test_suffix_alternative() {
        let mut rule = expr_rule(vec![
            alt(vec![rule_ref("e"), lit("!")]),
            alt(vec![lit("x")]),
        ]);
        assert!(rewrite(&mut rule));
        let ElementKind::Star { alts, .. } = &rule.alts[0].elements[1].kind else {
            panic!("expected star");
        };
        assert_eq!(precedences(&alts[0]), (Some(2), None));
    }

    #[test]
    fn test_only_recursive_alts_left_untouched() {
        let mut rule = expr_rule(vec![
            alt(vec![rule_ref("e"), lit("+"), rule_ref("e")]),
            alt(vec![rule_ref("e"), lit("!")]),
        ]);
        let before = rule.alts.clone();
        assert!(!rewrite(&mut rule));
        assert!(!rule.precedence_rule);
        assert_eq!(rule.alts, before);
    }

    #[test]
    fn test_not_left_recursive() {
        let mut rule = expr_rule(vec![alt(vec![lit("-"), rule_ref("e")]), alt(vec![lit("x")])]);
        assert!(!rewrite(&mut rule));
        assert!(!rule.precedence_rule);
        assert_eq!(rule.alts.len(), 2);
    }
}
