//! Navigation between input tokens, tree nodes and grammar text.

use g4preview::TextSize;
use g4preview::interp::{Channel, Scan};
use rstest::rstest;

use crate::helpers::grammar_fixtures::*;
use crate::helpers::session_helpers::GrammarDir;

fn calc_session(input: &str) -> (GrammarDir, g4preview::PreviewSession) {
    let dir = GrammarDir::new();
    dir.write("Calc.g4", CALC);
    let session = dir.session("Calc.g4", "prog", input);
    (dir, session)
}

#[rstest]
#[case("a = 1 ;")]
#[case("a = (1 + 2) * b ;\nc = a - 3 / 4 ;")]
#[case("x = y ; #comment\nz = x ;")]
fn test_matched_tokens_lead_back_to_their_terminal(#[case] input: &str) {
    let (_dir, session) = calc_session(input);
    let view = session.view();
    let result = view.result().expect("parsed");
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    let grammar = view.grammar().expect("grammar ready");
    let parser = grammar.parser();

    for token in result.tokens.real_tokens() {
        let location = view
            .grammar_location_of(token)
            .unwrap_or_else(|| panic!("no grammar location for {token}"));
        assert_eq!(location.path, parser.path);

        let state = result.state_of_token(token.index).expect("matched token has a state");
        let region = grammar.regions.get(state).expect("state is indexed");
        assert!(region.range.contains(location.offset));

        let declared = &CALC[region.range];
        let symbolic = parser.vocabulary.symbolic_name(token.ty).unwrap_or_default();
        let literal = format!("'{}'", token.text);
        assert!(
            declared == symbolic || declared == literal || declared.starts_with('('),
            "{token} declared by {declared:?}"
        );
    }
}

#[test]
fn test_off_channel_tokens_have_no_location() {
    let (_dir, session) = calc_session("x = y ; #comment\nz = x ;");
    let view = session.view();
    let comment = view.token_at(TextSize::new(8)).expect("comment token");
    assert_eq!(comment.channel, Channel::Hidden);
    assert!(view.grammar_location_of(comment).is_none());
    assert!(view.enclosing_node(comment).is_none());
    assert!(view.token_info(TextSize::new(8)).unwrap().ends_with("Channel hidden"));

    let next = view.token_near(TextSize::new(8), Scan::Forward).unwrap();
    assert_eq!(next.text.as_str(), "z");
    let previous = view.token_near(TextSize::new(8), Scan::Backward).unwrap();
    assert_eq!(previous.text.as_str(), ";");
    assert_eq!(view.token_near(TextSize::new(8), Scan::Exact).as_ref(), Some(comment));
}

#[test]
fn test_rule_locations_point_at_rule_names() {
    let (_dir, session) = calc_session("a = 1 ;");
    let view = session.view();
    let parser = view.grammar().unwrap().parser();
    for name in ["prog", "stat", "expr"] {
        let rule = parser.rule(name).unwrap();
        let location = view.grammar_location_of_rule(rule.index).unwrap();
        assert!(CALC[usize::from(location.offset)..].starts_with(&format!("{name} :")));
    }
    assert!(view.grammar_location_of_rule(99).is_none());
}

#[test]
fn test_cursor_in_nested_expression() {
    let input = "a = (1 + 2) * b ;";
    let (_dir, session) = calc_session(input);
    let view = session.view();
    // cursor on `2`
    let offset = TextSize::new(9);
    let token = view.token_at(offset).unwrap();
    assert_eq!(token.text.as_str(), "2");

    assert_eq!(
        view.rule_invocation_stack(token),
        ["expr", "expr", "expr", "expr", "stat", "prog"]
    );
    let region = view.parse_region(offset).unwrap();
    assert_eq!(&input[region.span], "2");
    assert_eq!(region.breadcrumb.first().map(|s| s.as_str()), Some("prog"));
    assert_eq!(region.breadcrumb.last().map(|s| s.as_str()), Some("expr"));

    let rule = view.grammar_location_of_enclosing_rule(offset).unwrap();
    assert!(CALC[usize::from(rule.offset)..].starts_with("expr :"));

    let node = view.enclosing_node(token).unwrap();
    let result = view.result().unwrap();
    assert_eq!(node.parent, result.tree.parent(node.leaf));
    assert_eq!(view.token_info(offset).unwrap(), format!("#{} Type INT, Line 1:9", token.index));
}

#[test]
fn test_queries_on_empty_view() {
    let dir = GrammarDir::new();
    dir.write("Calc.g4", CALC);
    let session = g4preview::PreviewSession::new(dir.path("Calc.g4"), Default::default());
    let view = session.view();
    assert!(view.token_at(TextSize::new(0)).is_none());
    assert!(view.error_at(TextSize::new(0)).is_none());
    assert!(view.parse_region(TextSize::new(0)).is_none());
    assert!(view.grammar_location_of_rule(0).is_none());
    assert!(view.token_info(TextSize::new(0)).is_none());
}
