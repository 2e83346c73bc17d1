//! Editor scenarios driven through session events.

use g4preview::ide::{GrammarStatus, ParseStatus};
use g4preview::interp::SyntaxErrorKind;
use g4preview::{RunError, SessionEvent, TextRange, TextSize};

use crate::helpers::grammar_fixtures::*;
use crate::helpers::session_helpers::GrammarDir;

#[test]
fn test_clean_statement() {
    let dir = GrammarDir::new();
    dir.write("Expr.g4", EXPR);
    let session = dir.session("Expr.g4", "stat", "x = 1 ;");
    let view = session.view();

    assert_eq!(view.grammar_status(), GrammarStatus::Ready);
    assert_eq!(view.parse_status(), &ParseStatus::Parsed);
    let result = view.result().expect("parsed");
    assert!(result.errors.is_empty(), "{:?}", result.errors);

    let root = result.tree.root().expect("tree has a root");
    let stat = view.grammar().unwrap().parser().rule("stat").unwrap().index;
    assert_eq!(result.tree.node(root).rule(), Some(stat));
    assert_eq!(result.tree.children(root).len(), 4);

    let token = view.token_at(TextSize::new(0)).expect("token at 0");
    assert_eq!(token.text.as_str(), "x");
    let vocabulary = &view.grammar().unwrap().parser().vocabulary;
    assert_eq!(vocabulary.symbolic_name(token.ty), Some("ID"));
}

#[test]
fn test_missing_operand() {
    let dir = GrammarDir::new();
    dir.write("Expr.g4", EXPR);
    let session = dir.session("Expr.g4", "stat", "x = ;");
    let view = session.view();

    let result = view.result().expect("errors still produce a result");
    assert_eq!(result.errors.len(), 1, "{:?}", result.errors);
    let error = &result.errors[0];
    assert_eq!(error.kind, SyntaxErrorKind::InputMismatch);
    assert_eq!(error.range, TextRange::new(TextSize::new(4), TextSize::new(5)));
    assert_eq!(view.error_at(TextSize::new(4)), Some(error));
    assert!(view.error_at(TextSize::new(0)).is_none());

    // partial tree keeps what matched before the error
    let root = result.tree.root().expect("partial tree");
    assert!(result.tree.children(root).len() >= 2);
    assert_eq!(view.rule_invocation_stack(view.token_at(TextSize::new(0)).unwrap()), ["stat"]);
}

#[test]
fn test_broken_grammar_reload_short_circuits() {
    let dir = GrammarDir::new();
    dir.write("Expr.g4", EXPR);
    let session = dir.session("Expr.g4", "stat", "x = 1 ;");
    assert_eq!(session.compile_count(), 1);

    dir.write("Expr.g4", &broken("Expr"));
    session.handle(SessionEvent::GrammarChanged);
    let view = session.view();
    assert_eq!(view.grammar_status(), GrammarStatus::Invalid);
    assert!(view.diagnostics().iter().any(|d| d.is_error()));
    assert!(view.result().is_none());
    assert_eq!(session.compile_count(), 2);

    session.handle(SessionEvent::InputChanged("y = 2 ;".into()));
    let view = session.view();
    assert_eq!(view.parse_status(), &ParseStatus::Failed(RunError::GrammarInvalid));
    assert!(view.result().is_none());
    assert_eq!(session.compile_count(), 2);

    // fixing the grammar brings the preview back with the latest input
    dir.write("Expr.g4", EXPR);
    session.handle(SessionEvent::GrammarChanged);
    let view = session.view();
    assert_eq!(view.grammar_status(), GrammarStatus::Ready);
    assert_eq!(view.parse_status(), &ParseStatus::Parsed);
    assert_eq!(view.token_at(TextSize::new(0)).unwrap().text.as_str(), "y");
    assert_eq!(session.compile_count(), 3);
}

#[test]
fn test_input_edit_does_not_recompile() {
    let dir = GrammarDir::new();
    dir.write("Expr.g4", EXPR);
    let session = dir.session("Expr.g4", "stat", "x = 1 ;");
    for input in ["x = 1 + ;", "x = 1 + 2 ;", "y=3;"] {
        session.handle(SessionEvent::InputChanged(input.into()));
    }
    assert_eq!(session.compile_count(), 1);
    let view = session.view();
    assert!(view.result().unwrap().errors.is_empty());
    assert_eq!(view.token_at(TextSize::new(0)).unwrap().text.as_str(), "y");
}

#[test]
fn test_start_rule_change_reparses() {
    let dir = GrammarDir::new();
    dir.write("Expr.g4", EXPR);
    let session = dir.session("Expr.g4", "stat", "1 + 2");
    assert!(session.view().result().unwrap().has_errors());

    session.handle(SessionEvent::StartRuleChanged("expr".into()));
    let view = session.view();
    let result = view.result().unwrap();
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert_eq!(Some(result.start_rule), view.grammar().unwrap().parser().rule("expr").map(|r| r.index));

    session.handle(SessionEvent::StartRuleChanged("WS".into()));
    assert_eq!(
        session.view().parse_status(),
        &ParseStatus::Failed(RunError::NoSuchStartRule("WS".into()))
    );
}

#[test]
fn test_split_session_reloads_both_halves() {
    let dir = GrammarDir::new();
    dir.write("CalcLexer.g4", CALC_LEXER);
    dir.write("CalcParser.g4", CALC_PARSER);
    let session = dir.session("CalcParser.g4", "prog", "a = 1 ;");
    assert!(session.view().result().unwrap().errors.is_empty());

    // lexer loses its whitespace rule; spaces become recognition errors
    let without_ws = CALC_LEXER.replace("WS : [ \\t\\r\\n]+ -> skip ;\n", "");
    dir.write("CalcLexer.g4", &without_ws);
    session.handle(SessionEvent::GrammarChanged);
    let view = session.view();
    assert_eq!(view.grammar_status(), GrammarStatus::Ready);
    let result = view.result().unwrap();
    assert_eq!(result.errors.iter().filter(|e| e.is_lexical()).count(), 3);
    assert!(view.grammar().unwrap().pair.lexer.rule("WS").is_none());
}
