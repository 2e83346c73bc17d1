//! Events and queries from several threads at once.

use std::sync::Arc;
use std::thread;

use g4preview::ide::GrammarStatus;
use g4preview::{PreviewSession, SessionConfig, SessionEvent, TextSize};

use crate::helpers::grammar_fixtures::*;
use crate::helpers::session_helpers::GrammarDir;

const EDITS: &[&str] = &[
    "a = 1 ;",
    "a = 1 + ;",
    "a = (1 + 2) * b ;",
    "b = a / 2 ;\nc = 3 ;",
    "x = ; y = 2 ;",
];

#[test]
fn test_views_are_always_consistent() {
    let dir = GrammarDir::new();
    dir.write("Calc.g4", CALC);
    let session = Arc::new(PreviewSession::new(dir.path("Calc.g4"), SessionConfig::default()));
    session.handle(SessionEvent::GrammarChanged);
    session.handle(SessionEvent::StartRuleChanged("prog".into()));

    thread::scope(|scope| {
        for writer in 0..3 {
            let session = Arc::clone(&session);
            scope.spawn(move || {
                for round in 0..20 {
                    let input = EDITS[(writer + round) % EDITS.len()];
                    session.handle(SessionEvent::InputChanged(input.to_string()));
                }
            });
        }
        {
            let session = Arc::clone(&session);
            scope.spawn(move || {
                for _ in 0..5 {
                    session.handle(SessionEvent::GrammarChanged);
                }
            });
        }
        for _ in 0..2 {
            let session = Arc::clone(&session);
            scope.spawn(move || {
                for _ in 0..200 {
                    let view = session.view();
                    let Some(result) = view.result() else {
                        continue;
                    };
                    assert_eq!(view.grammar_status(), GrammarStatus::Ready);
                    assert!(view.grammar().is_some());
                    let eof = result.tokens.eof().expect("published streams end with EOF");
                    // the stream belongs to one whole input, or the initial empty one
                    let len = usize::from(eof.start());
                    assert!(len == 0 || EDITS.iter().any(|e| e.len() == len));
                    if let Some(token) = view.token_at(TextSize::new(0)) {
                        assert_eq!(token.index, 0);
                    }
                }
            });
        }
    });

    let last = "z = 9 ;";
    session.handle(SessionEvent::InputChanged(last.to_string()));
    let view = session.view();
    let expected = dir.run("Calc.g4", "prog", last);
    assert_eq!(view.result(), Some(&expected));
}

#[test]
fn test_sessions_are_independent() {
    let dir = GrammarDir::new();
    dir.write("Calc.g4", CALC);
    dir.write("Expr.g4", EXPR);
    let calc = dir.session("Calc.g4", "prog", "a = 1 ;");
    let expr = dir.session("Expr.g4", "stat", "x = 1 ;");

    dir.write("Expr.g4", &broken("Expr"));
    expr.handle(SessionEvent::GrammarChanged);

    assert_eq!(expr.view().grammar_status(), GrammarStatus::Invalid);
    assert_eq!(calc.view().grammar_status(), GrammarStatus::Ready);
    assert!(calc.view().result().is_some());
    assert_eq!(calc.compile_count(), 1);
}
