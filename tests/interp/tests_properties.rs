//! Properties that hold for any run of the interpreter.

use g4preview::TextSize;
use g4preview::interp::Scan;
use rstest::rstest;

use crate::helpers::grammar_fixtures::*;
use crate::helpers::session_helpers::{GrammarDir, sexpr};

fn calc_dir() -> GrammarDir {
    let dir = GrammarDir::new();
    dir.write("Calc.g4", CALC);
    dir
}

const INPUTS: &[&str] = &[
    "a = 1 ;",
    "a = (1 + 2) * b ;\nc = a - 3 ;",
    "x = ; y = 2 ;",
    "x = 1 $ 2 ;",
    "= = =",
    "",
];

#[test]
fn test_runs_are_deterministic() {
    let dir = calc_dir();
    for input in INPUTS {
        let first = dir.run("Calc.g4", "prog", input);
        let second = dir.run("Calc.g4", "prog", input);
        assert_eq!(first, second, "input {input:?}");
    }
}

#[test]
fn test_token_lookup_is_total() {
    let dir = calc_dir();
    for input in INPUTS.iter().filter(|i| !i.contains('$')) {
        let result = dir.run("Calc.g4", "prog", input);
        let len = input.len() as u32;
        for offset in 0..len {
            let offset = TextSize::new(offset);
            let token = result.tokens.token_at(offset);
            assert!(token.is_some(), "no token at {offset:?} in {input:?}");
            assert!(token.is_some_and(|t| t.range.contains(offset)));
        }
        for offset in 0..=len {
            let near = result.tokens.token_near(TextSize::new(offset), Scan::Forward);
            assert!(near.is_some_and(|t| t.is_real()), "forward scan from {offset}");
        }
        assert!(
            result
                .tokens
                .token_near(TextSize::new(len), Scan::Forward)
                .is_some_and(|t| t.is_eof())
        );
    }
}

#[test]
fn test_tokens_are_ordered_and_end_with_eof() {
    let dir = calc_dir();
    for input in INPUTS {
        let result = dir.run("Calc.g4", "prog", input);
        let tokens = result.tokens.as_slice();
        for pair in tokens.windows(2) {
            assert!(pair[0].stop() <= pair[1].start(), "{} then {}", pair[0], pair[1]);
        }
        let eof = result.tokens.eof().expect("stream ends with EOF");
        assert_eq!(u32::from(eof.start()), input.len() as u32);
        assert!(tokens.iter().enumerate().all(|(i, t)| t.index == i));
    }
}

#[test]
fn test_error_lookup_matches_spans() {
    let dir = calc_dir();
    for input in INPUTS {
        let result = dir.run("Calc.g4", "prog", input);
        for offset in 0..=input.len() as u32 {
            let offset = TextSize::new(offset);
            let expected = result.errors.iter().find(|e| e.contains(offset));
            assert_eq!(result.error_at(offset), expected, "offset {offset:?} in {input:?}");
        }
        for error in &result.errors {
            if !error.range.is_empty() {
                let hit = result.error_at(error.range.start()).expect("error at its own start");
                assert!(hit.contains(error.range.start()));
            }
        }
    }
}

#[test]
fn test_errors_do_not_stop_parsing() {
    let dir = calc_dir();
    let outcome = dir.load("Calc.g4");
    let result = dir.run("Calc.g4", "prog", "x = 1 ; y 2 ; z = 3 ;");
    assert_eq!(result.errors.len(), 1, "{:?}", result.errors);
    assert_eq!(result.errors[0].message, "missing '=' at '2'");
    let tree = sexpr(&outcome, &result);
    assert!(tree.starts_with("(prog (stat x = (expr 1) ;)"), "{tree}");
    assert!(tree.contains("(stat y <missing '='> (expr 2) ;)"), "{tree}");
    assert!(tree.contains("(stat z = (expr 3) ;)"), "{tree}");
}

#[test]
fn test_lexical_error_spans_one_char() {
    let dir = calc_dir();
    let result = dir.run("Calc.g4", "prog", "x = 1 $ 2 ;");
    let lexical: Vec<_> = result.errors.iter().filter(|e| e.is_lexical()).collect();
    assert_eq!(lexical.len(), 1);
    assert_eq!(u32::from(lexical[0].range.start()), 6);
    assert_eq!(u32::from(lexical[0].range.len()), 1);
    assert_eq!(lexical[0].message, "token recognition error at: '$'");
}

#[rstest]
#[case("a = 1 + 2 + 3 ;", "(prog (stat a = (expr (expr (expr 1) + (expr 2)) + (expr 3)) ;) <EOF>)")]
#[case("a = 1 - 2 * 3 ;", "(prog (stat a = (expr (expr 1) - (expr (expr 2) * (expr 3))) ;) <EOF>)")]
#[case("a = (1 + 2) * 3 ;", "(prog (stat a = (expr (expr ( (expr (expr 1) + (expr 2)) )) * (expr 3)) ;) <EOF>)")]
fn test_left_recursive_nesting(#[case] input: &str, #[case] expected: &str) {
    let dir = calc_dir();
    let outcome = dir.load("Calc.g4");
    let result = dir.run("Calc.g4", "prog", input);
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert_eq!(sexpr(&outcome, &result), expected);
}
