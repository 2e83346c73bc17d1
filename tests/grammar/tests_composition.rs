//! Combined vs split grammar loading.

use g4preview::grammar::{Composition, LoadOutcome, codes};
use rstest::rstest;

use crate::helpers::grammar_fixtures::*;
use crate::helpers::session_helpers::{GrammarDir, sexpr};

fn error_codes(outcome: &LoadOutcome) -> Vec<String> {
    match outcome {
        LoadOutcome::Invalid(diags) => diags.iter().map(|d| d.code.to_string()).collect(),
        LoadOutcome::Ready(_) => Vec::new(),
    }
}

fn split_dir() -> GrammarDir {
    let dir = GrammarDir::new();
    dir.write("CalcLexer.g4", CALC_LEXER);
    dir.write("CalcParser.g4", CALC_PARSER);
    dir
}

// =============================================================================
// NAMING
// =============================================================================

#[test]
fn test_combined_grammar_gets_synthetic_names() {
    let dir = GrammarDir::new();
    dir.write("Calc.g4", CALC);
    let outcome = dir.load("Calc.g4");
    let pair = outcome.pair().expect("combined grammar loads");
    assert_eq!(pair.composition, Composition::Combined);
    assert_eq!(pair.lexer.name, "CalcLexer");
    assert_eq!(pair.parser.name, "CalcParser");
    assert_eq!(pair.lexer.path, pair.parser.path);
}

#[rstest]
#[case("CalcParser.g4")]
#[case("CalcLexer.g4")]
fn test_split_grammar_loads_from_either_half(#[case] file: &str) {
    let dir = split_dir();
    let outcome = dir.load(file);
    let pair = outcome.pair().expect("split grammar loads");
    assert_eq!(pair.composition, Composition::Split);
    assert_eq!(pair.lexer.name, "CalcLexer");
    assert_eq!(pair.parser.name, "CalcParser");
    assert!(pair.lexer.path.ends_with("CalcLexer.g4"));
    assert!(pair.parser.path.ends_with("CalcParser.g4"));
}

// =============================================================================
// FAILURES
// =============================================================================

#[test]
fn test_missing_counterpart() {
    let dir = GrammarDir::new();
    dir.write("CalcParser.g4", CALC_PARSER);
    let outcome = dir.load("CalcParser.g4");
    assert!(error_codes(&outcome).contains(&codes::MISSING_COUNTERPART.to_string()));
}

#[test]
fn test_counterpart_of_wrong_kind() {
    let dir = GrammarDir::new();
    dir.write("CalcParser.g4", CALC_PARSER);
    dir.write("CalcLexer.g4", "parser grammar CalcLexer;\ns : 'a' ;\n");
    let outcome = dir.load("CalcParser.g4");
    assert!(error_codes(&outcome).contains(&codes::WRONG_COUNTERPART_KIND.to_string()));
}

#[test]
fn test_broken_counterpart_invalidates_pair() {
    let dir = split_dir();
    dir.write("CalcLexer.g4", "lexer grammar CalcLexer;\nID : [a-z]+ \n");
    let outcome = dir.load("CalcParser.g4");
    assert!(!outcome.is_ready());
    assert!(error_codes(&outcome).contains(&codes::SYNTAX_ERROR.to_string()));
}

#[test]
fn test_unreadable_file() {
    let dir = GrammarDir::new();
    let outcome = dir.load("Nope.g4");
    assert_eq!(error_codes(&outcome), vec![codes::IO_ERROR.to_string()]);
}

// =============================================================================
// EQUIVALENCE
// =============================================================================

#[rstest]
#[case("a = 1 + 2 * (3 - b) ;")]
#[case("a = 1 ; #note\nb = a / 2 ;")]
#[case("x = ; y = 2 ;")]
#[case("x 1 ;")]
fn test_split_and_combined_parse_alike(#[case] input: &str) {
    let dir = split_dir();
    dir.write("Calc.g4", CALC);

    let combined = dir.load("Calc.g4");
    let split = dir.load("CalcParser.g4");
    let a = dir.run("Calc.g4", "prog", input);
    let b = dir.run("CalcParser.g4", "prog", input);

    assert_eq!(sexpr(&combined, &a), sexpr(&split, &b));
    let spans = |r: &g4preview::ParseResult| -> Vec<_> {
        r.tokens
            .iter()
            .map(|t| (t.range, t.channel, t.text.clone()))
            .collect()
    };
    assert_eq!(spans(&a), spans(&b));
    let messages = |r: &g4preview::ParseResult| -> Vec<String> {
        r.errors.iter().map(ToString::to_string).collect()
    };
    assert_eq!(messages(&a), messages(&b));
}
