//! Semantic-rejection fixtures
//!
//! Each case pins the exact error text the validator produces for a
//! known-bad grammar. The messages are a compatibility contract, matched
//! verbatim by callers.

use cdsn::cdsn::ast::{Alternative, Definition, Expression, Grammar, Inline, Multiline};
use cdsn::{parse_source, validate_grammar};
use rstest::rstest;

#[rstest]
#[case::duplicate_name(
    "bad: 'a'\n\nbad: 'b'\n",
    "The definition for bad is invalid:\nThe name bad is defined more than once.\n"
)]
#[case::undefined_symbol(
    "Thing: rule\n",
    "The grammar is missing a definition for the symbol: rule"
)]
#[case::token_references_rule(
    "token: Rule\n\nRule: 'x'\n",
    "The definition for token is invalid:\nA token definition cannot contain a rule name.\n"
)]
#[case::glyph_range_out_of_order(
    "span: 'z'..'a'\n",
    "The definition for span is invalid:\nThe range of glyphs in 'z'..'a' is out of order.\n"
)]
#[case::constraint_out_of_order(
    "sized: DIGIT{5..2}\n",
    "The definition for sized is invalid:\nThe constraint 5..2 is out of order.\n"
)]
fn test_validator_rejects_with_exact_message(#[case] source: &str, #[case] message: &str) {
    let grammar = parse_source(source).expect("the shape is syntactically fine");
    let error = validate_grammar(&grammar).expect_err("the shape is semantically bad");
    assert_eq!(error.to_string(), message);
}

#[rstest]
#[case::rule_may_reference_tokens("Thing: part\n\npart: 'p'\n")]
#[case::equal_range_endpoints("single: 'q'..'q'\n")]
#[case::forward_references("First: second\n\nsecond: third\n\nthird: 't'\n")]
#[case::self_reference("list: item list?\n\nitem: 'i'\n")]
fn test_validator_accepts(#[case] source: &str) {
    let grammar = parse_source(source).unwrap();
    assert!(validate_grammar(&grammar).is_ok());
}

// ----------------------------------------------------------------------
// Boundary shapes the parser cannot produce
// ----------------------------------------------------------------------

fn single_definition(name: &str, expression: Expression) -> Grammar {
    Grammar {
        headers: vec![],
        definitions: vec![Definition {
            comment: None,
            name: name.into(),
            expression,
        }],
    }
}

#[test]
fn test_empty_expression_is_rejected_not_formatted() {
    let grammar = single_definition("hollow", Expression::Multiline(Multiline { lines: vec![] }));
    let error = validate_grammar(&grammar).unwrap_err();
    assert_eq!(
        error.to_string(),
        "The definition for hollow is invalid:\nAn expression must have at least one alternative.\n"
    );
}

#[test]
fn test_empty_alternative_is_rejected_not_formatted() {
    let grammar = single_definition(
        "empty",
        Expression::Inline(Inline {
            alternatives: vec![Alternative { factors: vec![] }],
            note: None,
        }),
    );
    let error = validate_grammar(&grammar).unwrap_err();
    assert_eq!(
        error.to_string(),
        "The definition for empty is invalid:\nAn alternative must have at least one factor.\n"
    );
}
