//! Syntax-error rendering fixtures
//!
//! The parser's error text is a compatibility contract: tooling built on
//! the pipeline prints it verbatim. These tests pin the exact rendering
//! for the known-bad grammar shapes, including the structural limits on
//! inversion.

use cdsn::parse_source;

fn error_text(source: &str) -> String {
    parse_source(source)
        .expect_err("source should fail to parse")
        .to_string()
}

#[test]
fn test_double_inversion_fails_at_the_second_tilde() {
    let rendered = error_text("Bad: \"b\"\nworse: ~~CONTROL\n");
    assert_eq!(
        rendered,
        concat!(
            "An unexpected token was received by the parser: ",
            "Token [kind: Delimiter, line: 2, position: 9]: \"~\"\n",
            "\n",
            "0001: Bad: \"b\"\n",
            "0002: worse: ~~CONTROL\n",
            "              ^\n",
            "\n",
            "Was expecting one of the following grammar rules:\n",
            "  Filter: intrinsic | Glyph\n",
        )
    );
}

#[test]
fn test_inverting_a_literal_is_rejected() {
    let rendered = error_text("bad: ~\"ow\"\n");
    assert_eq!(
        rendered,
        concat!(
            "An unexpected token was received by the parser: ",
            "Token [kind: Literal, line: 1, position: 7]: \"\"ow\"\"\n",
            "\n",
            "0001: bad: ~\"ow\"\n",
            "            ^\n",
            "\n",
            "Was expecting one of the following grammar rules:\n",
            "  Filter: intrinsic | Glyph\n",
        )
    );
}

#[test]
fn test_inverting_a_reference_is_rejected() {
    let rendered = error_text("bad: ~rule\n");
    assert_eq!(
        rendered,
        concat!(
            "An unexpected token was received by the parser: ",
            "Token [kind: Name, line: 1, position: 7]: \"rule\"\n",
            "\n",
            "0001: bad: ~rule\n",
            "            ^\n",
            "\n",
            "Was expecting one of the following grammar rules:\n",
            "  Filter: intrinsic | Glyph\n",
        )
    );
}

#[test]
fn test_nested_inversion_via_parentheses_is_rejected_at_the_paren() {
    let rendered = error_text("bad: ~(Worse | ~Bad)\n");
    assert_eq!(
        rendered,
        concat!(
            "An unexpected token was received by the parser: ",
            "Token [kind: Delimiter, line: 1, position: 7]: \"(\"\n",
            "\n",
            "0001: bad: ~(Worse | ~Bad)\n",
            "            ^\n",
            "\n",
            "Was expecting one of the following grammar rules:\n",
            "  Filter: intrinsic | Glyph\n",
        )
    );
}

#[test]
fn test_missing_colon_names_the_rule_production() {
    let rendered = error_text("Broken \"text\"\n");
    assert_eq!(
        rendered,
        concat!(
            "An unexpected token was received by the parser: ",
            "Token [kind: Literal, line: 1, position: 8]: \"\"text\"\"\n",
            "\n",
            "0001: Broken \"text\"\n",
            "             ^\n",
            "\n",
            "Was expecting one of the following grammar rules:\n",
            "  Rule: Identifier \":\" Expression\n",
        )
    );
}

#[test]
fn test_lexical_error_renders_without_expected_rules() {
    let rendered = error_text("bad: #\n");
    assert_eq!(
        rendered,
        concat!(
            "An unexpected token was received by the parser: ",
            "Token [kind: Error, line: 1, position: 6]: \"#\"\n",
            "\n",
            "0001: bad: #\n",
            "           ^\n",
        )
    );
}

#[test]
fn test_stray_token_between_definitions() {
    let rendered = error_text("Good: 'a'\n\n)\n");
    assert_eq!(
        rendered,
        concat!(
            "An unexpected token was received by the parser: ",
            "Token [kind: Delimiter, line: 3, position: 1]: \")\"\n",
            "\n",
            "0002: \n",
            "0003: )\n",
            "      ^\n",
            "\n",
            "Was expecting one of the following grammar rules:\n",
            "  Definition: comment? Rule\n",
        )
    );
}

#[test]
fn test_unterminated_comment_surfaces_as_a_lexical_error() {
    let error = parse_source("!> never closed\n").unwrap_err();
    assert_eq!(error.token.value(), "!");
    assert!(error.expected.is_empty());
}
