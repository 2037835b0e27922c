//! Error types for the CDSN pipeline
//!
//! Errors are modeled as structured values; the legacy one-string renderings
//! that callers and tests match on are produced by the `Display`
//! implementations, so the formats live in exactly one place.
//!
//! There are two families. A [`ParseError`] is fatal to a parse and carries
//! the offending token, an excerpt of the surrounding source, and the
//! grammar rules that were expected. A [`GrammarError`] reports a semantic
//! violation found by the validator in an otherwise well-formed tree.

use std::fmt;

use thiserror::Error;

use crate::cdsn::token::Token;

// ============================================================================
// Syntax errors
// ============================================================================

/// A grammar rule the parser would have accepted at the failure point,
/// paired with its formal right-hand side for the diagnostic rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedRule {
    pub name: &'static str,
    pub definition: &'static str,
}

/// The source lines surrounding a failure, captured at raise time so the
/// error stays renderable after the source text is gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceExcerpt {
    lines: Vec<(usize, String)>,
    caret_line: usize,
    caret_position: usize,
}

impl SourceExcerpt {
    /// Captures the line before, the line of, and the line after the given
    /// 1-based location. A location just past the final newline (an EOF
    /// token) falls on an empty line.
    pub fn around(source: &str, line: usize, position: usize) -> Self {
        let all: Vec<&str> = source.lines().collect();
        let first = line.saturating_sub(1).max(1);
        let last = (line + 1).min(all.len().max(line));
        let mut lines = Vec::new();
        for number in first..=last {
            let text = all.get(number - 1).copied().unwrap_or("");
            lines.push((number, text.to_string()));
        }
        Self {
            lines,
            caret_line: line,
            caret_position: position,
        }
    }
}

impl fmt::Display for SourceExcerpt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (number, text) in &self.lines {
            writeln!(f, "{:04}: {}", number, text)?;
            if *number == self.caret_line {
                // The "0000: " prefix is six characters wide.
                writeln!(f, "{}^", " ".repeat(6 + self.caret_position - 1))?;
            }
        }
        Ok(())
    }
}

/// A fatal syntax error: a required production failed to match, or the
/// scanner reported a lexical error. The rendering is a compatibility
/// contract; tests assert on the exact text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub token: Token,
    pub excerpt: SourceExcerpt,
    pub expected: Vec<ExpectedRule>,
}

impl ParseError {
    pub fn new(token: Token, excerpt: SourceExcerpt, expected: Vec<ExpectedRule>) -> Self {
        Self {
            token,
            excerpt,
            expected,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "An unexpected token was received by the parser: {}",
            self.token
        )?;
        writeln!(f)?;
        write!(f, "{}", self.excerpt)?;
        if !self.expected.is_empty() {
            writeln!(f)?;
            writeln!(f, "Was expecting one of the following grammar rules:")?;
            for rule in &self.expected {
                writeln!(f, "  {}: {}", rule.name, rule.definition)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

// ============================================================================
// Semantic errors
// ============================================================================

/// A semantic violation found by the validator. Fail-fast: the first
/// violation aborts the walk.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    /// A definition body breaks one of the grammar-consistency rules.
    #[error("The definition for {name} is invalid:\n{reason}\n")]
    InvalidDefinition { name: String, reason: String },

    /// A name is referenced somewhere in the grammar but never defined.
    #[error("The grammar is missing a definition for the symbol: {symbol}")]
    MissingDefinition { symbol: String },
}

impl GrammarError {
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        GrammarError::InvalidDefinition {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdsn::token::TokenKind;

    #[test]
    fn test_excerpt_renders_caret_under_column() {
        let source = "first\nsecond line\nthird\n";
        let excerpt = SourceExcerpt::around(source, 2, 8);
        assert_eq!(
            excerpt.to_string(),
            "0001: first\n0002: second line\n             ^\n0003: third\n"
        );
    }

    #[test]
    fn test_excerpt_at_first_and_last_lines() {
        let source = "only\n";
        let excerpt = SourceExcerpt::around(source, 1, 1);
        assert_eq!(excerpt.to_string(), "0001: only\n      ^\n");
    }

    #[test]
    fn test_excerpt_past_final_newline() {
        let source = "alpha\n";
        let excerpt = SourceExcerpt::around(source, 2, 1);
        assert_eq!(excerpt.to_string(), "0001: alpha\n0002: \n      ^\n");
    }

    #[test]
    fn test_parse_error_rendering() {
        let source = "Bad: \"b\"\nworse: ~~CONTROL\n";
        let token = Token::new(2, 9, TokenKind::Delimiter, "~");
        let excerpt = SourceExcerpt::around(source, 2, 9);
        let error = ParseError::new(
            token,
            excerpt,
            vec![ExpectedRule {
                name: "Filter",
                definition: "intrinsic | Glyph",
            }],
        );
        assert_eq!(
            error.to_string(),
            "An unexpected token was received by the parser: \
             Token [kind: Delimiter, line: 2, position: 9]: \"~\"\n\
             \n\
             0001: Bad: \"b\"\n\
             0002: worse: ~~CONTROL\n\
             \x20             ^\n\
             \n\
             Was expecting one of the following grammar rules:\n\
             \x20 Filter: intrinsic | Glyph\n"
        );
    }

    #[test]
    fn test_grammar_error_renderings() {
        let duplicate = GrammarError::invalid("bad", "The name bad is defined more than once.");
        assert_eq!(
            duplicate.to_string(),
            "The definition for bad is invalid:\nThe name bad is defined more than once.\n"
        );
        let missing = GrammarError::MissingDefinition {
            symbol: "rule".into(),
        };
        assert_eq!(
            missing.to_string(),
            "The grammar is missing a definition for the symbol: rule"
        );
    }
}
