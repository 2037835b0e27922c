//! Token types for the CDSN scanner
//!
//! This module defines the token kinds produced by the scanner and the
//! immutable token value passed from the scanner to the parser. A token
//! carries its own position so that diagnostics can be rendered long after
//! the surrounding scanner state is gone.

use std::fmt;

use serde::{Deserialize, Serialize};

/// All token kinds recognized by the CDSN scanner.
///
/// The scanner matches kinds in a fixed priority order (see
/// [`crate::cdsn::scanner`]); the order of the variants here is
/// alphabetical and carries no meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    Comment,
    Delimiter,
    Eof,
    Eol,
    Error,
    Glyph,
    Intrinsic,
    Literal,
    Name,
    Note,
    Number,
    Space,
    Symbol,
}

impl TokenKind {
    /// The label used when rendering a token in diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            TokenKind::Comment => "Comment",
            TokenKind::Delimiter => "Delimiter",
            TokenKind::Eof => "EOF",
            TokenKind::Eol => "EOL",
            TokenKind::Error => "Error",
            TokenKind::Glyph => "Glyph",
            TokenKind::Intrinsic => "Intrinsic",
            TokenKind::Literal => "Literal",
            TokenKind::Name => "Name",
            TokenKind::Note => "Note",
            TokenKind::Number => "Number",
            TokenKind::Space => "Space",
            TokenKind::Symbol => "Symbol",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A single scanned token.
///
/// Tokens are immutable values: once produced by the scanner they are only
/// moved between the pushback stack and the parser, never modified. The
/// `line` and `position` fields are 1-based and count characters, not
/// bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    line: usize,
    position: usize,
    kind: TokenKind,
    value: String,
}

impl Token {
    /// Creates a new token at the given 1-based line and column.
    pub fn new(line: usize, position: usize, kind: TokenKind, value: impl Into<String>) -> Self {
        debug_assert!(line >= 1, "token lines are 1-based");
        debug_assert!(position >= 1, "token positions are 1-based");
        Self {
            line,
            position,
            kind,
            value: value.into(),
        }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// True for a delimiter token with exactly this text.
    pub fn is_delimiter(&self, text: &str) -> bool {
        self.kind == TokenKind::Delimiter && self.value == text
    }

    /// True for the kinds that may open a factor.
    pub fn starts_factor(&self) -> bool {
        match self.kind {
            TokenKind::Glyph | TokenKind::Intrinsic | TokenKind::Literal => true,
            TokenKind::Name | TokenKind::Symbol => true,
            TokenKind::Delimiter => self.value == "~" || self.value == "(",
            _ => false,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Newlines inside a value (block comments) would wreck the one-line
        // diagnostic form, so they are escaped.
        let value = self.value.replace('\n', "\\n");
        write!(
            f,
            "Token [kind: {}, line: {}, position: {}]: \"{}\"",
            self.kind, self.line, self.position, value
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_display() {
        let token = Token::new(3, 8, TokenKind::Delimiter, "~");
        assert_eq!(
            token.to_string(),
            "Token [kind: Delimiter, line: 3, position: 8]: \"~\""
        );
    }

    #[test]
    fn test_token_display_escapes_newlines() {
        let token = Token::new(1, 1, TokenKind::Comment, "!>\nnotice\n<!");
        assert_eq!(
            token.to_string(),
            "Token [kind: Comment, line: 1, position: 1]: \"!>\\nnotice\\n<!\""
        );
    }

    #[test]
    fn test_starts_factor() {
        assert!(Token::new(1, 1, TokenKind::Name, "rule").starts_factor());
        assert!(Token::new(1, 1, TokenKind::Delimiter, "~").starts_factor());
        assert!(Token::new(1, 1, TokenKind::Delimiter, "(").starts_factor());
        assert!(!Token::new(1, 1, TokenKind::Delimiter, ")").starts_factor());
        assert!(!Token::new(1, 1, TokenKind::Eol, "\n").starts_factor());
    }
}
