//! Scanner for CDSN source text
//!
//! The scanner converts a source string into a terminated stream of
//! tokens. Recognition is driven by one ordered table of regular
//! expressions: at each cursor position the table is tried top to bottom
//! and the first kind that matches wins. The order encodes priority, not
//! longest-match (delimiters are tried before names, intrinsics before
//! symbols), so the table order is part of the language definition.
//!
//! Streaming model:
//!     The scanner runs as a background producer publishing tokens through
//!     a bounded channel; the parser consumes from the other end. A full
//!     channel blocks the producer, which bounds memory on large inputs.
//!     The channel closes after the terminal EOF token, or after the single
//!     error token produced when no pattern matches.
//!
//! Failure model:
//!     Lexical failure is data, not an error value. When nothing matches,
//!     the scanner emits one `Error` token covering a single rune and
//!     stops; the parser turns that token into a raised syntax failure.

use std::collections::HashMap;
use std::thread;

use crossbeam_channel::{bounded, Receiver};
use log::{debug, trace};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::cdsn::token::{Token, TokenKind};

/// Capacity of the token channel between the scanner and the parser.
const CHANNEL_CAPACITY: usize = 16;

// ============================================================================
// Token patterns
// ============================================================================

// The patterns below are shared by the streaming scanner (anchored at the
// cursor) and by `match_token` (anchored at both ends). Capture groups
// expose the interesting sub-matches: the body of a comment, the text
// inside quotes.

const COMMENT_PATTERN: &str = r"(?s:!>(.*?)<!)";
const NOTE_PATTERN: &str = r"![^>\n][^\n]*";
const DELIMITER_PATTERN: &str = r"\.\.|[~?*+:|(){}]";
const INTRINSIC_PATTERN: &str = r"(?:ANY|CONTROL|DIGIT|EOF|EOL|ESCAPE|LOWER|UPPER)\b";
const SYMBOL_PATTERN: &str = r"[A-Z][A-Za-z0-9]*";
const NAME_PATTERN: &str = r"[a-z][A-Za-z0-9]*";
const NUMBER_PATTERN: &str = r"[0-9]+";
const LITERAL_PATTERN: &str = r#""((?:[^"\\\n]|\\[^\n])+)""#;
const GLYPH_PATTERN: &str = r"'((?:[^'\\\n]|\\[^\n]))'";
const EOL_PATTERN: &str = r"\n";
const SPACE_PATTERN: &str = r"[ \t\r]+";

/// The recognition table in priority order. First match wins.
const TOKEN_TABLE: &[(TokenKind, &str)] = &[
    (TokenKind::Comment, COMMENT_PATTERN),
    (TokenKind::Note, NOTE_PATTERN),
    (TokenKind::Delimiter, DELIMITER_PATTERN),
    (TokenKind::Intrinsic, INTRINSIC_PATTERN),
    (TokenKind::Symbol, SYMBOL_PATTERN),
    (TokenKind::Name, NAME_PATTERN),
    (TokenKind::Number, NUMBER_PATTERN),
    (TokenKind::Literal, LITERAL_PATTERN),
    (TokenKind::Glyph, GLYPH_PATTERN),
    (TokenKind::Eol, EOL_PATTERN),
    (TokenKind::Space, SPACE_PATTERN),
];

/// Cursor-anchored patterns for streaming recognition.
static SCAN_PATTERNS: Lazy<Vec<(TokenKind, Regex)>> = Lazy::new(|| {
    TOKEN_TABLE
        .iter()
        .map(|(kind, pattern)| {
            let anchored = format!("^(?:{})", pattern);
            let regex = Regex::new(&anchored)
                .unwrap_or_else(|error| panic!("invalid token pattern for {:?}: {}", kind, error));
            (*kind, regex)
        })
        .collect()
});

/// Fully anchored patterns for out-of-stream matching.
static MATCH_PATTERNS: Lazy<HashMap<TokenKind, Regex>> = Lazy::new(|| {
    TOKEN_TABLE
        .iter()
        .map(|(kind, pattern)| {
            let anchored = format!("^(?:{})$", pattern);
            let regex = Regex::new(&anchored)
                .unwrap_or_else(|error| panic!("invalid token pattern for {:?}: {}", kind, error));
            (*kind, regex)
        })
        .collect()
});

// ============================================================================
// Scanner
// ============================================================================

/// The CDSN scanner. All entry points are associated functions; each scan
/// owns its state, so scans never interfere with one another.
pub struct Scanner;

impl Scanner {
    /// Starts scanning in a background thread and returns the consuming
    /// end of the token channel. Does not block the caller; the producer
    /// blocks when the channel is full and stops early if the receiver is
    /// dropped.
    pub fn scan(source: &str) -> Receiver<Token> {
        let (sender, receiver) = bounded(CHANNEL_CAPACITY);
        let source = source.to_string();
        thread::spawn(move || {
            debug!("scanning {} bytes of grammar source", source.len());
            scan_into(&source, &mut |token| sender.send(token).is_ok());
        });
        receiver
    }

    /// Scans a complete source synchronously. Convenience wrapper used by
    /// tests and tooling; the token sequence is identical to [`scan`].
    ///
    /// [`scan`]: Scanner::scan
    pub fn scan_text(source: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        scan_into(source, &mut |token| {
            tokens.push(token);
            true
        });
        tokens
    }

    /// Matches one token kind against an arbitrary text span, anchored at
    /// both ends. On success returns the matched groups: index 0 is the
    /// whole text, later entries are the pattern's capture groups. Used by
    /// the validator to re-check token-shaped field values outside of any
    /// stream.
    pub fn match_token(kind: TokenKind, text: &str) -> Option<Vec<String>> {
        let regex = MATCH_PATTERNS.get(&kind)?;
        let captures = regex.captures(text)?;
        let groups = captures
            .iter()
            .map(|group| group.map(|m| m.as_str().to_string()).unwrap_or_default())
            .collect();
        Some(groups)
    }
}

/// The scanning loop. Emits tokens through `emit` until the source is
/// exhausted (terminal EOF token) or nothing matches (single error token).
/// `emit` returning false means the consumer is gone; scanning stops.
fn scan_into(source: &str, emit: &mut dyn FnMut(Token) -> bool) {
    let mut cursor = 0;
    let mut line = 1;
    let mut position = 1;

    'scan: while cursor < source.len() {
        let rest = &source[cursor..];
        for (kind, regex) in SCAN_PATTERNS.iter() {
            let Some(matched) = regex.find(rest) else {
                continue;
            };
            let text = matched.as_str();
            trace!("matched {} at {}:{}", kind, line, position);
            if *kind != TokenKind::Space {
                let token = Token::new(line, position, *kind, text);
                if !emit(token) {
                    return;
                }
            }
            advance(text, &mut line, &mut position);
            cursor += text.len();
            continue 'scan;
        }

        // Nothing matched: one error token covering a single rune, then
        // scanning stops without a terminal EOF.
        let Some(rune) = rest.chars().next() else {
            break;
        };
        debug!("no token pattern matches at {}:{}", line, position);
        emit(Token::new(line, position, TokenKind::Error, rune.to_string()));
        return;
    }

    emit(Token::new(line, position, TokenKind::Eof, ""));
}

/// Advances the line and column bookkeeping across matched text, counting
/// embedded newlines in multi-line matches such as block comments.
fn advance(text: &str, line: &mut usize, position: &mut usize) {
    for c in text.chars() {
        if c == '\n' {
            *line += 1;
            *position = 1;
        } else {
            *position += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|token| token.kind()).collect()
    }

    #[test]
    fn test_empty_input_yields_single_eof() {
        let tokens = Scanner::scan_text("");
        assert_eq!(kinds(&tokens), vec![TokenKind::Eof]);
        assert_eq!(tokens[0].line(), 1);
        assert_eq!(tokens[0].position(), 1);
    }

    #[test]
    fn test_priority_order_prefers_intrinsics_over_symbols() {
        let tokens = Scanner::scan_text("ANY ANYTHING");
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Intrinsic, TokenKind::Symbol, TokenKind::Eof]
        );
        assert_eq!(tokens[1].value(), "ANYTHING");
    }

    #[test]
    fn test_range_delimiter_splits_numbers() {
        let tokens = Scanner::scan_text("{1..12}");
        let values: Vec<&str> = tokens.iter().map(|token| token.value()).collect();
        assert_eq!(values, vec!["{", "1", "..", "12", "}", ""]);
    }

    #[test]
    fn test_spaces_advance_but_are_not_emitted() {
        let tokens = Scanner::scan_text("a   b");
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Name, TokenKind::Name, TokenKind::Eof]
        );
        assert_eq!(tokens[1].position(), 5);
    }

    #[test]
    fn test_comment_spans_lines_and_keeps_bookkeeping() {
        let tokens = Scanner::scan_text("!>\nnotice\n<!\nRule: a\n");
        assert_eq!(tokens[0].kind(), TokenKind::Comment);
        assert_eq!(tokens[0].value(), "!>\nnotice\n<!");
        // The EOL after the comment sits on the comment's closing line.
        assert_eq!(tokens[1].kind(), TokenKind::Eol);
        assert_eq!(tokens[1].line(), 3);
        assert_eq!(tokens[1].position(), 3);
        // The rule name starts the following line.
        assert_eq!(tokens[2].kind(), TokenKind::Symbol);
        assert_eq!(tokens[2].line(), 4);
        assert_eq!(tokens[2].position(), 1);
    }

    #[test]
    fn test_unterminated_comment_is_an_error_not_a_note() {
        let tokens = Scanner::scan_text("!> never closed");
        assert_eq!(kinds(&tokens), vec![TokenKind::Error]);
        assert_eq!(tokens[0].value(), "!");
    }

    #[test]
    fn test_error_token_covers_one_rune_and_stops_scanning() {
        let tokens = Scanner::scan_text("a § b");
        assert_eq!(kinds(&tokens), vec![TokenKind::Name, TokenKind::Error]);
        assert_eq!(tokens[1].value(), "§");
        assert_eq!(tokens[1].position(), 3);
    }

    #[test]
    fn test_note_requires_text() {
        let tokens = Scanner::scan_text("a  ! stop here\n");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Name,
                TokenKind::Note,
                TokenKind::Eol,
                TokenKind::Eof
            ]
        );
        assert_eq!(tokens[1].value(), "! stop here");
    }

    #[test]
    fn test_streaming_matches_synchronous_scan() {
        let source = "Grammar: alpha+ | \"beta\"? 'x'..'z'\n";
        let streamed: Vec<Token> = Scanner::scan(source).iter().collect();
        assert_eq!(streamed, Scanner::scan_text(source));
    }

    #[test]
    fn test_match_token_is_fully_anchored() {
        assert!(Scanner::match_token(TokenKind::Name, "lowercase").is_some());
        assert!(Scanner::match_token(TokenKind::Name, "lowercase extra").is_none());
        assert!(Scanner::match_token(TokenKind::Name, "Uppercase").is_none());
        assert!(Scanner::match_token(TokenKind::Number, "042").is_some());
    }

    #[test]
    fn test_match_token_exposes_sub_matches() {
        let groups = Scanner::match_token(TokenKind::Literal, "\"text\"").unwrap();
        assert_eq!(groups, vec!["\"text\"".to_string(), "text".to_string()]);
        let groups = Scanner::match_token(TokenKind::Comment, "!> notice <!").unwrap();
        assert_eq!(groups[1], " notice ");
    }
}
