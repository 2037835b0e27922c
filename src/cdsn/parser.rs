//! Recursive-descent parser for CDSN grammars
//!
//! The parser consumes the scanner's token stream and builds the AST, one
//! method per grammar production. Choice productions try their
//! alternatives in declaration order; an attempt that does not match puts
//! the tokens it looked at back on an explicit pushback stack, so sibling
//! attempts always see a consistent stream. The grammar is designed so
//! that one token of lookahead decides every choice point; there is no
//! unbounded backtracking.
//!
//! A required production that fails to match raises immediately with a
//! [`ParseError`] carrying the offending token, an excerpt of the
//! surrounding source with a caret at the exact column, and the formal
//! grammar rules that were expected. An `Error` token pulled from the
//! stream is converted into the same rendering on the spot. A successful
//! parse is a pure function of the input text.

use crossbeam_channel::Receiver;
use log::debug;

use crate::cdsn::ast::{
    Alternative, Cardinality, Comment, Constraint, Definition, Element, Expression, Extent,
    Factor, Filter, Glyph, Grammar, Inline, Intrinsic, Line, Multiline, Note, Predicate,
};
use crate::cdsn::error::{ParseError, SourceExcerpt};
use crate::cdsn::rules::GrammarRules;
use crate::cdsn::scanner::Scanner;
use crate::cdsn::token::{Token, TokenKind};

/// Parses a complete CDSN source text into a grammar AST, or fails with a
/// descriptive syntax error. Scanning runs concurrently in the background;
/// this call drives the consuming side to completion.
pub fn parse_source(source: &str) -> Result<Grammar, ParseError> {
    let tokens = Scanner::scan(source);
    let mut parser = Parser::new(source, tokens);
    let grammar = parser.parse_grammar()?;
    debug!(
        "parsed grammar {} with {} definitions",
        grammar.name(),
        grammar.definitions.len()
    );
    Ok(grammar)
}

struct Parser<'a> {
    source: &'a str,
    tokens: Receiver<Token>,
    pushback: Vec<Token>,
    rules: &'static GrammarRules,
    last_line: usize,
    last_position: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, tokens: Receiver<Token>) -> Self {
        Self {
            source,
            tokens,
            pushback: Vec::new(),
            rules: GrammarRules::shared(),
            last_line: 1,
            last_position: 1,
        }
    }

    // ------------------------------------------------------------------
    // Token plumbing
    // ------------------------------------------------------------------

    /// Returns the next token, draining the pushback stack before the
    /// scanner's channel. Blocks while the scanner is still producing. An
    /// `Error` token is converted into a raised syntax failure here.
    fn next_token(&mut self) -> Result<Token, ParseError> {
        let token = match self.pushback.pop() {
            Some(token) => token,
            None => match self.tokens.recv() {
                Ok(token) => token,
                // The channel only closes after the terminal token, so a
                // closed-and-drained channel means the terminal token was
                // consumed twice. Recover with a synthesized EOF.
                Err(_) => Token::new(self.last_line, self.last_position, TokenKind::Eof, ""),
            },
        };
        self.last_line = token.line();
        self.last_position = token.position();
        if token.kind() == TokenKind::Error {
            return Err(self.lexical_error(token));
        }
        Ok(token)
    }

    /// Pushes a token back; it will be the very next token returned.
    fn put_back(&mut self, token: Token) {
        self.pushback.push(token);
    }

    /// Consumes end-of-line tokens up to the next significant token.
    fn skip_eols(&mut self) -> Result<(), ParseError> {
        loop {
            let token = self.next_token()?;
            if token.kind() != TokenKind::Eol {
                self.put_back(token);
                return Ok(());
            }
        }
    }

    fn syntax_error(&self, token: Token, expected: &[&'static str]) -> ParseError {
        let excerpt = SourceExcerpt::around(self.source, token.line(), token.position());
        ParseError::new(token, excerpt, self.rules.expected_all(expected))
    }

    fn lexical_error(&self, token: Token) -> ParseError {
        let excerpt = SourceExcerpt::around(self.source, token.line(), token.position());
        ParseError::new(token, excerpt, Vec::new())
    }

    // ------------------------------------------------------------------
    // Productions
    // ------------------------------------------------------------------

    /// Grammar: Header* Definition+ eof
    fn parse_grammar(&mut self) -> Result<Grammar, ParseError> {
        let mut headers = Vec::new();
        let mut definitions = Vec::new();
        let mut pending: Option<Comment> = None;

        self.skip_eols()?;
        loop {
            let token = self.next_token()?;
            match token.kind() {
                TokenKind::Comment => {
                    // A comment followed by another comment is a header no
                    // matter what ends up following the second one.
                    if let Some(header) = pending.take() {
                        headers.push(header);
                    }
                    pending = self.classify_comment(token, &mut headers)?;
                }
                TokenKind::Name | TokenKind::Symbol => {
                    let definition = self.parse_rule(pending.take(), token)?;
                    definitions.push(definition);
                    self.skip_eols()?;
                }
                TokenKind::Eof => {
                    if definitions.is_empty() {
                        return Err(self.syntax_error(token, &["Definition"]));
                    }
                    if let Some(header) = pending.take() {
                        headers.push(header);
                    }
                    self.put_back(token);
                    break;
                }
                _ => return Err(self.syntax_error(token, &["Definition"])),
            }
        }

        // The root production requires a terminal EOF after trailing
        // end-of-line tokens.
        self.skip_eols()?;
        let token = self.next_token()?;
        if token.kind() != TokenKind::Eof {
            return Err(self.syntax_error(token, &["Grammar"]));
        }
        Ok(Grammar::new(headers, definitions))
    }

    /// Decides whether a comment is a header or the leading comment of the
    /// next definition: a blank line (or end of input) after the comment
    /// makes it a header; a definition on the very next line claims it.
    fn classify_comment(
        &mut self,
        token: Token,
        headers: &mut Vec<Comment>,
    ) -> Result<Option<Comment>, ParseError> {
        let comment = Comment::new(token.value());
        let next = self.next_token()?;
        match next.kind() {
            TokenKind::Eol => {
                let after = self.next_token()?;
                match after.kind() {
                    TokenKind::Eol | TokenKind::Eof => {
                        self.put_back(after);
                        headers.push(comment);
                        self.skip_eols()?;
                        Ok(None)
                    }
                    _ => {
                        self.put_back(after);
                        Ok(Some(comment))
                    }
                }
            }
            TokenKind::Eof => {
                self.put_back(next);
                headers.push(comment);
                Ok(None)
            }
            _ => Err(self.syntax_error(next, &["Header", "Definition"])),
        }
    }

    /// Rule: Identifier ":" Expression
    fn parse_rule(
        &mut self,
        comment: Option<Comment>,
        name: Token,
    ) -> Result<Definition, ParseError> {
        let colon = self.next_token()?;
        if !colon.is_delimiter(":") {
            return Err(self.syntax_error(colon, &["Rule"]));
        }
        let expression = self.parse_expression()?;
        Ok(Definition::new(comment, name.value(), expression))
    }

    /// Expression: Multiline | Inline
    ///
    /// An end-of-line directly after the `:` selects the multiline form.
    fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        let token = self.next_token()?;
        let multiline = token.kind() == TokenKind::Eol;
        self.put_back(token);
        if multiline {
            Ok(Expression::Multiline(self.parse_multiline()?))
        } else {
            Ok(Expression::Inline(self.parse_inline()?))
        }
    }

    /// Multiline: Line+ where Line: eol Alternative note?
    ///
    /// The body ends at a blank line or at the end of input; the
    /// terminating end-of-line is pushed back for the grammar loop.
    fn parse_multiline(&mut self) -> Result<Multiline, ParseError> {
        let mut lines = Vec::new();
        loop {
            let eol = self.next_token()?;
            if eol.kind() != TokenKind::Eol {
                self.put_back(eol);
                break;
            }
            let next = self.next_token()?;
            if matches!(next.kind(), TokenKind::Eol | TokenKind::Eof) {
                self.put_back(next);
                self.put_back(eol);
                break;
            }
            self.put_back(next);
            let alternative = self.require_alternative(&["Line"])?;
            let note = self.parse_note()?;
            lines.push(Line { alternative, note });
        }
        if lines.is_empty() {
            let token = self.next_token()?;
            return Err(self.syntax_error(token, &["Expression"]));
        }
        Ok(Multiline::new(lines))
    }

    /// Inline: Alternative ("|" Alternative)* note?
    fn parse_inline(&mut self) -> Result<Inline, ParseError> {
        let mut alternatives = vec![self.require_alternative(&["Inline"])?];
        loop {
            let token = self.next_token()?;
            if token.is_delimiter("|") {
                alternatives.push(self.require_alternative(&["Alternative"])?);
            } else {
                self.put_back(token);
                break;
            }
        }
        let note = self.parse_note()?;
        Ok(Inline::new(alternatives, note))
    }

    /// Alternative: Factor+ (or no match at all, with the stream intact).
    fn parse_alternative(&mut self) -> Result<Option<Alternative>, ParseError> {
        let mut factors = Vec::new();
        while let Some(factor) = self.parse_factor()? {
            factors.push(factor);
        }
        if factors.is_empty() {
            return Ok(None);
        }
        Ok(Some(Alternative::new(factors)))
    }

    fn require_alternative(
        &mut self,
        expected: &[&'static str],
    ) -> Result<Alternative, ParseError> {
        match self.parse_alternative()? {
            Some(alternative) => Ok(alternative),
            None => {
                let token = self.next_token()?;
                Err(self.syntax_error(token, expected))
            }
        }
    }

    /// Factor: Predicate Cardinality?
    fn parse_factor(&mut self) -> Result<Option<Factor>, ParseError> {
        let token = self.next_token()?;
        if !token.starts_factor() {
            self.put_back(token);
            return Ok(None);
        }
        let predicate = if token.is_delimiter("~") {
            Predicate::Inversion(self.parse_filter()?)
        } else {
            Predicate::Element(self.parse_element(token)?)
        };
        let cardinality = self.parse_cardinality()?;
        Ok(Some(Factor {
            predicate,
            cardinality,
        }))
    }

    /// Filter: intrinsic | Glyph, the only things an inversion accepts.
    fn parse_filter(&mut self) -> Result<Filter, ParseError> {
        let token = self.next_token()?;
        match token.kind() {
            TokenKind::Intrinsic => match Intrinsic::from_keyword(token.value()) {
                Some(intrinsic) => Ok(Filter::Intrinsic(intrinsic)),
                None => Err(self.syntax_error(token, &["Filter"])),
            },
            TokenKind::Glyph => Ok(Filter::Glyph(self.parse_glyph(token)?)),
            _ => Err(self.syntax_error(token, &["Filter"])),
        }
    }

    /// Element: intrinsic | Glyph | literal | Reference | Precedence
    fn parse_element(&mut self, first: Token) -> Result<Element, ParseError> {
        match first.kind() {
            TokenKind::Intrinsic => match Intrinsic::from_keyword(first.value()) {
                Some(intrinsic) => Ok(Element::Intrinsic(intrinsic)),
                None => Err(self.syntax_error(first, &["Element"])),
            },
            TokenKind::Glyph => Ok(Element::Glyph(self.parse_glyph(first)?)),
            TokenKind::Literal => Ok(Element::Literal(first.value().to_string())),
            TokenKind::Name | TokenKind::Symbol => {
                Ok(Element::Reference(first.value().to_string()))
            }
            TokenKind::Delimiter if first.value() == "(" => {
                let inline = self.parse_inline()?;
                let close = self.next_token()?;
                if !close.is_delimiter(")") {
                    return Err(self.syntax_error(close, &["Precedence"]));
                }
                Ok(Element::Precedence(inline))
            }
            _ => Err(self.syntax_error(first, &["Element"])),
        }
    }

    /// Glyph: glyph (".." glyph)?
    fn parse_glyph(&mut self, first: Token) -> Result<Glyph, ParseError> {
        let token = self.next_token()?;
        if token.is_delimiter("..") {
            let last = self.next_token()?;
            if last.kind() != TokenKind::Glyph {
                return Err(self.syntax_error(last, &["Glyph"]));
            }
            Ok(Glyph::new(first.value(), Some(last.value().to_string())))
        } else {
            self.put_back(token);
            Ok(Glyph::new(first.value(), None))
        }
    }

    /// Cardinality: "?" | "*" | "+" | Constraint
    fn parse_cardinality(&mut self) -> Result<Option<Cardinality>, ParseError> {
        let token = self.next_token()?;
        if token.is_delimiter("?") {
            return Ok(Some(Cardinality::Optional));
        }
        if token.is_delimiter("*") {
            return Ok(Some(Cardinality::ZeroOrMore));
        }
        if token.is_delimiter("+") {
            return Ok(Some(Cardinality::OneOrMore));
        }
        if token.is_delimiter("{") {
            return Ok(Some(self.parse_constraint()?));
        }
        self.put_back(token);
        Ok(None)
    }

    /// Constraint: "{" number (".." number?)? "}", with the "{" already
    /// consumed by the caller.
    fn parse_constraint(&mut self) -> Result<Cardinality, ParseError> {
        let number = self.next_token()?;
        if number.kind() != TokenKind::Number {
            return Err(self.syntax_error(number, &["Constraint"]));
        }
        let mut extent = Extent::Exact;
        let mut next = self.next_token()?;
        if next.is_delimiter("..") {
            next = self.next_token()?;
            if next.kind() == TokenKind::Number {
                extent = Extent::Limit(next.value().to_string());
                next = self.next_token()?;
            } else {
                extent = Extent::Open;
            }
        }
        if !next.is_delimiter("}") {
            return Err(self.syntax_error(next, &["Constraint"]));
        }
        Ok(Cardinality::Constrained(Constraint::new(
            number.value(),
            extent,
        )))
    }

    /// An optional trailing free-text note.
    fn parse_note(&mut self) -> Result<Option<Note>, ParseError> {
        let token = self.next_token()?;
        if token.kind() == TokenKind::Note {
            return Ok(Some(Note::new(token.value())));
        }
        self.put_back(token);
        Ok(None)
    }
}
