//! Canonical formatter for CDSN grammars
//!
//! The formatter renders a validated AST back into canonical source text.
//! Canonical form is unique per tree, so for any source that was already
//! canonical, parse → validate → format reproduces the input byte for
//! byte. That round trip is the pipeline's primary correctness oracle.
//!
//! Canonical conventions:
//!     Headers render verbatim, each followed by one blank line.
//!     Definitions are separated by one blank line; a multiline body
//!     indents each line by four spaces per depth. Factors are joined by
//!     single spaces, `|` is surrounded by single spaces, and a trailing
//!     note is preceded by two spaces. Cardinality shorthands render
//!     exactly as parsed: the shorthand table here inverts the parser's,
//!     so `?`, `*`, `+`, and explicit `{m..n}` forms all survive a round
//!     trip unchanged. The document ends with one trailing newline.
//!
//! The formatter trusts its input to have passed the validator. A node
//! that is structurally impossible in a validated tree (an expression
//! with no alternatives, an alternative with no factors) is a programming
//! error and panics rather than formatting as silent empty text.

use crate::cdsn::ast::{
    Alternative, Cardinality, Definition, Element, Expression, Extent, Factor, Filter, Glyph,
    Grammar, Inline, Multiline, Note, Predicate,
};

/// Width of one indentation level.
const INDENT: &str = "    ";

/// Renders a validated grammar in canonical form.
pub fn format_grammar(grammar: &Grammar) -> String {
    let mut formatter = Formatter::new();
    formatter.emit_grammar(grammar);
    formatter.finish()
}

/// Renders a single definition in canonical form, with a trailing
/// newline. Sub-tree entry point for tooling and tests.
pub fn format_definition(definition: &Definition) -> String {
    let mut formatter = Formatter::new();
    formatter.emit_definition(definition);
    formatter.emit("\n");
    formatter.finish()
}

/// A depth-tracking recursive writer. The depth increases on entering a
/// multiline body and decreases on exit; newlines are emitted with
/// depth-proportional indentation.
struct Formatter {
    depth: usize,
    buffer: String,
}

impl Formatter {
    fn new() -> Self {
        Self {
            depth: 0,
            buffer: String::new(),
        }
    }

    fn finish(self) -> String {
        self.buffer
    }

    fn emit(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    /// A newline followed by the current indentation.
    fn emit_newline(&mut self) {
        self.buffer.push('\n');
        for _ in 0..self.depth {
            self.buffer.push_str(INDENT);
        }
    }

    fn emit_grammar(&mut self, grammar: &Grammar) {
        for header in &grammar.headers {
            self.emit(&header.text);
            self.emit("\n\n");
        }
        for (index, definition) in grammar.definitions.iter().enumerate() {
            if index > 0 {
                self.emit("\n");
            }
            self.emit_definition(definition);
            self.emit("\n");
        }
    }

    fn emit_definition(&mut self, definition: &Definition) {
        if let Some(comment) = &definition.comment {
            self.emit(&comment.text);
            self.emit("\n");
        }
        self.emit(&definition.name);
        self.emit(":");
        match &definition.expression {
            Expression::Inline(inline) => {
                self.emit(" ");
                self.emit_inline(inline);
            }
            Expression::Multiline(multiline) => self.emit_multiline(multiline),
        }
    }

    fn emit_inline(&mut self, inline: &Inline) {
        assert!(
            !inline.alternatives.is_empty(),
            "an inline expression reached the formatter with no alternatives"
        );
        for (index, alternative) in inline.alternatives.iter().enumerate() {
            if index > 0 {
                self.emit(" | ");
            }
            self.emit_alternative(alternative);
        }
        if let Some(note) = &inline.note {
            self.emit_note(note);
        }
    }

    fn emit_multiline(&mut self, multiline: &Multiline) {
        assert!(
            !multiline.lines.is_empty(),
            "a multiline expression reached the formatter with no lines"
        );
        self.depth += 1;
        for line in &multiline.lines {
            self.emit_newline();
            self.emit_alternative(&line.alternative);
            if let Some(note) = &line.note {
                self.emit_note(note);
            }
        }
        self.depth -= 1;
    }

    fn emit_alternative(&mut self, alternative: &Alternative) {
        assert!(
            !alternative.factors.is_empty(),
            "an alternative reached the formatter with no factors"
        );
        for (index, factor) in alternative.factors.iter().enumerate() {
            if index > 0 {
                self.emit(" ");
            }
            self.emit_factor(factor);
        }
    }

    fn emit_factor(&mut self, factor: &Factor) {
        match &factor.predicate {
            Predicate::Element(element) => self.emit_element(element),
            Predicate::Inversion(filter) => {
                self.emit("~");
                self.emit_filter(filter);
            }
        }
        if let Some(cardinality) = &factor.cardinality {
            self.emit_cardinality(cardinality);
        }
    }

    fn emit_element(&mut self, element: &Element) {
        match element {
            Element::Intrinsic(intrinsic) => self.emit(intrinsic.as_str()),
            Element::Glyph(glyph) => self.emit_glyph(glyph),
            Element::Literal(text) => self.emit(text),
            Element::Reference(name) => self.emit(name),
            Element::Precedence(inline) => {
                self.emit("(");
                self.emit_inline(inline);
                self.emit(")");
            }
        }
    }

    fn emit_filter(&mut self, filter: &Filter) {
        match filter {
            Filter::Intrinsic(intrinsic) => self.emit(intrinsic.as_str()),
            Filter::Glyph(glyph) => self.emit_glyph(glyph),
        }
    }

    fn emit_glyph(&mut self, glyph: &Glyph) {
        self.emit(&glyph.first);
        if let Some(last) = &glyph.last {
            self.emit("..");
            self.emit(last);
        }
    }

    fn emit_cardinality(&mut self, cardinality: &Cardinality) {
        match cardinality {
            Cardinality::Optional => self.emit("?"),
            Cardinality::ZeroOrMore => self.emit("*"),
            Cardinality::OneOrMore => self.emit("+"),
            Cardinality::Constrained(constraint) => {
                self.emit("{");
                self.emit(&constraint.first);
                match &constraint.extent {
                    Extent::Exact => {}
                    Extent::Open => self.emit(".."),
                    Extent::Limit(last) => {
                        self.emit("..");
                        self.emit(last);
                    }
                }
                self.emit("}");
            }
        }
    }

    fn emit_note(&mut self, note: &Note) {
        self.emit("  ");
        self.emit(&note.text);
    }
}
