//! AST node types for CDSN grammars
//!
//! This module defines the tree produced by the parser and consumed by the
//! validator, the formatter, and the analyzer. Nodes are plain data: they
//! are created once during a parse, hold no back-references to their
//! parents, and are never modified afterward. Ambient context (the
//! enclosing definition, inversion state, nesting depth) is carried by the
//! walking code, not stored in the tree.
//!
//! Sum-typed positions are real enums. A predicate is an `Element` or an
//! `Inversion`, never a bag of optional fields, so "no variant populated"
//! is unrepresentable and the walkers dispatch with ordinary `match`.
//!
//! Textual fields (`Glyph`, literals, notes, comments) keep their source
//! text verbatim, quotes and escapes included. The formatter re-emits them
//! untouched, which is what makes the canonical round trip byte-exact; the
//! helpers below decode them where a decoded value is needed.

use serde::{Deserialize, Serialize};

// ============================================================================
// Traits
// ============================================================================

/// Common interface for all AST nodes.
pub trait AstNode {
    /// A stable label for the node kind, used in traces and test output.
    fn node_type(&self) -> &'static str;
}

// ============================================================================
// Root
// ============================================================================

/// The root node: an ordered sequence of header comments followed by an
/// ordered sequence of definitions.
///
/// By convention the first definition's name is the grammar's own name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grammar {
    pub headers: Vec<Comment>,
    pub definitions: Vec<Definition>,
}

impl Grammar {
    pub fn new(headers: Vec<Comment>, definitions: Vec<Definition>) -> Self {
        debug_assert!(
            !definitions.is_empty(),
            "a grammar must define at least one rule"
        );
        Self {
            headers,
            definitions,
        }
    }

    /// The grammar's own name: the first definition's name.
    pub fn name(&self) -> &str {
        &self.definitions[0].name
    }
}

/// A block comment, stored verbatim including the `!>` and `<!` markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
}

impl Comment {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

// ============================================================================
// Definitions
// ============================================================================

/// One named definition: an optional leading comment, a name, and a body.
///
/// The case of the first character of the name signals the kind: an
/// uppercase name defines a syntax rule, a lowercase name defines a lexical
/// token pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    pub comment: Option<Comment>,
    pub name: String,
    pub expression: Expression,
}

impl Definition {
    pub fn new(comment: Option<Comment>, name: impl Into<String>, expression: Expression) -> Self {
        let name = name.into();
        debug_assert!(!name.is_empty(), "a definition requires a name");
        Self {
            comment,
            name,
            expression,
        }
    }

    /// True when this definition is a lexical token pattern (lowercase name).
    pub fn is_token(&self) -> bool {
        self.name.starts_with(|c: char| c.is_ascii_lowercase())
    }
}

// ============================================================================
// Expressions
// ============================================================================

/// The body of a definition: either a single-line form with `|`-separated
/// alternatives, or a multiline form with one alternative per line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    Inline(Inline),
    Multiline(Multiline),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inline {
    pub alternatives: Vec<Alternative>,
    pub note: Option<Note>,
}

impl Inline {
    pub fn new(alternatives: Vec<Alternative>, note: Option<Note>) -> Self {
        debug_assert!(
            !alternatives.is_empty(),
            "an inline expression requires at least one alternative"
        );
        Self { alternatives, note }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Multiline {
    pub lines: Vec<Line>,
}

impl Multiline {
    pub fn new(lines: Vec<Line>) -> Self {
        debug_assert!(
            !lines.is_empty(),
            "a multiline expression requires at least one line"
        );
        Self { lines }
    }
}

/// One line of a multiline body: a single alternative with an optional
/// trailing note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub alternative: Alternative,
    pub note: Option<Note>,
}

/// An ordered, non-empty sequence of factors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub factors: Vec<Factor>,
}

impl Alternative {
    pub fn new(factors: Vec<Factor>) -> Self {
        debug_assert!(
            !factors.is_empty(),
            "an alternative requires at least one factor"
        );
        Self { factors }
    }
}

/// A free-text trailing note, stored verbatim including the leading `!`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub text: String,
}

impl Note {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

// ============================================================================
// Factors and predicates
// ============================================================================

/// A predicate with an optional repetition constraint. A missing
/// cardinality means exactly one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    pub predicate: Predicate,
    pub cardinality: Option<Cardinality>,
}

/// A matchable unit, possibly inverted.
///
/// Inversion is structurally restricted: only an intrinsic character class
/// or a glyph range can be inverted, so a nested or reference-carrying
/// inversion cannot be represented.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    Element(Element),
    Inversion(Filter),
}

/// The operand of an inversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    Intrinsic(Intrinsic),
    Glyph(Glyph),
}

/// A positive matchable unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Element {
    Intrinsic(Intrinsic),
    Glyph(Glyph),
    /// A double-quoted literal string, stored verbatim with its quotes.
    Literal(String),
    /// A reference to another definition by name.
    Reference(String),
    /// A parenthesized inline sub-expression.
    Precedence(Inline),
}

/// The built-in character classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intrinsic {
    Any,
    Control,
    Digit,
    Eof,
    Eol,
    Escape,
    Lower,
    Upper,
}

impl Intrinsic {
    /// The keyword as it appears in grammar source.
    pub fn as_str(&self) -> &'static str {
        match self {
            Intrinsic::Any => "ANY",
            Intrinsic::Control => "CONTROL",
            Intrinsic::Digit => "DIGIT",
            Intrinsic::Eof => "EOF",
            Intrinsic::Eol => "EOL",
            Intrinsic::Escape => "ESCAPE",
            Intrinsic::Lower => "LOWER",
            Intrinsic::Upper => "UPPER",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "ANY" => Some(Intrinsic::Any),
            "CONTROL" => Some(Intrinsic::Control),
            "DIGIT" => Some(Intrinsic::Digit),
            "EOF" => Some(Intrinsic::Eof),
            "EOL" => Some(Intrinsic::Eol),
            "ESCAPE" => Some(Intrinsic::Escape),
            "LOWER" => Some(Intrinsic::Lower),
            "UPPER" => Some(Intrinsic::Upper),
            _ => None,
        }
    }
}

/// A single-quoted rune, or a range of runes when `last` is present.
///
/// Both endpoints are stored verbatim with their quotes. Whether the range
/// is properly ordered is a validator concern, not a construction check, so
/// that an out-of-order range surfaces as a diagnostic instead of a panic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Glyph {
    pub first: String,
    pub last: Option<String>,
}

impl Glyph {
    pub fn new(first: impl Into<String>, last: Option<String>) -> Self {
        Self {
            first: first.into(),
            last,
        }
    }

    /// Decodes the first endpoint to its rune.
    pub fn first_char(&self) -> Option<char> {
        decode_glyph(&self.first)
    }

    /// Decodes the last endpoint to its rune, when present.
    pub fn last_char(&self) -> Option<char> {
        self.last.as_deref().and_then(decode_glyph)
    }
}

/// Decodes a quoted glyph token (`'a'`, `'\\''`, `'\\n'`) to its rune.
/// Returns `None` for text that is not a well-formed glyph token.
pub fn decode_glyph(text: &str) -> Option<char> {
    let inner = text.strip_prefix('\'')?.strip_suffix('\'')?;
    let mut chars = inner.chars();
    let first = chars.next()?;
    let decoded = if first == '\\' {
        match chars.next()? {
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            other => other,
        }
    } else {
        first
    };
    match chars.next() {
        None => Some(decoded),
        Some(_) => None,
    }
}

/// Decodes a quoted literal token (`"abc"`) to its text with escapes
/// resolved. Returns `None` for text that is not a well-formed literal.
pub fn decode_literal(text: &str) -> Option<String> {
    let inner = text.strip_prefix('"')?.strip_suffix('"')?;
    let mut decoded = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next()? {
                'n' => decoded.push('\n'),
                'r' => decoded.push('\r'),
                't' => decoded.push('\t'),
                other => decoded.push(other),
            }
        } else {
            decoded.push(c);
        }
    }
    if decoded.is_empty() {
        return None;
    }
    Some(decoded)
}

// ============================================================================
// Cardinalities
// ============================================================================

/// The repetition constraint on a factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cardinality {
    /// `?`
    Optional,
    /// `*`
    ZeroOrMore,
    /// `+`
    OneOrMore,
    /// An explicit `{m}`, `{m..}`, or `{m..n}` form.
    Constrained(Constraint),
}

impl Cardinality {
    /// True when the cardinality permits more than one instance.
    pub fn is_plural(&self) -> bool {
        match self {
            Cardinality::Optional => false,
            Cardinality::ZeroOrMore | Cardinality::OneOrMore => true,
            Cardinality::Constrained(constraint) => constraint.is_plural(),
        }
    }
}

/// An explicit numeric repetition range. The bound texts are kept verbatim
/// so that `{007}` formats back exactly as written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub first: String,
    pub extent: Extent,
}

/// The upper end of a constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Extent {
    /// `{m}`: exactly `m`.
    Exact,
    /// `{m..}`: at least `m`, unbounded.
    Open,
    /// `{m..n}`: between `m` and `n`.
    Limit(String),
}

impl Constraint {
    pub fn new(first: impl Into<String>, extent: Extent) -> Self {
        Self {
            first: first.into(),
            extent,
        }
    }

    pub fn first_value(&self) -> Option<u64> {
        self.first.parse().ok()
    }

    pub fn last_value(&self) -> Option<u64> {
        match &self.extent {
            Extent::Exact => self.first_value(),
            Extent::Open => None,
            Extent::Limit(last) => last.parse().ok(),
        }
    }

    /// True when the constraint permits more than one instance.
    pub fn is_plural(&self) -> bool {
        match self.last_value() {
            None => true,
            Some(last) => last > 1,
        }
    }
}

// ============================================================================
// Node labels
// ============================================================================

macro_rules! impl_node_type {
    ($($ty:ty => $label:literal),+ $(,)?) => {
        $(impl AstNode for $ty {
            fn node_type(&self) -> &'static str {
                $label
            }
        })+
    };
}

impl_node_type! {
    Grammar => "Grammar",
    Comment => "Comment",
    Definition => "Definition",
    Expression => "Expression",
    Inline => "Inline",
    Multiline => "Multiline",
    Line => "Line",
    Alternative => "Alternative",
    Note => "Note",
    Factor => "Factor",
    Predicate => "Predicate",
    Filter => "Filter",
    Element => "Element",
    Glyph => "Glyph",
    Cardinality => "Cardinality",
    Constraint => "Constraint",
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_kind_follows_case() {
        let expression = Expression::Inline(Inline::new(
            vec![Alternative::new(vec![Factor {
                predicate: Predicate::Element(Element::Intrinsic(Intrinsic::Digit)),
                cardinality: None,
            }])],
            None,
        ));
        let token = Definition::new(None, "number", expression.clone());
        assert!(token.is_token());
        let rule = Definition::new(None, "Number", expression);
        assert!(!rule.is_token());
    }

    #[test]
    fn test_decode_glyph() {
        assert_eq!(decode_glyph("'a'"), Some('a'));
        assert_eq!(decode_glyph("'\\n'"), Some('\n'));
        assert_eq!(decode_glyph("'\\''"), Some('\''));
        assert_eq!(decode_glyph("'ab'"), None);
        assert_eq!(decode_glyph("a"), None);
    }

    #[test]
    fn test_decode_literal() {
        assert_eq!(decode_literal("\"ow\""), Some("ow".to_string()));
        assert_eq!(decode_literal("\"a\\\"b\""), Some("a\"b".to_string()));
        assert_eq!(decode_literal("\"\""), None);
        assert_eq!(decode_literal("ow"), None);
    }

    #[test]
    fn test_constraint_plurality() {
        let exact_one = Constraint::new("1", Extent::Exact);
        assert!(!exact_one.is_plural());
        let open = Constraint::new("0", Extent::Open);
        assert!(open.is_plural());
        let bounded = Constraint::new("2", Extent::Limit("4".into()));
        assert!(bounded.is_plural());
        let unit = Constraint::new("0", Extent::Limit("1".into()));
        assert!(!unit.is_plural());
    }

    #[test]
    fn test_grammar_name_is_first_definition() {
        let expression = Expression::Inline(Inline::new(
            vec![Alternative::new(vec![Factor {
                predicate: Predicate::Element(Element::Reference("token".into())),
                cardinality: None,
            }])],
            None,
        ));
        let grammar = Grammar::new(
            vec![],
            vec![Definition::new(None, "Syntax", expression)],
        );
        assert_eq!(grammar.name(), "Syntax");
        assert_eq!(grammar.node_type(), "Grammar");
    }
}
