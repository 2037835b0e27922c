//! # cdsn
//!
//! A processor for Crater Dog Syntax Notation (CDSN) grammar definitions:
//! scanning, parsing, semantic validation, canonical formatting, and the
//! analysis pass that feeds grammar-driven code generation.
//!
//! The usual flow:
//!
//! ```text
//! source text -> parse_source -> validate_grammar -> format_grammar
//! ```
//!
//! For any source already in canonical form, that flow reproduces the
//! input byte for byte.

pub mod cdsn;

pub use cdsn::{
    format_definition, format_grammar, parse_source, validate_grammar, Analysis, Analyzer,
    GrammarError, ParseError, Scanner, Token, TokenKind,
};
