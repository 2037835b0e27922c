//! Semantic validator for parsed CDSN grammars
//!
//! The validator walks a completed AST depth-first and enforces the
//! grammar-consistency rules that are not expressible as parser-time
//! syntax: name uniqueness, resolved references, namespace separation
//! between token and rule definitions, ordered ranges, and well-shaped
//! textual fields. It re-checks token-shaped texts against the scanner's
//! own patterns via [`Scanner::match_token`], so a tree built
//! programmatically is held to the same lexical standards as a parsed one.
//!
//! Validation is fail-fast: the first violation aborts the walk with a
//! [`GrammarError`] naming the enclosing definition. Ambient state — the
//! enclosing definition's name and kind — is threaded through the
//! traversal as an explicit context value, so concurrent validations of
//! different grammars never share anything.

use std::collections::HashSet;

use log::debug;

use crate::cdsn::ast::{
    Alternative, Cardinality, Constraint, Definition, Element, Expression, Extent, Factor,
    Filter, Glyph, Grammar, Inline, Predicate,
};
use crate::cdsn::error::GrammarError;
use crate::cdsn::scanner::Scanner;
use crate::cdsn::token::TokenKind;

/// Checks a parsed grammar for semantic consistency. Completes silently
/// when the tree is acceptable; there is no partial or warning state.
pub fn validate_grammar(grammar: &Grammar) -> Result<(), GrammarError> {
    let mut validator = Validator::new();
    validator.check_definitions(grammar)?;
    validator.check_references()?;
    debug!(
        "validated grammar {} ({} definitions, {} referenced names)",
        grammar.name(),
        grammar.definitions.len(),
        validator.referenced.len()
    );
    Ok(())
}

/// The per-node ambient state, passed down the walk by value.
#[derive(Clone, Copy)]
struct Context<'a> {
    /// Name of the enclosing definition, for error messages.
    definition: &'a str,
    /// True inside a lowercase (token pattern) definition.
    is_token: bool,
}

struct Validator {
    defined: HashSet<String>,
    /// Names referenced anywhere, in first-reference order.
    referenced: Vec<String>,
}

impl Validator {
    fn new() -> Self {
        Self {
            defined: HashSet::new(),
            referenced: Vec::new(),
        }
    }

    fn check_definitions(&mut self, grammar: &Grammar) -> Result<(), GrammarError> {
        for definition in &grammar.definitions {
            if !self.defined.insert(definition.name.clone()) {
                return Err(GrammarError::invalid(
                    &definition.name,
                    format!("The name {} is defined more than once.", definition.name),
                ));
            }
        }
        for definition in &grammar.definitions {
            self.check_definition(definition)?;
        }
        Ok(())
    }

    fn check_definition(&mut self, definition: &Definition) -> Result<(), GrammarError> {
        let context = Context {
            definition: &definition.name,
            is_token: definition.is_token(),
        };
        let kind = if context.is_token {
            TokenKind::Name
        } else {
            TokenKind::Symbol
        };
        if Scanner::match_token(kind, &definition.name).is_none() {
            return Err(GrammarError::invalid(
                &definition.name,
                format!("The definition name {} is malformed.", definition.name),
            ));
        }
        self.check_expression(&definition.expression, context)
    }

    fn check_expression(
        &mut self,
        expression: &Expression,
        context: Context<'_>,
    ) -> Result<(), GrammarError> {
        let alternatives: Vec<&Alternative> = match expression {
            Expression::Inline(inline) => inline.alternatives.iter().collect(),
            Expression::Multiline(multiline) => {
                multiline.lines.iter().map(|line| &line.alternative).collect()
            }
        };
        if alternatives.is_empty() {
            return Err(GrammarError::invalid(
                context.definition,
                "An expression must have at least one alternative.",
            ));
        }
        for alternative in alternatives {
            self.check_alternative(alternative, context)?;
        }
        Ok(())
    }

    fn check_alternative(
        &mut self,
        alternative: &Alternative,
        context: Context<'_>,
    ) -> Result<(), GrammarError> {
        if alternative.factors.is_empty() {
            return Err(GrammarError::invalid(
                context.definition,
                "An alternative must have at least one factor.",
            ));
        }
        for factor in &alternative.factors {
            self.check_factor(factor, context)?;
        }
        Ok(())
    }

    fn check_factor(&mut self, factor: &Factor, context: Context<'_>) -> Result<(), GrammarError> {
        match &factor.predicate {
            Predicate::Element(element) => self.check_element(element, context)?,
            // Inversions are structurally restricted to filters, so nested
            // inversion and inverted references cannot occur here.
            Predicate::Inversion(filter) => self.check_filter(filter, context)?,
        }
        if let Some(Cardinality::Constrained(constraint)) = &factor.cardinality {
            self.check_constraint(constraint, context)?;
        }
        Ok(())
    }

    fn check_element(
        &mut self,
        element: &Element,
        context: Context<'_>,
    ) -> Result<(), GrammarError> {
        match element {
            Element::Intrinsic(_) => Ok(()),
            Element::Glyph(glyph) => self.check_glyph(glyph, context),
            Element::Literal(text) => {
                if Scanner::match_token(TokenKind::Literal, text).is_none() {
                    return Err(GrammarError::invalid(
                        context.definition,
                        format!("The literal {} is malformed.", text),
                    ));
                }
                Ok(())
            }
            Element::Reference(name) => self.check_reference(name, context),
            Element::Precedence(inline) => self.check_precedence(inline, context),
        }
    }

    fn check_precedence(
        &mut self,
        inline: &Inline,
        context: Context<'_>,
    ) -> Result<(), GrammarError> {
        if inline.alternatives.is_empty() {
            return Err(GrammarError::invalid(
                context.definition,
                "An expression must have at least one alternative.",
            ));
        }
        for alternative in &inline.alternatives {
            self.check_alternative(alternative, context)?;
        }
        Ok(())
    }

    fn check_reference(&mut self, name: &str, context: Context<'_>) -> Result<(), GrammarError> {
        let is_rule_name = name.starts_with(|c: char| c.is_ascii_uppercase());
        if context.is_token && is_rule_name {
            return Err(GrammarError::invalid(
                context.definition,
                "A token definition cannot contain a rule name.",
            ));
        }
        let kind = if is_rule_name {
            TokenKind::Symbol
        } else {
            TokenKind::Name
        };
        if Scanner::match_token(kind, name).is_none() {
            return Err(GrammarError::invalid(
                context.definition,
                format!("The reference {} is malformed.", name),
            ));
        }
        if !self.referenced.iter().any(|seen| seen == name) {
            self.referenced.push(name.to_string());
        }
        Ok(())
    }

    fn check_filter(&mut self, filter: &Filter, context: Context<'_>) -> Result<(), GrammarError> {
        match filter {
            Filter::Intrinsic(_) => Ok(()),
            Filter::Glyph(glyph) => self.check_glyph(glyph, context),
        }
    }

    fn check_glyph(&mut self, glyph: &Glyph, context: Context<'_>) -> Result<(), GrammarError> {
        let Some(first) = well_formed_glyph(&glyph.first) else {
            return Err(GrammarError::invalid(
                context.definition,
                format!("The glyph {} is malformed.", glyph.first),
            ));
        };
        let Some(last_text) = &glyph.last else {
            return Ok(());
        };
        let Some(last) = well_formed_glyph(last_text) else {
            return Err(GrammarError::invalid(
                context.definition,
                format!("The glyph {} is malformed.", last_text),
            ));
        };
        if first > last {
            return Err(GrammarError::invalid(
                context.definition,
                format!(
                    "The range of glyphs in {}..{} is out of order.",
                    glyph.first, last_text
                ),
            ));
        }
        Ok(())
    }

    fn check_constraint(
        &mut self,
        constraint: &Constraint,
        context: Context<'_>,
    ) -> Result<(), GrammarError> {
        let Some(first) = well_formed_number(&constraint.first) else {
            return Err(GrammarError::invalid(
                context.definition,
                format!("The constraint bound {} is malformed.", constraint.first),
            ));
        };
        match &constraint.extent {
            Extent::Exact | Extent::Open => Ok(()),
            Extent::Limit(last_text) => {
                let Some(last) = well_formed_number(last_text) else {
                    return Err(GrammarError::invalid(
                        context.definition,
                        format!("The constraint bound {} is malformed.", last_text),
                    ));
                };
                if first > last {
                    return Err(GrammarError::invalid(
                        context.definition,
                        format!(
                            "The constraint {}..{} is out of order.",
                            constraint.first, last_text
                        ),
                    ));
                }
                Ok(())
            }
        }
    }

    /// Every referenced name must have a definition.
    fn check_references(&self) -> Result<(), GrammarError> {
        for name in &self.referenced {
            if !self.defined.contains(name) {
                return Err(GrammarError::MissingDefinition {
                    symbol: name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Re-checks a glyph text against the scanner's pattern and decodes it.
fn well_formed_glyph(text: &str) -> Option<char> {
    Scanner::match_token(TokenKind::Glyph, text)?;
    crate::cdsn::ast::decode_glyph(text)
}

/// Re-checks a number text against the scanner's pattern and parses it.
fn well_formed_number(text: &str) -> Option<u64> {
    Scanner::match_token(TokenKind::Number, text)?;
    text.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdsn::parser::parse_source;

    fn validate(source: &str) -> Result<(), GrammarError> {
        validate_grammar(&parse_source(source).unwrap())
    }

    #[test]
    fn test_accepts_consistent_grammar() {
        let source = "Greeting: salutation name\n\nsalutation: \"hello\" | \"hi\"\n\nname: LOWER+\n";
        assert!(validate(source).is_ok());
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let error = validate("bad: 'a'\n\nbad: 'b'\n").unwrap_err();
        assert_eq!(
            error.to_string(),
            "The definition for bad is invalid:\nThe name bad is defined more than once.\n"
        );
    }

    #[test]
    fn test_rejects_missing_definition() {
        let error = validate("Thing: rule\n").unwrap_err();
        assert_eq!(
            error.to_string(),
            "The grammar is missing a definition for the symbol: rule"
        );
    }

    #[test]
    fn test_rejects_rule_reference_inside_token_definition() {
        let error = validate("token: Rule\n\nRule: 'x'\n").unwrap_err();
        assert_eq!(
            error.to_string(),
            "The definition for token is invalid:\nA token definition cannot contain a rule name.\n"
        );
    }

    #[test]
    fn test_rejects_out_of_order_glyph_range() {
        let error = validate("span: 'z'..'a'\n").unwrap_err();
        assert_eq!(
            error.to_string(),
            "The definition for span is invalid:\nThe range of glyphs in 'z'..'a' is out of order.\n"
        );
    }

    #[test]
    fn test_rejects_out_of_order_constraint() {
        let error = validate("sized: DIGIT{5..2}\n").unwrap_err();
        assert_eq!(
            error.to_string(),
            "The definition for sized is invalid:\nThe constraint 5..2 is out of order.\n"
        );
    }

    #[test]
    fn test_rejects_empty_alternative_in_handmade_tree() {
        use crate::cdsn::ast::{Alternative, Definition, Expression, Grammar, Inline};

        // The parser cannot produce an empty alternative, but a
        // programmatically built tree can; the validator must catch it.
        let grammar = Grammar {
            headers: vec![],
            definitions: vec![Definition {
                comment: None,
                name: "empty".into(),
                expression: Expression::Inline(Inline {
                    alternatives: vec![Alternative { factors: vec![] }],
                    note: None,
                }),
            }],
        };
        let error = validate_grammar(&grammar).unwrap_err();
        assert_eq!(
            error.to_string(),
            "The definition for empty is invalid:\nAn alternative must have at least one factor.\n"
        );
    }

    #[test]
    fn test_rejects_empty_expression_in_handmade_tree() {
        use crate::cdsn::ast::{Definition, Expression, Grammar, Multiline};

        let grammar = Grammar {
            headers: vec![],
            definitions: vec![Definition {
                comment: None,
                name: "hollow".into(),
                expression: Expression::Multiline(Multiline { lines: vec![] }),
            }],
        };
        let error = validate_grammar(&grammar).unwrap_err();
        assert_eq!(
            error.to_string(),
            "The definition for hollow is invalid:\nAn expression must have at least one alternative.\n"
        );
    }

    #[test]
    fn test_range_ordering_accepts_equal_endpoints() {
        assert!(validate("single: 'q'..'q'\n").is_ok());
        assert!(validate("sized: DIGIT{2..2}\n").is_ok());
    }
}
