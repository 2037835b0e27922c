//! Generic AST traversal
//!
//! One canonical depth-first walk over the grammar AST, driving a
//! replaceable [`Processor`] with pre/post hooks per node kind. The
//! analyzer and downstream code generators plug in their own processors
//! and share the traversal order instead of duplicating the walk.
//!
//! Every hook has an empty default, so a processor implements only the
//! node kinds it cares about.

use crate::cdsn::ast::{
    Alternative, Cardinality, Comment, Definition, Element, Expression, Factor, Filter, Glyph,
    Grammar, Inline, Intrinsic, Note, Predicate,
};

/// Callbacks invoked by [`Visitor`] in traversal order. `pre_*` hooks fire
/// before a node's children, `post_*` hooks after; leaf nodes get a single
/// `process_*` call.
pub trait Processor {
    fn pre_grammar(&mut self, _grammar: &Grammar) {}
    fn post_grammar(&mut self, _grammar: &Grammar) {}
    fn process_header(&mut self, _header: &Comment) {}
    fn pre_definition(&mut self, _definition: &Definition) {}
    fn post_definition(&mut self, _definition: &Definition) {}
    fn pre_alternative(&mut self, _alternative: &Alternative) {}
    fn post_alternative(&mut self, _alternative: &Alternative) {}
    fn pre_factor(&mut self, _factor: &Factor) {}
    fn post_factor(&mut self, _factor: &Factor) {}
    fn pre_inversion(&mut self, _filter: &Filter) {}
    fn post_inversion(&mut self, _filter: &Filter) {}
    fn pre_precedence(&mut self, _inline: &Inline) {}
    fn post_precedence(&mut self, _inline: &Inline) {}
    fn process_intrinsic(&mut self, _intrinsic: Intrinsic) {}
    fn process_glyph(&mut self, _glyph: &Glyph) {}
    fn process_literal(&mut self, _text: &str) {}
    fn process_reference(&mut self, _name: &str) {}
    fn process_cardinality(&mut self, _cardinality: &Cardinality) {}
    fn process_note(&mut self, _note: &Note) {}
}

/// Drives one processor over one grammar tree.
pub struct Visitor<'a, P: Processor> {
    processor: &'a mut P,
}

impl<'a, P: Processor> Visitor<'a, P> {
    pub fn new(processor: &'a mut P) -> Self {
        Self { processor }
    }

    pub fn visit_grammar(&mut self, grammar: &Grammar) {
        self.processor.pre_grammar(grammar);
        for header in &grammar.headers {
            self.processor.process_header(header);
        }
        for definition in &grammar.definitions {
            self.visit_definition(definition);
        }
        self.processor.post_grammar(grammar);
    }

    pub fn visit_definition(&mut self, definition: &Definition) {
        self.processor.pre_definition(definition);
        self.visit_expression(&definition.expression);
        self.processor.post_definition(definition);
    }

    fn visit_expression(&mut self, expression: &Expression) {
        match expression {
            Expression::Inline(inline) => {
                for alternative in &inline.alternatives {
                    self.visit_alternative(alternative);
                }
                if let Some(note) = &inline.note {
                    self.processor.process_note(note);
                }
            }
            Expression::Multiline(multiline) => {
                for line in &multiline.lines {
                    self.visit_alternative(&line.alternative);
                    if let Some(note) = &line.note {
                        self.processor.process_note(note);
                    }
                }
            }
        }
    }

    fn visit_alternative(&mut self, alternative: &Alternative) {
        self.processor.pre_alternative(alternative);
        for factor in &alternative.factors {
            self.visit_factor(factor);
        }
        self.processor.post_alternative(alternative);
    }

    fn visit_factor(&mut self, factor: &Factor) {
        self.processor.pre_factor(factor);
        match &factor.predicate {
            Predicate::Element(element) => self.visit_element(element),
            Predicate::Inversion(filter) => {
                self.processor.pre_inversion(filter);
                self.visit_filter(filter);
                self.processor.post_inversion(filter);
            }
        }
        if let Some(cardinality) = &factor.cardinality {
            self.processor.process_cardinality(cardinality);
        }
        self.processor.post_factor(factor);
    }

    fn visit_element(&mut self, element: &Element) {
        match element {
            Element::Intrinsic(intrinsic) => self.processor.process_intrinsic(*intrinsic),
            Element::Glyph(glyph) => self.processor.process_glyph(glyph),
            Element::Literal(text) => self.processor.process_literal(text),
            Element::Reference(name) => self.processor.process_reference(name),
            Element::Precedence(inline) => {
                self.processor.pre_precedence(inline);
                for alternative in &inline.alternatives {
                    self.visit_alternative(alternative);
                }
                if let Some(note) = &inline.note {
                    self.processor.process_note(note);
                }
                self.processor.post_precedence(inline);
            }
        }
    }

    fn visit_filter(&mut self, filter: &Filter) {
        match filter {
            Filter::Intrinsic(intrinsic) => self.processor.process_intrinsic(*intrinsic),
            Filter::Glyph(glyph) => self.processor.process_glyph(glyph),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdsn::parser::parse_source;

    /// Records the order of hook firings as a flat trace.
    #[derive(Default)]
    struct Tracer {
        trace: Vec<String>,
    }

    impl Processor for Tracer {
        fn pre_definition(&mut self, definition: &Definition) {
            self.trace.push(format!("pre:{}", definition.name));
        }

        fn post_definition(&mut self, definition: &Definition) {
            self.trace.push(format!("post:{}", definition.name));
        }

        fn process_reference(&mut self, name: &str) {
            self.trace.push(format!("ref:{}", name));
        }

        fn pre_inversion(&mut self, _filter: &Filter) {
            self.trace.push("invert".into());
        }
    }

    #[test]
    fn test_traversal_order_is_depth_first_and_stable() {
        let grammar =
            parse_source("Pair: left right\n\nleft: ~CONTROL\n\nright: left\n").unwrap();
        let mut tracer = Tracer::default();
        Visitor::new(&mut tracer).visit_grammar(&grammar);
        assert_eq!(
            tracer.trace,
            vec![
                "pre:Pair", "ref:left", "ref:right", "post:Pair", "pre:left", "invert",
                "post:left", "pre:right", "ref:left", "post:right",
            ]
        );
    }
}
