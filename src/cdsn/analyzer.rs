//! Analyzer: cross-cutting facts for code generation
//!
//! The analyzer makes a single pass over a validated grammar and collects
//! the derived facts a downstream code generator needs: the notice text,
//! the grammar's own name, the ordered rule and token name sets, which
//! names are plural (appear somewhere under a multi-instance cardinality
//! and so must become collections in generated code), and an assembled
//! regular-expression text for every token definition.
//!
//! Fact collection rides the generic [`Visitor`] traversal; the regex
//! assembly is a separate recursive pass because it follows references
//! across definitions rather than the tree shape.

use std::collections::{BTreeMap, HashMap, HashSet};

use log::debug;

use crate::cdsn::ast::{
    Alternative, Cardinality, Comment, Constraint, Definition, Element, Expression, Extent,
    Factor, Filter, Glyph, Grammar, Intrinsic, Predicate,
};
use crate::cdsn::visitor::{Processor, Visitor};

/// The facts derived from one grammar. Owned by the caller; the grammar
/// itself is not retained.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    notice: Option<String>,
    syntax_name: String,
    rule_names: Vec<String>,
    token_names: Vec<String>,
    plural_names: HashSet<String>,
    regexes: BTreeMap<String, String>,
}

impl Analysis {
    /// The copyright/notice text: the first header comment, if any.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// The grammar's own name, by convention the first definition's name.
    pub fn syntax_name(&self) -> &str {
        &self.syntax_name
    }

    /// Uppercase definition names, in definition order.
    pub fn rule_names(&self) -> &[String] {
        &self.rule_names
    }

    /// Lowercase definition names, in definition order.
    pub fn token_names(&self) -> &[String] {
        &self.token_names
    }

    /// True when the name appears somewhere under a `*`, `+`, or
    /// multi-instance constraint and so must be modeled as a collection.
    pub fn is_plural(&self, name: &str) -> bool {
        self.plural_names.contains(name)
    }

    /// The assembled regular-expression text for a token definition.
    pub fn regex_text(&self, token_name: &str) -> Option<&str> {
        self.regexes.get(token_name).map(String::as_str)
    }
}

/// The analyzer entry point.
pub struct Analyzer;

impl Analyzer {
    /// Collects all derived facts in one pass over a validated grammar.
    pub fn analyze(grammar: &Grammar) -> Analysis {
        let mut collector = FactCollector::default();
        Visitor::new(&mut collector).visit_grammar(grammar);

        let mut assembler = RegexAssembler::new(grammar);
        let regexes = collector
            .token_names
            .iter()
            .map(|name| (name.clone(), assembler.regex_for(name)))
            .collect();

        debug!(
            "analyzed grammar {}: {} rules, {} tokens",
            collector.syntax_name,
            collector.rule_names.len(),
            collector.token_names.len()
        );
        Analysis {
            notice: collector.notice,
            syntax_name: collector.syntax_name,
            rule_names: collector.rule_names,
            token_names: collector.token_names,
            plural_names: collector.plural_names,
            regexes,
        }
    }
}

// ============================================================================
// Fact collection
// ============================================================================

#[derive(Default)]
struct FactCollector {
    notice: Option<String>,
    syntax_name: String,
    rule_names: Vec<String>,
    token_names: Vec<String>,
    plural_names: HashSet<String>,
    /// How many enclosing factors carry a multi-instance cardinality.
    plural_depth: usize,
}

impl Processor for FactCollector {
    fn process_header(&mut self, header: &Comment) {
        if self.notice.is_none() {
            self.notice = Some(header.text.clone());
        }
    }

    fn pre_definition(&mut self, definition: &Definition) {
        if self.syntax_name.is_empty() {
            self.syntax_name = definition.name.clone();
        }
        if definition.is_token() {
            self.token_names.push(definition.name.clone());
        } else {
            self.rule_names.push(definition.name.clone());
        }
    }

    fn pre_factor(&mut self, factor: &Factor) {
        if factor_is_plural(factor) {
            self.plural_depth += 1;
        }
    }

    fn post_factor(&mut self, factor: &Factor) {
        if factor_is_plural(factor) {
            self.plural_depth -= 1;
        }
    }

    fn process_reference(&mut self, name: &str) {
        if self.plural_depth > 0 {
            self.plural_names.insert(name.to_string());
        }
    }
}

fn factor_is_plural(factor: &Factor) -> bool {
    factor
        .cardinality
        .as_ref()
        .map(Cardinality::is_plural)
        .unwrap_or(false)
}

// ============================================================================
// Regex assembly
// ============================================================================

/// Assembles the regular-expression text for token definitions, following
/// references across definitions. Assembly is greedy until an `ANY`
/// intrinsic appears; quantifiers after that point render non-greedy.
struct RegexAssembler<'a> {
    definitions: HashMap<&'a str, &'a Definition>,
    assembled: HashMap<String, String>,
    visiting: HashSet<String>,
}

impl<'a> RegexAssembler<'a> {
    fn new(grammar: &'a Grammar) -> Self {
        let definitions = grammar
            .definitions
            .iter()
            .map(|definition| (definition.name.as_str(), definition))
            .collect();
        Self {
            definitions,
            assembled: HashMap::new(),
            visiting: HashSet::new(),
        }
    }

    fn regex_for(&mut self, name: &str) -> String {
        if let Some(done) = self.assembled.get(name) {
            return done.clone();
        }
        // A cyclic or missing definition leaves a named placeholder in the
        // assembled text rather than recursing forever.
        if self.visiting.contains(name) {
            return format!("<{}>", name);
        }
        let Some(definition) = self.definitions.get(name).copied() else {
            return format!("<{}>", name);
        };
        self.visiting.insert(name.to_string());
        let mut greedy = true;
        let pattern = self.expression_pattern(&definition.expression, &mut greedy);
        self.visiting.remove(name);
        self.assembled.insert(name.to_string(), pattern.clone());
        pattern
    }

    fn expression_pattern(&mut self, expression: &Expression, greedy: &mut bool) -> String {
        let alternatives: Vec<&Alternative> = match expression {
            Expression::Inline(inline) => inline.alternatives.iter().collect(),
            Expression::Multiline(multiline) => {
                multiline.lines.iter().map(|line| &line.alternative).collect()
            }
        };
        self.alternation_pattern(&alternatives, greedy)
    }

    /// The bare `a|b|c` body of an alternation, without any grouping.
    fn alternation_body(&mut self, alternatives: &[&Alternative], greedy: &mut bool) -> String {
        let parts: Vec<String> = alternatives
            .iter()
            .map(|alternative| self.alternative_pattern(alternative, greedy))
            .collect();
        parts.join("|")
    }

    fn alternation_pattern(
        &mut self,
        alternatives: &[&Alternative],
        greedy: &mut bool,
    ) -> String {
        let body = self.alternation_body(alternatives, greedy);
        if alternatives.len() == 1 {
            return body;
        }
        format!("(?:{})", body)
    }

    fn alternative_pattern(&mut self, alternative: &Alternative, greedy: &mut bool) -> String {
        alternative
            .factors
            .iter()
            .map(|factor| self.factor_pattern(factor, greedy))
            .collect()
    }

    fn factor_pattern(&mut self, factor: &Factor, greedy: &mut bool) -> String {
        let base = match &factor.predicate {
            Predicate::Element(element) => self.element_pattern(element, greedy),
            Predicate::Inversion(filter) => filter_pattern(filter),
        };
        match &factor.cardinality {
            None => base,
            Some(cardinality) => quantify(&base, cardinality, *greedy),
        }
    }

    fn element_pattern(&mut self, element: &Element, greedy: &mut bool) -> String {
        match element {
            Element::Intrinsic(intrinsic) => {
                if *intrinsic == Intrinsic::Any {
                    *greedy = false;
                }
                intrinsic_pattern(*intrinsic).to_string()
            }
            Element::Glyph(glyph) => glyph_pattern(glyph, false),
            Element::Literal(text) => {
                let decoded = crate::cdsn::ast::decode_literal(text).unwrap_or_default();
                regex::escape(&decoded)
            }
            Element::Reference(name) => format!("(?:{})", self.regex_for(name)),
            // A grouped sub-pattern wraps the freshly computed inner
            // pattern in parentheses.
            Element::Precedence(inline) => {
                let alternatives: Vec<&Alternative> = inline.alternatives.iter().collect();
                format!("({})", self.alternation_body(&alternatives, greedy))
            }
        }
    }
}

/// Appends the quantifier for a cardinality, grouping the base pattern
/// where precedence requires it and honoring the greediness mode.
fn quantify(base: &str, cardinality: &Cardinality, greedy: bool) -> String {
    let base = if needs_group(base) {
        format!("(?:{})", base)
    } else {
        base.to_string()
    };
    let suffix = match cardinality {
        Cardinality::Optional => "?".to_string(),
        Cardinality::ZeroOrMore => "*".to_string(),
        Cardinality::OneOrMore => "+".to_string(),
        Cardinality::Constrained(constraint) => constraint_suffix(constraint),
    };
    let lazy = if greedy { "" } else { "?" };
    format!("{}{}{}", base, suffix, lazy)
}

fn constraint_suffix(constraint: &Constraint) -> String {
    match &constraint.extent {
        Extent::Exact => format!("{{{}}}", constraint.first),
        Extent::Open => format!("{{{},}}", constraint.first),
        Extent::Limit(last) => format!("{{{},{}}}", constraint.first, last),
    }
}

/// True when a pattern must be grouped before a quantifier can apply to
/// the whole of it.
fn needs_group(pattern: &str) -> bool {
    let mut chars = pattern.chars();
    match (chars.next(), chars.next()) {
        (_, None) => false,
        (Some('\\'), Some(_)) if pattern.len() == 2 => false,
        (Some('['), _) if pattern.ends_with(']') => false,
        (Some('('), _) if pattern.ends_with(')') => false,
        _ => true,
    }
}

fn filter_pattern(filter: &Filter) -> String {
    match filter {
        Filter::Intrinsic(intrinsic) => format!("[^{}]", intrinsic_class_body(*intrinsic)),
        Filter::Glyph(glyph) => glyph_pattern(glyph, true),
    }
}

fn glyph_pattern(glyph: &Glyph, inverted: bool) -> String {
    let first = glyph.first_char().unwrap_or_default();
    match glyph.last_char() {
        Some(last) => format!(
            "[{}{}-{}]",
            if inverted { "^" } else { "" },
            class_escape(first),
            class_escape(last)
        ),
        None if inverted => format!("[^{}]", class_escape(first)),
        None => regex::escape(&first.to_string()),
    }
}

fn intrinsic_pattern(intrinsic: Intrinsic) -> &'static str {
    match intrinsic {
        Intrinsic::Any => ".",
        Intrinsic::Control => "[\\x00-\\x1F]",
        Intrinsic::Digit => "[0-9]",
        Intrinsic::Eof => "",
        Intrinsic::Eol => "\\n",
        Intrinsic::Escape => "\\\\",
        Intrinsic::Lower => "[a-z]",
        Intrinsic::Upper => "[A-Z]",
    }
}

/// The character-class body for an intrinsic, used inside a negated class.
fn intrinsic_class_body(intrinsic: Intrinsic) -> &'static str {
    match intrinsic {
        Intrinsic::Any => "\\s\\S",
        Intrinsic::Control => "\\x00-\\x1F",
        Intrinsic::Digit => "0-9",
        Intrinsic::Eof => "\\s\\S",
        Intrinsic::Eol => "\\n",
        Intrinsic::Escape => "\\\\",
        Intrinsic::Lower => "a-z",
        Intrinsic::Upper => "A-Z",
    }
}

/// Escapes a rune for use inside a character class.
fn class_escape(c: char) -> String {
    match c {
        '\\' | ']' | '^' | '-' => format!("\\{}", c),
        '\n' => "\\n".to_string(),
        '\r' => "\\r".to_string(),
        '\t' => "\\t".to_string(),
        _ => c.to_string(),
    }
}
