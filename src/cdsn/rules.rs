//! Formal grammar rule texts for diagnostics
//!
//! The parser names the rules it was expecting when it raises a syntax
//! error, and shows each rule's formal right-hand side. Those texts live
//! here as one read-only table, constructed once and handed to the parser
//! by reference.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::cdsn::error::ExpectedRule;

/// The formal right-hand side of every CDSN grammar production, in
/// declaration order.
const PRODUCTIONS: &[(&str, &str)] = &[
    ("Grammar", "Header* Definition+ eof"),
    ("Header", "comment"),
    ("Definition", "comment? Rule"),
    ("Rule", "Identifier \":\" Expression"),
    ("Identifier", "name | symbol"),
    ("Expression", "Multiline | Inline"),
    ("Inline", "Alternative (\"|\" Alternative)* note?"),
    ("Multiline", "Line+"),
    ("Line", "eol Alternative note?"),
    ("Alternative", "Factor+"),
    ("Factor", "Predicate Cardinality?"),
    ("Predicate", "Inversion | Element"),
    ("Inversion", "\"~\" Filter"),
    ("Filter", "intrinsic | Glyph"),
    ("Element", "intrinsic | Glyph | literal | Reference | Precedence"),
    ("Glyph", "glyph (\"..\" glyph)?"),
    ("Reference", "name | symbol"),
    ("Precedence", "\"(\" Inline \")\""),
    ("Cardinality", "\"?\" | \"*\" | \"+\" | Constraint"),
    ("Constraint", "\"{\" number (\"..\" number?)? \"}\""),
];

/// Read-only lookup from production name to its formal right-hand side.
pub struct GrammarRules {
    table: HashMap<&'static str, &'static str>,
}

impl GrammarRules {
    fn new() -> Self {
        Self {
            table: PRODUCTIONS.iter().copied().collect(),
        }
    }

    /// The process-wide shared instance.
    pub fn shared() -> &'static GrammarRules {
        static RULES: Lazy<GrammarRules> = Lazy::new(GrammarRules::new);
        &RULES
    }

    /// Resolves a production name for a diagnostic. Unknown names are a
    /// programming error in the parser, not user input.
    pub fn expected(&self, name: &'static str) -> ExpectedRule {
        let definition = self
            .table
            .get(name)
            .copied()
            .unwrap_or("<unknown grammar rule>");
        ExpectedRule { name, definition }
    }

    /// Resolves several production names at once, preserving order.
    pub fn expected_all(&self, names: &[&'static str]) -> Vec<ExpectedRule> {
        names.iter().map(|name| self.expected(name)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_production_resolves() {
        let rules = GrammarRules::shared();
        for (name, definition) in PRODUCTIONS {
            let expected = rules.expected(name);
            assert_eq!(expected.definition, *definition);
        }
    }

    #[test]
    fn test_expected_all_preserves_order() {
        let rules = GrammarRules::shared();
        let expected = rules.expected_all(&["Filter", "Cardinality"]);
        assert_eq!(expected[0].name, "Filter");
        assert_eq!(expected[1].name, "Cardinality");
    }
}
