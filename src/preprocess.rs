//! Text Preprocessor
//!
//! Turns an automaton source into the text handed to Graphviz: escape
//! sequences become symbols and leading indentation is dropped so authors can
//! indent freely without it reaching `dot`.

use crate::symbols::SymbolTable;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static LEADING_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[\t ]+").expect("valid leading whitespace pattern"));

/// How replacements interact with later table entries
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SubstitutionMode {
    /// One pass per entry, each over the previous pass's output. A replacement
    /// containing another entry's sequence gets substituted again.
    #[default]
    Chained,
    /// One scan over the source; replacements are never revisited
    SinglePass,
}

impl SubstitutionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SubstitutionMode::Chained => "chained",
            SubstitutionMode::SinglePass => "single-pass",
        }
    }
}

impl std::str::FromStr for SubstitutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "chained" => Ok(SubstitutionMode::Chained),
            "single-pass" | "singlepass" => Ok(SubstitutionMode::SinglePass),
            other => Err(format!("Unknown substitution mode: {}", other)),
        }
    }
}

/// Substitute symbols (chained) and strip leading indentation
pub fn preprocess(text: &str, table: &SymbolTable) -> String {
    preprocess_with(text, table, SubstitutionMode::Chained)
}

/// Substitute symbols using `mode` and strip leading indentation
pub fn preprocess_with(text: &str, table: &SymbolTable, mode: SubstitutionMode) -> String {
    let substituted = match mode {
        SubstitutionMode::Chained => substitute_chained(text, table),
        SubstitutionMode::SinglePass => substitute_single_pass(text, table),
    };
    strip_leading_whitespace(&substituted)
}

/// Remove spaces and tabs at the start of every line
pub fn strip_leading_whitespace(text: &str) -> String {
    LEADING_WHITESPACE.replace_all(text, "").into_owned()
}

fn substitute_chained(text: &str, table: &SymbolTable) -> String {
    let mut processed = text.to_string();
    for entry in table.iter() {
        if processed.contains(entry.sequence()) {
            processed = processed.replace(entry.sequence(), entry.replacement());
        }
    }
    processed
}

fn substitute_single_pass(text: &str, table: &SymbolTable) -> String {
    if table.is_empty() {
        return text.to_string();
    }

    // Alternation is leftmost-first, so earlier table entries win at a position.
    let alternation = table
        .iter()
        .map(|e| regex::escape(e.sequence()))
        .collect::<Vec<_>>()
        .join("|");

    let pattern = match Regex::new(&alternation) {
        Ok(pattern) => pattern,
        Err(e) => {
            log::warn!("Single-pass substitution unavailable ({}), using chained passes", e);
            return substitute_chained(text, table);
        }
    };

    pattern
        .replace_all(text, |caps: &regex::Captures| {
            table.get(&caps[0]).unwrap_or(&caps[0]).to_string()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::{build_symbol_table, DEFAULT_SYMBOLS};

    #[test]
    fn test_epsilon_scenario() {
        let table = SymbolTable::defaults();
        assert_eq!(preprocess("\\epsilon -> \\epsilon", &table), "ε -> ε");
    }

    #[test]
    fn test_leading_tabs_scenario() {
        let table = SymbolTable::defaults();
        assert_eq!(preprocess("\t\tA -> B\n\tB -> C", &table), "A -> B\nB -> C");
    }

    #[test]
    fn test_inner_whitespace_untouched() {
        let table = SymbolTable::defaults();
        assert_eq!(
            preprocess("  a  ->\tb ;  \n\n   c", &table),
            "a  ->\tb ;  \n\nc"
        );
    }

    #[test]
    fn test_no_keys_is_only_stripping() {
        let table = SymbolTable::defaults();
        let samples = [
            "digraph { a -> b }",
            "   digraph G {\n\t  rankdir=LR;\n  q -> r [label=\"a,b\"]\n}",
            "",
            "\t\n \t",
        ];
        for sample in samples {
            assert!(!table.matches_any(sample));
            assert_eq!(preprocess(sample, &table), strip_leading_whitespace(sample));
        }
    }

    #[test]
    fn test_idempotent_once_no_key_remains() {
        let table = SymbolTable::defaults();
        let once = preprocess("  q_1 -> q_2 [label=\"\\sigma \\cup \\emptyset\"]", &table);
        assert!(!table.matches_any(&once));
        assert_eq!(preprocess(&once, &table), once);
        assert_eq!(once, "q₁ -> q₂ [label=\"Σ ∪ ∅\"]");
    }

    #[test]
    fn test_user_override_wins() {
        let table = build_symbol_table(DEFAULT_SYMBOLS.iter().copied(), [("\\epsilon", "λ")]);
        assert_eq!(preprocess("\\epsilon", &table), "λ");
    }

    #[test]
    fn test_emptyset_before_empty() {
        let table = SymbolTable::defaults();
        assert_eq!(preprocess("\\emptyset \\empty", &table), "∅ ∅");
    }

    #[test]
    fn test_chained_vs_single_pass() {
        let table = build_symbol_table([("\\a", "\\b"), ("\\b", "B")], std::iter::empty::<(&str, &str)>());

        assert_eq!(preprocess_with("\\a \\b", &table, SubstitutionMode::Chained), "B B");
        assert_eq!(preprocess_with("\\a \\b", &table, SubstitutionMode::SinglePass), "\\b B");
    }

    #[test]
    fn test_tab_replacement_is_stripped_at_line_start() {
        let table = SymbolTable::defaults();
        assert_eq!(preprocess("\\tab x", &table), "x");
        assert_eq!(preprocess("x\\tab y", &table), "x\t y");
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("single_pass".parse::<SubstitutionMode>().unwrap(), SubstitutionMode::SinglePass);
        assert_eq!("Chained".parse::<SubstitutionMode>().unwrap(), SubstitutionMode::Chained);
        assert!("loop".parse::<SubstitutionMode>().is_err());
    }
}
