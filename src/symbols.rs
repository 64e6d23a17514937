//! Symbol Table
//!
//! Maps escape sequences typed in automaton sources (`\epsilon`, `\to`, `_1`)
//! to the Unicode symbols they stand for. The same table drives pre-render
//! substitution, inline editor decorations and the insert-symbol picklist.

use crate::i18n::Locale;
use std::ops::Range;

/// Built-in mappings, in substitution order
pub const DEFAULT_SYMBOLS: &[(&str, &str)] = &[
    ("\\epsilon", "ε"),
    ("\\to", "→"),
    ("\\rightarrow", "→"),
    ("\\union", "∪"),
    ("\\cup", "∪"),
    ("\\intersect", "∩"),
    ("\\cap", "∩"),
    ("\\sigma", "Σ"),
    ("\\emptyset", "∅"),
    ("\\empty", "∅"),
    ("\\space", "⊔"),
    ("\\tab", "\t"),
    ("_1", "₁"),
    ("_2", "₂"),
    ("_3", "₃"),
    ("_4", "₄"),
    ("_5", "₅"),
    ("_6", "₆"),
    ("_7", "₇"),
    ("_8", "₈"),
    ("_9", "₉"),
    ("_0", "₀"),
];

/// A single escape sequence and its replacement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    sequence: String,
    replacement: String,
}

impl SymbolEntry {
    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }
}

/// Ordered escape sequence → symbol mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    entries: Vec<SymbolEntry>,
}

/// Where an escape sequence should be displayed as its symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolDecoration {
    /// Byte range of the escape sequence in the source
    pub range: Range<usize>,
    /// Symbol to draw in front of it
    pub symbol: String,
}

impl SymbolTable {
    /// Table holding only the built-in mappings
    pub fn defaults() -> Self {
        build_symbol_table(DEFAULT_SYMBOLS.iter().copied(), std::iter::empty::<(&str, &str)>())
    }

    /// Add a mapping; an existing key keeps its position and takes the new replacement
    pub fn insert(&mut self, sequence: impl Into<String>, replacement: impl Into<String>) {
        let sequence = sequence.into();
        if sequence.is_empty() {
            log::warn!("Ignoring empty escape sequence");
            return;
        }

        match self.entries.iter_mut().find(|e| e.sequence == sequence) {
            Some(existing) => existing.replacement = replacement.into(),
            None => self.entries.push(SymbolEntry {
                sequence,
                replacement: replacement.into(),
            }),
        }
    }

    /// Replacement for a sequence
    pub fn get(&self, sequence: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.sequence == sequence)
            .map(|e| e.replacement.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &SymbolEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any sequence still occurs in `text`
    pub fn matches_any(&self, text: &str) -> bool {
        self.entries.iter().any(|e| text.contains(e.sequence.as_str()))
    }

    /// Every occurrence of every sequence in `text`, per entry, in source order
    pub fn decorations(&self, text: &str) -> Vec<SymbolDecoration> {
        let mut decorations: Vec<SymbolDecoration> = self
            .entries
            .iter()
            .flat_map(|entry| {
                text.match_indices(entry.sequence.as_str())
                    .map(move |(start, matched)| SymbolDecoration {
                        range: start..start + matched.len(),
                        symbol: entry.replacement.clone(),
                    })
            })
            .collect();
        decorations.sort_by_key(|d| d.range.start);
        decorations
    }
}

/// Merge defaults with user overrides; overrides win on identical keys
pub fn build_symbol_table<D, U, K, V, K2, V2>(defaults: D, user_overrides: U) -> SymbolTable
where
    D: IntoIterator<Item = (K, V)>,
    U: IntoIterator<Item = (K2, V2)>,
    K: Into<String>,
    V: Into<String>,
    K2: Into<String>,
    V2: Into<String>,
{
    let mut table = SymbolTable::default();
    for (sequence, replacement) in defaults {
        table.insert(sequence, replacement);
    }
    for (sequence, replacement) in user_overrides {
        table.insert(sequence, replacement);
    }
    table
}

/// An entry of the insert-symbol picklist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolChoice {
    pub label: String,
    pub symbol: &'static str,
}

const PICKABLE: &[(&str, &str)] = &[
    ("ε", "epsilon"),
    ("→", "arrow"),
    ("∪", "union"),
    ("∩", "intersection"),
    ("Σ", "sigma"),
    ("∅", "empty"),
    ("⊔", "space"),
];

/// Symbols offered by the insert-symbol command
pub fn symbol_choices(locale: Locale) -> Vec<SymbolChoice> {
    let messages = locale.messages();
    PICKABLE
        .iter()
        .map(|&(symbol, key)| SymbolChoice {
            label: format!("{} ({})", symbol, messages.symbol_name(key)),
            symbol,
        })
        .collect()
}

/// Insert `symbol` at a character caret, returning the caret after the insertion
pub fn insert_at(text: &mut String, caret: usize, symbol: &str) -> usize {
    let byte_idx = text
        .char_indices()
        .nth(caret)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    text.insert_str(byte_idx, symbol);
    text[..byte_idx + symbol.len()].chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_contain_epsilon() {
        let table = SymbolTable::defaults();
        assert_eq!(table.get("\\epsilon"), Some("ε"));
        assert_eq!(table.len(), DEFAULT_SYMBOLS.len());
    }

    #[test]
    fn test_override_keeps_position() {
        let table = build_symbol_table(DEFAULT_SYMBOLS.iter().copied(), [("\\epsilon", "λ")]);
        assert_eq!(table.get("\\epsilon"), Some("λ"));
        assert_eq!(table.iter().next().map(|e| e.sequence()), Some("\\epsilon"));
        assert_eq!(table.len(), DEFAULT_SYMBOLS.len());
    }

    #[test]
    fn test_new_keys_are_appended() {
        let table = build_symbol_table(DEFAULT_SYMBOLS.iter().copied(), [("\\lambda", "λ")]);
        assert_eq!(table.iter().last().map(|e| e.sequence()), Some("\\lambda"));
    }

    #[test]
    fn test_regex_characters_are_literal() {
        let mut table = SymbolTable::default();
        table.insert("a.b", "X");
        assert_eq!(table.decorations("axb a.b").len(), 1);
    }

    #[test]
    fn test_decorations_are_sorted() {
        let table = SymbolTable::defaults();
        let text = "q_1 -> q_0 [label=\"\\epsilon\"]";
        let decorations = table.decorations(text);

        let symbols: Vec<_> = decorations.iter().map(|d| d.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["₁", "₀", "ε"]);
        assert_eq!(&text[decorations[2].range.clone()], "\\epsilon");
    }

    #[test]
    fn test_symbol_choices_localised() {
        let en = symbol_choices(Locale::En);
        let es = symbol_choices(Locale::Es);
        assert_eq!(en.len(), 7);
        assert_eq!(en[0].label, "ε (epsilon)");
        assert_eq!(es[1].label, "→ (flecha)");
        assert_eq!(es[1].symbol, "→");
    }

    #[test]
    fn test_insert_at_caret() {
        let mut text = String::from("q0 q1");
        let caret = insert_at(&mut text, 2, "→");
        assert_eq!(text, "q0→ q1");
        assert_eq!(caret, 3);

        let caret = insert_at(&mut text, 100, "ε");
        assert_eq!(text, "q0→ q1ε");
        assert_eq!(caret, 7);
    }
}
