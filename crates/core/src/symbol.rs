//! Instrument identifiers as read from the external list.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A normalized instrument identifier: trimmed, uppercase, non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Normalizes a raw list entry. Returns `None` for blank input.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_uppercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Symbol {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| "symbol cannot be empty".to_string())
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

/// Turns raw list entries into symbols.
///
/// Entries are trimmed and uppercased, blanks are dropped, and the first
/// remaining entry is discarded when it matches one of `header_tokens`
/// (case-insensitive). Order and duplicates are preserved.
pub fn normalize_symbols<S: AsRef<str>>(raw: &[S], header_tokens: &[String]) -> Vec<Symbol> {
    let mut symbols: Vec<Symbol> = raw.iter().filter_map(|s| Symbol::parse(s.as_ref())).collect();

    let is_header = symbols.first().is_some_and(|first| {
        header_tokens
            .iter()
            .any(|token| token.trim().eq_ignore_ascii_case(first.as_str()))
    });
    if is_header {
        symbols.remove(0);
    }

    symbols
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers() -> Vec<String> {
        vec!["TICKER".to_string(), "SYMBOL".to_string()]
    }

    #[test]
    fn parse_trims_and_uppercases() {
        let symbol = Symbol::parse("  aapl ").unwrap();
        assert_eq!(symbol.as_str(), "AAPL");
        assert!(Symbol::parse("   ").is_none());
    }

    #[test]
    fn normalize_drops_blanks_and_header() {
        let raw = ["Ticker", " msft", "", "  ", "nvda "];
        let symbols = normalize_symbols(&raw, &headers());
        let names: Vec<&str> = symbols.iter().map(Symbol::as_str).collect();
        assert_eq!(names, vec!["MSFT", "NVDA"]);
    }

    #[test]
    fn header_only_recognized_in_first_position() {
        let raw = ["AAPL", "symbol"];
        let symbols = normalize_symbols(&raw, &headers());
        let names: Vec<&str> = symbols.iter().map(Symbol::as_str).collect();
        assert_eq!(names, vec!["AAPL", "SYMBOL"]);
    }

    #[test]
    fn header_after_leading_blanks_is_still_first() {
        let raw = ["", "TICKER", "amd"];
        let symbols = normalize_symbols(&raw, &headers());
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].as_str(), "AMD");
    }

    #[test]
    fn duplicates_are_preserved_in_order() {
        let raw = ["aapl", "tsla", "AAPL"];
        let symbols = normalize_symbols(&raw, &[]);
        let names: Vec<&str> = symbols.iter().map(Symbol::as_str).collect();
        assert_eq!(names, vec!["AAPL", "TSLA", "AAPL"]);
    }

    #[test]
    fn symbol_deserializes_normalized() {
        let symbol: Symbol = serde_json::from_str("\" spy \"").unwrap();
        assert_eq!(symbol.as_str(), "SPY");
        assert!(serde_json::from_str::<Symbol>("\"\"").is_err());
    }
}
