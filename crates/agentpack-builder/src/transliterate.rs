// ABOUTME: ASCII transliteration for display text and wire identifiers.
// ABOUTME: The Transliterator trait isolates the text backend; the default uses deunicode.

/// Identifier used when a name has no letters or digits to keep.
pub const FALLBACK_IDENTIFIER: &str = "param";

/// Deterministic conversion of arbitrary Unicode text to ASCII.
pub trait Transliterator: Send + Sync {
    /// Transliterate free text, keeping words separated by single spaces.
    fn text(&self, input: &str) -> String;

    /// Transliterate a name into a lowercase ASCII identifier. ASCII names
    /// pass through unchanged.
    fn identifier(&self, input: &str) -> String {
        if input.is_ascii() {
            return input.to_string();
        }
        let identifier: String = self
            .text(input)
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        if identifier.is_empty() {
            FALLBACK_IDENTIFIER.to_string()
        } else {
            identifier
        }
    }
}

/// Transliterator backed by the `deunicode` tables (pinyin for Han script,
/// romanization for other scripts, accent stripping for Latin).
#[derive(Debug, Clone, Copy, Default)]
pub struct DeunicodeTransliterator;

impl Transliterator for DeunicodeTransliterator {
    fn text(&self, input: &str) -> String {
        if input.is_ascii() {
            return input.to_string();
        }
        deunicode::deunicode(input)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}
