// ABOUTME: Text normalization core for question statements.
// ABOUTME: Provides HTML text extraction, pattern rewriting, and special-character transliteration.

//! Statement text normalization.
//!
//! A statement goes through three pure steps:
//!
//! 1. [`text_from_html`] keeps the visible text of the markup,
//! 2. [`normalize_patterns`] rewrites URLs, LaTeX, BRL amounts and numerals,
//! 3. [`TransliterationTable::transliterate`] spells out or blanks symbols.
//!
//! ```
//! use statement_text::Normalizer;
//!
//! let normalizer = Normalizer::default();
//! let text = normalizer.clean_statement("<p>Some R$ 1.234,56 &gt; 10% de 50</p>");
//! assert_eq!(text, "some BRL maior que número de número");
//! ```

pub mod html;
pub mod patterns;
pub mod transliterate;

pub use html::text_from_html;
pub use patterns::{
    apply_stages, collapse_whitespace, normalize_patterns, stage, standard_stages, RewriteStage,
    StageKind,
};
pub use transliterate::{is_allowed, remove_special_chars, TransliterationTable};

/// Chains extraction, pattern rewriting and transliteration.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    table: TransliterationTable,
}

impl Normalizer {
    pub fn new(table: TransliterationTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &TransliterationTable {
        &self.table
    }

    /// Extracted, lower-cased and pattern-normalized text, before transliteration.
    pub fn clean_markup(&self, html: &str) -> String {
        normalize_patterns(&text_from_html(html).to_lowercase())
    }

    /// Full normalization of one statement's markup.
    pub fn clean_statement(&self, html: &str) -> String {
        self.table.transliterate(&self.clean_markup(html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_clean_statement_end_to_end() {
        let html = r#"<div><p>Faça um programa que leia <b>N</b> valores (N &le; 100).</p>
            <p>Se o saldo for maior que R$ 1.500,00, imprima "OK".</p>
            <!-- gabarito: 42 --></div>"#;
        assert_eq!(
            Normalizer::default().clean_statement(html),
            "faça um programa que leia n valores (n menor ou igual número ). se o saldo for maior que BRL , imprima ok ."
        );
    }

    #[test]
    fn test_clean_markup_keeps_symbols() {
        assert_eq!(
            Normalizer::default().clean_markup("<p>A + B = 3</p>"),
            "a + b = número"
        );
    }
}
