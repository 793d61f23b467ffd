// ABOUTME: Table-driven replacement of special characters by spelled-out Portuguese words.
// ABOUTME: Allow-listed letters, digits and accented vowels are never touched; unknown symbols pass through.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::patterns::collapse_whitespace;

/// Accented letters that belong to the allow-listed class.
const ACCENTED: &str = "áéíóúàèìòùâêîôûãẽĩõũçÁÉÍÓÚÀÈÌÒÙÂÊÎÔÛÃẼĨÕŨÇ";

/// Built-in symbol table.
const BUILTIN_ENTRIES: &[(char, &str)] = &[
    ('\u{0131}', "i"), // dotless i
    ('\u{0155}', "r"), // r with acute
    ('\u{03b1}', " alfa "),
    ('@', " arroba "),
    ('#', " cerquilha "),
    ('\u{2206}', " delta "),
    ('$', " dólar "),
    ('\u{00b0}', " graus "),
    ('\u{221e}', " infinito "),
    ('\u{0142}', " libra "),
    ('\u{2113}', " litro "),
    ('\u{03c9}', " ohm "),
    ('\u{00b2}', " ao quadrado "),
    ('\u{00b3}', " ao cubo "),
    ('\u{221a}', " raiz quadrada "),
    ('+', " mais "),
    ('\u{2212}', " menos "),
    ('\u{00d7}', " multiplicação "),
    ('=', " igual "),
    ('\u{2264}', " menor ou igual "),
    ('\u{2265}', " maior ou igual que "),
    ('>', " maior que "),
    ('<', " menor que "),
    ('\u{03c0}', " pi "),
    ('\u{00f7}', " divisão "),
    (';', ". "),
    ('\u{22c5}', " "), // dot operator
    ('\u{2219}', " "), // bullet operator
    ('\u{00b7}', " "), // middle dot
    ('/', " "),
    ('\\', " "),
    ('|', " "),
    ('\u{2192}', " "), // rightwards arrow
    ('\u{2013}', " "), // en dash
    ('\'', " "),
    ('\u{2019}', " "),
    ('\u{2018}', " "),
    ('"', " "),
    ('\u{201c}', " "),
    ('\u{201d}', " "),
    ('\u{00b4}', " "), // acute accent
    ('`', " "),
    ('^', " "),
    ('&', " "),
    ('\u{2026}', " "), // ellipsis
];

/// True for characters the transliterator never rewrites.
pub fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || ACCENTED.contains(c)
}

/// Mapping from a symbol to its replacement text.
#[derive(Debug, Clone)]
pub struct TransliterationTable {
    entries: HashMap<char, Cow<'static, str>>,
}

impl TransliterationTable {
    /// A table with no entries; every character passes through.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Adds or overrides an entry. Allow-listed characters are refused and
    /// returned as `Err`, since they would never be looked up.
    pub fn insert(
        &mut self,
        symbol: char,
        replacement: impl Into<Cow<'static, str>>,
    ) -> Result<(), char> {
        if is_allowed(symbol) {
            return Err(symbol);
        }
        self.entries.insert(symbol, replacement.into());
        Ok(())
    }

    pub fn get(&self, symbol: char) -> Option<&str> {
        self.entries.get(&symbol).map(|r| r.as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replaces every listed symbol, then collapses whitespace and trims.
    ///
    /// Replacements are character-disjoint, so a single pass gives the same
    /// result as substituting each distinct symbol in turn.
    pub fn transliterate(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            if is_allowed(c) {
                out.push(c);
                continue;
            }
            match self.entries.get(&c) {
                Some(replacement) => out.push_str(replacement),
                None => out.push(c),
            }
        }
        collapse_whitespace(&out)
    }
}

impl Default for TransliterationTable {
    fn default() -> Self {
        let entries = BUILTIN_ENTRIES
            .iter()
            .map(|&(symbol, replacement)| (symbol, Cow::Borrowed(replacement)))
            .collect();
        Self { entries }
    }
}

/// Transliterates with the built-in table.
pub fn remove_special_chars(text: &str) -> String {
    TransliterationTable::default().transliterate(text)
}
