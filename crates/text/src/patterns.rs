// ABOUTME: Ordered regex rewrite stages for statement text: URLs, LaTeX, BRL currency, numerals.
// ABOUTME: Stages run in a fixed order, then whitespace is collapsed.

//! Pattern normalizer.
//!
//! Each [`RewriteStage`] is a set of case-insensitive patterns sharing one
//! replacement token. The standard order is URL → LaTeX → currency → numeric:
//! currency must run before the numeric stage, otherwise the digit groups of
//! `R$ 1.234,56` are consumed as a plain number and the `R$` is left behind.

use once_cell::sync::Lazy;
use regex::{Captures, Regex, RegexBuilder};

/// Country-code and generic top-level domains recognised by the URL stage.
const TLDS: &str = "com|net|org|edu|gov|mil|aero|asia|biz|cat|coop|info|int|jobs|mobi|museum|name|post|pro|tel|travel|xxx|\
ac|ad|ae|af|ag|ai|al|am|an|ao|aq|ar|as|at|au|aw|ax|az|ba|bb|bd|be|bf|bg|bh|bi|bj|bm|bn|bo|br|bs|bt|bv|bw|by|bz|\
ca|cc|cd|cf|cg|ch|ci|ck|cl|cm|cn|co|cr|cs|cu|cv|cx|cy|cz|dd|de|dj|dk|dm|do|dz|ec|ee|eg|eh|er|es|et|eu|\
fi|fj|fk|fm|fo|fr|ga|gb|gd|ge|gf|gg|gh|gi|gl|gm|gn|gp|gq|gr|gs|gt|gu|gw|gy|hk|hm|hn|hr|ht|hu|\
id|ie|il|im|in|io|iq|ir|is|it|je|jm|jo|jp|ke|kg|kh|ki|km|kn|kp|kr|kw|ky|kz|la|lb|lc|li|lk|lr|ls|lt|lu|lv|ly|\
ma|mc|md|me|mg|mh|mk|ml|mm|mn|mo|mp|mq|mr|ms|mt|mu|mv|mw|mx|my|mz|na|nc|ne|nf|ng|ni|nl|no|np|nr|nu|nz|om|\
pa|pe|pf|pg|ph|pk|pl|pm|pn|pr|ps|pt|pw|py|qa|re|ro|rs|ru|rw|sa|sb|sc|sd|se|sg|sh|si|sj|sk|sl|sm|sn|so|sr|ss|st|su|sv|sx|sy|sz|\
tc|td|tf|tg|th|tj|tk|tl|tm|tn|to|tp|tr|tt|tv|tw|tz|ua|ug|uk|us|uy|uz|va|vc|ve|vg|vi|vn|vu|wf|ws|ye|yt|yu|za|zm|zw";

/// Liberal URL grammar: scheme-prefixed or `host.tld/` URLs with a path,
/// or a bare `host.tld` captured as `bare`.
static URL_PATTERN: Lazy<String> = Lazy::new(|| {
    format!(
        r#"\b(?:(?:https?:(?:/{{1,3}}|[a-z0-9%])|[a-z0-9.\-]+[.](?:{tlds})/)(?:[^\s()<>{{}}\[\]]+|\([^\s()]*?\([^\s()]+\)[^\s()]*?\)|\([^\s]+?\))+(?:\([^\s()]*?\([^\s()]+\)[^\s()]*?\)|\([^\s]+?\)|[^\s`!()\[\]{{}};:'".,<>?«»“”‘’])|(?P<bare>[a-z0-9]+(?:[.\-][a-z0-9]+)*[.](?:{tlds})\b/?))"#,
        tlds = TLDS
    )
});

const LATEX_PATTERNS: &[&str] = &[
    r"\\\[.+?\\\]",
    r"\\\(.+?\\\)",
    r"\\frac\{[\w_]+\}\{[\w_]+\}",
];

const CURRENCY_PATTERNS: &[&str] = &[r"r\$\s?\d{1,3}(?:\.\d{3})*,\d+"];

// Percentages first so the `%` goes with its number.
const NUMERIC_PATTERNS: &[&str] = &[r"\d+(?:,\d+)?%", r"\d+(?:\.\d{3})*(?:,\d+)?"];

static STANDARD_STAGES: Lazy<Vec<RewriteStage>> = Lazy::new(|| {
    vec![
        RewriteStage::new(StageKind::Url, &[URL_PATTERN.as_str()], "")
            .unwrap()
            .with_guard(is_mail_host),
        RewriteStage::new(StageKind::Latex, LATEX_PATTERNS, " latex ").unwrap(),
        RewriteStage::new(StageKind::Currency, CURRENCY_PATTERNS, " BRL ").unwrap(),
        RewriteStage::new(StageKind::Numeric, NUMERIC_PATTERNS, " número ").unwrap(),
    ]
});

/// The rewrite families, in their standard order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Url = 0,
    Latex = 1,
    Currency = 2,
    Numeric = 3,
}

/// Decides whether a match must be left untouched.
pub type MatchGuard = fn(haystack: &str, caps: &Captures<'_>) -> bool;

/// A group of patterns that share a replacement token.
#[derive(Debug, Clone)]
pub struct RewriteStage {
    pub kind: StageKind,
    patterns: Vec<Regex>,
    replacement: &'static str,
    guard: Option<MatchGuard>,
}

impl RewriteStage {
    /// Compiles `patterns` case-insensitively.
    pub fn new(
        kind: StageKind,
        patterns: &[&str],
        replacement: &'static str,
    ) -> Result<Self, regex::Error> {
        let patterns = patterns
            .iter()
            .map(|p| RegexBuilder::new(p).case_insensitive(true).build())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            kind,
            patterns,
            replacement,
            guard: None,
        })
    }

    /// Keep matches for which `guard` returns true.
    pub fn with_guard(mut self, guard: MatchGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn replacement(&self) -> &'static str {
        self.replacement
    }

    /// Replaces every match of every pattern, in declaration order.
    pub fn apply(&self, text: &str) -> String {
        let mut current = text.to_string();
        for pattern in &self.patterns {
            let rewritten = pattern
                .replace_all(&current, |caps: &Captures<'_>| match self.guard {
                    Some(keep) if keep(&current, caps) => caps[0].to_string(),
                    _ => self.replacement.to_string(),
                })
                .into_owned();
            current = rewritten;
        }
        current
    }
}

/// A bare domain touching `@` is the host part of an e-mail address.
fn is_mail_host(haystack: &str, caps: &Captures<'_>) -> bool {
    match caps.name("bare") {
        Some(bare) => {
            haystack[..bare.start()].ends_with('@') || haystack[bare.end()..].starts_with('@')
        }
        None => false,
    }
}

/// The stages in their standard order.
pub fn standard_stages() -> &'static [RewriteStage] {
    &STANDARD_STAGES
}

/// Looks up one of the standard stages.
pub fn stage(kind: StageKind) -> &'static RewriteStage {
    &STANDARD_STAGES[kind as usize]
}

/// Runs `text` through `stages` in order, then collapses whitespace.
pub fn apply_stages<'a, I>(stages: I, text: &str) -> String
where
    I: IntoIterator<Item = &'a RewriteStage>,
{
    let rewritten = stages
        .into_iter()
        .fold(text.to_string(), |acc, stage| stage.apply(&acc));
    collapse_whitespace(&rewritten)
}

/// Applies the standard stages: URL, LaTeX, currency, numeric, whitespace.
pub fn normalize_patterns(text: &str) -> String {
    apply_stages(standard_stages(), text)
}

/// Collapses runs of whitespace into single spaces and trims the ends.
pub fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut last_was_space = false;

    for c in s.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                result.push(' ');
                last_was_space = true;
            }
        } else {
            result.push(c);
            last_was_space = false;
        }
    }

    result.trim().to_string()
}
