// ABOUTME: Reader for the delimited statement dataset exported from Codebench.
// ABOUTME: Splits blocks into (id, markup) statements and decodes non-UTF-8 exports.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::MinerError;

/// Separators used by the dataset export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Delimiters {
    /// Between statements.
    pub record: String,
    /// Between a statement's id and its markup.
    pub field: String,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            record: "#!#!#".to_string(),
            field: "#;#;#".to_string(),
        }
    }
}

/// One question statement as exported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statement {
    pub id: String,
    pub raw_markup: String,
}

/// Splits a dataset into statements, in file order.
///
/// Blank blocks, blocks without a field separator and blocks with an empty id
/// are skipped.
pub fn parse_statements(text: &str, delimiters: &Delimiters) -> Vec<Statement> {
    let mut statements = Vec::new();

    for (index, block) in text.split(delimiters.record.as_str()).enumerate() {
        if block.trim().is_empty() {
            continue;
        }
        let Some((id, markup)) = block.split_once(delimiters.field.as_str()) else {
            tracing::debug!(block = index, "skipping block without field separator");
            continue;
        };
        let id = id.trim();
        if id.is_empty() {
            tracing::debug!(block = index, "skipping block with empty id");
            continue;
        }
        statements.push(Statement {
            id: id.to_string(),
            raw_markup: markup.to_string(),
        });
    }

    statements
}

/// Reads and splits the dataset file at `path`.
pub fn read_dataset(path: impl AsRef<Path>, delimiters: &Delimiters) -> Result<Vec<Statement>, MinerError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| {
        MinerError::dataset(path.display().to_string(), "read dataset", Some(e.into()))
    })?;
    let text = decode_bytes(&bytes);
    let statements = parse_statements(&text, delimiters);
    tracing::info!(path = %path.display(), statements = statements.len(), "loaded dataset");
    Ok(statements)
}

/// Decodes UTF-8 directly and anything else by detection.
pub fn decode_bytes(bytes: &[u8]) -> String {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.strip_prefix('\u{feff}').unwrap_or(text).to_string();
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    tracing::debug!(encoding = encoding.name(), "dataset is not UTF-8, decoding by detection");
    let (decoded, _, _) = encoding.decode(bytes);
    decoded.into_owned()
}
