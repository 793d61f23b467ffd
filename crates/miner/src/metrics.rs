// ABOUTME: Merges per-statement metrics tables into one wide CSV indexed by statement id.
// ABOUTME: Each source table lists (Metric, Value) rows; index and Group columns are discarded.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use serde::Serialize;

use crate::error::MinerError;

pub const METRIC_COLUMN: &str = "Metric";
pub const VALUE_COLUMN: &str = "Value";
pub const GROUP_COLUMN: &str = "Group";

/// Headers the unnamed leading index column may carry.
const INDEX_HEADERS: &[&str] = &["", "Unnamed: 0"];

/// Header of the id column in the merged table.
pub const ID_COLUMN: &str = "id";

/// Reads one per-statement table as `(metric, value)` pairs in file order.
///
/// The table must start with an unnamed index column and carry `Metric`,
/// `Value` and `Group` columns.
pub fn read_metrics_table(path: &Path) -> Result<Vec<(String, String)>, MinerError> {
    let target = path.display().to_string();
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| MinerError::merge(&target, "open metrics", Some(e.into())))?;
    let headers = reader
        .headers()
        .map_err(|e| MinerError::merge(&target, "read metrics header", Some(e.into())))?
        .clone();

    let column = |name: &str| {
        headers.iter().position(|h| h.trim() == name).ok_or_else(|| {
            MinerError::merge(
                &target,
                "read metrics header",
                Some(anyhow!("missing column '{}'", name)),
            )
        })
    };
    let metric_idx = column(METRIC_COLUMN)?;
    let value_idx = column(VALUE_COLUMN)?;
    column(GROUP_COLUMN)?;
    let has_index = headers
        .get(0)
        .is_some_and(|h| INDEX_HEADERS.contains(&h.trim()));
    if !has_index {
        return Err(MinerError::merge(
            &target,
            "read metrics header",
            Some(anyhow!("missing leading index column")),
        ));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| MinerError::merge(&target, "read metrics row", Some(e.into())))?;
        let metric = record.get(metric_idx).unwrap_or_default().trim();
        if metric.is_empty() {
            continue;
        }
        let value = record.get(value_idx).unwrap_or_default().trim();
        rows.push((metric.to_string(), value.to_string()));
    }
    Ok(rows)
}

/// Metrics of many statements, one row per statement id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergedMetrics {
    /// Union of metric names, in first-seen order.
    pub metrics: Vec<String>,
    pub rows: BTreeMap<String, HashMap<String, String>>,
}

impl MergedMetrics {
    pub fn insert(&mut self, id: impl Into<String>, table: Vec<(String, String)>) {
        let row = self.rows.entry(id.into()).or_default();
        for (metric, value) in table {
            if !self.metrics.contains(&metric) {
                self.metrics.push(metric.clone());
            }
            row.insert(metric, value);
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn value(&self, id: &str, metric: &str) -> Option<&str> {
        self.rows.get(id)?.get(metric).map(String::as_str)
    }

    /// Writes the table as CSV: `id` then one column per metric; absent
    /// values are empty cells.
    pub fn write_csv<W: Write>(&self, writer: W) -> csv::Result<()> {
        let mut out = csv::Writer::from_writer(writer);
        out.write_record(std::iter::once(ID_COLUMN).chain(self.metrics.iter().map(String::as_str)))?;
        for (id, row) in &self.rows {
            let values = self
                .metrics
                .iter()
                .map(|m| row.get(m).map(String::as_str).unwrap_or(""));
            out.write_record(std::iter::once(id.as_str()).chain(values))?;
        }
        out.flush()?;
        Ok(())
    }
}

/// Metrics files in `dir`, sorted, skipping names in `ignore`.
fn metrics_files(dir: &Path, ignore: &[&str]) -> Result<Vec<PathBuf>, MinerError> {
    let entries = fs::read_dir(dir).map_err(|e| {
        MinerError::merge(dir.display().to_string(), "scan metrics dir", Some(e.into()))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| MinerError::merge(dir.display().to_string(), "scan metrics dir", Some(e.into())))?
            .path();
        let is_csv = path.extension().is_some_and(|ext| ext == "csv");
        let ignored = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| ignore.contains(&name));
        if path.is_file() && is_csv && !ignored {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Reads every metrics table in `dir`; the file stem is the statement id.
pub fn collect_metrics_dir(dir: &Path, ignore: &[&str]) -> Result<MergedMetrics, MinerError> {
    let mut merged = MergedMetrics::default();
    for path in metrics_files(dir, ignore)? {
        let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let table = read_metrics_table(&path)?;
        tracing::debug!(id, metrics = table.len(), "read metrics table");
        merged.insert(id, table);
    }
    Ok(merged)
}

/// Merges `dir` into the CSV at `output` and returns the number of rows.
///
/// Every table is read before anything is written, so a schema error leaves
/// `output` untouched.
pub fn merge_metrics_dir(dir: &Path, output: &Path, ignore: &[&str]) -> Result<usize, MinerError> {
    let mut ignore = ignore.to_vec();
    let output_name = output.file_name().and_then(|n| n.to_str());
    let same_dir = output
        .parent()
        .map(|p| if p.as_os_str().is_empty() { Path::new(".") } else { p })
        .and_then(|p| p.canonicalize().ok())
        .is_some_and(|p| dir.canonicalize().ok().as_deref() == Some(p.as_path()));
    if let (true, Some(name)) = (same_dir, output_name) {
        ignore.push(name);
    }

    let merged = collect_metrics_dir(dir, &ignore)?;

    let target = output.display().to_string();
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| MinerError::merge(&target, "create output dir", Some(e.into())))?;
    }
    let file = fs::File::create(output)
        .map_err(|e| MinerError::merge(&target, "create output", Some(e.into())))?;
    merged
        .write_csv(file)
        .map_err(|e| MinerError::merge(&target, "write output", Some(e.into())))?;

    tracing::info!(path = %output.display(), rows = merged.len(), metrics = merged.metrics.len(), "merged metrics");
    Ok(merged.len())
}
