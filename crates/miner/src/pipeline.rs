// ABOUTME: Drives statements one at a time through normalization, submission and artifact persistence.
// ABOUTME: Statements whose metrics file already exists are skipped, so an interrupted run can resume.

use std::fs;
use std::path::Path;

use anyhow::anyhow;
use serde::Serialize;
use statement_text::Normalizer;

use crate::config::Config;
use crate::dataset::{read_dataset, Statement};
use crate::error::MinerError;
use crate::metrics::merge_metrics_dir;
use crate::service::MetricsService;

/// What a run did, in dataset order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub processed: Vec<String>,
    pub skipped: Vec<String>,
    /// Rows in the merged table, when a merge ran.
    pub merged_rows: Option<usize>,
}

/// Reads the dataset and processes every statement in it.
pub fn run(
    config: &Config,
    normalizer: &Normalizer,
    service: &mut dyn MetricsService,
) -> Result<RunSummary, MinerError> {
    let statements = read_dataset(&config.dataset_file, &config.delimiters)?;
    process_statements(config, normalizer, service, &statements)
}

/// Runs the pipeline, then merges the metrics directory into the output file.
pub fn run_and_merge(
    config: &Config,
    normalizer: &Normalizer,
    service: &mut dyn MetricsService,
) -> Result<RunSummary, MinerError> {
    let mut summary = run(config, normalizer, service)?;
    summary.merged_rows = Some(merge(config)?);
    Ok(summary)
}

/// Merges the configured metrics directory into the configured output file.
pub fn merge(config: &Config) -> Result<usize, MinerError> {
    merge_metrics_dir(
        &config.metrics_dir,
        &config.output_file,
        &[config.download_filename.as_str()],
    )
}

/// Processes `statements` strictly in order, one submission at a time.
pub fn process_statements(
    config: &Config,
    normalizer: &Normalizer,
    service: &mut dyn MetricsService,
    statements: &[Statement],
) -> Result<RunSummary, MinerError> {
    create_dir(&config.txt_dir)?;
    create_dir(&config.metrics_dir)?;

    let mut summary = RunSummary::default();
    for statement in statements {
        let id = statement.id.as_str();
        check_id(id, &config.download_filename)?;

        let artifact = config.metrics_path(id);
        if artifact.exists() {
            tracing::info!(id, "metrics already present, skipping");
            summary.skipped.push(id.to_string());
            continue;
        }

        let text = normalizer.clean_statement(&statement.raw_markup);
        let text_path = config.text_path(id);
        fs::write(&text_path, &text).map_err(|e| {
            MinerError::io(text_path.display().to_string(), "write statement text", Some(e.into()))
        })?;
        tracing::info!(id, path = %text_path.display(), "statement text saved");

        service
            .submit(&text)
            .map_err(|e| MinerError::submission(id, "submit", Some(e.into())))?;
        let bytes = service
            .fetch_result()
            .map_err(|e| MinerError::submission(id, "fetch_result", Some(e.into())))?;

        persist_artifact(&artifact, &bytes)?;
        tracing::info!(id, path = %artifact.display(), "metrics saved");
        summary.processed.push(id.to_string());
    }

    tracing::info!(
        processed = summary.processed.len(),
        skipped = summary.skipped.len(),
        "run finished"
    );
    Ok(summary)
}

fn create_dir(path: &Path) -> Result<(), MinerError> {
    fs::create_dir_all(path)
        .map_err(|e| MinerError::io(path.display().to_string(), "create dir", Some(e.into())))
}

/// Ids become file names, and no metrics file may take the download's name.
fn check_id(id: &str, download_filename: &str) -> Result<(), MinerError> {
    let unusable = id == "."
        || id == ".."
        || id.contains(['/', '\\', '\0'])
        || id.ends_with(".part");
    if unusable {
        return Err(MinerError::dataset(
            id,
            "check statement id",
            Some(anyhow!("id is not usable as a file name")),
        ));
    }
    if format!("{}.csv", id) == download_filename {
        return Err(MinerError::dataset(
            id,
            "check statement id",
            Some(anyhow!("id clashes with the download file '{}'", download_filename)),
        ));
    }
    Ok(())
}

/// Writes next to the final name and renames, so the artifact that resume
/// checks for is never partial.
fn persist_artifact(path: &Path, bytes: &[u8]) -> Result<(), MinerError> {
    let partial = path.with_extension("csv.part");
    let target = path.display().to_string();
    fs::write(&partial, bytes)
        .map_err(|e| MinerError::io(&target, "write metrics", Some(e.into())))?;
    fs::rename(&partial, path)
        .map_err(|e| MinerError::io(&target, "rename metrics", Some(e.into())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_id() {
        assert!(check_id("1234", "data.csv").is_ok());
        assert!(check_id("lista-3_q2", "data.csv").is_ok());
        assert!(check_id("../etc", "data.csv").unwrap_err().is_dataset());
        assert!(check_id("..", "data.csv").is_err());
        assert!(check_id("a\\b", "data.csv").is_err());
    }

    #[test]
    fn test_check_id_rejects_download_name() {
        let err = check_id("data", "data.csv").unwrap_err();
        assert!(err.is_dataset());
        assert!(err.to_string().contains("data.csv"), "{}", err);
        assert!(check_id("data", "export.csv").is_ok());
        assert!(check_id("data2", "data.csv").is_ok());
    }

    #[test]
    fn test_persist_artifact_leaves_no_partial() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("q1.csv");
        persist_artifact(&path, b"Metric,Value\n").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"Metric,Value\n");
        assert!(!dir.path().join("q1.csv.part").exists());
    }
}
