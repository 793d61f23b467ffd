// ABOUTME: Integration tests for the statement pipeline against an in-process fake metrics service.
// ABOUTME: Tests resume semantics, artifacts on disk, error reporting and the final merge.

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use statement_miner::{
    pipeline, process_statements, Config, MetricsService, ServiceError, Statement,
};
use statement_text::Normalizer;
use tempfile::TempDir;

/// Answers every submission with a canned metrics table derived from the text.
#[derive(Default)]
struct FakeService {
    submitted: Vec<String>,
    pending: Option<String>,
    fail_on: Option<String>,
}

impl MetricsService for FakeService {
    fn submit(&mut self, text: &str) -> Result<(), ServiceError> {
        if self.fail_on.as_deref() == Some(text) {
            return Err(ServiceError::missing_control("text", "http://fake/cohmetrixport"));
        }
        self.submitted.push(text.to_string());
        self.pending = Some(text.to_string());
        Ok(())
    }

    fn fetch_result(&mut self) -> Result<Vec<u8>, ServiceError> {
        let text = self.pending.take().ok_or(ServiceError::NotSubmitted)?;
        let words = text.split_whitespace().count();
        Ok(format!(",Group,Metric,Value\n0,Basic,Words,{}\n1,Basic,Chars,{}\n", words, text.len()).into_bytes())
    }
}

fn config(root: &Path) -> Config {
    Config::builder()
        .dataset_file(root.join("enunciados.csv"))
        .txt_dir(root.join("txt"))
        .metrics_dir(root.join("coh-metrix"))
        .output_file(root.join("enunciado-metricas.csv"))
        .build()
}

const DATASET: &str = "101#;#;#<p>Leia <b>dois</b> números</p>#!#!#\n\
102#;#;#<p>Imprima a &gt; b</p>#!#!#\n\
103#;#;#<p>Some R$ 2,50 a 10%</p>#!#!#\n";

#[test]
fn run_writes_texts_and_metrics() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("enunciados.csv"), DATASET).unwrap();
    let config = config(root.path());
    let mut service = FakeService::default();

    let summary = pipeline::run(&config, &Normalizer::default(), &mut service).unwrap();

    assert_eq!(summary.processed, vec!["101", "102", "103"]);
    assert!(summary.skipped.is_empty());
    assert_eq!(
        service.submitted,
        vec![
            "leia dois números",
            "imprima a maior que b",
            "some BRL a número",
        ]
    );
    assert_eq!(
        fs::read_to_string(config.text_path("102")).unwrap(),
        "imprima a maior que b"
    );
    assert!(config.metrics_path("103").is_file());
}

#[test]
fn rerun_skips_completed_statements() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("enunciados.csv"), DATASET).unwrap();
    let config = config(root.path());

    fs::create_dir_all(&config.metrics_dir).unwrap();
    let existing = ",Group,Metric,Value\n0,Basic,Words,99\n";
    fs::write(config.metrics_path("102"), existing).unwrap();

    let mut service = FakeService::default();
    let summary = pipeline::run_and_merge(&config, &Normalizer::default(), &mut service).unwrap();
    assert_eq!(summary.processed, vec!["101", "103"]);
    assert_eq!(summary.skipped, vec!["102"]);
    assert!(!service.submitted.contains(&"imprima a maior que b".to_string()));
    assert_eq!(fs::read_to_string(config.metrics_path("102")).unwrap(), existing);
    assert!(!config.text_path("102").exists());

    // a second run has nothing left to submit
    let mut service = FakeService::default();
    let summary = pipeline::run_and_merge(&config, &Normalizer::default(), &mut service).unwrap();
    assert!(service.submitted.is_empty());
    assert_eq!(summary.skipped, vec!["101", "102", "103"]);
    assert_eq!(summary.merged_rows, Some(3));

    let merged = fs::read_to_string(&config.output_file).unwrap();
    assert_eq!(
        merged,
        "id,Words,Chars\n101,3,18\n102,99,\n103,4,18\n"
    );
}

#[test]
fn service_failure_names_statement_and_control() {
    let root = TempDir::new().unwrap();
    let config = config(root.path());
    let statements = vec![
        Statement {
            id: "7".to_string(),
            raw_markup: "<p>primeiro</p>".to_string(),
        },
        Statement {
            id: "8".to_string(),
            raw_markup: "<p>segundo</p>".to_string(),
        },
    ];
    let mut service = FakeService {
        fail_on: Some("segundo".to_string()),
        ..FakeService::default()
    };

    let err = process_statements(&config, &Normalizer::default(), &mut service, &statements)
        .unwrap_err();

    assert!(err.is_submission());
    let message = err.to_string();
    assert!(message.contains(" 8:"), "{}", message);
    assert!(message.contains("'#text'"), "{}", message);
    assert!(config.metrics_path("7").is_file());
    assert!(!config.metrics_path("8").exists());
}

#[test]
fn missing_dataset_is_dataset_error() {
    let root = TempDir::new().unwrap();
    let config = config(root.path());
    let err = pipeline::run(&config, &Normalizer::default(), &mut FakeService::default())
        .unwrap_err();
    assert!(err.is_dataset());
}

#[test]
fn id_matching_download_name_is_refused() {
    let root = TempDir::new().unwrap();
    let config = config(root.path());
    let statements = vec![
        Statement {
            id: "q1".to_string(),
            raw_markup: "<p>primeiro</p>".to_string(),
        },
        Statement {
            id: "data".to_string(),
            raw_markup: "<p>segundo</p>".to_string(),
        },
    ];
    let mut service = FakeService::default();

    let err = process_statements(&config, &Normalizer::default(), &mut service, &statements)
        .unwrap_err();

    assert!(err.is_dataset(), "{}", err);
    assert_eq!(service.submitted, vec!["primeiro"]);
    assert!(!config.metrics_path("data").exists());
    assert_eq!(pipeline::merge(&config).unwrap(), 1);
}
