// ABOUTME: Main library entry point for the statement miner.
// ABOUTME: Re-exports the public API: Config, dataset reader, metrics services, pipeline and merge.

//! Statement miner - submits normalized question statements to a readability
//! metrics service and merges the per-statement results.
//!
//! # Example
//!
//! ```no_run
//! use statement_miner::{pipeline, service, Config, MinerError};
//!
//! fn main() -> Result<(), MinerError> {
//!     let config = Config::builder().dataset_file("datasets/enunciados.csv").build();
//!     let normalizer = statement_text::Normalizer::new(config.transliteration_table()?);
//!     let mut service = service::from_config(&config)?;
//!     let summary = pipeline::run_and_merge(&config, &normalizer, service.as_mut())?;
//!     println!("{} processed, {} skipped", summary.processed.len(), summary.skipped.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dataset;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod service;

pub use crate::config::{Backend, Config, ConfigBuilder};
pub use crate::dataset::{parse_statements, read_dataset, Delimiters, Statement};
pub use crate::error::{ErrorCode, MinerError};
pub use crate::metrics::{collect_metrics_dir, merge_metrics_dir, read_metrics_table, MergedMetrics};
pub use crate::pipeline::{process_statements, run, run_and_merge, RunSummary};
pub use crate::service::{
    CommandMetricsService, HttpMetricsService, MetricsService, ServiceError,
};
