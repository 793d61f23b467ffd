// ABOUTME: The metrics-service collaborator: submit one statement, then fetch its metrics file.
// ABOUTME: Backends are HTTP form submission and an external browser-automation command.

//! Metrics service backends.
//!
//! The readability metrics are computed by a third-party web tool that takes
//! one statement at a time. Every backend implements [`MetricsService`], so
//! the pipeline can be driven by the HTTP form client, by an external
//! browser-automation command, or by an in-process fake in tests.

pub mod command;
pub mod http;

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::config::{Backend, Config};
use crate::error::MinerError;

pub use command::{wait_for_download, CommandMetricsService, DOWNLOAD_DIR_ENV};
pub use http::HttpMetricsService;

/// A service that turns one statement into one metrics file.
pub trait MetricsService {
    /// Hands `text` to the service.
    fn submit(&mut self, text: &str) -> Result<(), ServiceError>;

    /// Returns the metrics file for the last submission, blocking until it
    /// is available.
    fn fetch_result(&mut self) -> Result<Vec<u8>, ServiceError>;
}

/// Errors raised by metrics-service backends.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The page has no element with the expected id.
    #[error("control '#{control}' not found on {page}")]
    MissingControl { control: String, page: String },

    #[error("fetch requested before any statement was submitted")]
    NotSubmitted,

    /// The export control exists but points nowhere.
    #[error("export control '#{control}' has no download target")]
    UnresolvableExport { control: String },

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("submit command is empty")]
    EmptyCommand,

    #[error("'{program}' exited with {status}")]
    Command { program: String, status: String },

    #[error("download {} did not appear within {:?}", .path.display(), .waited)]
    DownloadTimeout { path: PathBuf, waited: Duration },

    #[error("download {} is not a regular file", .path.display())]
    NotAFile { path: PathBuf },
}

impl ServiceError {
    pub fn missing_control(control: impl Into<String>, page: impl Into<String>) -> Self {
        ServiceError::MissingControl {
            control: control.into(),
            page: page.into(),
        }
    }

    /// Returns true if a page control was missing.
    pub fn is_missing_control(&self) -> bool {
        matches!(self, ServiceError::MissingControl { .. })
    }

    /// Returns true if the download never showed up.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ServiceError::DownloadTimeout { .. })
    }
}

/// Builds the backend selected by `config`.
pub fn from_config(config: &Config) -> Result<Box<dyn MetricsService>, MinerError> {
    let service: Box<dyn MetricsService> = match config.backend {
        Backend::Http => Box::new(
            HttpMetricsService::from_config(config)
                .map_err(|e| MinerError::config(&config.service_url, "http backend", Some(e.into())))?,
        ),
        Backend::Command => Box::new(
            CommandMetricsService::from_config(config).map_err(|e| {
                MinerError::config(config.submit_command.join(" "), "command backend", Some(e.into()))
            })?,
        ),
    };
    tracing::debug!(backend = %config.backend, "metrics service ready");
    Ok(service)
}
