// ABOUTME: Error types for the statement miner including ErrorCode enum and MinerError struct.
// ABOUTME: Provides categorized errors carrying the statement id or path that was in flight.

use std::fmt;

/// Error codes representing the stage of the run that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Config,
    Dataset,
    Io,
    Submission,
    Merge,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::Config => "configuration error",
            ErrorCode::Dataset => "dataset error",
            ErrorCode::Io => "I/O error",
            ErrorCode::Submission => "submission error",
            ErrorCode::Merge => "merge error",
        };
        write!(f, "{}", s)
    }
}

/// The main error type for miner operations.
///
/// `target` is the statement id for submission failures and a file path
/// otherwise.
#[derive(Debug, thiserror::Error)]
pub struct MinerError {
    pub code: ErrorCode,
    pub target: String,
    pub op: String,
    #[source]
    pub source: Option<anyhow::Error>,
}

impl fmt::Display for MinerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "statement-miner: {} {}: {}", self.op, self.target, self.code)?;
        if let Some(ref src) = self.source {
            write!(f, ": {}", src)?;
        }
        Ok(())
    }
}

impl MinerError {
    fn new(
        code: ErrorCode,
        target: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self {
            code,
            target: target.into(),
            op: op.into(),
            source,
        }
    }

    /// Create a Config error.
    pub fn config(
        target: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::Config, target, op, source)
    }

    /// Create a Dataset error.
    pub fn dataset(
        target: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::Dataset, target, op, source)
    }

    /// Create an Io error.
    pub fn io(
        target: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::Io, target, op, source)
    }

    /// Create a Submission error for the statement `id`.
    pub fn submission(
        id: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::Submission, id, op, source)
    }

    /// Create a Merge error.
    pub fn merge(
        target: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::Merge, target, op, source)
    }

    /// Returns true if this is a Config error.
    pub fn is_config(&self) -> bool {
        self.code == ErrorCode::Config
    }

    /// Returns true if this is a Dataset error.
    pub fn is_dataset(&self) -> bool {
        self.code == ErrorCode::Dataset
    }

    /// Returns true if this is an Io error.
    pub fn is_io(&self) -> bool {
        self.code == ErrorCode::Io
    }

    /// Returns true if this is a Submission error.
    pub fn is_submission(&self) -> bool {
        self.code == ErrorCode::Submission
    }

    /// Returns true if this is a Merge error.
    pub fn is_merge(&self) -> bool {
        self.code == ErrorCode::Merge
    }
}
