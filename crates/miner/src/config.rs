// ABOUTME: Run configuration for the statement miner: paths, delimiters, service backend, timeouts.
// ABOUTME: Config is built once (TOML file and/or ConfigBuilder) and passed by reference afterwards.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use statement_text::TransliterationTable;

use crate::dataset::Delimiters;
use crate::error::MinerError;

/// Which collaborator submits statements to the metrics service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Talk to the service's web form directly over HTTP.
    #[default]
    Http,
    /// Hand each statement to an external program that drives a browser.
    Command,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Backend::Http => "http",
            Backend::Command => "command",
        };
        write!(f, "{}", s)
    }
}

impl From<&str> for Backend {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "command" | "cmd" | "browser" => Backend::Command,
            _ => Backend::Http,
        }
    }
}

/// Configuration for a mining run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dataset_file: PathBuf,
    pub txt_dir: PathBuf,
    pub metrics_dir: PathBuf,
    pub output_file: PathBuf,
    pub delimiters: Delimiters,
    pub backend: Backend,
    pub service_url: String,
    /// Element id of the statement text area on the service page.
    pub text_control: String,
    /// Element id of the export/download control on the result page.
    pub export_control: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    /// File name the service gives every download.
    pub download_filename: String,
    pub poll_interval_ms: u64,
    /// 0 waits forever.
    pub download_timeout_secs: u64,
    /// Program and arguments for the command backend.
    pub submit_command: Vec<String>,
    /// Extra symbol replacements layered on the built-in table.
    pub transliteration: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset_file: PathBuf::from("datasets/enunciados.csv"),
            txt_dir: PathBuf::from("enunciados/txt"),
            metrics_dir: PathBuf::from("enunciados/coh-metrix"),
            output_file: PathBuf::from("datasets/enunciado-metricas.csv"),
            delimiters: Delimiters::default(),
            backend: Backend::Http,
            service_url: "http://fw.nilc.icmc.usp.br:23380/cohmetrixport".to_string(),
            text_control: "text".to_string(),
            export_control: "export".to_string(),
            user_agent: "statement-miner/0.1".to_string(),
            request_timeout_secs: 300,
            download_filename: "data.csv".to_string(),
            poll_interval_ms: 1000,
            download_timeout_secs: 600,
            submit_command: Vec::new(),
            transliteration: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Load a TOML file; missing keys keep their defaults.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, MinerError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            MinerError::config(path.display().to_string(), "read config", Some(e.into()))
        })?;
        Self::from_toml_str(&raw)
            .map_err(|e| MinerError::config(path.display().to_string(), e.op, e.source))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, MinerError> {
        toml::from_str(raw).map_err(|e| MinerError::config("<toml>", "parse config", Some(e.into())))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn download_timeout(&self) -> Option<Duration> {
        match self.download_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Where the metrics artifact of statement `id` lives.
    pub fn metrics_path(&self, id: &str) -> PathBuf {
        self.metrics_dir.join(format!("{}.csv", id))
    }

    /// Where the normalized text of statement `id` lives.
    pub fn text_path(&self, id: &str) -> PathBuf {
        self.txt_dir.join(format!("{}.txt", id))
    }

    /// The built-in transliteration table plus configured extras.
    pub fn transliteration_table(&self) -> Result<TransliterationTable, MinerError> {
        let mut table = TransliterationTable::default();
        for (key, replacement) in &self.transliteration {
            let mut chars = key.chars();
            let symbol = match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => {
                    return Err(MinerError::config(
                        key.clone(),
                        "transliteration",
                        Some(anyhow::anyhow!("key must be a single character")),
                    ))
                }
            };
            table.insert(symbol, replacement.clone()).map_err(|c| {
                MinerError::config(
                    c.to_string(),
                    "transliteration",
                    Some(anyhow::anyhow!("allow-listed characters cannot be replaced")),
                )
            })?;
        }
        Ok(table)
    }
}

/// Builder for constructing a Config with custom settings.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new ConfigBuilder with default settings.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Start from an existing configuration, e.g. one loaded from a file.
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    pub fn dataset_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.dataset_file = path.into();
        self
    }

    pub fn txt_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.txt_dir = path.into();
        self
    }

    pub fn metrics_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.metrics_dir = path.into();
        self
    }

    pub fn output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_file = path.into();
        self
    }

    pub fn delimiters(mut self, delimiters: Delimiters) -> Self {
        self.config.delimiters = delimiters;
        self
    }

    pub fn backend(mut self, backend: Backend) -> Self {
        self.config.backend = backend;
        self
    }

    pub fn service_url(mut self, url: impl Into<String>) -> Self {
        self.config.service_url = url.into();
        self
    }

    pub fn controls(mut self, text: impl Into<String>, export: impl Into<String>) -> Self {
        self.config.text_control = text.into();
        self.config.export_control = export.into();
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout_secs = timeout.as_secs();
        self
    }

    pub fn download_filename(mut self, name: impl Into<String>) -> Self {
        self.config.download_filename = name.into();
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// `None` polls for the download without a deadline.
    pub fn download_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.download_timeout_secs = timeout.map(|t| t.as_secs().max(1)).unwrap_or(0);
        self
    }

    pub fn submit_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.submit_command = command.into_iter().map(Into::into).collect();
        self
    }

    pub fn transliteration(mut self, symbol: impl Into<String>, replacement: impl Into<String>) -> Self {
        self.config
            .transliteration
            .insert(symbol.into(), replacement.into());
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
