// ABOUTME: Command backend for the metrics service: an external browser-automation program submits the text.
// ABOUTME: The metrics file is picked up from the download directory by polling with an optional deadline.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use super::{MetricsService, ServiceError};
use crate::config::Config;

/// Environment variable telling the submit program where downloads land.
pub const DOWNLOAD_DIR_ENV: &str = "STATEMENT_MINER_DOWNLOAD_DIR";

/// Runs an external program per statement and collects the file it downloads.
///
/// The program receives the statement on stdin. The service names its
/// download itself, so the file is expected under a fixed name in the
/// download directory.
#[derive(Debug, Clone)]
pub struct CommandMetricsService {
    program: String,
    args: Vec<String>,
    download_dir: PathBuf,
    download_path: PathBuf,
    poll_interval: Duration,
    timeout: Option<Duration>,
}

impl CommandMetricsService {
    pub fn new(
        command: &[String],
        download_dir: impl Into<PathBuf>,
        download_filename: &str,
    ) -> Result<Self, ServiceError> {
        let (program, args) = command.split_first().ok_or(ServiceError::EmptyCommand)?;
        let download_dir = download_dir.into();
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            download_path: download_dir.join(download_filename),
            download_dir,
            poll_interval: Duration::from_secs(1),
            timeout: None,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        Ok(Self::new(
            &config.submit_command,
            &config.metrics_dir,
            &config.download_filename,
        )?
        .poll_interval(config.poll_interval())
        .timeout(config.download_timeout()))
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// `None` waits for the download indefinitely.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn download_path(&self) -> &Path {
        &self.download_path
    }

    /// A leftover download from an interrupted run would be mistaken for the
    /// next statement's metrics.
    fn clear_stale_download(&self) -> Result<(), ServiceError> {
        if self.download_path.is_file() {
            tracing::warn!(path = %self.download_path.display(), "removing stale download");
            fs::remove_file(&self.download_path)?;
        }
        Ok(())
    }
}

impl MetricsService for CommandMetricsService {
    fn submit(&mut self, text: &str) -> Result<(), ServiceError> {
        self.clear_stale_download()?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env(DOWNLOAD_DIR_ENV, &self.download_dir)
            .stdin(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(text.as_bytes()) {
                // The program may exit without reading its input.
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
                other => other?,
            }
        }

        let status = child.wait()?;
        if !status.success() {
            return Err(ServiceError::Command {
                program: self.program.clone(),
                status: status.to_string(),
            });
        }
        Ok(())
    }

    fn fetch_result(&mut self) -> Result<Vec<u8>, ServiceError> {
        wait_for_download(&self.download_path, self.poll_interval, self.timeout)?;
        let bytes = fs::read(&self.download_path)?;
        fs::remove_file(&self.download_path)?;
        Ok(bytes)
    }
}

/// Polls until `path` exists, then requires it to be a regular file.
pub fn wait_for_download(
    path: &Path,
    interval: Duration,
    timeout: Option<Duration>,
) -> Result<(), ServiceError> {
    let start = Instant::now();
    loop {
        match fs::metadata(path) {
            Ok(meta) if meta.is_file() => return Ok(()),
            Ok(_) => {
                return Err(ServiceError::NotAFile {
                    path: path.to_path_buf(),
                })
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let waited = start.elapsed();
        if timeout.is_some_and(|limit| waited >= limit) {
            return Err(ServiceError::DownloadTimeout {
                path: path.to_path_buf(),
                waited,
            });
        }
        tracing::debug!(path = %path.display(), waited_ms = waited.as_millis() as u64, "waiting for download");
        thread::sleep(interval);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    fn service(dir: &TempDir, script: &str) -> CommandMetricsService {
        CommandMetricsService::new(&sh(script), dir.path(), "data.csv")
            .unwrap()
            .poll_interval(Duration::from_millis(10))
            .timeout(Some(Duration::from_millis(300)))
    }

    #[test]
    fn test_submit_and_fetch_downloaded_file() {
        let dir = TempDir::new().unwrap();
        let mut svc = service(&dir, r#"cat > "$STATEMENT_MINER_DOWNLOAD_DIR/data.csv""#);

        svc.submit("leia dois números").unwrap();
        let bytes = svc.fetch_result().unwrap();

        assert_eq!(String::from_utf8(bytes).unwrap(), "leia dois números");
        assert!(!svc.download_path().exists(), "download should be consumed");
    }

    #[test]
    fn test_stale_download_is_removed_before_submit() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("data.csv"), "stale").unwrap();
        let mut svc = service(&dir, "cat > /dev/null");

        svc.submit("x").unwrap();
        let err = svc.fetch_result().unwrap_err();
        assert!(err.is_timeout(), "{}", err);
    }

    #[test]
    fn test_failing_command() {
        let dir = TempDir::new().unwrap();
        let mut svc = service(&dir, "exit 3");
        let err = svc.submit("x").unwrap_err();
        assert!(matches!(err, ServiceError::Command { .. }), "{}", err);
    }

    #[test]
    fn test_download_that_is_not_a_file() {
        let dir = TempDir::new().unwrap();
        let mut svc = service(&dir, r#"mkdir "$STATEMENT_MINER_DOWNLOAD_DIR/data.csv""#);
        svc.submit("x").unwrap();
        let err = svc.fetch_result().unwrap_err();
        assert!(matches!(err, ServiceError::NotAFile { .. }), "{}", err);
    }

    #[test]
    fn test_empty_command() {
        let err = CommandMetricsService::new(&[], "/tmp", "data.csv").unwrap_err();
        assert!(matches!(err, ServiceError::EmptyCommand));
    }
}
