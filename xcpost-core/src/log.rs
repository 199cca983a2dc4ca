//! The run log: a plain-text trace of one run, mirrored to `tracing`.

use crate::adapters::FileLogSink;
use crate::error::RunError;
use crate::ports::LogSink;
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;
use tracing::{info, warn};

/// Text written for an absent message.
pub const ABSENT: &str = "None";

/// Render an optional value the way the run log shows it.
pub fn or_none(value: Option<&str>) -> &str {
    value.unwrap_or(ABSENT)
}

/// Line-oriented log handle passed explicitly through a run.
///
/// Write failures never interrupt the run. The first one is kept and reported by
/// [`RunLog::finish`].
pub struct RunLog {
    path: Utf8PathBuf,
    sink: Box<dyn LogSink>,
    error: Option<std::io::Error>,
}

impl RunLog {
    /// Create (or truncate) the log file at `path`.
    pub fn open(path: &Utf8Path) -> Result<Self, RunError> {
        let sink = FileLogSink::create(path).map_err(|source| RunError::Log {
            path: path.to_owned(),
            source,
        })?;
        Ok(Self::with_sink(path, Box::new(sink)))
    }

    /// Log into an arbitrary sink; `path` is only used in error reports.
    pub fn with_sink(path: impl Into<Utf8PathBuf>, sink: Box<dyn LogSink>) -> Self {
        Self {
            path: path.into(),
            sink,
            error: None,
        }
    }

    /// Append one line; `None` is written as `None`.
    pub fn line(&mut self, message: Option<&str>) {
        let text = or_none(message);
        info!(target: "xcpost::run", "{text}");
        if self.error.is_some() {
            return;
        }
        if let Err(err) = self.sink.write_line(text) {
            warn!(path = %self.path, error = %err, "run log write failed");
            self.error = Some(err);
        }
    }

    /// Append one formatted line.
    pub fn record(&mut self, args: fmt::Arguments<'_>) {
        let text = args.to_string();
        self.line(Some(&text));
    }

    /// Flush and report the first write failure, if any.
    pub fn finish(mut self) -> Result<(), RunError> {
        let flushed = self.sink.flush();
        let path = self.path.clone();
        match self.error.take() {
            Some(source) => Err(RunError::Log { path, source }),
            None => flushed.map_err(|source| RunError::Log { path, source }),
        }
    }
}

impl fmt::Debug for RunLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunLog")
            .field("path", &self.path)
            .field("failed", &self.error.is_some())
            .finish()
    }
}

impl Drop for RunLog {
    fn drop(&mut self) {
        let _ = self.sink.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryLogSink;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    struct BrokenSink;

    impl LogSink for BrokenSink {
        fn write_line(&mut self, _line: &str) -> std::io::Result<()> {
            Err(std::io::Error::other("disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn absent_messages_render_as_none() {
        let sink = MemoryLogSink::new();
        let mut log = RunLog::with_sink("mem", Box::new(sink.clone()));
        log.line(Some("Xcode SDK path: /sdk"));
        log.line(None);
        log.record(format_args!("code: {}, err: {}", 1, "boom"));
        log.finish().unwrap();

        assert_eq!(
            sink.lines(),
            vec!["Xcode SDK path: /sdk", "None", "code: 1, err: boom"]
        );
    }

    #[test]
    fn open_truncates_an_existing_log() {
        let temp = TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("AdjustPostBuildiOSLog.txt")).unwrap();
        std::fs::write(&path, "previous run\n").unwrap();

        let mut log = RunLog::open(&path).unwrap();
        log.line(Some("fresh"));
        log.finish().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "fresh\n");
    }

    #[test]
    fn open_in_missing_directory_is_a_log_error() {
        let temp = TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("missing").join("log.txt")).unwrap();
        let err = RunLog::open(&path).unwrap_err();
        assert!(matches!(err, RunError::Log { .. }));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn write_failures_surface_on_finish() {
        let mut log = RunLog::with_sink("broken.txt", Box::new(BrokenSink));
        log.line(Some("first"));
        log.line(Some("second"));
        let err = log.finish().unwrap_err();
        assert_eq!(err.to_string(), "run log broken.txt: disk full");
    }
}
