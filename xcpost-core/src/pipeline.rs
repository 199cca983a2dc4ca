//! The post-build pipeline: SDK lookup, path resolution, mutation and the exit decision.

use crate::error::RunError;
use crate::log::RunLog;
use crate::mutator::mutate;
use crate::paths::resolve_paths;
use crate::ports::{DocumentStore, Toolchain};
use crate::report::{RunReport, ToolInfo};
use crate::sdk::locate_sdk;
use crate::settings::RunSettings;
use tracing::{debug, error};

/// Outcome of [`run`].
#[derive(Debug)]
pub struct RunOutcome {
    pub report: RunReport,
    /// The error that stopped the run, if any. Toolchain errors never end up here.
    pub fatal: Option<RunError>,
    /// Diff of the document in dry-run mode.
    pub patch: Option<String>,
}

/// Run the post-build pipeline once: locate the SDK, resolve paths, mutate the document.
///
/// Every error is logged and captured in the outcome; nothing is returned early, so
/// the caller makes a single exit-code decision with [`RunOutcome::report`].
pub fn run(
    settings: &RunSettings,
    toolchain: &dyn Toolchain,
    store: &dyn DocumentStore,
    log: &mut RunLog,
    tool: ToolInfo,
) -> RunOutcome {
    let (sdk_path, sdk_error) = match locate_sdk(toolchain, &settings.toolchain, log) {
        Ok(path) => (Some(path), None),
        Err(err) => {
            debug!(error = %err, "continuing without an SDK path");
            (None, Some(err.to_string()))
        }
    };

    let paths = resolve_paths(&settings.project_dir, sdk_path.as_deref(), &settings.project);
    log.record(format_args!("Unity3d Xcode project path: {}", paths.document));
    log.record(format_args!("Framework path: {}", paths.frameworks_dir));

    let mut report = RunReport::new(tool, &settings.project_dir, paths.clone(), settings.dry_run);
    report.sdk_path = sdk_path;
    report.sdk_error = sdk_error;

    let mut patch = None;
    let fatal = match mutate(
        store,
        &paths.document,
        &paths.frameworks_dir,
        &settings.project,
        settings.dry_run,
        log,
    ) {
        Ok(summary) => {
            patch = summary.patch.clone();
            report.mutation = Some(summary);
            None
        }
        Err(err) => {
            error!(error = %err, exit_code = err.exit_code(), "post-build step failed");
            log.record(format_args!("Error: {err}"));
            Some(err)
        }
    };

    let mut outcome = RunOutcome {
        report,
        fatal,
        patch,
    };
    outcome.decide(settings);
    outcome
}

/// Close the run log, folding a log failure into the outcome when nothing else failed.
pub fn finish_run(mut outcome: RunOutcome, log: RunLog, settings: &RunSettings) -> RunOutcome {
    if let Err(err) = log.finish() {
        error!(error = %err, "run log could not be written");
        if outcome.fatal.is_none() {
            outcome.fatal = Some(err);
            outcome.decide(settings);
        }
    }
    outcome
}

impl RunOutcome {
    fn decide(&mut self, settings: &RunSettings) {
        self.report.error = self.fatal.as_ref().map(ToString::to_string);
        self.report.exit_code = settings.exit_mode.exit_code(self.fatal.as_ref());
    }

    pub fn exit_code(&self) -> u8 {
        self.report.exit_code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MemoryDocumentStore, MemoryLogSink, ScriptedToolchain};
    use crate::ports::LogSink;
    use crate::settings::ExitMode;
    use camino::Utf8PathBuf;

    struct FailingFlush;

    impl LogSink for FailingFlush {
        fn write_line(&mut self, _line: &str) -> std::io::Result<()> {
            Ok(())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::other("flush failed"))
        }
    }

    fn settings(exit_mode: ExitMode) -> RunSettings {
        RunSettings {
            project_dir: Utf8PathBuf::from("ios"),
            exit_mode,
            ..RunSettings::default()
        }
    }

    #[test]
    fn missing_document_is_fatal_in_strict_mode() {
        let sink = MemoryLogSink::new();
        let mut log = RunLog::with_sink("mem", Box::new(sink.clone()));
        let toolchain = ScriptedToolchain::exits(1, "", "sdk not found");
        let store = MemoryDocumentStore::new();

        let settings = settings(ExitMode::Strict);
        let outcome = run(&settings, &toolchain, &store, &mut log, ToolInfo::default());
        let outcome = finish_run(outcome, log, &settings);

        assert!(matches!(outcome.fatal, Some(RunError::Load(_))));
        assert_eq!(outcome.exit_code(), 2);
        assert_eq!(
            outcome.report.paths.frameworks_dir,
            "/System/Library/Frameworks/"
        );
        let lines = sink.lines();
        assert_eq!(lines[0], "Could not retrieve Xcode SDK path.");
        assert_eq!(lines[1], "code: 1, err: sdk not found");
        assert_eq!(
            lines[2],
            "Unity3d Xcode project path: ios/Unity-iPhone.xcodeproj/project.pbxproj"
        );
        assert_eq!(lines[3], "Framework path: /System/Library/Frameworks/");
        assert!(lines[4].starts_with("Error: read ios/Unity-iPhone.xcodeproj/project.pbxproj"));
    }

    #[test]
    fn lenient_mode_exits_zero_but_keeps_the_error() {
        let mut log = RunLog::with_sink("mem", Box::new(MemoryLogSink::new()));
        let toolchain = ScriptedToolchain::exits(0, "", "");
        let store = MemoryDocumentStore::new();

        let outcome = run(
            &settings(ExitMode::Lenient),
            &toolchain,
            &store,
            &mut log,
            ToolInfo::default(),
        );
        assert_eq!(outcome.exit_code(), 0);
        assert!(outcome.report.error.is_some());
        assert!(outcome.report.sdk_error.is_some());
    }

    #[test]
    fn log_failure_becomes_fatal_when_nothing_else_failed() {
        let settings = settings(ExitMode::Strict);
        let outcome = RunOutcome {
            report: RunReport::new(
                ToolInfo::default(),
                &settings.project_dir,
                resolve_paths(&settings.project_dir, None, &settings.project),
                false,
            ),
            fatal: None,
            patch: None,
        };
        let log = RunLog::with_sink("AdjustPostBuildiOSLog.txt", Box::new(FailingFlush));
        let outcome = finish_run(outcome, log, &settings);
        assert!(matches!(outcome.fatal, Some(RunError::Log { .. })));
        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(
            outcome.report.error.as_deref(),
            Some("run log AdjustPostBuildiOSLog.txt: flush failed")
        );
    }
}
