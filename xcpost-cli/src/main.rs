mod config;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{CommandFactory, Parser};
use config::{CliOverrides, ConfigMerger};
use std::ffi::OsString;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use xcpost_core::adapters::{FsDocumentStore, ProcessToolchain};
use xcpost_core::report::{ToolInfo, write_report};
use xcpost_core::{ExitMode, RunLog, finish_run, run};

#[derive(Debug, Parser)]
#[command(
    name = "xcpost",
    version,
    about = "Post-build step for Unity iOS builds: weak-links ad frameworks and adds -ObjC."
)]
struct Cli {
    /// Generated iOS project directory (contains Unity-iPhone.xcodeproj).
    project_dir: Utf8PathBuf,

    /// Config file (default: ./xcpost.toml when present).
    #[arg(long)]
    config: Option<Utf8PathBuf>,

    /// Run log location (default: ./AdjustPostBuildiOSLog.txt).
    #[arg(long)]
    log_file: Option<Utf8PathBuf>,

    /// Toolchain program queried for the SDK path.
    #[arg(long, value_name = "PROGRAM")]
    xcodebuild: Option<String>,

    /// Always exit 0, even when the project could not be patched.
    #[arg(long, default_value_t = false, conflicts_with = "strict")]
    lenient: bool,

    /// Exit non-zero when the project could not be patched (the default).
    #[arg(long, default_value_t = false)]
    strict: bool,

    /// Print the changes as a diff instead of writing the project.
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Write a JSON run report to this path.
    #[arg(long)]
    report: Option<Utf8PathBuf>,

    /// Positional arguments passed by the build host after the project directory. Ignored.
    #[arg(hide = true)]
    extra: Vec<String>,
}

impl Cli {
    fn exit_mode(&self) -> Option<ExitMode> {
        match (self.lenient, self.strict) {
            (true, _) => Some(ExitMode::Lenient),
            (_, true) => Some(ExitMode::Strict),
            _ => None,
        }
    }
}

fn main() -> ExitCode {
    match real_main() {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:?}", e);
            ExitCode::from(1)
        }
    }
}

fn real_main() -> anyhow::Result<u8> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut command = Cli::command();
    command.build();
    let (known, ignored) = split_known_args(&command, std::env::args_os());
    if !ignored.is_empty() {
        debug!(?ignored, "ignoring unknown options");
    }
    let cli = Cli::parse_from(known);
    if !cli.extra.is_empty() {
        debug!(extra = ?cli.extra, "ignoring extra arguments");
    }

    let file_config = config::load_or_default(Utf8Path::new("."), cli.config.as_deref())
        .context("load xcpost.toml config")?;
    let settings = ConfigMerger::new(file_config).merge_run_args(&CliOverrides {
        project_dir: cli.project_dir.clone(),
        log_file: cli.log_file.clone(),
        xcodebuild: cli.xcodebuild.clone(),
        exit_mode: cli.exit_mode(),
        dry_run: cli.dry_run,
    });
    debug!(?settings, "merged settings");

    let mut log = match RunLog::open(&settings.log_file) {
        Ok(log) => log,
        Err(err) => {
            error!(error = %err, "could not open the run log");
            return Ok(settings.exit_mode.exit_code(Some(&err)));
        }
    };

    let toolchain = ProcessToolchain::new(
        settings.toolchain.program.clone(),
        settings.toolchain.args.clone(),
    );
    let outcome = run(
        &settings,
        &toolchain,
        &FsDocumentStore,
        &mut log,
        ToolInfo::default(),
    );
    let outcome = finish_run(outcome, log, &settings);

    if let Some(patch) = &outcome.patch {
        print!("{patch}");
    }
    if let Some(path) = &cli.report
        && let Err(err) = write_report(path, &outcome.report)
    {
        error!("{:?}", err.context(format!("write report {}", path)));
        if settings.exit_mode == ExitMode::Strict {
            return Ok(1);
        }
    }

    info!(exit_code = outcome.exit_code(), "post-build step finished");
    Ok(outcome.exit_code())
}

/// Separate the options `command` knows from the ones it does not.
///
/// Build hosts append their own flags to the post-build command line. Unknown
/// options are dropped so they neither fail parsing nor get read as positionals;
/// known options keep their values. Everything after `--` is kept as is.
/// `command` must be built so help and version flags are listed.
fn split_known_args(
    command: &clap::Command,
    args: impl IntoIterator<Item = OsString>,
) -> (Vec<OsString>, Vec<String>) {
    let mut args = args.into_iter();
    let mut known: Vec<OsString> = args.next().into_iter().collect();
    let mut ignored = Vec::new();

    while let Some(arg) = args.next() {
        let Some(text) = arg.to_str() else {
            known.push(arg);
            continue;
        };

        if text == "--" {
            known.push(arg);
            known.extend(args.by_ref());
            break;
        }

        let wants_value = if let Some(long) = text.strip_prefix("--") {
            let (name, inline) = match long.split_once('=') {
                Some((name, _)) => (name, true),
                None => (long, false),
            };
            match command.get_arguments().find(|a| a.get_long() == Some(name)) {
                Some(found) => !inline && found.get_action().takes_values(),
                None => {
                    ignored.push(text.to_string());
                    continue;
                }
            }
        } else if let Some(shorts) = text.strip_prefix('-').filter(|s| !s.is_empty()) {
            let found: Option<Vec<&clap::Arg>> = shorts
                .chars()
                .map(|c| command.get_arguments().find(|a| a.get_short() == Some(c)))
                .collect();
            match found.as_deref() {
                Some([.., last]) => last.get_action().takes_values(),
                _ => {
                    ignored.push(text.to_string());
                    continue;
                }
            }
        } else {
            false
        };

        known.push(arg);
        if wants_value && let Some(value) = args.next() {
            known.push(value);
        }
    }

    (known, ignored)
}
