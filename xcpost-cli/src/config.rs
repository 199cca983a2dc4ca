//! Configuration file loading for xcpost.
//!
//! Discovers and loads `xcpost.toml` from the working directory, or from an explicit
//! `--config` path. Merges config file settings with CLI arguments (CLI takes precedence).

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use serde::Deserialize;
use tracing::debug;
use xcpost_core::{ExitMode, ProjectSettings, RunSettings, ToolchainSettings};

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "xcpost.toml";

/// Top-level configuration from xcpost.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct XcpostConfig {
    /// How to query the SDK path.
    pub toolchain: ToolchainConfig,

    /// What to change in the project document.
    pub project: ProjectConfig,

    /// Log file and exit behavior.
    pub run: RunConfig,
}

/// Toolchain section of the config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    pub program: Option<String>,
    pub args: Option<Vec<String>>,
    pub accepted_exit_codes: Option<Vec<i32>>,
    pub sdk_display_name: Option<String>,
}

/// Project section of the config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub document_subpath: Option<String>,
    pub frameworks_subpath: Option<String>,
    pub frameworks: Option<Vec<String>>,
    pub weak: Option<bool>,
    pub linker_flags: Option<Vec<String>>,
    pub enable_objc_exceptions: Option<bool>,
}

/// Run section of the config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub log_file: Option<Utf8PathBuf>,
    pub exit_mode: Option<ExitMode>,
}

/// Discover the xcpost.toml config file in `dir`.
pub fn discover_config(dir: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

/// Load and parse an xcpost.toml config file.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<XcpostConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

/// Parse a config file from a string.
pub fn parse_config(contents: &str) -> anyhow::Result<XcpostConfig> {
    let config: XcpostConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load the explicit config file, else the one discovered in `dir`, else defaults.
///
/// An explicit path that does not exist is an error.
pub fn load_or_default(dir: &Utf8Path, explicit: Option<&Utf8Path>) -> anyhow::Result<XcpostConfig> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    match discover_config(dir) {
        Some(path) => load_config(&path),
        None => Ok(XcpostConfig::default()),
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub project_dir: Utf8PathBuf,
    pub log_file: Option<Utf8PathBuf>,
    pub xcodebuild: Option<String>,
    pub exit_mode: Option<ExitMode>,
    pub dry_run: bool,
}

/// Builder for merging config file with CLI arguments.
pub struct ConfigMerger {
    config: XcpostConfig,
}

impl ConfigMerger {
    pub fn new(config: XcpostConfig) -> Self {
        Self { config }
    }

    /// Produce run settings: CLI values, then config file values, then built-in defaults.
    pub fn merge_run_args(self, cli: &CliOverrides) -> RunSettings {
        let XcpostConfig {
            toolchain,
            project,
            run,
        } = self.config;
        let toolchain_defaults = ToolchainSettings::default();
        let project_defaults = ProjectSettings::default();
        let run_defaults = RunSettings::default();

        RunSettings {
            project_dir: cli.project_dir.clone(),
            toolchain: ToolchainSettings {
                program: cli
                    .xcodebuild
                    .clone()
                    .or(toolchain.program)
                    .unwrap_or(toolchain_defaults.program),
                args: toolchain.args.unwrap_or(toolchain_defaults.args),
                accepted_exit_codes: toolchain
                    .accepted_exit_codes
                    .unwrap_or(toolchain_defaults.accepted_exit_codes),
                sdk_display_name: toolchain
                    .sdk_display_name
                    .unwrap_or(toolchain_defaults.sdk_display_name),
            },
            project: ProjectSettings {
                document_subpath: project
                    .document_subpath
                    .unwrap_or(project_defaults.document_subpath),
                frameworks_subpath: project
                    .frameworks_subpath
                    .unwrap_or(project_defaults.frameworks_subpath),
                frameworks: project.frameworks.unwrap_or(project_defaults.frameworks),
                weak: project.weak.unwrap_or(project_defaults.weak),
                linker_flags: project.linker_flags.unwrap_or(project_defaults.linker_flags),
                enable_objc_exceptions: project
                    .enable_objc_exceptions
                    .unwrap_or(project_defaults.enable_objc_exceptions),
            },
            log_file: cli
                .log_file
                .clone()
                .or(run.log_file)
                .unwrap_or(run_defaults.log_file),
            exit_mode: cli
                .exit_mode
                .or(run.exit_mode)
                .unwrap_or(run_defaults.exit_mode),
            dry_run: cli.dry_run,
        }
    }
}
