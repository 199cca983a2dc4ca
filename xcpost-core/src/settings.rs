//! Clap-free settings for a post-build run.

use crate::error::RunError;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

pub const DEFAULT_LOG_FILE: &str = "AdjustPostBuildiOSLog.txt";
pub const DEFAULT_DOCUMENT_SUBPATH: &str = "Unity-iPhone.xcodeproj/project.pbxproj";
pub const DEFAULT_FRAMEWORKS_SUBPATH: &str = "/System/Library/Frameworks/";
pub const DEFAULT_FRAMEWORKS: &[&str] = &[
    "AdSupport.framework",
    "iAd.framework",
    "CoreTelephony.framework",
];
pub const DEFAULT_LINKER_FLAGS: &[&str] = &["-ObjC"];

/// Exit behavior when a fatal error occurred.
///
/// `Lenient` always exits 0 so a failing repair never fails the parent build; `Strict`
/// returns the error's exit code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitMode {
    #[default]
    Strict,
    Lenient,
}

impl ExitMode {
    /// The single exit-code decision point of a run.
    pub fn exit_code(self, fatal: Option<&RunError>) -> u8 {
        match (self, fatal) {
            (ExitMode::Lenient, _) | (_, None) => 0,
            (ExitMode::Strict, Some(err)) => err.exit_code(),
        }
    }
}

/// How to ask the toolchain for the SDK path.
#[derive(Debug, Clone)]
pub struct ToolchainSettings {
    pub program: String,
    pub args: Vec<String>,
    /// Exit codes treated as success. `xcodebuild -version -sdk` exits 66 on some installs.
    pub accepted_exit_codes: Vec<i32>,
    /// Section header token of the SDK to use.
    pub sdk_display_name: String,
}

impl Default for ToolchainSettings {
    fn default() -> Self {
        Self {
            program: "xcodebuild".to_string(),
            args: vec!["-version".to_string(), "-sdk".to_string()],
            accepted_exit_codes: vec![0, 66],
            sdk_display_name: "iPhoneOS".to_string(),
        }
    }
}

/// What to change in the project document.
#[derive(Debug, Clone)]
pub struct ProjectSettings {
    /// Document location relative to the project directory.
    pub document_subpath: String,
    /// Appended to the SDK path to form the framework directory.
    pub frameworks_subpath: String,
    pub frameworks: Vec<String>,
    pub weak: bool,
    pub linker_flags: Vec<String>,
    /// Switch `GCC_ENABLE_OBJC_EXCEPTIONS = NO` to `YES`.
    pub enable_objc_exceptions: bool,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            document_subpath: DEFAULT_DOCUMENT_SUBPATH.to_string(),
            frameworks_subpath: DEFAULT_FRAMEWORKS_SUBPATH.to_string(),
            frameworks: DEFAULT_FRAMEWORKS.iter().map(|s| s.to_string()).collect(),
            weak: true,
            linker_flags: DEFAULT_LINKER_FLAGS.iter().map(|s| s.to_string()).collect(),
            enable_objc_exceptions: false,
        }
    }
}

/// Settings for one run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub project_dir: Utf8PathBuf,
    pub toolchain: ToolchainSettings,
    pub project: ProjectSettings,
    pub log_file: Utf8PathBuf,
    pub exit_mode: ExitMode,
    /// Do everything except writing the document.
    pub dry_run: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            project_dir: Utf8PathBuf::from("."),
            toolchain: ToolchainSettings::default(),
            project: ProjectSettings::default(),
            log_file: Utf8PathBuf::from(DEFAULT_LOG_FILE),
            exit_mode: ExitMode::default(),
            dry_run: false,
        }
    }
}
