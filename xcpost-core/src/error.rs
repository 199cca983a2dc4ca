//! Error kinds of a run and how they map to exit codes.
//!
//! - Toolchain errors are diagnostics: the run continues without an SDK path. They are
//!   reported, never turned into a [`RunError`].
//! - Load and edit errors reject the document (exit code 2).
//! - Save and run-log I/O errors are runtime failures (exit code 1).

use camino::Utf8PathBuf;
use thiserror::Error;
use xcpost_pbxproj::{EditError, LoadError, SaveError};

/// The SDK could not be located. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolchainError {
    #[error("could not run {program}: {message}")]
    Spawn { program: String, message: String },

    #[error("unexpected exit code {}: {stderr}", display_code(.code))]
    UnexpectedExit { code: Option<i32>, stderr: String },

    #[error("no {display_name} section with a Path: field in toolchain output")]
    MissingSdkSection { display_name: String },
}

fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "None".to_string(), |c| c.to_string())
}

/// An error that stops the run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("edit {path}: {source}")]
    Edit {
        path: Utf8PathBuf,
        #[source]
        source: EditError,
    },

    #[error(transparent)]
    Save(#[from] SaveError),

    #[error("run log {path}: {source}")]
    Log {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RunError {
    /// Exit code under strict exit behavior.
    pub fn exit_code(&self) -> u8 {
        match self {
            RunError::Load(_) | RunError::Edit { .. } => 2,
            RunError::Save(_) | RunError::Log { .. } => 1,
        }
    }
}
