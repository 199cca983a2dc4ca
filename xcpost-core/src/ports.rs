//! Port traits abstracting all I/O away from the pipeline.

use crate::error::ToolchainError;
use camino::Utf8Path;
use xcpost_pbxproj::{LoadError, PbxProject, SaveError};

/// Captured result of a toolchain invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// The platform build toolchain.
pub trait Toolchain {
    /// Run the SDK listing query. Only a failure to run at all is an error here.
    fn sdk_listing(&self) -> Result<ToolOutput, ToolchainError>;
}

/// Where project documents are read from and written to.
pub trait DocumentStore {
    fn load(&self, path: &Utf8Path) -> Result<PbxProject, LoadError>;
    fn save(&self, path: &Utf8Path, project: &PbxProject) -> Result<(), SaveError>;
}

/// Line-oriented text sink behind the run log.
pub trait LogSink {
    fn write_line(&mut self, line: &str) -> std::io::Result<()>;
    fn flush(&mut self) -> std::io::Result<()>;
}
