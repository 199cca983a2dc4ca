//! Default port implementations: process, filesystem, and in-memory ones for embedding
//! and testing.

use crate::error::ToolchainError;
use crate::ports::{DocumentStore, LogSink, ToolOutput, Toolchain};
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::{BufWriter, Write};
use std::process::Command;
use std::rc::Rc;
use tracing::debug;
use xcpost_pbxproj::{LoadError, PbxProject, SaveError};

/// Runs the toolchain as a child process and waits for it.
#[derive(Debug, Clone)]
pub struct ProcessToolchain {
    pub program: String,
    pub args: Vec<String>,
}

impl ProcessToolchain {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl Toolchain for ProcessToolchain {
    fn sdk_listing(&self) -> Result<ToolOutput, ToolchainError> {
        debug!(program = %self.program, args = ?self.args, "querying toolchain");
        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .map_err(|e| ToolchainError::Spawn {
                program: self.program.clone(),
                message: e.to_string(),
            })?;
        Ok(ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Replays a fixed toolchain result.
#[derive(Debug, Clone)]
pub struct ScriptedToolchain {
    result: Result<ToolOutput, ToolchainError>,
}

impl ScriptedToolchain {
    pub fn exits(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            result: Ok(ToolOutput {
                code: Some(code),
                stdout: stdout.into(),
                stderr: stderr.into(),
            }),
        }
    }

    pub fn fails(err: ToolchainError) -> Self {
        Self { result: Err(err) }
    }
}

impl Toolchain for ScriptedToolchain {
    fn sdk_listing(&self) -> Result<ToolOutput, ToolchainError> {
        self.result.clone()
    }
}

/// Documents on disk; saves go through a temporary file and a rename.
#[derive(Debug, Clone, Default)]
pub struct FsDocumentStore;

impl DocumentStore for FsDocumentStore {
    fn load(&self, path: &Utf8Path) -> Result<PbxProject, LoadError> {
        PbxProject::load(path)
    }

    fn save(&self, path: &Utf8Path, project: &PbxProject) -> Result<(), SaveError> {
        project.save(path)
    }
}

/// Documents held in memory, keyed by path.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    files: RefCell<BTreeMap<Utf8PathBuf, String>>,
    read_only: bool,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every save fails with `PermissionDenied`.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn insert(&self, path: impl Into<Utf8PathBuf>, contents: impl Into<String>) {
        self.files.borrow_mut().insert(path.into(), contents.into());
    }

    pub fn get(&self, path: &Utf8Path) -> Option<String> {
        self.files.borrow().get(path).cloned()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn load(&self, path: &Utf8Path) -> Result<PbxProject, LoadError> {
        let text = self.get(path).ok_or_else(|| LoadError::Read {
            path: path.to_owned(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such document"),
        })?;
        PbxProject::parse(&text).map_err(|source| LoadError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    fn save(&self, path: &Utf8Path, project: &PbxProject) -> Result<(), SaveError> {
        if self.read_only {
            return Err(SaveError {
                path: path.to_owned(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only store"),
            });
        }
        self.insert(path, project.render());
        Ok(())
    }
}

/// Log file in the working directory, truncated when opened.
#[derive(Debug)]
pub struct FileLogSink {
    writer: BufWriter<fs::File>,
}

impl FileLogSink {
    pub fn create(path: &Utf8Path) -> std::io::Result<Self> {
        let file = fs::File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl LogSink for FileLogSink {
    fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        writeln!(self.writer, "{line}")
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

/// Collects lines in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryLogSink {
    lines: Rc<RefCell<Vec<String>>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }
}

impl LogSink for MemoryLogSink {
    fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        self.lines.borrow_mut().push(line.to_string());
        Ok(())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
