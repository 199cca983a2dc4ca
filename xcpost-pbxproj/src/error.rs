//! Error types for xcpost-pbxproj.
//!
//! Loading distinguishes between a document that could not be read and one that
//! could not be parsed; editing reports structural problems (a document that parses
//! but lacks the objects the edit needs); saving reports I/O failures.

use camino::Utf8PathBuf;
use thiserror::Error;

/// A syntax error in a `project.pbxproj` document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}, column {column}: {message}")]
pub struct ParseError {
    /// 1-based line of the offending character.
    pub line: usize,
    /// 1-based column of the offending character.
    pub column: usize,
    pub message: String,
}

/// The document could not be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("read {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse {path}: {source}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        source: ParseError,
    },
}

/// The document could not be written back.
#[derive(Debug, Error)]
#[error("write {path}: {source}")]
pub struct SaveError {
    pub path: Utf8PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// The document parsed, but does not have the shape an edit needs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("document has no `objects` dictionary")]
    MissingObjects,

    #[error("root object {id} is missing or is not a PBXProject")]
    MissingRootProject { id: String },

    #[error("no PBXFrameworksBuildPhase to register {path} in")]
    NoFrameworksPhase { path: String },

    #[error("could not allocate a unique object id for {seed}")]
    IdExhausted { seed: String },
}
