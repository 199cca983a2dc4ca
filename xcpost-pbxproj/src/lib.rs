//! Load/edit/save engine for Xcode `project.pbxproj` documents.
//!
//! Responsibilities:
//! - Parse the OpenStep property list Xcode writes.
//! - Answer the few queries a post-build repair needs (file references, build files,
//!   build configurations).
//! - Apply idempotent additions: add-file-if-absent, append-unique-linker-flag,
//!   replace-build-setting.
//! - Render deterministically in Xcode's layout and save atomically.
//!
//! This is deliberately not a general Xcode project model.

mod error;
mod ident;
mod parse;
mod project;
mod render;
mod value;

pub use error::{EditError, LoadError, ParseError, SaveError};
pub use project::{AddFileOptions, AddFileOutcome, OTHER_LDFLAGS, PbxProject, SOURCE_TREE_SDKROOT};
pub use value::{Dict, Value};
