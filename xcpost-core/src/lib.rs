//! Embeddable core library for xcpost.
//!
//! Provides a clap-free, I/O-abstracted entry point for the Unity iOS post-build
//! step: locate the SDK, resolve the project paths, and patch `project.pbxproj`.
//!
//! # Port traits
//!
//! All I/O is abstracted behind port traits in [`ports`]:
//! - [`Toolchain`](ports::Toolchain): query the SDK listing
//! - [`DocumentStore`](ports::DocumentStore): load and save project documents
//! - [`LogSink`](ports::LogSink): lines of the run log
//!
//! The [`adapters`] module provides process, filesystem, and in-memory implementations.
//!
//! # Entry points
//!
//! - [`run`](pipeline::run): run the pipeline once and capture the outcome
//! - [`finish_run`](pipeline::finish_run): close the run log and settle the exit code

pub mod adapters;
pub mod error;
pub mod log;
pub mod mutator;
pub mod paths;
pub mod pipeline;
pub mod ports;
pub mod report;
pub mod sdk;
pub mod settings;

pub use error::{RunError, ToolchainError};
pub use log::RunLog;
pub use pipeline::{RunOutcome, finish_run, run};
pub use settings::{ExitMode, ProjectSettings, RunSettings, ToolchainSettings};

// Re-export the document engine so embedders don't need xcpost-pbxproj directly.
pub use xcpost_pbxproj::PbxProject;
