//! Path resolution for a run. Pure string work, no I/O.

use crate::settings::ProjectSettings;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPaths {
    /// The project document to edit.
    pub document: Utf8PathBuf,
    /// Prefix of the framework file references. Plain concatenation, so an absent SDK
    /// yields the bare subpath.
    pub frameworks_dir: String,
}

pub fn resolve_paths(
    project_dir: &Utf8Path,
    sdk: Option<&str>,
    settings: &ProjectSettings,
) -> ResolvedPaths {
    ResolvedPaths {
        document: project_dir.join(&settings.document_subpath),
        frameworks_dir: format!("{}{}", sdk.unwrap_or_default(), settings.frameworks_subpath),
    }
}
