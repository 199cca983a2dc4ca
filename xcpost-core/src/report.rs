//! JSON summary of a run.

use crate::mutator::MutationSummary;
use crate::paths::ResolvedPaths;
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use serde::Serialize;

pub const XCPOST_REPORT_V1: &str = "xcpost.report.v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

impl Default for ToolInfo {
    fn default() -> Self {
        Self {
            name: "xcpost".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub schema: String,
    pub tool: ToolInfo,
    pub project_dir: Utf8PathBuf,
    pub dry_run: bool,
    pub sdk_path: Option<String>,
    /// Why the SDK could not be located. Informational only.
    pub sdk_error: Option<String>,
    pub paths: ResolvedPaths,
    /// Absent when the document could not be loaded or edited.
    pub mutation: Option<MutationSummary>,
    pub error: Option<String>,
    pub exit_code: u8,
}

impl RunReport {
    pub fn new(tool: ToolInfo, project_dir: &Utf8Path, paths: ResolvedPaths, dry_run: bool) -> Self {
        Self {
            schema: XCPOST_REPORT_V1.to_string(),
            tool,
            project_dir: project_dir.to_owned(),
            dry_run,
            sdk_path: None,
            sdk_error: None,
            paths,
            mutation: None,
            error: None,
            exit_code: 0,
        }
    }
}

/// Write `report` as pretty JSON, creating parent directories as needed.
pub fn write_report(path: &Utf8Path, report: &RunReport) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent))?;
    }
    let mut json = serde_json::to_string_pretty(report).context("serialize report")?;
    json.push('\n');
    fs::write(path, json).with_context(|| format!("write {}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn report() -> RunReport {
        let paths = ResolvedPaths {
            document: Utf8PathBuf::from("ios/Unity-iPhone.xcodeproj/project.pbxproj"),
            frameworks_dir: "/System/Library/Frameworks/".to_string(),
        };
        RunReport::new(ToolInfo::default(), Utf8Path::new("ios"), paths, false)
    }

    #[test]
    fn serializes_schema_and_absent_fields() {
        let value = serde_json::to_value(report()).unwrap();
        assert_eq!(value["schema"], "xcpost.report.v1");
        assert_eq!(value["tool"]["name"], "xcpost");
        assert!(value["sdk_path"].is_null());
        assert_eq!(
            value["paths"]["frameworks_dir"],
            "/System/Library/Frameworks/"
        );
    }

    #[test]
    fn write_report_creates_parent_directories() {
        let temp = TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("out").join("report.json")).unwrap();
        write_report(&path, &report()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.ends_with("}\n"));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["exit_code"], 0);
    }
}
