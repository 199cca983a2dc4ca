//! Project mutator: loads the document, applies the idempotent edits, and saves it.

use crate::error::RunError;
use crate::log::RunLog;
use crate::ports::DocumentStore;
use crate::settings::ProjectSettings;
use camino::Utf8Path;
use diffy::PatchFormatter;
use serde::Serialize;
use tracing::{debug, info};
use xcpost_pbxproj::{AddFileOptions, AddFileOutcome, EditError, SOURCE_TREE_SDKROOT};

const OBJC_EXCEPTIONS: &str = "GCC_ENABLE_OBJC_EXCEPTIONS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameworkChange {
    pub name: String,
    pub path: String,
    pub file_ref: String,
    /// `false` when a reference with the same path already existed.
    pub added: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagChange {
    pub flag: String,
    pub configurations_updated: usize,
}

/// What a mutation changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MutationSummary {
    pub frameworks: Vec<FrameworkChange>,
    pub linker_flags: Vec<FlagChange>,
    /// Configurations switched to `YES`; `None` when the step is disabled.
    pub objc_exceptions_enabled: Option<usize>,
    pub saved: bool,
    /// Unified diff of the document, only produced in dry-run mode.
    #[serde(skip)]
    pub patch: Option<String>,
}

impl MutationSummary {
    pub fn frameworks_added(&self) -> usize {
        self.frameworks.iter().filter(|f| f.added).count()
    }
}

/// Load `document`, add the frameworks and linker flags, and write it back.
///
/// With `dry_run` the document is left untouched and the summary carries a diff
/// of what would have been written.
pub fn mutate(
    store: &dyn DocumentStore,
    document: &Utf8Path,
    frameworks_dir: &str,
    settings: &ProjectSettings,
    dry_run: bool,
    log: &mut RunLog,
) -> Result<MutationSummary, RunError> {
    let mut project = store.load(document)?;
    let before = dry_run.then(|| project.render());
    let edit_error = |source: EditError| RunError::Edit {
        path: document.to_owned(),
        source,
    };

    let mut summary = MutationSummary::default();
    let opts = AddFileOptions {
        source_tree: SOURCE_TREE_SDKROOT.to_string(),
        weak: settings.weak,
        create_build_file: true,
    };
    for name in &settings.frameworks {
        let path = format!("{frameworks_dir}{name}");
        log.record(format_args!("Adding {name} to Xcode project."));
        let outcome = project.add_file_if_absent(&path, &opts).map_err(edit_error)?;
        if outcome.is_added() {
            log.record(format_args!("{name} successfully added."));
        } else {
            log.record(format_args!("{name} already present in Xcode project."));
        }
        summary.frameworks.push(FrameworkChange {
            name: name.clone(),
            path,
            file_ref: outcome.file_ref().to_string(),
            added: matches!(outcome, AddFileOutcome::Added { .. }),
        });
    }

    for flag in &settings.linker_flags {
        log.record(format_args!("Adding {flag} to other linker flags."));
        let updated = project.add_other_ldflags(flag).map_err(edit_error)?;
        log.record(format_args!("Flag {flag} successfully added."));
        summary.linker_flags.push(FlagChange {
            flag: flag.clone(),
            configurations_updated: updated,
        });
    }

    if settings.enable_objc_exceptions {
        log.line(Some("Enabling Objective-C exceptions in Xcode project."));
        let updated = project
            .replace_build_setting(OBJC_EXCEPTIONS, "NO", "YES")
            .map_err(edit_error)?;
        log.line(Some("Objective-C exceptions successfully enabled."));
        summary.objc_exceptions_enabled = Some(updated);
    }

    match before {
        Some(before) => {
            let patch = render_patch(document, &before, &project.render());
            info!(path = %document, changed = !patch.is_empty(), "dry run; document not written");
            log.record(format_args!("Dry run: {document} not written."));
            summary.patch = Some(patch);
        }
        None => {
            store.save(document, &project)?;
            debug!(path = %document, "document saved");
            summary.saved = true;
        }
    }

    Ok(summary)
}

/// Git-style unified diff of one document; empty when nothing changed.
fn render_patch(path: &Utf8Path, old: &str, new: &str) -> String {
    if old == new {
        return String::new();
    }
    let mut out = String::new();
    out.push_str(&format!("diff --git a/{0} b/{0}\n", path));
    out.push_str(&format!("--- a/{0}\n+++ b/{0}\n", path));
    let patch = diffy::create_patch(old, new);
    out.push_str(&PatchFormatter::new().fmt_patch(&patch).to_string());
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MemoryDocumentStore, MemoryLogSink};
    use pretty_assertions::assert_eq;

    const DOC: &str = "doc/project.pbxproj";

    const MINIMAL: &str = r#"// !$*UTF8*$!
{
	objects = {
		AAAA = {isa = PBXProject; mainGroup = BBBB; targets = (CCCC, ); };
		BBBB = {isa = PBXGroup; children = ( ); sourceTree = "<group>"; };
		CCCC = {isa = PBXNativeTarget; buildPhases = (DDDD, ); };
		DDDD = {isa = PBXFrameworksBuildPhase; files = ( ); };
		EEEE = {isa = XCBuildConfiguration; buildSettings = {GCC_ENABLE_OBJC_EXCEPTIONS = NO; OTHER_LDFLAGS = ( ); }; name = Release; };
	};
	rootObject = AAAA;
}
"#;

    fn run(
        store: &MemoryDocumentStore,
        settings: &ProjectSettings,
        dry_run: bool,
    ) -> (Result<MutationSummary, RunError>, Vec<String>) {
        let sink = MemoryLogSink::new();
        let mut log = RunLog::with_sink("mem", Box::new(sink.clone()));
        let result = mutate(store, Utf8Path::new(DOC), "/sdk/F/", settings, dry_run, &mut log);
        log.finish().unwrap();
        (result, sink.lines())
    }

    fn store() -> MemoryDocumentStore {
        let store = MemoryDocumentStore::new();
        store.insert(DOC, MINIMAL);
        store
    }

    #[test]
    fn logs_each_step_in_order() {
        let store = store();
        let (result, lines) = run(&store, &ProjectSettings::default(), false);
        let summary = result.unwrap();
        assert_eq!(summary.frameworks_added(), 3);
        assert!(summary.saved);
        assert_eq!(
            lines,
            vec![
                "Adding AdSupport.framework to Xcode project.",
                "AdSupport.framework successfully added.",
                "Adding iAd.framework to Xcode project.",
                "iAd.framework successfully added.",
                "Adding CoreTelephony.framework to Xcode project.",
                "CoreTelephony.framework successfully added.",
                "Adding -ObjC to other linker flags.",
                "Flag -ObjC successfully added.",
            ]
        );
    }

    #[test]
    fn second_run_reports_existing_frameworks() {
        let store = store();
        run(&store, &ProjectSettings::default(), false).0.unwrap();
        let first = store.get(Utf8Path::new(DOC)).unwrap();

        let (result, lines) = run(&store, &ProjectSettings::default(), false);
        let summary = result.unwrap();
        assert_eq!(summary.frameworks_added(), 0);
        assert_eq!(summary.linker_flags[0].configurations_updated, 0);
        assert!(lines.contains(&"iAd.framework already present in Xcode project.".to_string()));
        assert_eq!(store.get(Utf8Path::new(DOC)).unwrap(), first);
    }

    #[test]
    fn dry_run_leaves_the_document_alone() {
        let store = store();
        let (result, lines) = run(&store, &ProjectSettings::default(), true);
        let summary = result.unwrap();
        assert!(!summary.saved);
        let patch = summary.patch.unwrap();
        assert!(patch.starts_with("diff --git a/doc/project.pbxproj b/doc/project.pbxproj\n"));
        assert!(patch.contains("\"-ObjC\""));
        assert!(patch.contains("/sdk/F/AdSupport.framework"));
        assert_eq!(store.get(Utf8Path::new(DOC)).unwrap(), MINIMAL);
        assert_eq!(lines.last().unwrap(), "Dry run: doc/project.pbxproj not written.");
    }

    #[test]
    fn objc_exceptions_are_opt_in() {
        let store = store();
        let settings = ProjectSettings {
            enable_objc_exceptions: true,
            ..ProjectSettings::default()
        };
        let summary = run(&store, &settings, false).0.unwrap();
        assert_eq!(summary.objc_exceptions_enabled, Some(1));
        assert!(
            store
                .get(Utf8Path::new(DOC))
                .unwrap()
                .contains("GCC_ENABLE_OBJC_EXCEPTIONS = YES;")
        );

        let untouched = self::store();
        let summary = run(&untouched, &ProjectSettings::default(), false).0.unwrap();
        assert_eq!(summary.objc_exceptions_enabled, None);
        assert!(
            untouched
                .get(Utf8Path::new(DOC))
                .unwrap()
                .contains("GCC_ENABLE_OBJC_EXCEPTIONS = NO;")
        );
    }

    #[test]
    fn unparseable_document_is_a_load_error() {
        let store = MemoryDocumentStore::new();
        store.insert(DOC, "{ objects = ");
        let (result, lines) = run(&store, &ProjectSettings::default(), false);
        let err = result.unwrap_err();
        assert!(matches!(err, RunError::Load(_)));
        assert_eq!(err.exit_code(), 2);
        assert!(lines.is_empty());
    }

    #[test]
    fn project_without_frameworks_phase_is_an_edit_error() {
        let store = MemoryDocumentStore::new();
        store.insert(
            DOC,
            "{ objects = { AAAA = {isa = PBXProject; mainGroup = BBBB; targets = ( ); }; \
             BBBB = {isa = PBXGroup; children = ( ); }; }; rootObject = AAAA; }",
        );
        let err = run(&store, &ProjectSettings::default(), false).0.unwrap_err();
        assert!(matches!(
            err,
            RunError::Edit {
                source: EditError::NoFrameworksPhase { .. },
                ..
            }
        ));
    }

    #[test]
    fn failed_save_is_a_save_error() {
        let store = MemoryDocumentStore::new().read_only();
        store.insert(DOC, MINIMAL);
        let err = run(&store, &ProjectSettings::default(), false).0.unwrap_err();
        assert!(matches!(err, RunError::Save(_)));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn identical_documents_have_an_empty_patch() {
        assert_eq!(render_patch(Utf8Path::new("p"), "a\n", "a\n"), "");
    }
}
