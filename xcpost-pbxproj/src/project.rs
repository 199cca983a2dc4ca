//! The narrow project API: load, query, edit, save.

use crate::error::{EditError, LoadError, ParseError, SaveError};
use crate::ident::allocate;
use crate::parse::parse_value;
use crate::render::render_document;
use crate::value::{Dict, Value};
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use tracing::{debug, warn};

pub const SOURCE_TREE_SDKROOT: &str = "SDKROOT";
pub const OTHER_LDFLAGS: &str = "OTHER_LDFLAGS";

const FILE_REFERENCE: &str = "PBXFileReference";
const BUILD_FILE: &str = "PBXBuildFile";
const FRAMEWORKS_PHASE: &str = "PBXFrameworksBuildPhase";
const BUILD_CONFIGURATION: &str = "XCBuildConfiguration";

/// How [`PbxProject::add_file_if_absent`] creates a file.
#[derive(Debug, Clone)]
pub struct AddFileOptions {
    /// `sourceTree` of the new file reference.
    pub source_tree: String,
    /// Mark the build file `ATTRIBUTES = (Weak, )`.
    pub weak: bool,
    /// Register a build file in the frameworks build phase.
    pub create_build_file: bool,
}

impl Default for AddFileOptions {
    fn default() -> Self {
        Self {
            source_tree: SOURCE_TREE_SDKROOT.to_string(),
            weak: false,
            create_build_file: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddFileOutcome {
    /// A file reference with the same path was already present; nothing changed.
    Existing { file_ref: String },
    Added {
        file_ref: String,
        build_file: Option<String>,
        phase: Option<String>,
    },
}

impl AddFileOutcome {
    pub fn is_added(&self) -> bool {
        matches!(self, AddFileOutcome::Added { .. })
    }

    pub fn file_ref(&self) -> &str {
        match self {
            AddFileOutcome::Existing { file_ref } | AddFileOutcome::Added { file_ref, .. } => {
                file_ref
            }
        }
    }
}

/// An in-memory `project.pbxproj` document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PbxProject {
    root: Dict,
}

impl PbxProject {
    pub fn from_root(root: Dict) -> Self {
        Self { root }
    }

    pub fn parse(text: &str) -> Result<Self, ParseError> {
        match parse_value(text)? {
            Value::Dict(root) => Ok(Self { root }),
            _ => Err(ParseError {
                line: 1,
                column: 1,
                message: "document root is not a dictionary".to_string(),
            }),
        }
    }

    pub fn load(path: &Utf8Path) -> Result<Self, LoadError> {
        let text = fs::read_to_string(path).map_err(|source| LoadError::Read {
            path: path.to_owned(),
            source,
        })?;
        let project = Self::parse(&text).map_err(|source| LoadError::Parse {
            path: path.to_owned(),
            source,
        })?;
        debug!(
            path = %path,
            objects = project.objects().map_or(0, Dict::len),
            "loaded project"
        );
        Ok(project)
    }

    pub fn render(&self) -> String {
        render_document(&self.root)
    }

    /// Write the rendered document next to `path` and rename it into place.
    pub fn save(&self, path: &Utf8Path) -> Result<(), SaveError> {
        let tmp = Utf8PathBuf::from(format!("{path}.xcpost.tmp"));
        let save_error = |source: std::io::Error| SaveError {
            path: path.to_owned(),
            source,
        };

        if let Err(source) = fs::write(&tmp, self.render()) {
            let _ = fs::remove_file(&tmp);
            return Err(save_error(source));
        }
        if let Err(source) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(save_error(source));
        }
        debug!(path = %path, "saved project");
        Ok(())
    }

    pub fn root(&self) -> &Dict {
        &self.root
    }

    pub fn objects(&self) -> Option<&Dict> {
        self.root.get("objects").and_then(Value::as_dict)
    }

    fn objects_mut(&mut self) -> Result<&mut Dict, EditError> {
        self.root
            .get_mut("objects")
            .and_then(Value::as_dict_mut)
            .ok_or(EditError::MissingObjects)
    }

    pub fn object(&self, id: &str) -> Option<&Dict> {
        self.objects()?.get(id)?.as_dict()
    }

    /// All objects whose `isa` is `isa`, in document order.
    pub fn objects_of<'a>(&'a self, isa: &'a str) -> impl Iterator<Item = (&'a str, &'a Dict)> {
        self.objects()
            .into_iter()
            .flat_map(|objects| objects.iter())
            .filter_map(move |(id, value)| {
                let obj = value.as_dict()?;
                (obj.get_str("isa") == Some(isa)).then_some((id, obj))
            })
    }

    pub fn file_reference_for_path(&self, path: &str) -> Option<&str> {
        self.objects_of(FILE_REFERENCE)
            .find(|(_, obj)| obj.get_str("path") == Some(path))
            .map(|(id, _)| id)
    }

    pub fn build_files_for<'a>(&'a self, file_ref: &'a str) -> Vec<&'a str> {
        self.objects_of(BUILD_FILE)
            .filter(|(_, obj)| obj.get_str("fileRef") == Some(file_ref))
            .map(|(id, _)| id)
            .collect()
    }

    pub fn is_weak(&self, build_file: &str) -> bool {
        self.object(build_file)
            .and_then(|obj| obj.get("settings"))
            .and_then(Value::as_dict)
            .and_then(|settings| settings.get("ATTRIBUTES"))
            .and_then(Value::as_array)
            .is_some_and(|attrs| attrs.iter().any(|a| a.as_str() == Some("Weak")))
    }

    /// Ids of build phases whose `files` list contains `build_file`.
    pub fn phases_containing<'a>(&'a self, build_file: &'a str) -> Vec<&'a str> {
        self.objects()
            .into_iter()
            .flat_map(|objects| objects.iter())
            .filter(|(_, value)| {
                value
                    .as_dict()
                    .and_then(|obj| obj.get("files"))
                    .and_then(Value::as_array)
                    .is_some_and(|files| files.iter().any(|f| f.as_str() == Some(build_file)))
            })
            .map(|(id, _)| id)
            .collect()
    }

    pub fn build_configurations(&self) -> impl Iterator<Item = (&str, &Dict)> {
        self.objects_of(BUILD_CONFIGURATION)
    }

    pub fn build_setting(&self, configuration: &str, key: &str) -> Option<&Value> {
        self.object(configuration)?
            .get("buildSettings")?
            .as_dict()?
            .get(key)
    }

    fn root_project(&self) -> Result<&Dict, EditError> {
        let objects = self.objects().ok_or(EditError::MissingObjects)?;
        let id = self.root.get_str("rootObject").unwrap_or_default();
        objects
            .get(id)
            .and_then(Value::as_dict)
            .filter(|obj| obj.get_str("isa") == Some("PBXProject"))
            .ok_or_else(|| EditError::MissingRootProject { id: id.to_string() })
    }

    /// The frameworks phase of the first target, else the first one by id.
    fn frameworks_phase(&self, project: &Dict) -> Option<String> {
        let from_targets = project
            .get("targets")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .filter_map(|target| self.object(target))
            .flat_map(|target| {
                target
                    .get("buildPhases")
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten()
            })
            .filter_map(Value::as_str)
            .find(|phase| {
                self.object(phase).and_then(|obj| obj.get_str("isa")) == Some(FRAMEWORKS_PHASE)
            });

        from_targets
            .or_else(|| {
                self.objects_of(FRAMEWORKS_PHASE)
                    .map(|(id, _)| id)
                    .min()
            })
            .map(str::to_string)
    }

    /// The `Frameworks` group under the main group, else the main group itself.
    fn frameworks_group(&self, project: &Dict) -> Option<String> {
        let main = project.get_str("mainGroup")?;
        let group = self.object(main)?;
        let frameworks = group
            .get("children")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .find(|child| {
                self.object(child).is_some_and(|obj| {
                    obj.get_str("isa") == Some("PBXGroup")
                        && (obj.get_str("name") == Some("Frameworks")
                            || obj.get_str("path") == Some("Frameworks"))
                })
            });
        Some(frameworks.unwrap_or(main).to_string())
    }

    /// Add a file reference for `path` unless one already exists.
    ///
    /// A new reference is placed in the `Frameworks` group and, when
    /// `opts.create_build_file` is set, gets exactly one build file registered in the
    /// frameworks build phase of the first target. An existing reference is left alone,
    /// whatever its build files look like.
    pub fn add_file_if_absent(
        &mut self,
        path: &str,
        opts: &AddFileOptions,
    ) -> Result<AddFileOutcome, EditError> {
        if let Some(existing) = self.file_reference_for_path(path) {
            debug!(path, file_ref = existing, "file reference already present");
            return Ok(AddFileOutcome::Existing {
                file_ref: existing.to_string(),
            });
        }

        let project = self.root_project()?;
        let phase = if opts.create_build_file {
            let phase = self
                .frameworks_phase(project)
                .ok_or_else(|| EditError::NoFrameworksPhase {
                    path: path.to_string(),
                })?;
            Some(phase)
        } else {
            None
        };
        let group = self.frameworks_group(project);
        let name = path
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .unwrap_or(path)
            .to_string();

        let objects = self.objects_mut()?;

        let file_ref = allocate(objects, &format!("{FILE_REFERENCE}:{path}"))?;
        let mut reference = Dict::new();
        reference.insert("isa", FILE_REFERENCE);
        reference.insert("lastKnownFileType", last_known_file_type(&name));
        reference.insert("name", name.as_str());
        reference.insert("path", path);
        reference.insert("sourceTree", opts.source_tree.as_str());
        objects.insert(file_ref.clone(), reference);

        match &group {
            Some(group) => push_child(objects, group, "children", &file_ref),
            None => debug!(path, "project has no main group; reference left ungrouped"),
        }

        let build_file = match &phase {
            Some(phase) => {
                let id = allocate(objects, &format!("{BUILD_FILE}:{path}"))?;
                let mut entry = Dict::new();
                entry.insert("isa", BUILD_FILE);
                entry.insert("fileRef", file_ref.as_str());
                if opts.weak {
                    let mut settings = Dict::new();
                    settings.insert("ATTRIBUTES", vec![Value::from("Weak")]);
                    entry.insert("settings", settings);
                }
                objects.insert(id.clone(), entry);
                push_child(objects, phase, "files", &id);
                Some(id)
            }
            None => None,
        };

        debug!(path, file_ref = %file_ref, build_file = ?build_file, "added file reference");
        Ok(AddFileOutcome::Added {
            file_ref,
            build_file,
            phase,
        })
    }

    /// Append `flag` to `OTHER_LDFLAGS` of every build configuration that lacks it.
    ///
    /// A scalar setting is split on whitespace and turned into a list. Returns the
    /// number of configurations changed.
    pub fn add_other_ldflags(&mut self, flag: &str) -> Result<usize, EditError> {
        self.for_each_build_settings(|settings| append_unique_flag(settings, flag))
    }

    /// Set `key` to `to` in every build configuration where it is currently `from`.
    pub fn replace_build_setting(
        &mut self,
        key: &str,
        from: &str,
        to: &str,
    ) -> Result<usize, EditError> {
        self.for_each_build_settings(|settings| {
            if settings.get_str(key) != Some(from) {
                return false;
            }
            settings.insert(key, to);
            true
        })
    }

    fn for_each_build_settings(
        &mut self,
        mut edit: impl FnMut(&mut Dict) -> bool,
    ) -> Result<usize, EditError> {
        let objects = self.objects_mut()?;
        let mut changed = 0;
        for (id, value) in objects.iter_mut() {
            let Some(config) = value.as_dict_mut() else {
                continue;
            };
            if config.get_str("isa") != Some(BUILD_CONFIGURATION) {
                continue;
            }
            if !config.contains_key("buildSettings") {
                config.insert("buildSettings", Dict::new());
            }
            let Some(settings) = config.get_mut("buildSettings").and_then(Value::as_dict_mut) else {
                warn!(configuration = id, "buildSettings is not a dictionary; skipped");
                continue;
            };
            if edit(settings) {
                changed += 1;
            }
        }
        Ok(changed)
    }
}

fn append_unique_flag(settings: &mut Dict, flag: &str) -> bool {
    let holds_flag = |value: &Value| {
        value
            .as_str()
            .is_some_and(|s| s.split_whitespace().any(|token| token == flag))
    };

    let updated = match settings.get(OTHER_LDFLAGS) {
        None => vec![Value::from(flag)],
        Some(Value::String(s)) => {
            if s.split_whitespace().any(|token| token == flag) {
                return false;
            }
            let mut tokens: Vec<Value> = s.split_whitespace().map(Value::from).collect();
            tokens.push(Value::from(flag));
            tokens
        }
        Some(Value::Array(items)) => {
            if items.iter().any(holds_flag) {
                return false;
            }
            let mut items = items.clone();
            items.push(Value::from(flag));
            items
        }
        Some(_) => {
            warn!("{OTHER_LDFLAGS} is neither a string nor a list; left untouched");
            return false;
        }
    };
    settings.insert(OTHER_LDFLAGS, updated);
    true
}

fn push_child(objects: &mut Dict, owner: &str, key: &str, child: &str) {
    let Some(owner_obj) = objects.get_mut(owner).and_then(Value::as_dict_mut) else {
        warn!(owner, "owner object missing; {child} not registered");
        return;
    };
    if !owner_obj.contains_key(key) {
        owner_obj.insert(key, Vec::<Value>::new());
    }
    match owner_obj.get_mut(key).and_then(Value::as_array_mut) {
        Some(items) => items.push(Value::from(child)),
        None => warn!(owner, key, "not a list; {child} not registered"),
    }
}

fn last_known_file_type(name: &str) -> &'static str {
    match name.rsplit_once('.').map(|(_, ext)| ext) {
        Some("framework") => "wrapper.framework",
        Some("dylib") => "compiled.mach-o.dylib",
        Some("tbd") => "sourcecode.text-based-dylib-definition",
        Some("a") => "archive.ar",
        _ => "file",
    }
}
