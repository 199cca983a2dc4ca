//! SDK locator: asks the toolchain for its SDK listing and picks the path of one SDK.

use crate::error::ToolchainError;
use crate::log::{ABSENT, RunLog, or_none};
use crate::ports::Toolchain;
use crate::settings::ToolchainSettings;
use tracing::{debug, warn};

const PATH_FIELD: &str = "Path:";

/// Locate the SDK path. Every failure is logged to `log` before it is returned.
pub fn locate_sdk(
    toolchain: &dyn Toolchain,
    settings: &ToolchainSettings,
    log: &mut RunLog,
) -> Result<String, ToolchainError> {
    let output = match toolchain.sdk_listing() {
        Ok(output) => output,
        Err(err) => {
            warn!(error = %err, "toolchain did not run");
            log.line(Some("Could not retrieve Xcode SDK path."));
            log.record(format_args!("code: {ABSENT}, err: {err}"));
            return Err(err);
        }
    };

    let accepted = output
        .code
        .is_some_and(|code| settings.accepted_exit_codes.contains(&code));
    if !accepted {
        let code = output.code.map_or_else(|| ABSENT.to_string(), |c| c.to_string());
        warn!(code = %code, "toolchain exited with an unexpected code");
        log.line(Some("Could not retrieve Xcode SDK path."));
        log.record(format_args!("code: {code}, err: {}", output.stderr.trim_end()));
        return Err(ToolchainError::UnexpectedExit {
            code: output.code,
            stderr: output.stderr,
        });
    }

    let path = parse_sdk_path(&output.stdout, &settings.sdk_display_name);
    log.record(format_args!("Xcode SDK path: {}", or_none(path.as_deref())));
    debug!(sdk = ?path, display_name = %settings.sdk_display_name, "parsed toolchain output");
    path.ok_or_else(|| ToolchainError::MissingSdkSection {
        display_name: settings.sdk_display_name.clone(),
    })
}

/// Extract the `Path:` value of the first section headed by `display_name`.
///
/// A section starts at a line containing `display_name` and runs until a blank line.
/// The field may follow the header on the same line. `Path:` only counts at the start
/// of a word, so `PlatformPath:` is skipped.
pub fn parse_sdk_path(output: &str, display_name: &str) -> Option<String> {
    if display_name.is_empty() {
        return None;
    }
    let mut in_section = false;
    for line in output.lines() {
        let rest = if in_section {
            if line.trim().is_empty() {
                in_section = false;
                continue;
            }
            line
        } else {
            match line.find(display_name) {
                Some(at) => {
                    in_section = true;
                    &line[at + display_name.len()..]
                }
                None => continue,
            }
        };
        if let Some(path) = path_field(rest) {
            return Some(path);
        }
    }
    None
}

fn path_field(text: &str) -> Option<String> {
    let mut from = 0;
    while let Some(found) = text[from..].find(PATH_FIELD) {
        let at = from + found;
        let at_word_start = text[..at].chars().next_back().is_none_or(char::is_whitespace);
        if at_word_start {
            let value = text[at + PATH_FIELD.len()..].trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
        from = at + PATH_FIELD.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MemoryLogSink, ScriptedToolchain};
    use pretty_assertions::assert_eq;

    const LISTING: &str = "\
MacOSX14.0.sdk - macOS 14.0 (macosx14.0)
SDKVersion: 14.0
Path: /Applications/Xcode.app/Contents/Developer/Platforms/MacOSX.platform/Developer/SDKs/MacOSX14.0.sdk
PlatformPath: /Applications/Xcode.app/Contents/Developer/Platforms/MacOSX.platform

iPhoneOS17.0.sdk - iOS 17.0 (iphoneos17.0)
SDKVersion: 17.0
PlatformPath: /Applications/Xcode.app/Contents/Developer/Platforms/iPhoneOS.platform
Path: /Applications/Xcode.app/Contents/Developer/Platforms/iPhoneOS.platform/Developer/SDKs/iPhoneOS17.0.sdk

Xcode 15.0
Build version 15A240d
";

    fn logged(f: impl FnOnce(&mut RunLog)) -> Vec<String> {
        let sink = MemoryLogSink::new();
        let mut log = RunLog::with_sink("mem", Box::new(sink.clone()));
        f(&mut log);
        log.finish().unwrap();
        sink.lines()
    }

    #[test]
    fn path_on_the_header_line() {
        assert_eq!(
            parse_sdk_path("iPhoneOS... Path: /foo/bar\n", "iPhoneOS"),
            Some("/foo/bar".to_string())
        );
    }

    #[test]
    fn path_in_a_multi_line_section() {
        assert_eq!(
            parse_sdk_path(LISTING, "iPhoneOS").as_deref(),
            Some(
                "/Applications/Xcode.app/Contents/Developer/Platforms/iPhoneOS.platform/Developer/SDKs/iPhoneOS17.0.sdk"
            )
        );
    }

    #[test]
    fn no_matching_section_is_absent() {
        assert_eq!(parse_sdk_path("Xcode 15.0\nBuild version 15A240d\n", "iPhoneOS"), None);
        assert_eq!(parse_sdk_path("", "iPhoneOS"), None);
    }

    #[test]
    fn section_without_path_ends_at_blank_line() {
        let output = "iPhoneOS17.0.sdk\nSDKVersion: 17.0\n\nMacOSX.sdk\nPath: /mac\n";
        assert_eq!(parse_sdk_path(output, "iPhoneOS"), None);
    }

    #[test]
    fn platform_path_is_not_the_path_field() {
        let output = "iPhoneOS17.0.sdk\nPlatformPath: /platform\nPath: /sdk\n";
        assert_eq!(parse_sdk_path(output, "iPhoneOS").as_deref(), Some("/sdk"));
    }

    #[test]
    fn accepted_exit_code_logs_the_path() {
        let toolchain = ScriptedToolchain::exits(66, "iPhoneOS... Path: /foo/bar\n", "");
        let mut found = None;
        let lines = logged(|log| {
            found = Some(locate_sdk(&toolchain, &ToolchainSettings::default(), log));
        });
        assert_eq!(found.unwrap().unwrap(), "/foo/bar");
        assert_eq!(lines, vec!["Xcode SDK path: /foo/bar"]);
    }

    #[test]
    fn unexpected_exit_code_is_logged_and_tolerated() {
        let toolchain = ScriptedToolchain::exits(1, "", "sdk not found");
        let mut found = None;
        let lines = logged(|log| {
            found = Some(locate_sdk(&toolchain, &ToolchainSettings::default(), log));
        });
        assert_eq!(
            found.unwrap().unwrap_err(),
            ToolchainError::UnexpectedExit {
                code: Some(1),
                stderr: "sdk not found".to_string()
            }
        );
        assert_eq!(
            lines,
            vec!["Could not retrieve Xcode SDK path.", "code: 1, err: sdk not found"]
        );
    }

    #[test]
    fn missing_section_logs_none() {
        let toolchain = ScriptedToolchain::exits(0, "Xcode 15.0\n", "");
        let mut found = None;
        let lines = logged(|log| {
            found = Some(locate_sdk(&toolchain, &ToolchainSettings::default(), log));
        });
        assert!(matches!(
            found.unwrap(),
            Err(ToolchainError::MissingSdkSection { .. })
        ));
        assert_eq!(lines, vec!["Xcode SDK path: None"]);
    }

    #[test]
    fn spawn_failure_is_logged() {
        let toolchain = ScriptedToolchain::fails(ToolchainError::Spawn {
            program: "xcodebuild".to_string(),
            message: "not found".to_string(),
        });
        let lines = logged(|log| {
            assert!(locate_sdk(&toolchain, &ToolchainSettings::default(), log).is_err());
        });
        assert_eq!(lines[0], "Could not retrieve Xcode SDK path.");
        assert_eq!(lines[1], "code: None, err: could not run xcodebuild: not found");
    }
}
