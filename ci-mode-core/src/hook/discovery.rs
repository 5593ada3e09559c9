//! Filesystem discovery of external isolated hooks.
//!
//! A hook is an executable file named `<phase>-<order>-<name>`, with `-` or `_`
//! as separators:
//! - `begin-15-notify.sh` → begin phase, order 15
//! - `end_90_upload` → end phase, order 90
//!
//! Other files are ignored, as is a missing directory.

use std::path::Path;
use lazy_static::lazy_static;
use regex::Regex;
use crate::hook::HookPhase;
use crate::hook::registry::{HookDescriptor, IsolatedCommand};

lazy_static! {
    static ref HOOK_FILE: Regex = Regex::new(r"^(begin|end)[-_]([0-9]{1,9})[-_](.+)$").unwrap();
}

/// Parses a hook file name into phase, order and name.
pub fn parse_hook_file_name(file_name: &str) -> Option<(HookPhase, u32, String)> {
    let captures = HOOK_FILE.captures(file_name)?;
    let phase = captures[1].parse().ok()?;
    let order = captures[2].parse().ok()?;
    Some((phase, order, captures[3].to_string()))
}

/// Scans `dir` for hook files, sorted by file name for a stable result.
pub fn discover_hooks(dir: &Path) -> Vec<HookDescriptor> {
    if !dir.is_dir() {
        log::debug!("Hook directory {} does not exist, skipping discovery", dir.display());
        return Vec::new();
    }

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Cannot read hook directory {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut paths: Vec<_> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    let mut discovered = Vec::new();
    for path in paths {
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        let Some((phase, order, name)) = parse_hook_file_name(file_name) else {
            continue;
        };
        if !is_executable(&path) {
            log::warn!("Hook {} is not executable, skipping", path.display());
            continue;
        }
        log::debug!("Discovered {phase} hook '{name}' (order {order}) at {}", path.display());
        discovered.push(HookDescriptor::isolated(name, phase, order, IsolatedCommand::new(path)));
    }
    discovered
}

/// Check if the file at the given path has the executable bit set (Unix only).
/// On non-Unix platforms, returns true if the file exists.
fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(path)
            .map(|m| m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::HookModel;
    use std::fs;

    #[test]
    fn parses_file_names() {
        assert_eq!(
            parse_hook_file_name("begin-15-notify.sh"),
            Some((HookPhase::Begin, 15, "notify.sh".to_string()))
        );
        assert_eq!(
            parse_hook_file_name("end_90_upload"),
            Some((HookPhase::End, 90, "upload".to_string()))
        );
        assert_eq!(parse_hook_file_name("middle-10-x"), None);
        assert_eq!(parse_hook_file_name("begin-x-notify"), None);
        assert_eq!(parse_hook_file_name("begin-10-"), None);
        assert_eq!(parse_hook_file_name("README.md"), None);
    }

    #[test]
    fn missing_directory_yields_nothing() {
        assert!(discover_hooks(Path::new("/no/such/hooks")).is_empty());
    }

    #[test]
    #[cfg(unix)]
    fn discovers_only_executable_hook_files() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        for (name, mode) in [
            ("begin-20-second.sh", 0o755),
            ("begin-10-first.sh", 0o755),
            ("end-5-cleanup.sh", 0o755),
            ("begin-30-not-executable.sh", 0o644),
            ("notes.txt", 0o755),
        ] {
            let path = dir.path().join(name);
            fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
        }

        let hooks = discover_hooks(dir.path());
        let summary: Vec<_> = hooks
            .iter()
            .map(|hook| (hook.phase, hook.order, hook.name.as_str(), hook.model()))
            .collect();

        assert_eq!(
            summary,
            vec![
                (HookPhase::Begin, 10, "first.sh", HookModel::Isolated),
                (HookPhase::Begin, 20, "second.sh", HookModel::Isolated),
                (HookPhase::End, 5, "cleanup.sh", HookModel::Isolated),
            ]
        );
    }
}
