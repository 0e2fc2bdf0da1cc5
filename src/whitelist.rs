//! The fixed sync whitelist (spec.md §3): which `.gitgov/` files are allowed
//! onto the state branch, and which must never leave the work branch.

use std::path::Path;

pub const SYNC_DIRECTORIES: &[&str] = &[
    "tasks",
    "cycles",
    "actors",
    "agents",
    "feedback",
    "executions",
    "changelogs",
    "workflows",
];

pub const SYNC_ROOT_FILES: &[&str] = &["config.json"];

pub const ALLOWED_EXTENSION: &str = "json";

/// Filenames that must never be synced, even if they otherwise match an
/// allowed directory (private keys, ad-hoc backups, editor swap files).
pub const LOCAL_ONLY_FILES: &[&str] = &["index.json", ".session.json", "gitgov"];

/// Whether `path` (a path under `.gitgov/`, e.g. `"tasks/1.json"` or
/// `"config.json"`) should ever be copied to the state branch.
///
/// This is the single predicate both the push pipeline's publication phase
/// and its post-stage sweep (spec.md §4.3 step 7: "scan the staging area...
/// `git rm -f` it") consult, so the two can never disagree.
pub fn is_whitelisted(relative_path: &str) -> bool {
    let path = Path::new(relative_path);
    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };

    if LOCAL_ONLY_FILES.contains(&file_name) {
        return false;
    }

    if is_excluded_pattern(file_name) {
        return false;
    }

    let mut components = path.components();
    let Some(first) = components.next() else {
        return false;
    };
    let first = first.as_os_str().to_string_lossy();
    let rest: Vec<_> = components.collect();

    if rest.is_empty() {
        // Root-level file under .gitgov/.
        return SYNC_ROOT_FILES.contains(&first.as_ref()) && has_allowed_extension(file_name);
    }

    SYNC_DIRECTORIES.contains(&first.as_ref()) && has_allowed_extension(file_name)
}

fn has_allowed_extension(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == ALLOWED_EXTENSION)
}

/// Excluded-by-filename patterns (spec.md §3): `.key`, `.backup`,
/// `.backup-<digits>`, `.tmp`, `.bak` suffixes.
fn is_excluded_pattern(file_name: &str) -> bool {
    if file_name.ends_with(".key")
        || file_name.ends_with(".backup")
        || file_name.ends_with(".tmp")
        || file_name.ends_with(".bak")
    {
        return true;
    }

    if let Some(suffix) = file_name.rsplit_once(".backup-").map(|(_, suf)| suf) {
        return !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit());
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("tasks/1.json", true)]
    #[case("config.json", true)]
    #[case("cycles/abc.json", true)]
    #[case("agents/a1.json", true)]
    #[case("builds/out.js", false)]
    #[case("scripts/helper.sh", false)]
    #[case(".gitignore", false)]
    #[case("file.backup-001", false)]
    #[case("file.backup-001.json", false)]
    #[case("temp.tmp", false)]
    #[case("tasks/t.json.bak", false)]
    #[case("tasks/private.key", false)]
    #[case("index.json", false)]
    #[case(".session.json", false)]
    #[case("gitgov", false)]
    #[case("tasks/index.json", false)]
    #[case("nested/config.json", false)]
    fn whitelist_predicate(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(is_whitelisted(path), expected, "path: {path}");
    }
}
