//! Path utilities for normalization, containment checks, and project discovery.

use std::path::{Component, Path, PathBuf};

/// Normalizes a path by resolving `.` and `..` components.
///
/// This is purely lexical: symbolic links are not resolved and the path does
/// not need to exist.
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                components.pop();
            }
            c => components.push(c),
        }
    }

    components.iter().collect()
}

/// Checks that `path` stays inside `base` once joined and normalized.
///
/// Used by archive extraction to reject entries such as `../../etc/passwd`
/// or absolute names.
///
/// # Examples
///
/// ```rust
/// use bz_cli::utils::fs::is_safe_path;
/// use std::path::Path;
///
/// let base = Path::new("/cache/extracted");
/// assert!(is_safe_path(base, Path::new("bin/tool")));
/// assert!(!is_safe_path(base, Path::new("../../../etc/passwd")));
/// assert!(!is_safe_path(base, Path::new("/etc/passwd")));
/// ```
#[must_use]
pub fn is_safe_path(base: &Path, path: &Path) -> bool {
    let normalized_base = normalize_path(base);
    let normalized_path = if path.is_absolute() {
        normalize_path(path)
    } else {
        normalize_path(&base.join(path))
    };

    normalized_path.starts_with(normalized_base)
}

/// Finds the nearest ancestor of `start` (including `start`) that contains
/// any of `markers`.
///
/// Returns `None` when the filesystem root is reached without a match.
#[must_use]
pub fn find_project_root(start: &Path, markers: &[&str]) -> Option<PathBuf> {
    let mut current = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());

    loop {
        if markers.iter().any(|marker| current.join(marker).exists()) {
            return Some(current);
        }

        if !current.pop() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("/foo/./bar/../baz")), PathBuf::from("/foo/baz"));
        assert_eq!(normalize_path(Path::new("/foo/bar/..")), PathBuf::from("/foo"));
        assert_eq!(normalize_path(Path::new("./foo/bar")), PathBuf::from("foo/bar"));
    }

    #[test]
    fn test_is_safe_path() {
        let base = Path::new("/home/user/cache/extracted");

        assert!(is_safe_path(base, Path::new("bin/tool")));
        assert!(is_safe_path(base, Path::new("./lib/./x.so")));
        assert!(is_safe_path(base, Path::new("a/../b")));
        assert!(!is_safe_path(base, Path::new("..")));
        assert!(!is_safe_path(base, Path::new("../extracted-evil/x")));
        assert!(!is_safe_path(base, Path::new("bin/../../x")));
        assert!(!is_safe_path(base, Path::new("/etc/passwd")));
    }

    #[test]
    fn test_find_project_root_nearest_marker() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("project");
        let sub = root.join("sub");
        let deep = sub.join("src").join("deep");

        crate::utils::fs::ensure_dir(&deep).unwrap();
        std::fs::write(root.join(".bz.toml"), "").unwrap();
        std::fs::write(sub.join(".bz.lock"), "{}").unwrap();

        let found = find_project_root(&deep, &[".bz.toml", ".bz.lock"]).unwrap();
        assert_eq!(found, sub.canonicalize().unwrap());

        let found = find_project_root(&deep, &[".bz.toml"]).unwrap();
        assert_eq!(found, root.canonicalize().unwrap());
    }

    #[test]
    fn test_find_project_root_not_found() {
        let temp = tempdir().unwrap();
        assert!(find_project_root(temp.path(), &["no-such-marker-file-3f1c"]).is_none());
    }
}
