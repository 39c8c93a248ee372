//! Root containment checks for untrusted relative paths.
//!
//! These are lexical: `.` and `..` are resolved without touching the
//! filesystem, so the check works for destinations that do not exist yet.

use std::path::{Component, Path, PathBuf};

use crate::error::{PathError, Result};

/// Join `rel` onto `root`, failing with [`PathError::EscapesRoot`] if the
/// result lies outside `root`. Absolute `rel` paths always fail.
pub fn contained_join(root: &Path, rel: impl AsRef<Path>) -> Result<PathBuf> {
    let rel = rel.as_ref();
    let joined = normalize_lexically(&root.join(rel));

    if rel.has_root() || !is_within(root, &joined) {
        return Err(PathError::EscapesRoot {
            root: root.to_path_buf(),
            path: rel.to_path_buf(),
        });
    }

    Ok(joined)
}

/// Whether `candidate` lies inside `root` (or is `root` itself).
///
/// A root of `.` or `""` normalizes to the empty path, so the remainder after
/// the root must not climb out through a leading `..`.
pub fn is_within(root: &Path, candidate: &Path) -> bool {
    let candidate = normalize_lexically(candidate);
    match candidate.strip_prefix(normalize_lexically(root)) {
        Ok(rest) => !matches!(rest.components().next(), Some(Component::ParentDir)),
        Err(_) => false,
    }
}

/// Resolve `.` and `..` components without consulting the filesystem.
///
/// Leading `..` components of a relative path are kept; `..` directly under
/// the filesystem root is dropped.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            Component::Normal(part) => out.push(part),
        }
    }

    out
}
