//! Virtual path utilities.
//!
//! Pure functions for '/'-separated overlay paths. No side effects except
//! [`normalize_fs_path`], which consults the filesystem.

use std::path::{Component, Path, PathBuf};

/// Normalize separators of a virtual path.
///
/// Backslashes become '/', repeated and surrounding slashes are dropped.
pub fn normalize_separators(path: &str) -> String {
    path.split(['/', '\\'])
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Normalize separators and resolve `.` and `..` segments.
///
/// `..` above the root is dropped rather than kept.
pub fn resolve_dots(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            _ => parts.push(segment),
        }
    }
    parts.join("/")
}

/// Parent directory of a virtual path. `None` only for the root itself.
///
/// ```ignore
/// assert_eq!(parent("Graphics/Atlases/Gui"), Some("Graphics/Atlases"));
/// assert_eq!(parent("icon.png"), Some(""));
/// assert_eq!(parent(""), None);
/// ```
pub fn parent(path: &str) -> Option<&str> {
    if path.is_empty() {
        return None;
    }
    Some(path.rfind('/').map_or("", |idx| &path[..idx]))
}

/// Last segment of a virtual path.
pub fn file_name(path: &str) -> &str {
    path.rfind('/').map_or(path, |idx| &path[idx + 1..])
}

/// Split a file name at its last dot.
///
/// Unlike [`Path::extension`], a leading dot starts an extension, so
/// `.overlayignore` splits into `("", Some("overlayignore"))`.
/// A trailing dot yields no extension.
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx + 1 < name.len() => (&name[..idx], Some(&name[idx + 1..])),
        Some(idx) => (&name[..idx], None),
        None => (name, None),
    }
}

/// The path itself followed by each ancestor, ending with the root `""`.
///
/// `"a/b/c"` yields `"a/b/c"`, `"a/b"`, `"a"`, `""`.
pub fn self_and_ancestors(path: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(Some(path), |p| parent(*p))
}

/// Virtual path of `file` relative to `root`, or `None` if outside it.
pub fn relative_virtual(root: &Path, file: &Path) -> Option<String> {
    let rel = file.strip_prefix(root).ok()?;
    let parts: Vec<_> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy()),
            _ => None,
        })
        .collect();
    Some(parts.join("/"))
}

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`).
/// Falls back to joining with the current directory.
#[inline]
pub fn normalize_fs_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_separators() {
        assert_eq!(normalize_separators("Graphics\\Atlases\\a.png"), "Graphics/Atlases/a.png");
        assert_eq!(normalize_separators("/Maps//a.bin/"), "Maps/a.bin");
        assert_eq!(normalize_separators(""), "");
    }

    #[test]
    fn test_resolve_dots() {
        assert_eq!(resolve_dots("Graphics/./Atlases/../a.png"), "Graphics/a.png");
        assert_eq!(resolve_dots("../a.png"), "a.png");
    }

    #[test]
    fn test_parent() {
        assert_eq!(parent("Graphics/Atlases/Gui"), Some("Graphics/Atlases"));
        assert_eq!(parent("icon.png"), Some(""));
        assert_eq!(parent(""), None);
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("a.png"), ("a", Some("png")));
        assert_eq!(split_extension("a.txt.export"), ("a.txt", Some("export")));
        assert_eq!(split_extension(".overlayignore"), ("", Some("overlayignore")));
        assert_eq!(split_extension("README"), ("README", None));
        assert_eq!(split_extension("a."), ("a", None));
    }

    #[test]
    fn test_self_and_ancestors() {
        let chain: Vec<_> = self_and_ancestors("Graphics/Atlases/Gui/icon").collect();
        assert_eq!(
            chain,
            vec![
                "Graphics/Atlases/Gui/icon",
                "Graphics/Atlases/Gui",
                "Graphics/Atlases",
                "Graphics",
                ""
            ]
        );
        assert_eq!(self_and_ancestors("").collect::<Vec<_>>(), vec![""]);
    }

    #[test]
    fn test_relative_virtual() {
        let root = Path::new("/mods/foo");
        assert_eq!(
            relative_virtual(root, Path::new("/mods/foo/Graphics/a.png")),
            Some("Graphics/a.png".to_string())
        );
        assert_eq!(relative_virtual(root, Path::new("/mods/bar/a.png")), None);
    }
}
