//! Lexical path helpers.

use std::path::{Component, Path, PathBuf};

/// Normalize `.` and `..` components without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)))
                    && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Path of `target` relative to the directory `from`, as `/`-separated parts.
fn relative_parts(from: &Path, target: &Path) -> Vec<String> {
    let from = normalize_path(from);
    let target = normalize_path(target);
    let from: Vec<Component<'_>> = from.components().collect();
    let target: Vec<Component<'_>> = target.components().collect();

    let common = from
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = Vec::with_capacity(from.len() + target.len() - 2 * common);
    parts.extend(std::iter::repeat("..".to_string()).take(from.len() - common));
    parts.extend(
        target[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    parts
}

/// A `require` specifier for `target` as seen from a module in `from_dir`.
///
/// Always starts with `./` or `../` and uses `/` separators.
pub fn require_specifier(from_dir: &Path, target: &Path) -> String {
    let relative = relative_parts(from_dir, target).join("/");
    if relative.starts_with("../") {
        relative
    } else {
        format!("./{}", relative)
    }
}
