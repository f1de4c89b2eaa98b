//! Virtual modules holding precompiled render functions.

use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// File name prefix of every synthesized render module.
pub const VIRTUAL_FILE_PREFIX: &str = "[coolie-mid-vue-virtual-file]";

/// A fresh virtual module path next to the template at `template`.
pub fn virtual_file_path(template: &Path) -> PathBuf {
    let dir = template.parent().unwrap_or_else(|| Path::new(""));
    dir.join(format!(
        "{}-{}.js",
        VIRTUAL_FILE_PREFIX,
        Uuid::new_v4().simple()
    ))
}

/// Whether `path` names a synthesized render module.
pub fn is_virtual_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(VIRTUAL_FILE_PREFIX) && name.ends_with(".js"))
}

/// The source of a render module.
pub fn render_module(render_function: &str) -> String {
    format!("module.exports = {};", render_function)
}

/// Template id to virtual module path, for one build run.
///
/// Entries are never evicted, so every module requiring the same template
/// shares one render module.
#[derive(Debug, Default)]
pub struct VirtualFileMap {
    files: FxHashMap<PathBuf, PathBuf>,
}

impl VirtualFileMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// The render module for a template id.
    pub fn get(&self, id: &Path) -> Option<&Path> {
        self.files.get(id).map(PathBuf::as_path)
    }

    /// Record the render module for a template id.
    pub fn insert(&mut self, id: PathBuf, virtual_path: PathBuf) {
        self.files.insert(id, virtual_path);
    }

    /// Number of templates compiled so far.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no template has been compiled yet.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_virtual_file_path() {
        let path = virtual_file_path(Path::new("/app/src/tpl/home.html"));
        assert_eq!(path.parent(), Some(Path::new("/app/src/tpl")));
        assert!(is_virtual_file(&path), "{}", path.display());

        let other = virtual_file_path(Path::new("/app/src/tpl/home.html"));
        assert_ne!(path, other);
    }

    #[test]
    fn test_is_virtual_file() {
        assert!(is_virtual_file(Path::new(
            "/a/[coolie-mid-vue-virtual-file]-0f1e.js"
        )));
        assert!(!is_virtual_file(Path::new("/a/home.js")));
    }

    #[test]
    fn test_render_module() {
        assert_eq!(
            render_module("function render () {}"),
            "module.exports = function render () {};"
        );
    }

    #[test]
    fn test_map() {
        let mut map = VirtualFileMap::new();
        assert!(map.is_empty());
        map.insert("/t.html".into(), "/v.js".into());
        assert_eq!(map.get(Path::new("/t.html")), Some(Path::new("/v.js")));
        assert_eq!(map.len(), 1);
    }
}
