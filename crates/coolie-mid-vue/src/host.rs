//! The host bundler capabilities the transforms call into.
//!
//! [`Host`] is what a bundler integration implements. [`FsHost`] is a
//! filesystem-backed implementation used by the `coolie-vue` binary and the
//! tests.

use crate::COMPONENT_LABEL;
use crate::error::ResolveError;
use crate::paths::normalize_path;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

/// Encoding used for synthesized modules.
pub const VIRTUAL_FILE_ENCODING: &str = "utf8";

/// Where a `require` is being resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveContext {
    /// The importing module.
    pub file: PathBuf,
    /// Source root of the build.
    pub src_dirname: PathBuf,
}

/// A resolved module and its pipeline types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    /// Absolute path of the module.
    pub id: PathBuf,
    /// Type the module is read as.
    pub in_type: String,
    /// Type the module is exposed as.
    pub out_type: String,
}

impl ResolvedModule {
    /// Whether the module is an HTML file consumed as text, the only
    /// pipeline a template can be compiled from.
    pub fn is_html_text(&self) -> bool {
        self.in_type == "html" && self.out_type == "text"
    }
}

/// An in-memory module registered with the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualModule {
    /// Absolute path the module is registered under.
    pub path: PathBuf,
    /// Content encoding.
    pub encoding: String,
    /// Module source.
    pub content: String,
}

/// Capabilities provided by the host bundler.
pub trait Host {
    /// Resolve a `require(specifier, qualifier)` made from `context.file`.
    fn resolve_module(
        &self,
        specifier: &str,
        qualifier: Option<&str>,
        context: &ResolveContext,
    ) -> Result<ResolvedModule, ResolveError>;

    /// Register an in-memory module with the build graph.
    fn virtual_file(&mut self, path: PathBuf, encoding: &str, content: String);
}

impl<H: Host + ?Sized> Host for &mut H {
    fn resolve_module(
        &self,
        specifier: &str,
        qualifier: Option<&str>,
        context: &ResolveContext,
    ) -> Result<ResolvedModule, ResolveError> {
        (**self).resolve_module(specifier, qualifier, context)
    }

    fn virtual_file(&mut self, path: PathBuf, encoding: &str, content: String) {
        (**self).virtual_file(path, encoding, content)
    }
}

/// Filesystem-backed host with an in-memory virtual file registry.
#[derive(Debug, Default)]
pub struct FsHost {
    virtual_files: IndexMap<PathBuf, VirtualModule>,
}

impl FsHost {
    /// Create a host with an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered virtual modules, in registration order.
    pub fn virtual_files(&self) -> impl Iterator<Item = &VirtualModule> {
        self.virtual_files.values()
    }

    /// Look up a registered virtual module.
    pub fn get(&self, path: &Path) -> Option<&VirtualModule> {
        self.virtual_files.get(path)
    }

    /// Number of registered virtual modules.
    pub fn len(&self) -> usize {
        self.virtual_files.len()
    }

    /// Whether nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.virtual_files.is_empty()
    }

    /// Locate the file a specifier points at.
    fn locate(&self, specifier: &str, context: &ResolveContext) -> PathBuf {
        let is_relative = specifier == "."
            || specifier == ".."
            || specifier.starts_with("./")
            || specifier.starts_with("../");

        let path = if is_relative {
            context
                .file
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join(specifier)
        } else if let Some(rooted) = specifier.strip_prefix('/') {
            context.src_dirname.join(rooted)
        } else {
            context.src_dirname.join("node_modules").join(specifier)
        };
        normalize_path(&path)
    }
}

impl Host for FsHost {
    fn resolve_module(
        &self,
        specifier: &str,
        qualifier: Option<&str>,
        context: &ResolveContext,
    ) -> Result<ResolvedModule, ResolveError> {
        if specifier.trim().is_empty() {
            return Err(ResolveError::InvalidSpecifier(specifier.to_string()));
        }

        let id = self.locate(specifier, context);
        if !id.is_file() {
            return Err(ResolveError::NotFound {
                specifier: specifier.to_string(),
                from: context.file.clone(),
            });
        }

        let (in_type, out_type) = pipeline_types(&id, qualifier);
        tracing::trace!(
            target: COMPONENT_LABEL,
            specifier,
            id = %id.display(),
            in_type = %in_type,
            out_type = %out_type,
            "resolved module"
        );
        Ok(ResolvedModule {
            id,
            in_type,
            out_type,
        })
    }

    fn virtual_file(&mut self, path: PathBuf, encoding: &str, content: String) {
        tracing::debug!(
            target: COMPONENT_LABEL,
            path = %path.display(),
            bytes = content.len(),
            "registered virtual file"
        );
        self.virtual_files.insert(
            path.clone(),
            VirtualModule {
                path,
                encoding: encoding.to_string(),
                content,
            },
        );
    }
}

/// Pipeline types of a module from its extension and an optional
/// `"in|out"` / `"out"` qualifier.
fn pipeline_types(id: &Path, qualifier: Option<&str>) -> (String, String) {
    let extension = id
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    let mut in_type = match extension.as_str() {
        "htm" => "html".to_string(),
        "mjs" | "cjs" => "js".to_string(),
        "" => "file".to_string(),
        other => other.to_string(),
    };
    let mut out_type = match in_type.as_str() {
        "js" => "js".to_string(),
        _ => "text".to_string(),
    };

    if let Some(qualifier) = qualifier.map(str::trim).filter(|q| !q.is_empty()) {
        match qualifier.split_once('|') {
            Some((input, output)) => {
                if !input.trim().is_empty() {
                    in_type = input.trim().to_ascii_lowercase();
                }
                if !output.trim().is_empty() {
                    out_type = output.trim().to_ascii_lowercase();
                }
            }
            None => out_type = qualifier.to_ascii_lowercase(),
        }
    }

    (in_type, out_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn context(root: &Path) -> ResolveContext {
        ResolveContext {
            file: root.join("pages/home.js"),
            src_dirname: root.to_path_buf(),
        }
    }

    #[test]
    fn test_resolve_relative_rooted_and_bare() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("pages")).unwrap();
        fs::create_dir_all(root.join("tpl")).unwrap();
        fs::create_dir_all(root.join("node_modules/ui")).unwrap();
        fs::write(root.join("pages/home.html"), "<div></div>").unwrap();
        fs::write(root.join("tpl/shared.htm"), "<div></div>").unwrap();
        fs::write(root.join("node_modules/ui/card.html"), "<div></div>").unwrap();

        let host = FsHost::new();
        let ctx = context(root);

        let relative = host.resolve_module("./home.html", None, &ctx).unwrap();
        assert_eq!(relative.id, root.join("pages/home.html"));
        assert!(relative.is_html_text());

        let parent = host.resolve_module("../tpl/shared.htm", None, &ctx).unwrap();
        assert_eq!(parent.id, root.join("tpl/shared.htm"));
        assert_eq!(parent.in_type, "html");

        let rooted = host.resolve_module("/tpl/shared.htm", None, &ctx).unwrap();
        assert_eq!(rooted.id, parent.id);

        let bare = host.resolve_module("ui/card.html", None, &ctx).unwrap();
        assert_eq!(bare.id, root.join("node_modules/ui/card.html"));
    }

    #[test]
    fn test_resolve_qualifier() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("pages")).unwrap();
        fs::write(root.join("pages/home.html"), "<div></div>").unwrap();
        fs::write(root.join("pages/data.json"), "{}").unwrap();

        let host = FsHost::new();
        let ctx = context(root);

        let html = host.resolve_module("./home.html", Some("html"), &ctx).unwrap();
        assert_eq!((html.in_type.as_str(), html.out_type.as_str()), ("html", "html"));
        assert!(!html.is_html_text());

        let text = host.resolve_module("./home.html", Some("html|text"), &ctx).unwrap();
        assert!(text.is_html_text());

        let json = host.resolve_module("./data.json", None, &ctx).unwrap();
        assert_eq!((json.in_type.as_str(), json.out_type.as_str()), ("json", "text"));
    }

    #[test]
    fn test_resolve_missing_and_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let host = FsHost::new();
        let ctx = context(dir.path());

        let err = host.resolve_module("./nope.html", None, &ctx).unwrap_err();
        assert!(matches!(err, ResolveError::NotFound { .. }));

        let err = host.resolve_module("  ", None, &ctx).unwrap_err();
        assert_eq!(err, ResolveError::InvalidSpecifier("  ".into()));
    }

    #[test]
    fn test_registry_keeps_order_and_replaces() {
        let mut host = FsHost::new();
        host.virtual_file("/b.js".into(), VIRTUAL_FILE_ENCODING, "1".into());
        host.virtual_file("/a.js".into(), VIRTUAL_FILE_ENCODING, "2".into());
        host.virtual_file("/b.js".into(), VIRTUAL_FILE_ENCODING, "3".into());

        let paths: Vec<_> = host.virtual_files().map(|m| m.path.clone()).collect();
        assert_eq!(paths, vec![PathBuf::from("/b.js"), PathBuf::from("/a.js")]);
        assert_eq!(host.get(Path::new("/b.js")).unwrap().content, "3");
        assert_eq!(host.len(), 2);
    }

    #[test]
    fn test_pipeline_types_defaults() {
        assert_eq!(
            pipeline_types(Path::new("/a/b.js"), None),
            ("js".to_string(), "js".to_string())
        );
        assert_eq!(
            pipeline_types(Path::new("/a/b.HTML"), None),
            ("html".to_string(), "text".to_string())
        );
        assert_eq!(
            pipeline_types(Path::new("/a/b.css"), Some("css|style")),
            ("css".to_string(), "style".to_string())
        );
    }
}
