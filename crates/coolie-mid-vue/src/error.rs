//! Error types for the coolie-mid-vue transforms.
//!
//! Recoverable conditions (unparseable modules, unsupported `require`
//! shapes, unsupported pipeline types) are reported as
//! [`Diagnostic`](crate::Diagnostic)s instead; the errors here stop the
//! current step.

use source_text::EditError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for pipeline operations.
pub type PluginResult<T> = Result<T, PluginError>;

/// An error that aborts a pipeline step.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The host could not resolve a template module.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// A resolved template could not be read.
    #[error("failed to read template {}: {source}", path.display())]
    ReadTemplate {
        /// Template path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A module was transformed before the build configuration was seen.
    #[error("no build configuration captured before transforming {}", file.display())]
    MissingConfig {
        /// The module being transformed.
        file: PathBuf,
    },

    /// Planned replacements could not be spliced into the module.
    #[error("failed to rewrite {}: {source}", file.display())]
    Edit {
        /// The module being rewritten.
        file: PathBuf,
        /// Underlying edit error.
        #[source]
        source: EditError,
    },
}

/// An error from module resolution.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// No file exists for the specifier.
    #[error("cannot find module '{specifier}' from {}", from.display())]
    NotFound {
        /// The specifier as written.
        specifier: String,
        /// The importing file.
        from: PathBuf,
    },

    /// The specifier is empty or otherwise unusable.
    #[error("invalid module specifier '{0}'")]
    InvalidSpecifier(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_resolve_error_message() {
        let err = ResolveError::NotFound {
            specifier: "./missing.html".into(),
            from: PathBuf::from("/src/app.js"),
        };
        assert_eq!(
            err.to_string(),
            "cannot find module './missing.html' from /src/app.js"
        );
    }

    #[test]
    fn test_plugin_error_from_resolve() {
        let err: PluginError = ResolveError::InvalidSpecifier(String::new()).into();
        assert!(matches!(err, PluginError::Resolve(_)));
        assert_eq!(err.to_string(), "invalid module specifier ''");
    }
}
