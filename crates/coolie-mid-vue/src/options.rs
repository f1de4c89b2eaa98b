//! The per-module record the host passes through its build phases.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A phase of the host's per-module build pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Phase {
    /// The build configuration has been loaded.
    PostConfig,
    /// A module's source is about to be parsed by the host.
    PreModule,
    /// A module has been resolved and added to the graph.
    PostModule,
    /// Any other phase; ignored by these transforms.
    Other(String),
}

impl Phase {
    /// Get the phase name as the host spells it.
    pub fn as_str(&self) -> &str {
        match self {
            Self::PostConfig => "post-config",
            Self::PreModule => "pre-module",
            Self::PostModule => "post-module",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for Phase {
    fn from(name: &str) -> Self {
        match name {
            "post-config" => Self::PostConfig,
            "pre-module" => Self::PreModule,
            "post-module" => Self::PostModule,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build configuration captured at [`Phase::PostConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfig {
    /// Absolute source root of the build.
    pub src_dirname: PathBuf,
}

impl BuildConfig {
    /// Create a build configuration rooted at `src_dirname`.
    pub fn new(src_dirname: impl Into<PathBuf>) -> Self {
        Self {
            src_dirname: src_dirname.into(),
        }
    }
}

/// Mutable state for one module in one phase.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// The current phase.
    pub progress: Phase,
    /// Absolute path of the module.
    pub file: PathBuf,
    /// Module source; rewritten in place.
    pub code: String,
    /// Whether the module comes from a dependency.
    pub node_module: bool,
    /// Build configuration, present at [`Phase::PostConfig`].
    pub configs: Option<BuildConfig>,
}

impl PipelineOptions {
    /// Options for the configuration phase.
    pub fn post_config(configs: BuildConfig) -> Self {
        Self {
            progress: Phase::PostConfig,
            file: PathBuf::new(),
            code: String::new(),
            node_module: false,
            configs: Some(configs),
        }
    }

    /// Options for a module phase.
    pub fn module(
        progress: Phase,
        file: impl Into<PathBuf>,
        code: impl Into<String>,
        node_module: bool,
    ) -> Self {
        Self {
            progress,
            file: file.into(),
            code: code.into(),
            node_module,
            configs: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_phase_names() {
        for phase in [Phase::PostConfig, Phase::PreModule, Phase::PostModule] {
            assert_eq!(Phase::from(phase.as_str()), phase);
        }
        assert_eq!(Phase::from("pre-compile"), Phase::Other("pre-compile".into()));
    }

    #[test]
    fn test_build_config_serde() {
        let config: BuildConfig = serde_json::from_str(r#"{"srcDirname":"/app/src"}"#).unwrap();
        assert_eq!(config, BuildConfig::new("/app/src"));
    }
}
