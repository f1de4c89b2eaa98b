//! Switching dependency imports of the full Vue build to the runtime-only
//! build, which is all precompiled render functions need.

use crate::COMPONENT_LABEL;
use crate::error::PluginResult;
use crate::options::{Phase, PipelineOptions};
use crate::paths::normalize_path;
use crate::pipeline::{Outcome, Transform};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};

/// Full build → runtime-only build, relative to the source root.
const RUNTIME_BUILDS: &[(&str, &str)] = &[(
    "node_modules/vue/dist/vue.common.js",
    "node_modules/vue/dist/vue.runtime.common.js",
)];

/// Rewrites resolved dependency paths to their runtime-only builds.
#[derive(Debug, Default)]
pub struct RuntimeModeRewriter {
    mapping: FxHashMap<PathBuf, PathBuf>,
}

impl RuntimeModeRewriter {
    /// Create a rewriter; the mapping is filled at [`Phase::PostConfig`].
    pub fn new() -> Self {
        Self::default()
    }

    /// The runtime build `file` should be replaced with, if any.
    pub fn rewrite(&self, file: &Path) -> Option<&PathBuf> {
        self.mapping.get(&normalize_path(file))
    }
}

impl Transform for RuntimeModeRewriter {
    fn transform(&mut self, options: &mut PipelineOptions) -> PluginResult<Outcome> {
        match options.progress {
            Phase::PostConfig => {
                if let Some(configs) = &options.configs {
                    for (full, runtime) in RUNTIME_BUILDS {
                        self.mapping.insert(
                            normalize_path(&configs.src_dirname.join(full)),
                            normalize_path(&configs.src_dirname.join(runtime)),
                        );
                    }
                }
                Ok(Outcome::Handled)
            }
            Phase::PostModule if options.node_module => {
                if let Some(runtime) = self.rewrite(&options.file) {
                    tracing::debug!(
                        target: COMPONENT_LABEL,
                        from = %options.file.display(),
                        to = %runtime.display(),
                        "using vue runtime-only build"
                    );
                    options.file = runtime.clone();
                }
                Ok(Outcome::Handled)
            }
            _ => Ok(Outcome::Ignored),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::BuildConfig;
    use pretty_assertions::assert_eq;

    fn configured() -> RuntimeModeRewriter {
        let mut rewriter = RuntimeModeRewriter::new();
        let mut options = PipelineOptions::post_config(BuildConfig::new("/app/src"));
        assert_eq!(rewriter.transform(&mut options).unwrap(), Outcome::Handled);
        rewriter
    }

    #[test]
    fn test_full_build_is_rewritten_for_dependencies() {
        let mut rewriter = configured();
        let mut options = PipelineOptions::module(
            Phase::PostModule,
            "/app/src/node_modules/vue/dist/vue.common.js",
            "",
            true,
        );
        assert_eq!(rewriter.transform(&mut options).unwrap(), Outcome::Handled);
        assert_eq!(
            options.file,
            PathBuf::from("/app/src/node_modules/vue/dist/vue.runtime.common.js")
        );
    }

    #[test]
    fn test_unnormalized_host_paths_are_rewritten() {
        let mut rewriter = configured();
        let mut options = PipelineOptions::module(
            Phase::PostModule,
            "/app/src/./lib/../node_modules/vue/dist/vue.common.js",
            "",
            true,
        );
        rewriter.transform(&mut options).unwrap();
        assert_eq!(
            options.file,
            PathBuf::from("/app/src/node_modules/vue/dist/vue.runtime.common.js")
        );
    }

    #[test]
    fn test_other_paths_are_unchanged() {
        let mut rewriter = configured();
        let mut options = PipelineOptions::module(
            Phase::PostModule,
            "/app/src/node_modules/vue-router/dist/vue-router.common.js",
            "",
            true,
        );
        assert_eq!(rewriter.transform(&mut options).unwrap(), Outcome::Handled);
        assert_eq!(
            options.file,
            PathBuf::from("/app/src/node_modules/vue-router/dist/vue-router.common.js")
        );
    }

    #[test]
    fn test_own_modules_and_other_phases_are_ignored() {
        let mut rewriter = configured();
        let full = "/app/src/node_modules/vue/dist/vue.common.js";

        let mut own = PipelineOptions::module(Phase::PostModule, full, "", false);
        assert_eq!(rewriter.transform(&mut own).unwrap(), Outcome::Ignored);
        assert_eq!(own.file, PathBuf::from(full));

        let mut pre = PipelineOptions::module(Phase::PreModule, full, "", true);
        assert_eq!(rewriter.transform(&mut pre).unwrap(), Outcome::Ignored);
        assert_eq!(pre.file, PathBuf::from(full));

        let mut other = PipelineOptions::module(Phase::Other("pre-compile".into()), full, "", true);
        assert_eq!(rewriter.transform(&mut other).unwrap(), Outcome::Ignored);
    }
}
