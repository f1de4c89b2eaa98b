//! coolie bundler middleware that precompiles Vue templates.
//!
//! The middleware runs inside the bundler's module pipeline and does two
//! things:
//! - At `pre-module`, every `template` binding preceded by a `@coolievue`
//!   comment and bound to `require('<path>.html')` is compiled to a render
//!   function, registered as a virtual module, and the binding is rewritten
//!   to `render = require('<virtual module>')`.
//! - At `post-module`, dependency imports of Vue's full build are switched
//!   to the runtime-only build.
//!
//! Use [`pipeline`] to assemble both stages for one bundler run.

pub mod annotation;
pub mod compile;
pub mod diagnostics;
pub mod error;
pub mod host;
pub mod literal;
pub mod matcher;
pub mod options;
pub mod paths;
pub mod pipeline;
pub mod runtime_mode;
pub mod syntax;
pub mod template_rewriter;
pub mod virtual_file;

pub use compile::{Es5Transpiler, TemplateCompiler, Transpiler, VueTemplateCompiler};
pub use diagnostics::{Diagnostic, DiagnosticCode, Severity};
pub use error::{PluginError, PluginResult, ResolveError};
pub use host::{FsHost, Host, ResolveContext, ResolvedModule, VirtualModule};
pub use options::{BuildConfig, Phase, PipelineOptions};
pub use pipeline::{pipeline, Outcome, Pipeline, Transform};
pub use runtime_mode::RuntimeModeRewriter;
pub use template_rewriter::TemplateRewriter;

/// Label the middleware registers itself under.
pub const COMPONENT_LABEL: &str = "coolie-mid-vue";

/// Package name.
pub const PACKAGE_NAME: &str = env!("CARGO_PKG_NAME");

/// Package version.
pub const PACKAGE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_package_metadata() {
        assert_eq!(COMPONENT_LABEL, "coolie-mid-vue");
        assert_eq!(PACKAGE_NAME, "coolie-mid-vue");
        assert!(!PACKAGE_VERSION.is_empty());
    }

    #[test]
    fn test_virtual_modules_live_next_to_templates() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("views")).unwrap();
        std::fs::write(root.join("views/list.html"), "<ul><li v-for=\"item in items\" :key=\"item.id\">{{ item.name }}</li></ul>").unwrap();

        let mut plugin = pipeline(FsHost::new(), VueTemplateCompiler, Es5Transpiler);
        plugin
            .transform(&mut PipelineOptions::post_config(BuildConfig::new(root)))
            .unwrap();

        let mut module = PipelineOptions::module(
            Phase::from("pre-module"),
            root.join("index.js"),
            "new Vue({\n  el: '#app',\n  /* @coolievue */\n  template: require('./views/list.html')\n});\n",
            false,
        );
        plugin.transform(&mut module).unwrap();
        assert!(plugin.templates().diagnostics().is_empty());
        assert!(module.code.contains("render: require('./views/[coolie-mid-vue-virtual-file]-"));

        let host = plugin.into_host();
        let registered: Vec<_> = host.virtual_files().collect();
        assert_eq!(registered.len(), 1);
        assert_eq!(registered[0].path.parent(), Some(root.join("views").as_path()));
        let content = &registered[0].content;
        assert!(content.starts_with("module.exports = function render() {"), "{}", content);
        assert!(content.ends_with("};"), "{}", content);
        assert!(content.contains("_c('ul'"), "{}", content);
        assert!(content.contains("_v(_s(item.name))"), "{}", content);
    }
}
