//! The host pipeline contract and the assembled plugin.

use crate::compile::{TemplateCompiler, Transpiler};
use crate::error::PluginResult;
use crate::host::Host;
use crate::options::PipelineOptions;
use crate::runtime_mode::RuntimeModeRewriter;
use crate::template_rewriter::TemplateRewriter;

/// Whether a transform acted on the options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The transform ran for this phase.
    Handled,
    /// Nothing to do for this phase; the options are unchanged.
    Ignored,
}

impl Outcome {
    /// Combine the outcomes of two transforms run on the same options.
    pub fn or(self, other: Outcome) -> Outcome {
        match (self, other) {
            (Self::Ignored, Self::Ignored) => Self::Ignored,
            _ => Self::Handled,
        }
    }
}

/// A stage the host calls once per module and phase.
pub trait Transform {
    /// Inspect and possibly rewrite `options`.
    fn transform(&mut self, options: &mut PipelineOptions) -> PluginResult<Outcome>;
}

/// Both stages, run in order: runtime-mode rewriting, then templates.
pub struct Pipeline<H, C, T> {
    runtime_mode: RuntimeModeRewriter,
    templates: TemplateRewriter<H, C, T>,
}

impl<H: Host, C: TemplateCompiler, T: Transpiler> Pipeline<H, C, T> {
    /// The template stage, for its host and diagnostics.
    pub fn templates(&self) -> &TemplateRewriter<H, C, T> {
        &self.templates
    }

    /// Mutable access to the template stage.
    pub fn templates_mut(&mut self) -> &mut TemplateRewriter<H, C, T> {
        &mut self.templates
    }

    /// Finish the run and hand back the host.
    pub fn into_host(self) -> H {
        self.templates.into_host()
    }
}

impl<H: Host, C: TemplateCompiler, T: Transpiler> Transform for Pipeline<H, C, T> {
    fn transform(&mut self, options: &mut PipelineOptions) -> PluginResult<Outcome> {
        let runtime = self.runtime_mode.transform(options)?;
        let templates = self.templates.transform(options)?;
        Ok(runtime.or(templates))
    }
}

/// Assemble the plugin for one bundler run.
pub fn pipeline<H: Host, C: TemplateCompiler, T: Transpiler>(
    host: H,
    compiler: C,
    transpiler: T,
) -> Pipeline<H, C, T> {
    Pipeline {
        runtime_mode: RuntimeModeRewriter::new(),
        templates: TemplateRewriter::new(host, compiler, transpiler),
    }
}
