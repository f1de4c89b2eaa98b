//! Rewriting annotated `template` bindings to precompiled `render` modules.
//!
//! ```js
//! /* @coolievue */
//! App.template = require('./app.html');
//! ```
//!
//! becomes
//!
//! ```js
//! /* @coolievue */
//! App.render = require('./[coolie-mid-vue-virtual-file]-<uuid>.js');
//! ```
//!
//! where the virtual module exports the compiled render function. Every
//! replacement in a module is planned against the same snapshot of its
//! source and spliced in one pass, so any number of bindings per module
//! rewrite correctly.

use crate::COMPONENT_LABEL;
use crate::compile::{TemplateCompiler, Transpiler};
use crate::diagnostics::{Diagnostic, DiagnosticCode, Severity};
use crate::error::{PluginError, PluginResult};
use crate::host::{Host, ResolveContext, ResolvedModule, VIRTUAL_FILE_ENCODING};
use crate::literal::quote_js_string;
use crate::matcher::{find_template_matches, TemplateMatch};
use crate::options::{BuildConfig, Phase, PipelineOptions};
use crate::paths::require_specifier;
use crate::pipeline::{Outcome, Transform};
use crate::syntax::parse_module;
use crate::virtual_file::{render_module, virtual_file_path, VirtualFileMap};
use source_text::EditSet;
use std::path::{Path, PathBuf};

/// Rewrites annotated template bindings and registers render modules.
pub struct TemplateRewriter<H, C, T> {
    host: H,
    compiler: C,
    transpiler: T,
    configs: Option<BuildConfig>,
    virtual_files: VirtualFileMap,
    diagnostics: Vec<Diagnostic>,
}

impl<H: Host, C: TemplateCompiler, T: Transpiler> TemplateRewriter<H, C, T> {
    /// Create a rewriter for one build run.
    pub fn new(host: H, compiler: C, transpiler: T) -> Self {
        Self {
            host,
            compiler,
            transpiler,
            configs: None,
            virtual_files: VirtualFileMap::new(),
            diagnostics: Vec::new(),
        }
    }

    /// The host.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Finish the run and hand back the host.
    pub fn into_host(self) -> H {
        self.host
    }

    /// Templates compiled so far.
    pub fn virtual_files(&self) -> &VirtualFileMap {
        &self.virtual_files
    }

    /// Diagnostics reported so far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Drain the diagnostics reported so far.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => tracing::error!(
                target: COMPONENT_LABEL,
                file = %diagnostic.file.display(),
                code = diagnostic.code.as_str(),
                "{}",
                diagnostic.message
            ),
            Severity::Warning => tracing::warn!(
                target: COMPONENT_LABEL,
                file = %diagnostic.file.display(),
                code = diagnostic.code.as_str(),
                "{}",
                diagnostic.message
            ),
        }
        self.diagnostics.push(diagnostic);
    }

    /// Rewrite every annotated template binding in one module.
    fn rewrite_module(&mut self, options: &mut PipelineOptions) -> PluginResult<()> {
        let module = match parse_module(&options.code) {
            Ok(module) => module,
            Err(err) => {
                self.report(
                    Diagnostic::error(
                        &options.file,
                        format!("module cannot be parsed, please check its syntax: {}", err.message),
                        DiagnosticCode::ParseFailure,
                    )
                    .with_span(err.span),
                );
                return Ok(());
            }
        };

        let matches = find_template_matches(&module, &options.code);
        if matches.is_empty() {
            return Ok(());
        }

        let src_dirname = match &self.configs {
            Some(configs) => configs.src_dirname.clone(),
            None => {
                return Err(PluginError::MissingConfig {
                    file: options.file.clone(),
                })
            }
        };
        let context = ResolveContext {
            file: options.file.clone(),
            src_dirname,
        };

        let mut edits = EditSet::new();
        for found in &matches {
            if let Some(replacement) = self.replacement(found, &context)? {
                edits.replace(found.replace, replacement);
            }
        }

        if edits.is_empty() {
            return Ok(());
        }

        let count = edits.len();
        options.code = edits.apply(&options.code).map_err(|source| PluginError::Edit {
            file: options.file.clone(),
            source,
        })?;
        tracing::debug!(
            target: COMPONENT_LABEL,
            file = %options.file.display(),
            count,
            "rewrote template bindings"
        );
        Ok(())
    }

    /// The `render ... require(...)` text for one binding, or `None` when
    /// the binding stays as it is.
    fn replacement(
        &mut self,
        found: &TemplateMatch,
        context: &ResolveContext,
    ) -> PluginResult<Option<String>> {
        let Some(require) = &found.require else {
            self.report(
                Diagnostic::warning(
                    &context.file,
                    "template must be bound to require() with one or two string arguments",
                    DiagnosticCode::UnsupportedRequireShape,
                )
                .with_span(found.value),
            );
            return Ok(None);
        };

        let resolved = self.host.resolve_module(
            &require.specifier.value,
            require.qualifier.as_ref().map(|q| q.value.as_str()),
            context,
        )?;

        if !resolved.is_html_text() {
            self.report(
                Diagnostic::warning(
                    &context.file,
                    format!(
                        "template require pipeline only supports html|text, found {}|{}",
                        resolved.in_type, resolved.out_type
                    ),
                    DiagnosticCode::UnsupportedPipelineType,
                )
                .with_span(found.value),
            );
            return Ok(None);
        }

        let Some(virtual_path) = self.render_module_for(&resolved, &context.file, found)? else {
            return Ok(None);
        };

        let from_dir = context.file.parent().unwrap_or_else(|| Path::new(""));
        let specifier = require_specifier(from_dir, &virtual_path);
        Ok(Some(format!(
            "render{}require({})",
            found.form.operator(),
            quote_js_string(&specifier, require.specifier.quote)
        )))
    }

    /// The render module for a template, compiling and registering it the
    /// first time the template is seen.
    fn render_module_for(
        &mut self,
        resolved: &ResolvedModule,
        file: &Path,
        found: &TemplateMatch,
    ) -> PluginResult<Option<PathBuf>> {
        if let Some(existing) = self.virtual_files.get(&resolved.id) {
            return Ok(Some(existing.to_path_buf()));
        }

        let html =
            std::fs::read_to_string(&resolved.id).map_err(|source| PluginError::ReadTemplate {
                path: resolved.id.clone(),
                source,
            })?;

        let render_function = self
            .compiler
            .compile(&html)
            .and_then(|compiled| {
                self.transpiler
                    .transpile(&format!("function render () {{{}}}", compiled.render))
            });
        let render_function = match render_function {
            Ok(render_function) => render_function,
            Err(message) => {
                self.report(
                    Diagnostic::warning(
                        file,
                        format!("{}: {}", resolved.id.display(), message),
                        DiagnosticCode::TemplateCompileFailure,
                    )
                    .with_span(found.value),
                );
                return Ok(None);
            }
        };

        let virtual_path = virtual_file_path(&resolved.id);
        self.host.virtual_file(
            virtual_path.clone(),
            VIRTUAL_FILE_ENCODING,
            render_module(&render_function),
        );
        self.virtual_files
            .insert(resolved.id.clone(), virtual_path.clone());
        Ok(Some(virtual_path))
    }
}

impl<H: Host, C: TemplateCompiler, T: Transpiler> Transform for TemplateRewriter<H, C, T> {
    fn transform(&mut self, options: &mut PipelineOptions) -> PluginResult<Outcome> {
        match options.progress {
            Phase::PostConfig => {
                self.configs = options.configs.clone();
                Ok(Outcome::Handled)
            }
            Phase::PreModule if !options.node_module => {
                self.rewrite_module(options)?;
                Ok(Outcome::Handled)
            }
            _ => Ok(Outcome::Ignored),
        }
    }
}
