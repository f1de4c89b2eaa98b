//! Template compilation and transpilation of the generated render function.

use crate::syntax::parse_script_file;
use source_text::LineIndex;
use swc_common::comments::SingleThreadedComments;
use swc_common::sync::Lrc;
use swc_common::{FileName, Globals, Mark, SourceMap, GLOBALS};
use swc_ecma_ast::{Decl, Program, Stmt};
use swc_ecma_codegen::to_code_default;
use swc_ecma_transforms_base::fixer::fixer;
use swc_ecma_transforms_base::helpers::{inject_helpers, Helpers, HELPERS};
use swc_ecma_transforms_base::hygiene::hygiene;
use swc_ecma_transforms_base::resolver;
use swc_ecma_transforms_compat::es2015;
use vue_template_compiler::CompiledTemplate;

const RENDER: &str = "render";

/// Compiles HTML templates to render function bodies.
pub trait TemplateCompiler {
    /// Compile `html`; the error is a human-readable message.
    fn compile(&self, html: &str) -> Result<CompiledTemplate, String>;
}

/// Transpiles generated JavaScript for the target runtime.
pub trait Transpiler {
    /// Transpile `js`; the error is a human-readable message.
    fn transpile(&self, js: &str) -> Result<String, String>;
}

/// The Vue 2 template compiler from `vue-template-compiler`.
#[derive(Debug, Clone, Copy, Default)]
pub struct VueTemplateCompiler;

impl TemplateCompiler for VueTemplateCompiler {
    fn compile(&self, html: &str) -> Result<CompiledTemplate, String> {
        vue_template_compiler::compile(html).map_err(|err| {
            let (line, col) = LineIndex::new(html).line_col(err.span.start).to_display();
            format!("{}:{}: {} [{}]", line, col, err.message, err.code)
        })
    }
}

/// Lowers the render function to ES5 with swc's ES2015 passes.
///
/// Template expressions are copied into the render code verbatim, so arrow
/// functions, template literals, spreads and destructuring written in a
/// template are rewritten here. Runtime helpers the passes need are inlined
/// at the top of the render function, which stays the only statement.
#[derive(Debug, Clone, Copy, Default)]
pub struct Es5Transpiler;

impl Transpiler for Es5Transpiler {
    fn transpile(&self, js: &str) -> Result<String, String> {
        let cm: Lrc<SourceMap> = Default::default();
        let file = cm.new_source_file(Lrc::new(FileName::Anon), js.to_string());
        let script = parse_script_file(&file)
            .map_err(|err| format!("generated render function is invalid: {}", err.message))?;

        let program = GLOBALS.set(&Globals::new(), || {
            let unresolved_mark = Mark::new();
            let top_level_mark = Mark::new();
            HELPERS.set(&Helpers::new(false), || {
                Program::Script(script)
                    .apply(resolver(unresolved_mark, top_level_mark, false))
                    .apply(es2015(
                        unresolved_mark,
                        None::<SingleThreadedComments>,
                        Default::default(),
                    ))
                    .apply(inject_helpers(unresolved_mark))
                    .apply(hygiene())
                    .apply(fixer(None))
            })
        });

        let Program::Script(mut script) = program else {
            return Err("generated render function is not a script".to_string());
        };
        let render = script
            .body
            .iter()
            .rposition(|stmt| matches!(stmt, Stmt::Decl(Decl::Fn(f)) if &*f.ident.sym == RENDER))
            .map(|index| script.body.remove(index));
        let Some(Stmt::Decl(Decl::Fn(mut render))) = render else {
            return Err(format!("transpiled code lost the {} function", RENDER));
        };
        if let Some(body) = render.function.body.as_mut() {
            let mut stmts = std::mem::take(&mut script.body);
            stmts.append(&mut body.stmts);
            body.stmts = stmts;
        }
        script.body = vec![Stmt::Decl(Decl::Fn(render))];

        Ok(to_code_default(cm, None, &script).trim_end().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_vue_template_compiler() {
        let compiled = VueTemplateCompiler.compile("<p>{{ msg }}</p>").unwrap();
        assert_eq!(compiled.render, "with(this){return _c('p',[_v(_s(msg))])}");
    }

    #[test]
    fn test_vue_template_compiler_error_position() {
        let err = VueTemplateCompiler
            .compile("<div>\n  <li v-for=\"oops\"></li>\n</div>")
            .unwrap_err();
        assert!(err.starts_with("2:"), "{}", err);
        assert!(err.ends_with("[invalid-v-for]"), "{}", err);
    }

    #[test]
    fn test_es5_transpiler_keeps_es5_render_code() {
        let code = Es5Transpiler
            .transpile("function render () {with(this){return _c('p',[_v(_s(msg))])}}")
            .unwrap();
        assert!(code.starts_with("function render() {"), "{}", code);
        assert!(code.contains("with(this)") || code.contains("with (this)"), "{}", code);
        assert!(code.contains("_c('p'"), "{}", code);
        assert!(code.contains("_v(_s(msg))"), "{}", code);
    }

    #[test]
    fn test_es5_transpiler_lowers_template_expressions() {
        let compiled = VueTemplateCompiler
            .compile(
                "<div :title=\"`a${b}`\" @click=\"() => go(1)\"><p v-for=\"{id} in xs\">{{ [...xs].length }}</p></div>",
            )
            .unwrap();
        let code = Es5Transpiler
            .transpile(&format!("function render () {{{}}}", compiled.render))
            .unwrap();

        assert!(code.starts_with("function render() {"), "{}", code);
        assert!(!code.contains("=>"), "{}", code);
        assert!(!code.contains('`'), "{}", code);
        assert!(!code.contains("..."), "{}", code);
        assert!(!code.contains("{id}") && !code.contains("{ id }"), "{}", code);

        let cm = SourceMap::default();
        let file = cm.new_source_file(Lrc::new(FileName::Anon), code);
        let script = parse_script_file(&file).unwrap();
        assert_eq!(script.body.len(), 1);
    }

    #[test]
    fn test_es5_transpiler_rejects_invalid_code() {
        let err = Es5Transpiler
            .transpile("function render () {with(this){return _c('p',{on:{\"click\":function($event){a +}}})}}")
            .unwrap_err();
        assert!(err.starts_with("generated render function is invalid"), "{}", err);
    }
}
