//! Finding annotated template bindings in a syntax tree.
//!
//! Two syntactic forms are recognized:
//!
//! ```js
//! /* @coolievue */
//! Component.template = require('./component.html');
//!
//! new Vue({
//!     // @coolievue
//!     template: require('./component.html', 'html|text')
//! });
//! ```
//!
//! Each annotated node becomes a [`TemplateMatch`] whose value has been
//! checked for the `require(specifier[, qualifier])` shape.

use crate::annotation::has_annotation;
use crate::literal::StringLiteral;
use crate::syntax::ParsedModule;
use source_text::Span;
use swc_common::{BytePos, Spanned};
use swc_ecma_ast::{
    AssignExpr, AssignOp, AssignTarget, Callee, Expr, KeyValueProp, Lit, MemberProp, PropName,
    SimpleAssignTarget,
};
use swc_ecma_visit::{Visit, VisitWith};

const TEMPLATE: &str = "template";

/// How the template is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateForm {
    /// `obj.template = require(...)` or `template = require(...)`.
    Assignment,
    /// `{ template: require(...) }`.
    Property,
}

impl TemplateForm {
    /// The operator written between `render` and the new `require`.
    pub fn operator(self) -> &'static str {
        match self {
            Self::Assignment => " = ",
            Self::Property => ": ",
        }
    }
}

/// A `require` call with one or two string arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequireCall {
    /// The module specifier.
    pub specifier: StringLiteral,
    /// The optional pipeline qualifier, e.g. `'html|text'`.
    pub qualifier: Option<StringLiteral>,
}

/// An annotated template binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateMatch {
    /// The syntactic form.
    pub form: TemplateForm,
    /// From the start of the `template` name to the end of the value.
    pub replace: Span,
    /// Span of the bound value.
    pub value: Span,
    /// The value as a `require` call, or `None` when it has another shape.
    pub require: Option<RequireCall>,
}

/// Collect every annotated template binding, in source order.
pub fn find_template_matches(module: &ParsedModule, code: &str) -> Vec<TemplateMatch> {
    let mut collector = TemplateCollector {
        module,
        code,
        matches: Vec::new(),
    };
    module.program.visit_with(&mut collector);
    collector.matches
}

struct TemplateCollector<'a> {
    module: &'a ParsedModule,
    code: &'a str,
    matches: Vec<TemplateMatch>,
}

impl TemplateCollector<'_> {
    fn is_annotated(&self, pos: BytePos) -> bool {
        has_annotation(self.module.comments_before(pos))
    }

    fn record(&mut self, form: TemplateForm, name_lo: BytePos, value: &Expr) {
        let value_span = value.span();
        let replace = self
            .module
            .span(swc_common::Span::new(name_lo, value_span.hi));
        let require = self.require_call(value);
        self.matches.push(TemplateMatch {
            form,
            replace,
            value: self.module.span(value_span),
            require,
        });
    }

    /// The string literal at `span`, read from the source text so the
    /// original quote character is kept.
    fn string_literal(&self, span: swc_common::Span) -> Option<StringLiteral> {
        let raw = self.code.get(self.module.span(span).to_range())?;
        StringLiteral::parse(raw)
    }

    fn require_call(&self, value: &Expr) -> Option<RequireCall> {
        let Expr::Call(call) = value else {
            return None;
        };
        let Callee::Expr(callee) = &call.callee else {
            return None;
        };
        let Expr::Ident(ident) = &**callee else {
            return None;
        };
        if &*ident.sym != "require" || !(1..=2).contains(&call.args.len()) {
            return None;
        }

        let mut literals = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            if arg.spread.is_some() {
                return None;
            }
            let Expr::Lit(Lit::Str(literal)) = &*arg.expr else {
                return None;
            };
            literals.push(self.string_literal(literal.span)?);
        }

        let mut literals = literals.into_iter();
        Some(RequireCall {
            specifier: literals.next()?,
            qualifier: literals.next(),
        })
    }

    fn template_key(&self, key: &PropName) -> Option<BytePos> {
        match key {
            PropName::Ident(name) if &*name.sym == TEMPLATE => Some(name.span.lo),
            PropName::Str(literal) => self
                .string_literal(literal.span)
                .filter(|lit| lit.value == TEMPLATE)
                .map(|_| literal.span.lo),
            _ => None,
        }
    }
}

/// Start of the `template` name when `target` is `<obj>.template` or a bare
/// `template` identifier.
fn template_target(target: &AssignTarget) -> Option<BytePos> {
    match target {
        AssignTarget::Simple(SimpleAssignTarget::Member(member)) => match &member.prop {
            MemberProp::Ident(name) if &*name.sym == TEMPLATE => Some(name.span.lo),
            _ => None,
        },
        AssignTarget::Simple(SimpleAssignTarget::Ident(binding))
            if &*binding.id.sym == TEMPLATE =>
        {
            Some(binding.id.span.lo)
        }
        _ => None,
    }
}

impl Visit for TemplateCollector<'_> {
    fn visit_assign_expr(&mut self, node: &AssignExpr) {
        if node.op == AssignOp::Assign {
            if let Some(name_lo) = template_target(&node.left) {
                if self.is_annotated(node.span.lo) {
                    self.record(TemplateForm::Assignment, name_lo, &node.right);
                }
            }
        }
        node.visit_children_with(self);
    }

    fn visit_key_value_prop(&mut self, node: &KeyValueProp) {
        if let Some(key_lo) = self.template_key(&node.key) {
            if self.is_annotated(key_lo) {
                self.record(TemplateForm::Property, key_lo, &node.value);
            }
        }
        node.visit_children_with(self);
    }
}
