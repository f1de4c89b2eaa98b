//! AST types for Vue templates.
//!
//! Structural directives are lifted out of elements while parsing:
//! `v-for` becomes a [`ForNode`], `v-if`/`v-else-if`/`v-else` become
//! single-branch [`IfNode`]s that [`crate::transforms`] later chains, and
//! `<slot>` becomes a [`SlotOutletNode`].

use indexmap::IndexMap;
use smol_str::SmolStr;
use source_text::Span;

/// The root of a parsed template.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TemplateAst {
    pub children: Vec<TemplateNode>,
    pub span: Span,
}

/// A node in the template AST.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TemplateNode {
    /// An HTML element or a component.
    Element(ElementNode),
    Text(TextNode),
    /// `{{ expr }}`
    Interpolation(InterpolationNode),
    Comment(CommentNode),
    /// A `v-if` / `v-else-if` / `v-else` chain.
    If(IfNode),
    /// An element carrying `v-for`.
    For(ForNode),
    /// `<slot>`
    SlotOutlet(SlotOutletNode),
    /// `<template v-slot>` before it is moved into its component's slots.
    Template(TemplateElementNode),
}

impl TemplateNode {
    pub fn span(&self) -> Span {
        match self {
            Self::Element(n) => n.span,
            Self::Text(n) => n.span,
            Self::Interpolation(n) => n.span,
            Self::Comment(n) => n.span,
            Self::If(n) => n.span,
            Self::For(n) => n.span,
            Self::SlotOutlet(n) => n.span,
            Self::Template(n) => n.span,
        }
    }

    /// Whether this node is a comment or whitespace-only text.
    pub fn is_insignificant(&self) -> bool {
        match self {
            Self::Comment(_) => true,
            Self::Text(text) => text.content.trim().is_empty(),
            _ => false,
        }
    }
}

/// An element node (HTML element or component).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ElementNode {
    pub tag: SmolStr,
    /// A user component: PascalCase or hyphenated, and not a built-in.
    pub is_component: bool,
    /// Static attributes.
    pub attrs: Vec<Attribute>,
    /// Directives other than bindings, listeners and structural ones.
    pub directives: Vec<Directive>,
    /// `:name` / `v-bind:name` / `.name`
    pub props: Vec<Prop>,
    /// `@name` / `v-on:name`
    pub events: Vec<EventListener>,
    pub children: Vec<TemplateNode>,
    /// Named slot content passed to a component, in source order.
    pub slots: IndexMap<SmolStr, SlotNode>,
    pub span: Span,
}

impl ElementNode {
    pub fn has_directive(&self, name: &str) -> bool {
        self.directives.iter().any(|d| d.name == name)
    }

    /// A static attribute by name.
    pub fn get_attr(&self, name: &str) -> Option<&Attribute> {
        self.attrs.iter().find(|a| a.name == name)
    }

    /// A bound attribute with a static name.
    pub fn get_prop(&self, name: &str) -> Option<&Prop> {
        self.props.iter().find(|p| p.name == name && !p.is_dynamic)
    }
}

/// Anything written with `.modifier` suffixes.
pub trait Modifiers {
    fn modifiers(&self) -> &[SmolStr];

    fn has_modifier(&self, modifier: &str) -> bool {
        self.modifiers().iter().any(|m| m == modifier)
    }
}

/// A static attribute.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Attribute {
    pub name: SmolStr,
    /// `None` for a bare attribute such as `disabled`.
    pub value: Option<String>,
    pub span: Span,
    /// Span of the value text, without quotes.
    pub value_span: Option<Span>,
}

/// A `v-*` or `#slot` directive.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Directive {
    /// Name without the `v-` prefix.
    pub name: SmolStr,
    pub arg: Option<DirectiveArg>,
    pub modifiers: Vec<SmolStr>,
    pub value: Option<Expression>,
    pub span: Span,
}

impl Modifiers for Directive {
    fn modifiers(&self) -> &[SmolStr] {
        &self.modifiers
    }
}

/// A directive argument.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DirectiveArg {
    /// `v-slot:header`
    Static(SmolStr, Span),
    /// `v-slot:[name]`
    Dynamic(Expression),
}

/// A bound attribute.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Prop {
    /// Attribute name, or the name expression when `is_dynamic`.
    pub name: SmolStr,
    pub value: Expression,
    pub is_dynamic: bool,
    /// `.prop`, `.camel`, `.sync`
    pub modifiers: Vec<SmolStr>,
    pub span: Span,
}

impl Modifiers for Prop {
    fn modifiers(&self) -> &[SmolStr] {
        &self.modifiers
    }
}

/// An event listener.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EventListener {
    /// Event name, or the name expression when `is_dynamic`.
    pub name: SmolStr,
    /// Handler expression; empty for modifier-only listeners like `@submit.prevent`.
    pub handler: Expression,
    pub is_dynamic: bool,
    pub modifiers: Vec<SmolStr>,
    pub span: Span,
}

impl Modifiers for EventListener {
    fn modifiers(&self) -> &[SmolStr] {
        &self.modifiers
    }
}

/// Content for a named slot of a component.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlotNode {
    /// Slot name (an expression when `is_dynamic`).
    pub name: SmolStr,
    pub is_dynamic: bool,
    /// Slot props pattern, for scoped slots.
    pub props: Option<SlotProps>,
    pub children: Vec<TemplateNode>,
    pub span: Span,
}

/// The props pattern of a scoped slot.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlotProps {
    /// An identifier or a destructuring pattern.
    pub pattern: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextNode {
    /// Raw text; entities are decoded during code generation.
    pub content: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InterpolationNode {
    pub expression: Expression,
    pub span: Span,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CommentNode {
    pub content: String,
    pub span: Span,
}

/// A conditional chain.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IfNode {
    pub branches: Vec<IfBranch>,
    pub span: Span,
}

/// One branch of a conditional chain.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IfBranch {
    /// `None` for `v-else`.
    pub condition: Option<Expression>,
    pub branch_type: IfBranchType,
    pub children: Vec<TemplateNode>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IfBranchType {
    If,
    ElseIf,
    Else,
}

/// `v-for="(value, key, index) in source"`
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ForNode {
    pub source: Expression,
    pub value: ForAlias,
    pub key: Option<ForAlias>,
    pub index: Option<ForAlias>,
    /// The repeated element, possibly wrapped in a `v-if`.
    pub children: Vec<TemplateNode>,
    pub span: Span,
}

/// An alias in a v-for expression.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ForAlias {
    /// An identifier or a destructuring pattern.
    pub pattern: String,
    pub span: Span,
}

/// A `<slot>` outlet.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlotOutletNode {
    /// Static `name="..."`, bound `:name`, or `"default"`.
    pub name: Expression,
    /// Static attributes passed to a scoped slot.
    pub attrs: Vec<Attribute>,
    /// Bound props passed to a scoped slot.
    pub props: Vec<Prop>,
    pub fallback: Vec<TemplateNode>,
    pub span: Span,
}

/// `<template v-slot:name="props">`
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TemplateElementNode {
    pub directives: Vec<Directive>,
    pub children: Vec<TemplateNode>,
    pub span: Span,
}

/// A JavaScript expression, or a literal string when `is_static`.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Expression {
    /// Raw source text.
    pub content: String,
    pub span: Span,
    pub is_static: bool,
}

impl Expression {
    pub fn new(content: impl Into<String>, span: Span) -> Self {
        Self {
            content: content.into(),
            span,
            is_static: false,
        }
    }

    /// A literal string rather than code.
    pub fn static_expr(content: impl Into<String>, span: Span) -> Self {
        Self {
            content: content.into(),
            span,
            is_static: true,
        }
    }

    /// Whether the expression has no code.
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}
