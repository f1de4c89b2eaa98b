//! Parser for Vue templates.
//!
//! A forgiving single-pass scanner in the spirit of the browser's: stray end
//! tags are dropped, an unclosed element is closed by any ancestor's end tag,
//! and a `<` that does not open a tag is text.

use crate::ast::*;
use crate::error::{CompileError, CompileResult};
use indexmap::IndexMap;
use smol_str::SmolStr;
use source_text::Span;

/// Parse a Vue template into an AST.
pub fn parse_template(source: &str) -> CompileResult<TemplateAst> {
    let mut parser = TemplateParser {
        source,
        pos: 0,
        open_tags: Vec::new(),
    };
    let children = parser.parse_children()?;
    Ok(TemplateAst {
        children,
        span: Span::new(0, source.len() as u32),
    })
}

struct TemplateParser<'a> {
    source: &'a str,
    pos: usize,
    /// Tags whose children are currently being parsed, innermost last.
    open_tags: Vec<String>,
}

impl<'a> TemplateParser<'a> {
    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn at(&self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    /// Consume `s` if the cursor is on it.
    fn eat(&mut self, s: &str) -> bool {
        let found = self.at(s);
        if found {
            self.pos += s.len();
        }
        found
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        let len = self
            .rest()
            .find(|c: char| !pred(c))
            .unwrap_or(self.source.len() - start);
        self.pos += len;
        &self.source[start..self.pos]
    }

    /// Consume up to (not including) `s`, or to the end.
    fn eat_until(&mut self, s: &str) -> &'a str {
        let start = self.pos;
        self.pos += self.rest().find(s).unwrap_or(self.source.len() - start);
        &self.source[start..self.pos]
    }

    fn skip_whitespace(&mut self) {
        self.eat_while(char::is_whitespace);
    }

    /// Skip past the next `>`.
    fn skip_tag(&mut self) {
        self.eat_until(">");
        self.eat(">");
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(start as u32, self.pos as u32)
    }

    /// Name of the end tag at the cursor, if the cursor is on one.
    fn peek_end_tag(&self) -> Option<&'a str> {
        let rest = self.rest().strip_prefix("</")?;
        rest.split(|c: char| c.is_whitespace() || c == '>').next()
    }

    /// Parse children until an end tag closing an open element, or the end.
    fn parse_children(&mut self) -> CompileResult<Vec<TemplateNode>> {
        let mut children = Vec::new();

        while !self.at_end() {
            if let Some(tag) = self.peek_end_tag() {
                if self.open_tags.iter().any(|open| open.eq_ignore_ascii_case(tag)) {
                    break;
                }
                self.skip_tag();
                continue;
            }

            if self.at("<!--") {
                children.push(TemplateNode::Comment(self.parse_comment()));
            } else if self.at("<!") {
                // doctype
                self.skip_tag();
            } else if self.at_start_tag() {
                children.push(self.parse_element()?);
            } else if self.at("{{") {
                children.push(TemplateNode::Interpolation(self.parse_interpolation()));
            } else {
                children.push(TemplateNode::Text(self.parse_text()));
            }
        }

        Ok(children)
    }

    fn at_start_tag(&self) -> bool {
        self.rest()
            .strip_prefix('<')
            .and_then(|rest| rest.chars().next())
            .is_some_and(|c| c.is_ascii_alphabetic())
    }

    fn parse_comment(&mut self) -> CommentNode {
        let start = self.pos;
        self.eat("<!--");
        let content = self.eat_until("-->").to_string();
        self.eat("-->");
        CommentNode {
            content,
            span: self.span_from(start),
        }
    }

    fn parse_interpolation(&mut self) -> InterpolationNode {
        let start = self.pos;
        self.eat("{{");
        let expr_start = self.pos;
        let content = self.eat_until("}}");
        let expression = Expression::new(content.trim(), self.span_from(expr_start));
        self.eat("}}");
        InterpolationNode {
            expression,
            span: self.span_from(start),
        }
    }

    fn parse_text(&mut self) -> TextNode {
        let start = self.pos;
        // The first char may be a `<` that opens nothing
        self.bump();
        while !self.at_end() && !self.at("<") && !self.at("{{") {
            self.bump();
        }
        TextNode {
            content: self.source[start..self.pos].to_string(),
            span: self.span_from(start),
        }
    }

    fn parse_element(&mut self) -> CompileResult<TemplateNode> {
        let start = self.pos;
        self.eat("<");
        let tag = self
            .eat_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':'))
            .to_string();
        if tag.is_empty() {
            let found = self.peek().map(String::from).unwrap_or_else(|| "EOF".into());
            return Err(CompileError::unexpected_token("tag name", &found, self.span_from(start)));
        }

        let mut attrs = self.parse_attributes();
        self.skip_whitespace();
        let self_closing = self.eat("/>");
        if !self_closing {
            self.eat(">");
        }

        let children = if self_closing || is_void_element(&tag) {
            Vec::new()
        } else {
            self.parse_element_body(&tag)?
        };
        let span = self.span_from(start);

        let v_for = attrs.take_directive("for");
        let v_if = attrs.take_directive("if");
        let v_else_if = attrs.take_directive("else-if");
        let v_else = attrs.take_directive("else");

        // v-for binds tighter than v-if on the same element
        if let Some(dir) = v_for {
            let value = dir
                .value
                .ok_or_else(|| CompileError::invalid_v_for("", dir.span))?;
            let mut for_node = parse_v_for_expression(&value.content, value.span)?;
            let element = attrs.into_element(tag.into(), children, span);
            let body = match v_if {
                Some(cond) => conditional(IfBranchType::If, cond.value, element, span),
                None => element,
            };
            for_node.children = vec![body];
            for_node.span = span;
            return Ok(TemplateNode::For(for_node));
        }

        let branch = match (v_if, v_else_if, v_else) {
            (Some(dir), _, _) => Some((IfBranchType::If, dir.value)),
            (None, Some(dir), _) => Some((IfBranchType::ElseIf, dir.value)),
            (None, None, Some(_)) => Some((IfBranchType::Else, None)),
            (None, None, None) => None,
        };
        if let Some((branch_type, condition)) = branch {
            let element = attrs.into_element(tag.into(), children, span);
            return Ok(conditional(branch_type, condition, element, span));
        }

        if tag == "slot" {
            return Ok(TemplateNode::SlotOutlet(attrs.into_slot_outlet(children, span)));
        }

        if tag == "template" && attrs.directives.iter().any(|d| d.name == "slot") {
            return Ok(TemplateNode::Template(TemplateElementNode {
                directives: attrs.directives,
                children,
                span,
            }));
        }

        Ok(attrs.into_element(tag.into(), children, span))
    }

    /// Children of `tag` and its end tag. An end tag belonging to an
    /// ancestor closes `tag` implicitly and is left for the ancestor.
    fn parse_element_body(&mut self, tag: &str) -> CompileResult<Vec<TemplateNode>> {
        self.open_tags.push(tag.to_string());
        let children = self.parse_children();
        self.open_tags.pop();
        let children = children?;

        if self
            .peek_end_tag()
            .is_some_and(|end| end.eq_ignore_ascii_case(tag))
        {
            self.skip_tag();
        }
        Ok(children)
    }

    fn parse_attributes(&mut self) -> StartTagAttrs {
        let mut attrs = StartTagAttrs::default();

        loop {
            self.skip_whitespace();
            if self.at_end() || self.at(">") || self.at("/>") {
                break;
            }

            let start = self.pos;
            let name = self.eat_while(|c| {
                c.is_ascii_alphanumeric()
                    || matches!(c, '-' | '_' | ':' | '.' | '@' | '#' | '[' | ']' | '$')
            });
            if name.is_empty() {
                self.bump();
                continue;
            }

            self.skip_whitespace();
            let value = if self.eat("=") {
                self.skip_whitespace();
                Some(self.parse_attribute_value())
            } else {
                None
            };

            attrs.push(name, value, self.span_from(start));
        }

        attrs
    }

    /// A quoted or bare attribute value and the span of its text.
    fn parse_attribute_value(&mut self) -> (String, Span) {
        if let Some(quote @ ('"' | '\'')) = self.peek() {
            self.bump();
            let start = self.pos;
            let value = self.eat_while(|c| c != quote).to_string();
            let span = self.span_from(start);
            self.bump();
            return (value, span);
        }

        let start = self.pos;
        let value = self
            .eat_while(|c| !c.is_whitespace() && c != '>')
            .trim_end_matches('/');
        // Leave a trailing `/` for the `/>` check
        self.pos = start + value.len();
        (value.to_string(), self.span_from(start))
    }
}

/// Attributes of one start tag, sorted by kind.
#[derive(Default)]
struct StartTagAttrs {
    attrs: Vec<Attribute>,
    directives: Vec<Directive>,
    props: Vec<Prop>,
    events: Vec<EventListener>,
}

impl StartTagAttrs {
    /// Classify one attribute by its name.
    fn push(&mut self, name: &str, value: Option<(String, Span)>, span: Span) {
        let bound = name
            .strip_prefix("v-bind:")
            .or_else(|| name.strip_prefix(':'))
            .or_else(|| name.starts_with('.').then_some(name));
        if let Some(bound) = bound {
            // `.foo` is shorthand for `:foo.prop`
            let (bound, mut modifiers) = match bound.strip_prefix('.') {
                Some(short) => (short, vec![SmolStr::new("prop")]),
                None => (bound, Vec::new()),
            };
            let (prop_name, is_dynamic, extra) = split_prop_name(bound);
            modifiers.extend(extra);
            if let Some((val, val_span)) = value {
                self.props.push(Prop {
                    name: prop_name.into(),
                    value: Expression::new(val, val_span),
                    is_dynamic,
                    modifiers,
                    span,
                });
            }
            return;
        }

        if let Some(event) = name.strip_prefix("v-on:").or_else(|| name.strip_prefix('@')) {
            let (event, modifiers) = split_event_name(event);
            let dynamic = strip_brackets(event);
            self.events.push(EventListener {
                name: dynamic.unwrap_or(event).into(),
                handler: match value {
                    Some((val, val_span)) => Expression::new(val, val_span),
                    None => Expression::new("", span),
                },
                is_dynamic: dynamic.is_some(),
                modifiers,
                span,
            });
            return;
        }

        if let Some(directive) = name.strip_prefix("v-") {
            self.directives.push(parse_directive(directive, value, span));
            return;
        }

        if let Some(slot) = name.strip_prefix('#') {
            let arg = match strip_brackets(slot) {
                Some(expr) => DirectiveArg::Dynamic(Expression::new(expr, span)),
                None => DirectiveArg::Static(slot.into(), span),
            };
            self.directives.push(Directive {
                name: "slot".into(),
                arg: Some(arg),
                modifiers: Vec::new(),
                value: value.map(|(v, s)| Expression::new(v, s)),
                span,
            });
            return;
        }

        let (value, value_span) = value.unzip();
        self.attrs.push(Attribute {
            name: name.into(),
            value,
            span,
            value_span,
        });
    }

    /// Remove the first directive called `name`.
    fn take_directive(&mut self, name: &str) -> Option<Directive> {
        let index = self.directives.iter().position(|d| d.name == name)?;
        Some(self.directives.remove(index))
    }

    fn into_element(self, tag: SmolStr, children: Vec<TemplateNode>, span: Span) -> TemplateNode {
        TemplateNode::Element(ElementNode {
            is_component: is_component_tag(&tag),
            tag,
            attrs: self.attrs,
            directives: self.directives,
            props: self.props,
            events: self.events,
            children,
            slots: IndexMap::new(),
            span,
        })
    }

    fn into_slot_outlet(self, fallback: Vec<TemplateNode>, span: Span) -> SlotOutletNode {
        let bound_name = self
            .props
            .iter()
            .find(|p| p.name == "name" && !p.is_dynamic)
            .map(|p| p.value.clone());
        let static_name = self.attrs.iter().find(|a| a.name == "name").map(|a| {
            Expression::static_expr(
                a.value.clone().unwrap_or_default(),
                a.value_span.unwrap_or(a.span),
            )
        });

        SlotOutletNode {
            name: bound_name
                .or(static_name)
                .unwrap_or_else(|| Expression::static_expr("default", span)),
            attrs: self.attrs.into_iter().filter(|a| a.name != "name").collect(),
            props: self.props.into_iter().filter(|p| p.name != "name").collect(),
            fallback,
            span,
        }
    }
}

/// A single-branch conditional around `element`.
fn conditional(
    branch_type: IfBranchType,
    condition: Option<Expression>,
    element: TemplateNode,
    span: Span,
) -> TemplateNode {
    TemplateNode::If(IfNode {
        branches: vec![IfBranch {
            condition,
            branch_type,
            children: vec![element],
            span,
        }],
        span,
    })
}

/// The inside of a `[...]` dynamic name.
fn strip_brackets(name: &str) -> Option<&str> {
    name.strip_prefix('[')?.strip_suffix(']')
}

/// Split `.mod1.mod2` into modifiers.
fn modifiers_of(part: &str) -> Vec<SmolStr> {
    part.split('.')
        .filter(|m| !m.is_empty())
        .map(SmolStr::from)
        .collect()
}

/// Parse a directive: `name:arg.mod1.mod2`.
fn parse_directive(name_with_mods: &str, value: Option<(String, Span)>, span: Span) -> Directive {
    // Dynamic arguments may contain dots, so split modifiers after them
    let split_at = name_with_mods
        .find(']')
        .map(|close| close + 1)
        .or_else(|| name_with_mods.find('.'))
        .unwrap_or(name_with_mods.len());
    let (head, modifier_part) = name_with_mods.split_at(split_at);

    let (name, arg) = match head.split_once(':') {
        Some((name, arg)) => {
            let arg = match strip_brackets(arg) {
                Some(expr) => DirectiveArg::Dynamic(Expression::new(expr, span)),
                None => DirectiveArg::Static(arg.into(), span),
            };
            (name, Some(arg))
        }
        None => (head, None),
    };

    Directive {
        name: name.into(),
        arg,
        modifiers: modifiers_of(modifier_part),
        value: value.map(|(v, s)| Expression::new(v, s)),
        span,
    }
}

/// Parse `alias in source`, `(value, key, index) of source` and
/// destructuring aliases.
fn parse_v_for_expression(expr: &str, span: Span) -> CompileResult<ForNode> {
    let invalid = || CompileError::invalid_v_for(expr, span);

    let trimmed = expr.trim();
    let (aliases, source) = trimmed
        .split_once(" in ")
        .or_else(|| trimmed.split_once(" of "))
        .ok_or_else(invalid)?;
    let (aliases, source) = (aliases.trim(), source.trim());

    let aliases = aliases
        .strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
        .unwrap_or(aliases);
    let mut parts = split_aliases(aliases).into_iter().map(|pattern| ForAlias {
        pattern: pattern.to_string(),
        span,
    });

    let value = parts.next().filter(|v| !v.pattern.is_empty()).ok_or_else(invalid)?;
    let key = parts.next();
    let index = parts.next();
    if parts.next().is_some() || source.is_empty() {
        return Err(invalid());
    }

    Ok(ForNode {
        source: Expression::new(source, span),
        value,
        key,
        index,
        children: Vec::new(),
        span,
    })
}

/// Split v-for aliases on top-level commas, keeping destructuring patterns whole.
fn split_aliases(aliases: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in aliases.char_indices() {
        match c {
            '{' | '[' => depth += 1,
            '}' | ']' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(aliases[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(aliases[start..].trim());
    parts
}

fn is_void_element(tag: &str) -> bool {
    const VOID: &[&str] = &[
        "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
        "source", "track", "wbr",
    ];
    VOID.iter().any(|void| void.eq_ignore_ascii_case(tag))
}

/// Whether a tag names a user component rather than an HTML element or one
/// of the built-ins handled by the compiler.
fn is_component_tag(tag: &str) -> bool {
    const BUILT_INS: &[&str] = &[
        "template",
        "slot",
        "component",
        "keep-alive",
        "transition",
        "transition-group",
    ];
    !BUILT_INS.contains(&tag)
        && (tag.contains('-') || tag.starts_with(|c: char| c.is_uppercase()))
}

/// `name.mod` or `[expr].mod` → (name, is_dynamic, modifiers).
fn split_prop_name(name: &str) -> (&str, bool, Vec<SmolStr>) {
    if let Some(close) = name.find(']').filter(|_| name.starts_with('[')) {
        return (&name[1..close], true, modifiers_of(&name[close + 1..]));
    }
    match name.split_once('.') {
        Some((base, rest)) => (base, false, modifiers_of(rest)),
        None => (name, false, Vec::new()),
    }
}

/// `click.stop` or `[expr].stop` → (event, modifiers).
fn split_event_name(name: &str) -> (&str, Vec<SmolStr>) {
    let split_at = match name.find(']').filter(|_| name.starts_with('[')) {
        Some(close) => close + 1,
        None => name.find('.').unwrap_or(name.len()),
    };
    let (event, rest) = name.split_at(split_at);
    (event, modifiers_of(rest))
}
