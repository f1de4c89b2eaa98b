//! Render function code generation.
//!
//! Turns a transformed template AST into the body of a Vue 2 render
//! function, `with(this){return ...}`, written against the runtime helpers
//! (`_c` create element, `_v` text, `_s` to string, `_e` empty, `_l` list,
//! `_t` slot, `_u` scoped slots, `_k` key check, `_q` loose equal, `_i`
//! loose index, `_n` to number, `_b` bind object, `_g` listeners object,
//! `_d` dynamic keys, `_p` prepend modifier).

use crate::ast::*;
use crate::error::{CompileError, CompileResult};
use crate::transforms::camelize;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use smol_str::SmolStr;

static FN_EXPRESSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([\w$]+|\([^)]*?\))\s*=>|^function(?:\s+[\w$]+)?\s*\(").expect("valid regex")
});

static FN_INVOKE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([^)]*?\);*$").expect("valid regex"));

static SIMPLE_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^[A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*|\['[^']*?'\]|\["[^"]*?"\]|\[\d+\]|\[[A-Za-z_$][\w$]*\])*$"#,
    )
    .expect("valid regex")
});

/// Key modifiers: (modifier, keyCode JSON, key name JSON).
const KEY_MODIFIERS: &[(&str, &str, &str)] = &[
    ("esc", "27", r#"["Esc","Escape"]"#),
    ("tab", "9", r#""Tab""#),
    ("enter", "13", r#""Enter""#),
    ("space", "32", r#"[" ","Spacebar"]"#),
    ("up", "38", r#"["Up","ArrowUp"]"#),
    ("left", "37", r#"["Left","ArrowLeft"]"#),
    ("right", "39", r#"["Right","ArrowRight"]"#),
    ("down", "40", r#"["Down","ArrowDown"]"#),
    ("delete", "[8,46]", r#"["Backspace","Delete","Del"]"#),
];

/// Generate the render function body for a transformed template.
pub fn generate(ast: &TemplateAst) -> CompileResult<String> {
    let root = find_root(ast)?;
    let mut generator = RenderGenerator::default();
    let code = generator.gen_node(root)?;
    Ok(format!("with(this){{return {}}}", code))
}

/// Find the single root node of a template.
fn find_root(ast: &TemplateAst) -> CompileResult<&TemplateNode> {
    let mut significant = ast.children.iter().filter(|n| !n.is_insignificant());
    let Some(root) = significant.next() else {
        return Err(CompileError::invalid_root(
            "Component template requires a root element",
            ast.span,
        ));
    };
    if let Some(extra) = significant.next() {
        return Err(CompileError::invalid_root(
            "Component template should contain exactly one root element",
            extra.span(),
        ));
    }
    check_root(root)?;
    Ok(root)
}

fn check_root(node: &TemplateNode) -> CompileResult<()> {
    match node {
        TemplateNode::Element(el) if el.tag == "template" => Err(CompileError::invalid_root(
            "Cannot use <template> as component root element because it may contain multiple nodes",
            el.span,
        )),
        TemplateNode::Template(t) => Err(CompileError::invalid_root(
            "Cannot use <template> as component root element because it may contain multiple nodes",
            t.span,
        )),
        TemplateNode::SlotOutlet(s) => Err(CompileError::invalid_root(
            "Cannot use <slot> as component root element because it may contain multiple nodes",
            s.span,
        )),
        TemplateNode::For(f) => Err(CompileError::invalid_root(
            "Cannot use v-for on stateful component root element because it renders multiple elements",
            f.span,
        )),
        TemplateNode::Text(_) | TemplateNode::Interpolation(_) => {
            Err(CompileError::invalid_root(
                "Component template requires a root element, rather than just text",
                node.span(),
            ))
        }
        TemplateNode::If(i) => {
            for branch in &i.branches {
                for child in &branch.children {
                    check_root(child)?;
                }
            }
            Ok(())
        }
        TemplateNode::Element(_) | TemplateNode::Comment(_) => Ok(()),
    }
}

/// One item of a children list after text merging.
enum ChildItem<'a> {
    Text(Vec<&'a TemplateNode>),
    Node(&'a TemplateNode),
}

/// Listeners grouped by final event name, in source order.
#[derive(Default)]
struct Listeners {
    named: IndexMap<String, Vec<String>>,
    dynamic: Vec<(String, String)>,
}

impl Listeners {
    fn add(&mut self, name: String, handler: String, important: bool) {
        let handlers = self.named.entry(name).or_default();
        if important {
            handlers.insert(0, handler);
        } else {
            handlers.push(handler);
        }
    }

    fn is_empty(&self) -> bool {
        self.named.is_empty() && self.dynamic.is_empty()
    }

    fn generate(&self) -> String {
        let statics: Vec<String> = self
            .named
            .iter()
            .map(|(name, handlers)| {
                let code = match handlers.as_slice() {
                    [single] => single.clone(),
                    many => format!("[{}]", many.join(",")),
                };
                format!("\"{}\":{}", name, code)
            })
            .collect();
        wrap_dynamic(format!("{{{}}}", statics.join(",")), &self.dynamic)
    }
}

/// Code generator state.
#[derive(Default)]
struct RenderGenerator {
    /// Depth of enclosing v-for loops.
    for_depth: usize,
}

impl RenderGenerator {
    /// Generate code for a template node.
    fn gen_node(&mut self, node: &TemplateNode) -> CompileResult<String> {
        match node {
            TemplateNode::Element(el) => self.gen_element(el),
            TemplateNode::Text(_) | TemplateNode::Interpolation(_) => Ok(gen_text_run([node])),
            TemplateNode::Comment(_) => Ok("_e()".to_string()),
            TemplateNode::If(i) => self.gen_if(&i.branches),
            TemplateNode::For(f) => self.gen_for(f),
            TemplateNode::SlotOutlet(s) => self.gen_slot_outlet(s),
            TemplateNode::Template(t) => Ok(self
                .gen_children(&t.children, false)?
                .unwrap_or_else(|| "void 0".to_string())),
        }
    }

    /// Generate code for an element or component.
    fn gen_element(&mut self, el: &ElementNode) -> CompileResult<String> {
        if el.tag == "template" {
            return Ok(self
                .gen_children(&el.children, false)?
                .unwrap_or_else(|| "void 0".to_string()));
        }

        if el.has_directive("slot") {
            return Err(CompileError::invalid_slot(
                "v-slot can only be used on components or <template>",
                el.span,
            ));
        }

        let dynamic_tag = if el.tag == "component" {
            el.get_prop("is").map(|p| p.value.content.clone()).or_else(|| {
                el.get_attr("is")
                    .map(|a| js_string(a.value.as_deref().unwrap_or_default()))
            })
        } else {
            None
        };
        let tag_code = dynamic_tag
            .clone()
            .unwrap_or_else(|| format!("'{}'", el.tag));

        let data = self.gen_data(el, dynamic_tag.is_some())?;
        let children = if el.has_directive("html") || el.has_directive("text") {
            None
        } else {
            self.gen_children(&el.children, true)?
        };

        let mut code = format!("_c({}", tag_code);
        if let Some(data) = data {
            code.push(',');
            code.push_str(&data);
        }
        if let Some(children) = children {
            code.push(',');
            code.push_str(&children);
        }
        code.push(')');
        Ok(code)
    }

    /// Generate a children array. With `check_skip` the normalization type
    /// for `_c` is appended.
    fn gen_children(
        &mut self,
        children: &[TemplateNode],
        check_skip: bool,
    ) -> CompileResult<Option<String>> {
        let mut items: Vec<ChildItem<'_>> = Vec::new();
        for node in children {
            match node {
                TemplateNode::Comment(_) => {}
                TemplateNode::Text(_) | TemplateNode::Interpolation(_) => match items.last_mut() {
                    Some(ChildItem::Text(run)) => run.push(node),
                    _ => items.push(ChildItem::Text(vec![node])),
                },
                _ => items.push(ChildItem::Node(node)),
            }
        }

        let is_blank = |item: &ChildItem<'_>| match item {
            ChildItem::Text(run) => run
                .iter()
                .all(|n| matches!(n, TemplateNode::Text(t) if t.content.trim().is_empty())),
            ChildItem::Node(_) => false,
        };
        while items.last().is_some_and(is_blank) {
            items.pop();
        }
        let leading = items.iter().take_while(|item| is_blank(*item)).count();
        items.drain(..leading);

        // A lone v-for child renders its list directly
        if let [ChildItem::Node(TemplateNode::For(f))] = items.as_slice() {
            if !for_renders_fragment(f) {
                let code = self.gen_for(f)?;
                if !check_skip {
                    return Ok(Some(code));
                }
                let normalization = if f.children.iter().any(maybe_component) {
                    1
                } else {
                    0
                };
                return Ok(Some(format!("{},{}", code, normalization)));
            }
        }

        let mut code = Vec::with_capacity(items.len());
        for item in &items {
            match item {
                ChildItem::Text(_) if is_blank(item) => code.push("_v(\" \")".to_string()),
                ChildItem::Text(run) => code.push(gen_text_run(run.iter().copied())),
                ChildItem::Node(node) => code.push(self.gen_node(node)?),
            }
        }

        if code.is_empty() {
            return Ok(None);
        }

        let mut out = format!("[{}]", code.join(","));
        if check_skip {
            let normalization = normalization_type(children);
            if normalization > 0 {
                out.push_str(&format!(",{}", normalization));
            }
        }
        Ok(Some(out))
    }

    /// Generate a conditional as nested ternaries.
    fn gen_if(&mut self, branches: &[IfBranch]) -> CompileResult<String> {
        let Some((first, rest)) = branches.split_first() else {
            return Ok("_e()".to_string());
        };
        let body = match first.children.first() {
            Some(child) => self.gen_node(child)?,
            None => "_e()".to_string(),
        };
        match &first.condition {
            Some(cond) if first.branch_type != IfBranchType::Else => Ok(format!(
                "({})?{}:{}",
                cond.content.trim(),
                body,
                self.gen_if(rest)?
            )),
            _ => Ok(body),
        }
    }

    /// Generate a v-for list.
    fn gen_for(&mut self, f: &ForNode) -> CompileResult<String> {
        let params: Vec<&str> = [Some(&f.value), f.key.as_ref(), f.index.as_ref()]
            .into_iter()
            .flatten()
            .map(|alias| alias.pattern.as_str())
            .collect();

        self.for_depth += 1;
        let body = match f.children.first() {
            Some(child) => self.gen_node(child),
            None => Ok("_e()".to_string()),
        };
        self.for_depth -= 1;

        Ok(format!(
            "_l(({}),function({}){{return {}}})",
            f.source.content.trim(),
            params.join(","),
            body?
        ))
    }

    /// Generate a `<slot>` outlet.
    fn gen_slot_outlet(&mut self, s: &SlotOutletNode) -> CompileResult<String> {
        let name = if s.name.is_static {
            js_string(&s.name.content)
        } else {
            s.name.content.trim().to_string()
        };
        let fallback = self.gen_children(&s.fallback, false)?;

        let mut props: Vec<String> = s
            .attrs
            .iter()
            .map(|a| {
                format!(
                    "\"{}\":{}",
                    camelize(&a.name),
                    js_string(&decode_entities(a.value.as_deref().unwrap_or_default()))
                )
            })
            .collect();
        props.extend(
            s.props
                .iter()
                .filter(|p| !p.is_dynamic)
                .map(|p| format!("\"{}\":{}", camelize(&p.name), p.value.content.trim())),
        );

        let mut code = format!("_t({}", name);
        match &fallback {
            Some(children) => {
                code.push(',');
                code.push_str(children);
            }
            None if !props.is_empty() => code.push_str(",null"),
            None => {}
        }
        if !props.is_empty() {
            code.push_str(&format!(",{{{}}}", props.join(",")));
        }
        code.push(')');
        Ok(code)
    }

    /// Generate the data object of an element.
    fn gen_data(&mut self, el: &ElementNode, dynamic_tag: bool) -> CompileResult<Option<String>> {
        let mut parts: Vec<String> = Vec::new();
        let mut attrs: Vec<String> = Vec::new();
        let mut dynamic_attrs: Vec<(String, String)> = Vec::new();
        let mut dom_props: Vec<String> = Vec::new();
        let mut on = Listeners::default();
        let mut native_on = Listeners::default();
        let mut runtime_directives: Vec<String> = Vec::new();
        let mut component_model: Option<String> = None;
        let mut bind_object: Option<&Directive> = None;
        let mut on_object: Option<&Directive> = None;

        let type_attr = el.get_attr("type").and_then(|a| a.value.as_deref());

        for dir in &el.directives {
            match dir.name.as_str() {
                "html" | "text" => {
                    let prop = if dir.name == "html" {
                        "innerHTML"
                    } else {
                        "textContent"
                    };
                    let value = dir.value.as_ref().map(|v| v.content.trim()).unwrap_or("");
                    dom_props.push(format!("\"{}\":_s({})", prop, value));
                }
                "model" => {
                    let Some(value) = dir.value.as_ref().filter(|v| !v.is_empty()) else {
                        continue;
                    };
                    let value = value.content.trim();
                    if el.is_component || dynamic_tag {
                        component_model = Some(gen_component_model(dir, value));
                    } else {
                        gen_native_model(el, dir, value, type_attr, &mut dom_props, &mut on);
                        runtime_directives.push(gen_directive(dir));
                    }
                }
                "bind" if dir.arg.is_none() => bind_object = Some(dir),
                "on" if dir.arg.is_none() => on_object = Some(dir),
                "cloak" | "once" | "pre" => {}
                _ => runtime_directives.push(gen_directive(dir)),
            }
        }

        if !runtime_directives.is_empty() {
            parts.push(format!("directives:[{}]", runtime_directives.join(",")));
        }

        if let Some(key) = el.get_prop("key") {
            parts.push(format!("key:{}", key.value.content.trim()));
        } else if let Some(key) = el.get_attr("key") {
            parts.push(format!("key:{}", js_string(key.value.as_deref().unwrap_or_default())));
        }

        let reference = el
            .get_prop("ref")
            .map(|p| p.value.content.trim().to_string())
            .or_else(|| {
                el.get_attr("ref")
                    .map(|a| js_string(a.value.as_deref().unwrap_or_default()))
            });
        if let Some(reference) = reference {
            parts.push(format!("ref:{}", reference));
            if self.for_depth > 0 {
                parts.push("refInFor:true".to_string());
            }
        }

        if dynamic_tag {
            parts.push("tag:\"component\"".to_string());
        }

        if let Some(class) = el.get_attr("class") {
            let collapsed = decode_entities(class.value.as_deref().unwrap_or_default())
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            parts.push(format!("staticClass:{}", js_string(&collapsed)));
        }
        if let Some(class) = el.get_prop("class") {
            parts.push(format!("class:{}", class.value.content.trim()));
        }
        if let Some(style) = el.get_attr("style") {
            let declarations =
                parse_style_text(&decode_entities(style.value.as_deref().unwrap_or_default()));
            parts.push(format!("staticStyle:{}", declarations));
        }
        if let Some(style) = el.get_prop("style") {
            parts.push(format!("style:({})", style.value.content.trim()));
        }

        for attr in &el.attrs {
            if matches!(attr.name.as_str(), "class" | "style" | "ref" | "slot" | "key")
                || (dynamic_tag && attr.name == "is")
            {
                continue;
            }
            let value = decode_entities(attr.value.as_deref().unwrap_or_default());
            attrs.push(format!("\"{}\":{}", attr.name, js_string(&value)));
        }

        for prop in &el.props {
            let value = prop.value.content.trim();
            if prop.is_dynamic {
                dynamic_attrs.push((value_or_name(&prop.name), value.to_string()));
                continue;
            }
            if matches!(prop.name.as_str(), "key" | "class" | "style" | "ref" | "slot")
                || (dynamic_tag && prop.name == "is")
            {
                continue;
            }
            let name = if prop.has_modifier("camel") {
                SmolStr::from(camelize(&prop.name))
            } else {
                prop.name.clone()
            };
            if prop.has_modifier("sync") {
                on.add(
                    format!("update:{}", camelize(&prop.name)),
                    format!("function($event){{{}}}", gen_assignment(value, "$event")),
                    false,
                );
            }
            if prop.has_modifier("prop")
                || (!el.is_component && must_use_prop(&el.tag, type_attr, &name))
            {
                dom_props.push(format!("\"{}\":{}", name, value));
            } else {
                attrs.push(format!("\"{}\":{}", name, value));
            }
        }

        if !attrs.is_empty() || !dynamic_attrs.is_empty() {
            parts.push(format!(
                "attrs:{}",
                wrap_dynamic(format!("{{{}}}", attrs.join(",")), &dynamic_attrs)
            ));
        }
        if !dom_props.is_empty() {
            parts.push(format!("domProps:{{{}}}", dom_props.join(",")));
        }

        for listener in &el.events {
            let native = listener.has_modifier("native") && el.is_component;
            let target = if native { &mut native_on } else { &mut on };
            let handler = gen_handler(&listener.handler.content, &listener.modifiers, &listener.name);
            let prefix = event_prefix(&listener.modifiers);
            if listener.is_dynamic {
                let name = listener.name.trim();
                let name = if prefix.is_empty() {
                    name.to_string()
                } else {
                    format!("_p({},\"{}\")", name, prefix)
                };
                target.dynamic.push((name, handler));
            } else {
                target.add(format!("{}{}", prefix, listener.name), handler, false);
            }
        }

        if !on.is_empty() {
            parts.push(format!("on:{}", on.generate()));
        }
        if !native_on.is_empty() {
            parts.push(format!("nativeOn:{}", native_on.generate()));
        }

        if el.slots.is_empty() {
            if let Some(slot) = el.get_prop("slot") {
                parts.push(format!("slot:{}", slot.value.content.trim()));
            } else if let Some(slot) = el.get_attr("slot") {
                parts.push(format!(
                    "slot:{}",
                    js_string(slot.value.as_deref().unwrap_or("default"))
                ));
            }
        } else {
            parts.push(self.gen_scoped_slots(el)?);
        }

        if let Some(model) = component_model {
            parts.push(model);
        }

        if parts.is_empty() && bind_object.is_none() && on_object.is_none() {
            return Ok(None);
        }

        let mut data = format!("{{{}}}", parts.join(","));
        if let Some(dir) = bind_object {
            let value = dir.value.as_ref().map(|v| v.content.trim()).unwrap_or("{}");
            data = format!(
                "_b({},'{}',{},{}{})",
                data,
                el.tag,
                value,
                dir.has_modifier("prop"),
                if dir.has_modifier("sync") { ",true" } else { "" }
            );
        }
        if let Some(dir) = on_object {
            let value = dir.value.as_ref().map(|v| v.content.trim()).unwrap_or("{}");
            data = format!("_g({},{})", data, value);
        }
        Ok(Some(data))
    }

    /// Generate `scopedSlots:_u([...])` for a component's slot content.
    fn gen_scoped_slots(&mut self, el: &ElementNode) -> CompileResult<String> {
        let mut has_dynamic = false;
        let mut slots = Vec::with_capacity(el.slots.len());
        for slot in el.slots.values() {
            let key = if slot.is_dynamic {
                has_dynamic = true;
                slot.name.to_string()
            } else {
                js_string(&slot.name)
            };
            let body = self
                .gen_children(&slot.children, false)?
                .unwrap_or_else(|| "undefined".to_string());
            let code = match &slot.props {
                Some(props) => format!(
                    "{{key:{},fn:function({}){{return {}}}}}",
                    key, props.pattern, body
                ),
                None => format!("{{key:{},fn:function(){{return {}}},proxy:true}}", key, body),
            };
            slots.push(code);
        }
        let suffix = if has_dynamic { ",null,true" } else { "" };
        Ok(format!("scopedSlots:_u([{}]{})", slots.join(","), suffix))
    }
}

/// Whether a v-for renders a fragment instead of a single element.
fn for_renders_fragment(f: &ForNode) -> bool {
    f.children.iter().any(|child| match child {
        TemplateNode::Element(el) => el.tag == "template",
        TemplateNode::SlotOutlet(_) | TemplateNode::Template(_) => true,
        _ => false,
    })
}

/// Merge a run of text and interpolation nodes into one `_v(...)` call.
fn gen_text_run<'a>(nodes: impl IntoIterator<Item = &'a TemplateNode>) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut literal = String::new();
    for node in nodes {
        match node {
            TemplateNode::Text(text) => literal.push_str(&decode_entities(&text.content)),
            TemplateNode::Interpolation(interp) => {
                if !literal.is_empty() {
                    parts.push(js_string(&literal));
                    literal.clear();
                }
                parts.push(format!("_s({})", interp.expression.content.trim()));
            }
            _ => {}
        }
    }
    if !literal.is_empty() || parts.is_empty() {
        parts.push(js_string(&literal));
    }
    format!("_v({})", parts.join("+"))
}

/// Normalization type for `_c`: 2 when a child may render an array,
/// 1 when a child may be a component, 0 otherwise.
fn normalization_type(children: &[TemplateNode]) -> u8 {
    let mut result = 0;
    for child in children {
        if needs_normalization(child) {
            return 2;
        }
        if maybe_component(child) {
            result = 1;
        }
    }
    result
}

fn needs_normalization(node: &TemplateNode) -> bool {
    match node {
        TemplateNode::For(_) | TemplateNode::SlotOutlet(_) | TemplateNode::Template(_) => true,
        TemplateNode::Element(el) => el.tag == "template",
        TemplateNode::If(i) => i
            .branches
            .iter()
            .any(|b| b.children.iter().any(needs_normalization)),
        _ => false,
    }
}

fn maybe_component(node: &TemplateNode) -> bool {
    match node {
        TemplateNode::Element(el) => el.is_component || el.tag == "component",
        TemplateNode::If(i) => i
            .branches
            .iter()
            .any(|b| b.children.iter().any(maybe_component)),
        _ => false,
    }
}

/// Attributes the platform must set as DOM properties.
fn must_use_prop(tag: &str, type_attr: Option<&str>, attr: &str) -> bool {
    (attr == "value"
        && matches!(tag, "input" | "textarea" | "option" | "select" | "progress")
        && type_attr != Some("button"))
        || (attr == "selected" && tag == "option")
        || (attr == "checked" && tag == "input")
        || (attr == "muted" && tag == "video")
}

/// Wrap an object literal with `_d` when it has dynamic keys.
fn wrap_dynamic(object: String, dynamic: &[(String, String)]) -> String {
    if dynamic.is_empty() {
        return object;
    }
    let pairs: Vec<String> = dynamic
        .iter()
        .map(|(key, value)| format!("{},{}", key, value))
        .collect();
    format!("_d({},[{}])", object, pairs.join(","))
}

fn value_or_name(name: &str) -> String {
    name.trim().to_string()
}

/// Event name prefix for capture / once / passive.
fn event_prefix(modifiers: &[SmolStr]) -> String {
    let mut prefix = String::new();
    if modifiers.iter().any(|m| m == "capture") {
        prefix.insert(0, '!');
    }
    if modifiers.iter().any(|m| m == "once") {
        prefix.insert(0, '~');
    }
    if modifiers.iter().any(|m| m == "passive") {
        prefix.insert(0, '&');
    }
    prefix
}

/// Generate a handler function for a listener.
fn gen_handler(handler: &str, modifiers: &[SmolStr], event: &str) -> String {
    let handler = handler.trim();
    let is_method_path = SIMPLE_PATH_RE.is_match(handler);
    let is_function_expression = FN_EXPRESSION_RE.is_match(handler);
    let is_function_invocation = SIMPLE_PATH_RE.is_match(&FN_INVOKE_RE.replace(handler, ""));

    let guards = gen_guards(modifiers, event);

    if guards.is_empty() && !handler.is_empty() {
        if is_method_path || is_function_expression {
            return handler.to_string();
        }
        let body = if is_function_invocation {
            format!("return {}", handler)
        } else {
            handler.to_string()
        };
        return format!("function($event){{{}}}", body);
    }

    let body = if handler.is_empty() {
        String::new()
    } else if is_method_path {
        format!("return {}.apply(null, arguments)", handler)
    } else if is_function_expression {
        format!("return ({}).apply(null, arguments)", handler)
    } else if is_function_invocation {
        format!("return {}", handler)
    } else {
        handler.to_string()
    };
    format!("function($event){{{}{}}}", guards, body)
}

/// Guard statements for listener modifiers.
fn gen_guards(modifiers: &[SmolStr], event: &str) -> String {
    let is_key_event = event.starts_with("key");
    let mut code = String::new();
    let mut keys: Vec<String> = Vec::new();

    for modifier in modifiers {
        match modifier.as_str() {
            "stop" => code.push_str("$event.stopPropagation();"),
            "prevent" => code.push_str("$event.preventDefault();"),
            "self" => code.push_str("if($event.target !== $event.currentTarget)return null;"),
            "ctrl" | "shift" | "alt" | "meta" => {
                code.push_str(&format!("if(!$event.{}Key)return null;", modifier));
            }
            "middle" => code.push_str("if('button' in $event && $event.button !== 1)return null;"),
            "left" if !is_key_event => {
                code.push_str("if('button' in $event && $event.button !== 0)return null;")
            }
            "right" if !is_key_event => {
                code.push_str("if('button' in $event && $event.button !== 2)return null;")
            }
            "capture" | "once" | "passive" | "native" | "exact" => {}
            key => keys.push(gen_key_filter(key)),
        }
    }

    if !keys.is_empty() {
        // Key filters go first so nothing runs for other keys
        code.insert_str(
            0,
            &format!(
                "if(!$event.type.indexOf('key')&&{})return null;",
                keys.join("&&")
            ),
        );
    }
    code
}

fn gen_key_filter(key: &str) -> String {
    if let Ok(code) = key.parse::<u32>() {
        return format!("$event.keyCode!=={}", code);
    }
    match KEY_MODIFIERS.iter().find(|(name, _, _)| *name == key) {
        Some((name, code, key_name)) => format!(
            "_k($event.keyCode,\"{}\",{},$event.key,{})",
            name, code, key_name
        ),
        None => format!(
            "_k($event.keyCode,{},undefined,$event.key,undefined)",
            js_string(key)
        ),
    }
}

/// Generate a runtime directive descriptor.
fn gen_directive(dir: &Directive) -> String {
    let mut raw_name = format!("v-{}", dir.name);
    let mut code = String::new();
    code.push_str(&format!("{{name:\"{}\"", dir.name));

    let arg = match &dir.arg {
        Some(DirectiveArg::Static(arg, _)) => {
            raw_name.push(':');
            raw_name.push_str(arg);
            Some(js_string(arg))
        }
        Some(DirectiveArg::Dynamic(expr)) => {
            raw_name.push_str(&format!(":[{}]", expr.content));
            Some(expr.content.trim().to_string())
        }
        None => None,
    };
    for modifier in &dir.modifiers {
        raw_name.push('.');
        raw_name.push_str(modifier);
    }

    code.push_str(&format!(",rawName:{}", js_string(&raw_name)));
    if let Some(value) = dir.value.as_ref().filter(|v| !v.is_empty()) {
        let value = value.content.trim();
        code.push_str(&format!(",value:({}),expression:{}", value, js_string(value)));
    }
    if let Some(arg) = arg {
        code.push_str(&format!(",arg:{}", arg));
    }
    if !dir.modifiers.is_empty() {
        let modifiers: Vec<String> = dir
            .modifiers
            .iter()
            .map(|m| format!("{}:true", js_string(m)))
            .collect();
        code.push_str(&format!(",modifiers:{{{}}}", modifiers.join(",")));
    }
    code.push('}');
    code
}

/// `model:{...}` for v-model on a component.
fn gen_component_model(dir: &Directive, value: &str) -> String {
    let mut value_expression = "$$v".to_string();
    if dir.has_modifier("trim") {
        value_expression = format!(
            "(typeof {} === 'string'? {}.trim(): {})",
            value_expression, value_expression, value_expression
        );
    }
    if dir.has_modifier("number") {
        value_expression = format!("_n({})", value_expression);
    }
    format!(
        "model:{{value:({}),callback:function ($$v) {{{}}},expression:{}}}",
        value,
        gen_assignment(value, &value_expression),
        js_string(value)
    )
}

/// v-model on native form elements.
fn gen_native_model(
    el: &ElementNode,
    dir: &Directive,
    value: &str,
    type_attr: Option<&str>,
    dom_props: &mut Vec<String>,
    on: &mut Listeners,
) {
    let number = dir.has_modifier("number");
    let value_binding = el
        .get_prop("value")
        .map(|p| p.value.content.trim().to_string())
        .or_else(|| {
            el.get_attr("value")
                .map(|a| js_string(a.value.as_deref().unwrap_or_default()))
        })
        .unwrap_or_else(|| "null".to_string());

    match (el.tag.as_str(), type_attr) {
        ("select", _) => {
            let selected = format!(
                "Array.prototype.filter.call($event.target.options,function(o){{return o.selected}}).map(function(o){{var val = \"_value\" in o ? o._value : o.value;return {}}})",
                if number { "_n(val)" } else { "val" }
            );
            let code = format!(
                "var $$selectedVal = {}; {}",
                selected,
                gen_assignment(value, "$event.target.multiple ? $$selectedVal : $$selectedVal[0]")
            );
            on.add("change".into(), format!("function($event){{{}}}", code), true);
        }
        ("input", Some("checkbox")) => {
            dom_props.push(format!(
                "\"checked\":Array.isArray({v})?_i({v},{b})>-1:({v})",
                v = value,
                b = value_binding
            ));
            let item = if number {
                format!("_n({})", value_binding)
            } else {
                value_binding.clone()
            };
            let code = format!(
                "var $$a={v},$$el=$event.target,$$c=$$el.checked?(true):(false);if(Array.isArray($$a)){{var $$v={item},$$i=_i($$a,$$v);if($$el.checked){{$$i<0&&({add})}}else{{$$i>-1&&({remove})}}}}else{{{plain}}}",
                v = value,
                item = item,
                add = gen_assignment(value, "$$a.concat([$$v])"),
                remove = gen_assignment(value, "$$a.slice(0,$$i).concat($$a.slice($$i+1))"),
                plain = gen_assignment(value, "$$c"),
            );
            on.add("change".into(), format!("function($event){{{}}}", code), true);
        }
        ("input", Some("radio")) => {
            dom_props.push(format!("\"checked\":_q({},{})", value, value_binding));
            let assigned = if number {
                format!("_n({})", value_binding)
            } else {
                value_binding.clone()
            };
            on.add(
                "change".into(),
                format!("function($event){{{}}}", gen_assignment(value, &assigned)),
                true,
            );
        }
        _ => {
            let lazy = dir.has_modifier("lazy");
            let trim = dir.has_modifier("trim");
            let is_range = type_attr == Some("range");
            let event = if lazy {
                "change"
            } else if is_range {
                "__r"
            } else {
                "input"
            };
            let mut value_expression = "$event.target.value".to_string();
            if trim {
                value_expression = "$event.target.value.trim()".to_string();
            }
            if number {
                value_expression = format!("_n({})", value_expression);
            }
            let mut code = gen_assignment(value, &value_expression);
            if !lazy && !is_range {
                code = format!("if($event.target.composing)return;{}", code);
            }
            dom_props.push(format!("\"value\":({})", value));
            on.add(event.into(), format!("function($event){{{}}}", code), true);
            if trim || number {
                on.add("blur".into(), "function($event){return $forceUpdate()}".into(), false);
            }
        }
    }
}

/// Assignment code for a v-model target; reactive paths go through `$set`.
fn gen_assignment(value: &str, assignment: &str) -> String {
    match parse_model(value) {
        (exp, None) => format!("{}={}", exp, assignment),
        (exp, Some(key)) => format!("$set({}, {}, {})", exp, key, assignment),
    }
}

/// Split a model expression into object and key (`a.b` → `a`, `"b"`).
fn parse_model(value: &str) -> (String, Option<String>) {
    let value = value.trim();

    if !value.contains('[') || !value.ends_with(']') {
        return match value.rfind('.') {
            Some(idx) => (
                value[..idx].to_string(),
                Some(format!("\"{}\"", &value[idx + 1..])),
            ),
            None => (value.to_string(), None),
        };
    }

    // Find the bracket matching the final `]`
    let bytes = value.as_bytes();
    let mut depth = 0i32;
    let mut quote: Option<u8> = None;
    for idx in (0..bytes.len()).rev() {
        let c = bytes[idx];
        if let Some(q) = quote {
            if c == q && (idx == 0 || bytes[idx - 1] != b'\\') {
                quote = None;
            }
            continue;
        }
        match c {
            b'\'' | b'"' | b'`' => quote = Some(c),
            b']' => depth += 1,
            b'[' => {
                depth -= 1;
                if depth == 0 {
                    return (
                        value[..idx].to_string(),
                        Some(value[idx + 1..value.len() - 1].to_string()),
                    );
                }
            }
            _ => {}
        }
    }
    (value.to_string(), None)
}

/// Parse `style="a: b; c: d"` into a JSON object literal, in source order.
fn parse_style_text(css: &str) -> String {
    let mut declarations = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    let mut push = |item: &str| {
        if let Some((property, value)) = item.split_once(':') {
            let property = property.trim();
            if !property.is_empty() {
                declarations.push(format!("{}:{}", js_string(property), js_string(value.trim())));
            }
        }
    };
    for (idx, c) in css.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ';' if depth <= 0 => {
                push(&css[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    push(&css[start..]);
    format!("{{{}}}", declarations.join(","))
}

/// Quote a string as a JavaScript string literal.
pub(crate) fn js_string(value: &str) -> String {
    serde_json::to_string(value)
        .unwrap_or_default()
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

/// Decode the HTML character references the template may contain.
fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').filter(|&semi| semi <= 10).and_then(|semi| {
            let entity = &rest[1..semi];
            let ch = match entity {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "amp" => Some('&'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity.strip_prefix('#').and_then(|num| {
                    let code = match num.strip_prefix(['x', 'X']) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => num.parse::<u32>().ok(),
                    };
                    code.and_then(char::from_u32)
                }),
            };
            ch.map(|c| (c, semi))
        });
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compile, parse_template, CompileErrorCode};
    use pretty_assertions::assert_eq;

    fn render(source: &str) -> String {
        compile(source).unwrap().render
    }

    #[test]
    fn test_text_and_interpolation_merge() {
        assert_eq!(
            render(r#"<div id="app">Hello {{ name }}!</div>"#),
            r#"with(this){return _c('div',{attrs:{"id":"app"}},[_v("Hello "+_s(name)+"!")])}"#
        );
    }

    #[test]
    fn test_whitespace_between_elements() {
        assert_eq!(
            render("<div>\n  <span>a</span>\n  <span>b</span>\n</div>\n"),
            r#"with(this){return _c('div',[_c('span',[_v("a")]),_v(" "),_c('span',[_v("b")])])}"#
        );
    }

    #[test]
    fn test_if_chain() {
        assert_eq!(
            render(r#"<div><p v-if="a">A</p><p v-else-if="b">B</p><p v-else>C</p></div>"#),
            r#"with(this){return _c('div',[(a)?_c('p',[_v("A")]):(b)?_c('p',[_v("B")]):_c('p',[_v("C")])])}"#
        );
    }

    #[test]
    fn test_if_without_else_renders_empty() {
        assert_eq!(
            render(r#"<div v-if="ok"></div>"#),
            r#"with(this){return (ok)?_c('div'):_e()}"#
        );
    }

    #[test]
    fn test_lone_v_for_child() {
        assert_eq!(
            render(r#"<ul><li v-for="(item, i) in items" :key="item.id">{{ item.name }}</li></ul>"#),
            r#"with(this){return _c('ul',_l((items),function(item,i){return _c('li',{key:item.id},[_v(_s(item.name))])}),0)}"#
        );
    }

    #[test]
    fn test_v_for_among_siblings_normalizes() {
        let code = render(r#"<ul><li>head</li><li v-for="x in xs">{{ x }}</li></ul>"#);
        assert!(code.ends_with("})],2)}"), "{}", code);
    }

    #[test]
    fn test_class_and_style() {
        assert_eq!(
            render(r#"<div class="a  b" :class="{ on: active }" style="color: red; background: url(a;b)" :style="s"></div>"#),
            r#"with(this){return _c('div',{staticClass:"a b",class:{ on: active },staticStyle:{"color":"red","background":"url(a;b)"},style:(s)})}"#
        );
    }

    #[test]
    fn test_events() {
        assert_eq!(
            render(r#"<button @click="save" @keyup.enter="submit()" @submit.prevent>Go</button>"#),
            concat!(
                r#"with(this){return _c('button',{on:{"click":save,"#,
                r#""keyup":function($event){if(!$event.type.indexOf('key')&&_k($event.keyCode,"enter",13,$event.key,"Enter"))return null;return submit()},"#,
                r#""submit":function($event){$event.preventDefault();}}},[_v("Go")])}"#
            )
        );
    }

    #[test]
    fn test_event_prefixes_and_inline_statement() {
        let code = render(r#"<div @click.once.capture="count += 1"></div>"#);
        assert_eq!(
            code,
            r#"with(this){return _c('div',{on:{"~!click":function($event){count += 1}}})}"#
        );
    }

    #[test]
    fn test_native_v_model() {
        assert_eq!(
            render(r#"<input v-model="msg">"#),
            concat!(
                r#"with(this){return _c('input',{directives:[{name:"model",rawName:"v-model",value:(msg),expression:"msg"}],"#,
                r#"domProps:{"value":(msg)},on:{"input":function($event){if($event.target.composing)return;msg=$event.target.value}}})}"#
            )
        );
    }

    #[test]
    fn test_component_v_model_with_path() {
        let code = render(r#"<my-input v-model="form.name"></my-input>"#);
        assert_eq!(
            code,
            r#"with(this){return _c('my-input',{model:{value:(form.name),callback:function ($$v) {$set(form, "name", $$v)},expression:"form.name"}})}"#
        );
    }

    #[test]
    fn test_v_show_and_v_html() {
        assert_eq!(
            render(r#"<div v-show="visible" v-html="raw"></div>"#),
            r#"with(this){return _c('div',{directives:[{name:"show",rawName:"v-show",value:(visible),expression:"visible"}],domProps:{"innerHTML":_s(raw)}})}"#
        );
    }

    #[test]
    fn test_must_use_prop_and_sync() {
        assert_eq!(
            render(r#"<div><input :value="v"><my-child :title.sync="t"></my-child></div>"#),
            concat!(
                r#"with(this){return _c('div',[_c('input',{domProps:{"value":v}}),"#,
                r#"_c('my-child',{attrs:{"title":t},on:{"update:title":function($event){t=$event}}})],1)}"#
            )
        );
    }

    #[test]
    fn test_slot_outlet() {
        assert_eq!(
            render(r#"<div><slot name="header" :item="row">Default</slot></div>"#),
            r#"with(this){return _c('div',[_t("header",[_v("Default")],{"item":row})],2)}"#
        );
    }

    #[test]
    fn test_scoped_slots() {
        assert_eq!(
            render(r#"<my-list><template #header>Title</template><template v-slot:row="{ item }">{{ item }}</template></my-list>"#),
            concat!(
                r#"with(this){return _c('my-list',{scopedSlots:_u([{key:"header",fn:function(){return [_v("Title")]},proxy:true},"#,
                r#"{key:"row",fn:function({ item }){return [_v(_s(item))]}}])})}"#
            )
        );
    }

    #[test]
    fn test_ref_in_for() {
        let code = render(r#"<div><p v-for="x in xs" ref="items"></p></div>"#);
        assert!(code.contains("ref:\"items\",refInFor:true"), "{}", code);
    }

    #[test]
    fn test_dynamic_component() {
        assert_eq!(
            render(r#"<component :is="view" :msg="m"></component>"#),
            r#"with(this){return _c(view,{tag:"component",attrs:{"msg":m}})}"#
        );
    }

    #[test]
    fn test_bind_object_and_dynamic_attr() {
        assert_eq!(
            render(r#"<div v-bind="attrs" :[key]="val"></div>"#),
            r#"with(this){return _c('div',_b({attrs:_d({},[key,val])},'div',attrs,false))}"#
        );
    }

    #[test]
    fn test_template_fragment_in_if() {
        assert_eq!(
            render(r#"<div><template v-if="ok"><b>1</b><i>2</i></template></div>"#),
            r#"with(this){return _c('div',[(ok)?[_c('b',[_v("1")]),_c('i',[_v("2")])]:_e()],2)}"#
        );
    }

    #[test]
    fn test_entities_decoded() {
        assert_eq!(
            render(r#"<p title="a &amp; b">&lt;tag&gt; &#169;</p>"#),
            r#"with(this){return _c('p',{attrs:{"title":"a & b"}},[_v("<tag> ©")])}"#
        );
    }

    #[test]
    fn test_root_errors() {
        for source in [
            "",
            "just text",
            "<div></div><div></div>",
            "<template><div></div></template>",
            "<slot></slot>",
            r#"<li v-for="x in xs"></li>"#,
        ] {
            let err = compile(source).unwrap_err();
            assert_eq!(err.code, CompileErrorCode::InvalidRoot, "{:?}", source);
        }
    }

    #[test]
    fn test_root_if_chain_is_single_root() {
        let code = render(r#"<p v-if="a">A</p><p v-else>B</p>"#);
        assert_eq!(code, r#"with(this){return (a)?_c('p',[_v("A")]):_c('p',[_v("B")])}"#);
    }

    #[test]
    fn test_parse_model() {
        assert_eq!(parse_model("msg"), ("msg".to_string(), None));
        assert_eq!(
            parse_model("a.b.c"),
            ("a.b".to_string(), Some("\"c\"".to_string()))
        );
        assert_eq!(
            parse_model("list[idx]"),
            ("list".to_string(), Some("idx".to_string()))
        );
        assert_eq!(
            parse_model("map['x]']"),
            ("map".to_string(), Some("'x]'".to_string()))
        );
    }

    #[test]
    fn test_handler_shapes() {
        assert_eq!(gen_handler("doThing", &[], "click"), "doThing");
        assert_eq!(gen_handler("() => go(1)", &[], "click"), "() => go(1)");
        assert_eq!(
            gen_handler("go(1)", &[], "click"),
            "function($event){return go(1)}"
        );
        assert_eq!(
            gen_handler("doThing", &[SmolStr::new("stop")], "click"),
            "function($event){$event.stopPropagation();return doThing.apply(null, arguments)}"
        );
    }

    #[test]
    fn test_generate_directly_from_ast() {
        let ast = parse_template("<span>{{ a }}</span>").unwrap();
        assert_eq!(
            generate(&ast).unwrap(),
            "with(this){return _c('span',[_v(_s(a))])}"
        );
    }
}
