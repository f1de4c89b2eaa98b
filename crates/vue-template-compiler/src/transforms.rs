//! Template transformations.
//!
//! Runs between parsing and code generation: joins `v-if` / `v-else-if` /
//! `v-else` siblings into a single conditional and moves `v-slot` content of
//! components into the element's named slots.

use crate::ast::*;
use crate::error::{CompileError, CompileResult};
use smol_str::SmolStr;

/// Transform a template AST in place.
pub fn transform(ast: &mut TemplateAst) -> CompileResult<()> {
    transform_children(&mut ast.children)
}

/// Transform a list of sibling nodes and everything below them.
fn transform_children(children: &mut Vec<TemplateNode>) -> CompileResult<()> {
    merge_if_chains(children)?;
    for child in children.iter_mut() {
        transform_node(child)?;
    }
    Ok(())
}

/// Transform a single node.
fn transform_node(node: &mut TemplateNode) -> CompileResult<()> {
    match node {
        TemplateNode::Element(el) => {
            if el.is_component || el.tag == "component" {
                collect_slots(el)?;
            }
            transform_children(&mut el.children)?;
            for slot in el.slots.values_mut() {
                transform_children(&mut slot.children)?;
            }
        }
        TemplateNode::For(f) => transform_children(&mut f.children)?,
        TemplateNode::If(i) => {
            for branch in &mut i.branches {
                transform_children(&mut branch.children)?;
            }
        }
        TemplateNode::Template(t) => transform_children(&mut t.children)?,
        TemplateNode::SlotOutlet(s) => transform_children(&mut s.fallback)?,
        TemplateNode::Text(_) | TemplateNode::Interpolation(_) | TemplateNode::Comment(_) => {}
    }
    Ok(())
}

/// Fold `v-else-if` / `v-else` nodes into the preceding `v-if`.
///
/// Whitespace and comments between branches are dropped.
fn merge_if_chains(children: &mut Vec<TemplateNode>) -> CompileResult<()> {
    let mut merged: Vec<TemplateNode> = Vec::with_capacity(children.len());
    let mut pending_gap: Vec<TemplateNode> = Vec::new();

    for node in children.drain(..) {
        if node.is_insignificant() {
            pending_gap.push(node);
            continue;
        }

        let continues_chain = matches!(
            &node,
            TemplateNode::If(i) if i.branches.first().is_some_and(|b| b.branch_type != IfBranchType::If)
        );

        if let (true, TemplateNode::If(tail)) = (continues_chain, &node) {
            let open = match merged.last_mut() {
                Some(TemplateNode::If(head))
                    if head
                        .branches
                        .last()
                        .is_some_and(|b| b.branch_type != IfBranchType::Else) =>
                {
                    Some(head)
                }
                _ => None,
            };

            let Some(head) = open else {
                return Err(CompileError::unpaired_else(tail.span));
            };

            head.branches.extend(tail.branches.iter().cloned());
            head.span = head.span.merge(tail.span);
            pending_gap.clear();
            continue;
        }

        merged.append(&mut pending_gap);
        merged.push(node);
    }

    merged.append(&mut pending_gap);
    *children = merged;
    Ok(())
}

/// Move `<template v-slot:name>` children, and a `v-slot` on the component
/// itself, into `el.slots`.
fn collect_slots(el: &mut ElementNode) -> CompileResult<()> {
    let own_slot = el
        .directives
        .iter()
        .position(|d| d.name == "slot")
        .map(|idx| el.directives.remove(idx));

    let mut remaining = Vec::with_capacity(el.children.len());
    for child in el.children.drain(..) {
        match child {
            TemplateNode::Template(t) => {
                let Some(directive) = t.directives.iter().find(|d| d.name == "slot") else {
                    remaining.push(TemplateNode::Template(t));
                    continue;
                };
                let slot = slot_from_directive(directive, t.children.clone(), t.span);
                if el.slots.contains_key(&slot.name) {
                    return Err(CompileError::invalid_slot(
                        format!("Duplicate slot content for \"{}\"", slot.name),
                        t.span,
                    ));
                }
                el.slots.insert(slot.name.clone(), slot);
            }
            other => remaining.push(other),
        }
    }

    if let Some(directive) = own_slot {
        if !el.slots.is_empty() {
            return Err(CompileError::invalid_slot(
                "v-slot on a component cannot be mixed with <template v-slot> children",
                directive.span,
            ));
        }
        let slot = slot_from_directive(&directive, remaining, el.span);
        el.slots.insert(slot.name.clone(), slot);
        return Ok(());
    }

    el.children = remaining;
    Ok(())
}

fn slot_from_directive(
    directive: &Directive,
    children: Vec<TemplateNode>,
    span: source_text::Span,
) -> SlotNode {
    let (name, is_dynamic) = match &directive.arg {
        Some(DirectiveArg::Static(name, _)) => (name.clone(), false),
        Some(DirectiveArg::Dynamic(expr)) => (SmolStr::from(expr.content.trim()), true),
        None => (SmolStr::new_static("default"), false),
    };
    let props = directive
        .value
        .as_ref()
        .filter(|v| !v.is_empty())
        .map(|v| SlotProps {
            pattern: v.content.trim().to_string(),
            span: v.span,
        });

    SlotNode {
        name,
        is_dynamic,
        props,
        children,
        span,
    }
}

/// Camelize a string (kebab-case to camelCase).
pub fn camelize(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut capitalize_next = false;

    for c in s.chars() {
        if c == '-' {
            capitalize_next = true;
        } else if capitalize_next {
            result.push(c.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_template, CompileErrorCode};
    use pretty_assertions::assert_eq;

    fn transformed(source: &str) -> TemplateAst {
        let mut ast = parse_template(source).unwrap();
        transform(&mut ast).unwrap();
        ast
    }

    #[test]
    fn test_merge_if_chain() {
        let source = r#"<div><p v-if="a">A</p>
  <!-- between -->
  <p v-else-if="b">B</p>
  <p v-else>C</p></div>"#;
        let ast = transformed(source);
        let TemplateNode::Element(div) = &ast.children[0] else {
            panic!("Expected element");
        };
        assert_eq!(div.children.len(), 1);
        match &div.children[0] {
            TemplateNode::If(node) => {
                let kinds: Vec<_> = node.branches.iter().map(|b| b.branch_type).collect();
                assert_eq!(
                    kinds,
                    vec![IfBranchType::If, IfBranchType::ElseIf, IfBranchType::Else]
                );
                assert_eq!(node.span.start as usize, source.find("<p v-if").unwrap());
                assert!(node.span.end as usize > source.find("<p v-else>").unwrap());
            }
            _ => panic!("Expected if node"),
        }
    }

    #[test]
    fn test_separate_if_blocks_stay_separate() {
        let ast = transformed(r#"<div><p v-if="a">A</p><p v-if="b">B</p></div>"#);
        let TemplateNode::Element(div) = &ast.children[0] else {
            panic!("Expected element");
        };
        assert_eq!(div.children.len(), 2);
    }

    #[test]
    fn test_unpaired_else() {
        let mut ast = parse_template(r#"<div><span></span><p v-else>C</p></div>"#).unwrap();
        let err = transform(&mut ast).unwrap_err();
        assert_eq!(err.code, CompileErrorCode::UnpairedElse);
    }

    #[test]
    fn test_else_after_else_is_unpaired() {
        let mut ast =
            parse_template(r#"<div><p v-if="a"></p><p v-else></p><p v-else></p></div>"#).unwrap();
        assert!(transform(&mut ast).is_err());
    }

    #[test]
    fn test_collect_named_slots() {
        let ast = transformed(
            r#"<MyList><template #header>Title</template><template v-slot:item="{ row }">{{ row }}</template><span>rest</span></MyList>"#,
        );
        let TemplateNode::Element(list) = &ast.children[0] else {
            panic!("Expected element");
        };
        let names: Vec<_> = list.slots.keys().map(|k| k.as_str()).collect();
        assert_eq!(names, vec!["header", "item"]);
        assert_eq!(list.slots["item"].props.as_ref().unwrap().pattern, "{ row }");
        assert!(list.slots["header"].props.is_none());
        assert_eq!(list.children.len(), 1);
    }

    #[test]
    fn test_component_own_v_slot() {
        let ast = transformed(r#"<my-list v-slot="props">{{ props.x }}</my-list>"#);
        let TemplateNode::Element(list) = &ast.children[0] else {
            panic!("Expected element");
        };
        assert!(list.children.is_empty());
        assert_eq!(list.slots["default"].props.as_ref().unwrap().pattern, "props");
    }

    #[test]
    fn test_camelize() {
        assert_eq!(camelize("foo-bar"), "fooBar");
        assert_eq!(camelize("foo-bar-baz"), "fooBarBaz");
        assert_eq!(camelize("foo"), "foo");
    }
}
