//! Component source parser
//!
//! Turns fetched source text into a `ComponentDefinition`. The source must
//! wrap its content in a `<template>`; everything outside it is ignored.

use fos_dom::{Document, NodeId, NodeSnapshot, ShadowRootMode};
use fos_js::{ScriptKind, ScriptUnit};

use crate::definition::{ComponentDefinition, Isolation, StyleNode};
use crate::{ComponentError, Config};

const JS_MIME_TYPES: &[&str] = &[
    "text/javascript",
    "application/javascript",
    "application/x-javascript",
    "text/ecmascript",
    "application/ecmascript",
];

/// Parse a component source. `tag` and `src` are used for diagnostics only.
pub fn parse_component(text: &str, tag: &str, src: &str, config: &Config) -> Result<ComponentDefinition, ComponentError> {
    let doc = fos_html::parse(text);

    let Some(template) = find_template(&doc) else {
        tracing::warn!(tag, src, "Component source has no <template>");
        return Err(ComponentError::MissingTemplate {
            tag: tag.to_string(),
            src: src.to_string(),
        });
    };

    let isolation = doc
        .get_attribute(template, &config.isolation_attribute)
        .and_then(ShadowRootMode::parse)
        .map(Isolation::Isolated)
        .unwrap_or(Isolation::None);

    let content = doc.template_content(template).unwrap_or(NodeId::NONE);
    let marker = config.form_associated_attribute.as_str();
    let form_associated = doc.has_attribute(template, marker)
        || doc.descendant_elements(content).into_iter().any(|id| doc.has_attribute(id, marker));

    let mut template_snapshot = doc.snapshot(content).unwrap_or(NodeSnapshot::Fragment(Vec::new()));

    let mut styles = Vec::new();
    let mut scripts = Vec::new();
    template_snapshot.walk(&mut |node| {
        if is_style_node(node) {
            styles.push(style_node(node));
        } else if let Some(kind) = script_kind(node) {
            scripts.push(script_unit(node, kind));
        }
    });
    template_snapshot.prune(&|node: &NodeSnapshot| is_style_node(node) || script_kind(node).is_some());

    tracing::debug!(
        tag,
        src,
        styles = styles.len(),
        scripts = scripts.len(),
        isolated = matches!(isolation, Isolation::Isolated(_)),
        "Parsed component source"
    );

    Ok(ComponentDefinition {
        source: src.to_string(),
        template: template_snapshot,
        styles,
        scripts,
        isolation,
        form_associated,
    })
}

/// First `<template>` in document order, outside any other template
fn find_template(doc: &Document) -> Option<NodeId> {
    doc.descendant_elements(NodeId::ROOT)
        .into_iter()
        .find(|&id| doc.tag_name(id) == Some("template"))
}

fn is_style_node(node: &NodeSnapshot) -> bool {
    match node.name() {
        Some("style") => true,
        Some("link") => node
            .attr("rel")
            .is_some_and(|rel| rel.split_ascii_whitespace().any(|r| r.eq_ignore_ascii_case("stylesheet"))),
        _ => false,
    }
}

fn style_node(node: &NodeSnapshot) -> StyleNode {
    match node {
        NodeSnapshot::Element { name, attrs, .. } if name == "link" => {
            StyleNode::link(attrs.iter().map(|a| (a.name.clone(), a.value.clone())).collect())
        }
        _ => StyleNode::inline(&text_of(node)),
    }
}

/// Behaviour kind of a `<script>`, or `None` for data blocks
fn script_kind(node: &NodeSnapshot) -> Option<ScriptKind> {
    if node.name() != Some("script") {
        return None;
    }
    let script_type = node.attr("type").unwrap_or("").trim().to_ascii_lowercase();
    let external = node.attr("src").is_some();

    if script_type == "module" {
        return Some(if external { ScriptKind::ModuleExternal } else { ScriptKind::ModuleInline });
    }
    if script_type.is_empty() || JS_MIME_TYPES.contains(&script_type.as_str()) {
        return Some(if external { ScriptKind::ModuleExternal } else { ScriptKind::Inline });
    }
    None
}

fn script_unit(node: &NodeSnapshot, kind: ScriptKind) -> ScriptUnit {
    let attrs = match node {
        NodeSnapshot::Element { attrs, .. } => attrs.iter()
            .filter(|a| a.name != "src")
            .map(|a| (a.name.clone(), a.value.clone()))
            .collect(),
        _ => Vec::new(),
    };
    ScriptUnit {
        kind,
        body: text_of(node),
        src: node.attr("src").map(str::to_string),
        attrs,
    }
}

fn text_of(node: &NodeSnapshot) -> String {
    let mut text = String::new();
    node.walk(&mut |n| {
        if let NodeSnapshot::Text(t) = n {
            text.push_str(t);
        }
    });
    text
}
