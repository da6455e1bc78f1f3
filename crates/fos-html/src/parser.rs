//! HTML5 Parser implementation
//!
//! Uses html5ever's RcDom and converts it to our DOM. `<template>` contents
//! land in the template's fragment and `<template shadowrootmode>` becomes a
//! declarative shadow root on its parent.

use fos_dom::{Document, NodeId, ShadowRootMode};
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

/// HTML5 parser
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlParser;

impl HtmlParser {
    /// Create a new HTML parser
    pub fn new() -> Self {
        Self
    }

    /// Parse HTML string into a Document
    pub fn parse(&self, html: &str) -> Document {
        self.parse_with_url(html, "about:blank")
    }

    /// Parse HTML with a base URL
    pub fn parse_with_url(&self, html: &str, url: &str) -> Document {
        tracing::debug!("Parsing HTML document: {}", url);

        let dom = parse_document(RcDom::default(), Default::default()).one(html);

        let mut document = Document::empty(url);
        self.convert_children(&dom.document, &mut document, NodeId::ROOT);
        document.refresh_structure();

        tracing::debug!("Parsed {} nodes", document.len());
        document
    }

    /// Parse `html` as body content and import the top-level nodes into
    /// `document` as detached subtrees, in source order. Leading `<style>`
    /// or `<link>` content that html5ever hoists into `<head>` is kept.
    pub fn parse_fragment_into(&self, document: &mut Document, html: &str) -> Vec<NodeId> {
        let parsed = self.parse(html);
        let mut nodes = Vec::new();
        for container in [parsed.head(), parsed.body()] {
            for child in parsed.children(container) {
                if let Some(snapshot) = parsed.snapshot(child) {
                    nodes.push(document.instantiate(&snapshot));
                }
            }
        }
        nodes
    }

    fn convert_children(&self, handle: &Handle, document: &mut Document, parent: NodeId) {
        for child in handle.children.borrow().iter() {
            self.convert_node(child, document, parent);
        }
    }

    /// Convert an RcDom node to our DOM format
    fn convert_node(&self, handle: &Handle, document: &mut Document, parent: NodeId) {
        let id = match &handle.data {
            RcNodeData::Document => {
                self.convert_children(handle, document, parent);
                return;
            }
            RcNodeData::Doctype { name, .. } => document.create_doctype(name),
            RcNodeData::Text { contents } => {
                let text = contents.borrow();
                // Inter-element whitespace outside <body> carries nothing
                let structural = parent == NodeId::ROOT
                    || matches!(document.tag_name(parent), Some("html" | "head"));
                if structural && text.trim().is_empty() {
                    return;
                }
                document.create_text(&text)
            }
            RcNodeData::Comment { contents } => document.create_comment(contents),
            RcNodeData::Element { name, attrs, template_contents, .. } => {
                let tag: &str = &name.local;

                if tag == "template" {
                    let mode = attrs.borrow()
                        .iter()
                        .find(|a| &*a.name.local == "shadowrootmode")
                        .and_then(|a| ShadowRootMode::parse(&a.value));
                    if let Some(mode) = mode {
                        if self.attach_declarative(handle, document, parent, mode) {
                            return;
                        }
                    }
                }

                let id = document.create_element(tag);
                for attr in attrs.borrow().iter() {
                    if let Err(e) = document.set_attribute(id, &attr.name.local, &attr.value) {
                        tracing::warn!("Dropping attribute {}: {}", &*attr.name.local, e);
                    }
                }
                self.convert_children(handle, document, id);

                if let Some(contents) = template_contents.borrow().as_ref() {
                    if let Some(fragment) = document.template_content(id) {
                        self.convert_children(contents, document, fragment);
                    }
                }
                id
            }
            RcNodeData::ProcessingInstruction { .. } => return,
        };

        if let Err(e) = document.append_child(parent, id) {
            tracing::warn!("Dropping parsed node {}: {}", id, e);
        }
    }

    /// Returns false when the parent cannot host the shadow root, in which
    /// case the template is kept as an ordinary element.
    fn attach_declarative(&self, handle: &Handle, document: &mut Document, parent: NodeId, mode: ShadowRootMode) -> bool {
        let RcNodeData::Element { template_contents, .. } = &handle.data else {
            return false;
        };
        if !document.is_element(parent) {
            return false;
        }
        match document.attach_declarative_shadow(parent, mode) {
            Ok(root) => {
                if let Some(contents) = template_contents.borrow().as_ref() {
                    self.convert_children(contents, document, root);
                }
                true
            }
            Err(e) => {
                tracing::debug!("Declarative shadow root ignored on {}: {}", parent, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let html = "<html><head><title>Test</title></head><body><p>Hello</p></body></html>";
        let doc = HtmlParser::new().parse(html);

        assert!(doc.len() > 1, "Expected more than 1 node, got {}", doc.len());
        assert_eq!(doc.text_content(doc.body()), "Hello");
    }

    #[test]
    fn test_parse_fragment_wraps_structure() {
        let doc = HtmlParser::new().parse("<div><span>Text</span></div>");

        // Even fragments get wrapped in html/head/body by html5ever
        assert_eq!(doc.tag_name(doc.document_element()), Some("html"));
        let div = doc.children(doc.body())[0];
        assert_eq!(doc.tag_name(div), Some("div"));
    }

    #[test]
    fn test_template_contents() {
        let doc = HtmlParser::new().parse("<template shadowroot=\"open\"><p>inside</p></template>");
        let template = doc.descendant_elements(doc.root())
            .into_iter()
            .find(|&id| doc.tag_name(id) == Some("template"))
            .unwrap();

        assert!(doc.children(template).is_empty());
        let content = doc.template_content(template).unwrap();
        assert_eq!(doc.text_content(content), "inside");
        assert_eq!(doc.get_attribute(template, "shadowroot"), Some("open"));
    }
}
