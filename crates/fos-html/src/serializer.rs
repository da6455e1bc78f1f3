//! HTML Serialization (innerHTML/outerHTML)
//!
//! Serializes DOM nodes to HTML strings with escaping and void element
//! handling. Template contents are serialized in place of the template's
//! (empty) children; shadow roots are not serialized.

use fos_dom::{Document, NodeData, NodeId};

/// HTML serializer
#[derive(Debug, Clone)]
pub struct HtmlSerializer {
    /// Whether to format output with indentation
    pub pretty_print: bool,
    /// Indentation string
    pub indent: String,
}

/// Void elements (self-closing, no end tag)
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input",
    "link", "meta", "param", "source", "track", "wbr",
];

/// Raw text elements (no escaping for content)
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

impl Default for HtmlSerializer {
    fn default() -> Self {
        Self {
            pretty_print: false,
            indent: "  ".to_string(),
        }
    }
}

impl HtmlSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty() -> Self {
        Self {
            pretty_print: true,
            ..Self::default()
        }
    }

    /// Serialize innerHTML of a node (children only)
    pub fn serialize_inner(&self, doc: &Document, node_id: NodeId) -> String {
        let mut output = String::new();
        self.serialize_children(doc, node_id, &mut output, 0);
        output
    }

    /// Serialize outerHTML of a node (including the node itself)
    pub fn serialize_outer(&self, doc: &Document, node_id: NodeId) -> String {
        let mut output = String::new();
        self.serialize_node(doc, node_id, &mut output, 0);
        output
    }

    fn serialize_node(&self, doc: &Document, node_id: NodeId, output: &mut String, depth: usize) {
        let Some(node) = doc.node(node_id) else {
            return;
        };

        match &node.data {
            NodeData::Document | NodeData::Fragment | NodeData::ShadowRoot(_) => {
                self.serialize_children(doc, node_id, output, depth);
            }
            NodeData::Element(elem) => {
                let tag = elem.name.as_str();
                let is_void = VOID_ELEMENTS.contains(&tag);
                let is_raw = RAW_TEXT_ELEMENTS.contains(&tag);

                self.newline(output, depth);

                output.push('<');
                output.push_str(tag);
                for attr in elem.attrs.iter() {
                    output.push(' ');
                    output.push_str(&attr.name);
                    if !attr.value.is_empty() {
                        output.push_str("=\"");
                        escape_attribute(&attr.value, output);
                        output.push('"');
                    }
                }

                if is_void {
                    output.push('>');
                    return;
                }
                output.push('>');

                let content = doc.template_content(node_id).unwrap_or(node_id);
                if is_raw {
                    output.push_str(&doc.text_content(content));
                } else {
                    self.serialize_children(doc, content, output, depth + 1);
                }

                if node.first_child.is_valid() && !is_raw {
                    self.newline(output, depth);
                }
                output.push_str("</");
                output.push_str(tag);
                output.push('>');
            }
            NodeData::Text(text) => escape_text(text, output),
            NodeData::Comment(text) => {
                output.push_str("<!--");
                output.push_str(text);
                output.push_str("-->");
            }
            NodeData::Doctype { name } => {
                output.push_str("<!DOCTYPE ");
                output.push_str(name);
                output.push('>');
            }
        }
    }

    fn serialize_children(&self, doc: &Document, parent_id: NodeId, output: &mut String, depth: usize) {
        for child_id in doc.children(parent_id) {
            self.serialize_node(doc, child_id, output, depth);
        }
    }

    fn newline(&self, output: &mut String, depth: usize) {
        if self.pretty_print && depth > 0 {
            output.push('\n');
            for _ in 0..depth {
                output.push_str(&self.indent);
            }
        }
    }
}

/// Escape text content for HTML
fn escape_text(text: &str, output: &mut String) {
    for c in text.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            _ => output.push(c),
        }
    }
}

/// Escape attribute value
fn escape_attribute(text: &str, output: &mut String) {
    for c in text.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '"' => output.push_str("&quot;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            _ => output.push(c),
        }
    }
}

/// Utility: Get innerHTML of an element
pub fn get_inner_html(doc: &Document, node_id: NodeId) -> String {
    HtmlSerializer::new().serialize_inner(doc, node_id)
}

/// Utility: Get outerHTML of an element
pub fn get_outer_html(doc: &Document, node_id: NodeId) -> String {
    HtmlSerializer::new().serialize_outer(doc, node_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_text() {
        let mut output = String::new();
        escape_text("Hello <world> & \"friends\"", &mut output);
        assert_eq!(output, "Hello &lt;world&gt; &amp; \"friends\"");
    }

    #[test]
    fn test_escape_attribute() {
        let mut output = String::new();
        escape_attribute("Hello <world> & \"friends\"", &mut output);
        assert_eq!(output, "Hello &lt;world&gt; &amp; &quot;friends&quot;");
    }

    #[test]
    fn test_outer_html() {
        let mut doc = Document::default();
        let p = doc.create_element("p");
        doc.set_attribute(p, "style", "color: red;").unwrap();
        let text = doc.create_text("a < b");
        doc.append_child(p, text).unwrap();
        let br = doc.create_element("br");
        doc.append_child(p, br).unwrap();

        assert_eq!(get_outer_html(&doc, p), "<p style=\"color: red;\">a &lt; b<br></p>");
    }

    #[test]
    fn test_raw_text_not_escaped() {
        let mut doc = Document::default();
        let style = doc.create_element("style");
        let css = doc.create_text("a > b { color: red }");
        doc.append_child(style, css).unwrap();

        assert_eq!(get_outer_html(&doc, style), "<style>a > b { color: red }</style>");
    }
}
