//! Style application
//!
//! Isolated instances adopt the definition's compiled sheets, so every
//! instance of a tag shares one sheet. When compilation failed, or shared
//! sheets are turned off, the original text goes into a plain `<style>`.
//! Shared-mode instances get a `<style>` whose `:host` selectors were
//! rewritten to the tag name.

use fos_css::rewrite_host_selectors;
use fos_dom::{Document, DomResult, NodeId};

use crate::{ComponentDefinition, Config, StyleNode};

/// Apply every style node of `definition` to `root`, returning how many
/// sheets were adopted
pub(crate) fn apply_styles(
    doc: &mut Document,
    root: NodeId,
    tag: &str,
    definition: &ComponentDefinition,
    config: &Config,
) -> DomResult<usize> {
    let mut adopted = 0;
    for style in &definition.styles {
        match style {
            StyleNode::Inline { text, .. } if definition.is_isolated() => {
                let sheet = if config.constructable_stylesheets { style.compiled() } else { None };
                match sheet {
                    Some(sheet) => {
                        if doc.adopt_style_sheet(root, sheet)? {
                            adopted += 1;
                        }
                    }
                    None => append_style(doc, root, text)?,
                }
            }
            StyleNode::Inline { text, .. } => {
                append_style(doc, root, &rewrite_host_selectors(text, tag))?;
            }
            StyleNode::Link { attrs } => {
                let link = doc.create_element("link");
                for (name, value) in attrs {
                    doc.set_attribute(link, name, value)?;
                }
                doc.append_child(root, link)?;
            }
        }
    }
    tracing::trace!(tag, styles = definition.styles.len(), adopted, "Applied styles");
    Ok(adopted)
}

fn append_style(doc: &mut Document, root: NodeId, text: &str) -> DomResult<()> {
    let style = doc.create_element("style");
    let content = doc.create_text(text);
    doc.append_child(style, content)?;
    doc.append_child(root, style)
}
