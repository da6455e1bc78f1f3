//! fOS HTML Parser
//!
//! HTML5 parsing built on html5ever, converted into the fOS DOM, plus
//! innerHTML/outerHTML serialization.

mod parser;
mod serializer;

pub use fos_dom::Document;
pub use parser::HtmlParser;
pub use serializer::{get_inner_html, get_outer_html, HtmlSerializer};

/// Parse an HTML string into a document
pub fn parse(html: &str) -> Document {
    HtmlParser::new().parse(html)
}
