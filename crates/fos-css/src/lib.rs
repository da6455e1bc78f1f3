//! fOS CSS
//!
//! Stylesheet compilation for constructable sheets and `:host` selector
//! rewriting for components rendered without a shadow root.

mod parser;
mod host;

pub use parser::CssParser;
pub use host::rewrite_host_selectors;

use fos_dom::StyleSheet;

/// Compile a stylesheet with default options
pub fn compile(css: &str) -> Result<StyleSheet, CssError> {
    CssParser::new().compile(css)
}

/// CSS parsing error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CssError {
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: u32, message: String },
    #[error("Failed to print stylesheet: {0}")]
    PrintError(String),
}
