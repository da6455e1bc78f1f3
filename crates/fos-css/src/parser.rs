//! CSS Parser using lightningcss
//!
//! Validates and normalizes stylesheet text into a shareable `StyleSheet`.

use fos_dom::StyleSheet;
use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet as LightningSheet};

use crate::CssError;

/// CSS Parser
#[derive(Debug, Clone, Default)]
pub struct CssParser {
    minify: bool,
}

impl CssParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit minified text
    pub fn minify(mut self, minify: bool) -> Self {
        self.minify = minify;
        self
    }

    /// Parse and reprint a stylesheet. Any rule lightningcss rejects fails
    /// the whole sheet.
    pub fn compile(&self, css: &str) -> Result<StyleSheet, CssError> {
        let sheet = LightningSheet::parse(css, ParserOptions::default())
            .map_err(|e| CssError::ParseError {
                line: e.loc.as_ref().map(|l| l.line + 1).unwrap_or(0),
                message: e.kind.to_string(),
            })?;

        let printed = sheet
            .to_css(PrinterOptions {
                minify: self.minify,
                ..PrinterOptions::default()
            })
            .map_err(|e| CssError::PrintError(e.to_string()))?;

        tracing::trace!(rules = sheet.rules.0.len(), "Compiled stylesheet");
        Ok(StyleSheet::new(printed.code))
    }
}
