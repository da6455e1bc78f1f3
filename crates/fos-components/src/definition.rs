//! Component definitions
//!
//! A definition is the parsed blueprint for one source: the template
//! snapshot with styles and behaviour units extracted, the isolation mode
//! and form association. Definitions are shared behind `Rc` and never
//! change after parsing, except for the lazily compiled style sheets.

use std::cell::OnceCell;
use std::rc::Rc;

use fos_dom::{NodeSnapshot, ShadowRootMode, StyleSheet};
use fos_js::ScriptUnit;

/// Rendering mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Isolation {
    /// Render into the host element itself
    None,
    /// Render into a shadow root of the given mode
    Isolated(ShadowRootMode),
}

/// A style block or stylesheet link from the template
#[derive(Debug)]
pub enum StyleNode {
    Inline {
        text: String,
        /// Compiled on first isolated use; `None` when compilation failed
        sheet: OnceCell<Option<Rc<StyleSheet>>>,
    },
    Link {
        attrs: Vec<(String, String)>,
    },
}

impl StyleNode {
    pub fn inline(text: &str) -> Self {
        Self::Inline {
            text: text.to_string(),
            sheet: OnceCell::new(),
        }
    }

    pub fn link(attrs: Vec<(String, String)>) -> Self {
        Self::Link { attrs }
    }

    /// Shared compiled sheet for an inline block
    pub fn compiled(&self) -> Option<Rc<StyleSheet>> {
        let Self::Inline { text, sheet } = self else {
            return None;
        };
        sheet
            .get_or_init(|| match fos_css::compile(text) {
                Ok(compiled) => Some(Rc::new(compiled)),
                Err(e) => {
                    tracing::warn!("Style block rejected, using plain <style>: {}", e);
                    None
                }
            })
            .clone()
    }
}

/// Parsed blueprint for one component source
#[derive(Debug)]
pub struct ComponentDefinition {
    pub source: String,
    /// Template content without style and script elements
    pub template: NodeSnapshot,
    pub styles: Vec<StyleNode>,
    pub scripts: Vec<ScriptUnit>,
    pub isolation: Isolation,
    pub form_associated: bool,
}

impl ComponentDefinition {
    pub fn is_isolated(&self) -> bool {
        matches!(self.isolation, Isolation::Isolated(_))
    }

    pub fn shadow_mode(&self) -> Option<ShadowRootMode> {
        match self.isolation {
            Isolation::Isolated(mode) => Some(mode),
            Isolation::None => None,
        }
    }
}
