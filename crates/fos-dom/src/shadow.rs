//! Shadow DOM
//!
//! Shadow roots and constructable stylesheets adopted into them.

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::NodeId;

static NEXT_SHEET_ID: AtomicU64 = AtomicU64::new(1);

/// Shadow root mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShadowRootMode {
    #[default]
    Open,
    Closed,
}

impl ShadowRootMode {
    /// Parse the `open` / `closed` keywords
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Some(Self::Open),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

/// Shadow root node payload
#[derive(Debug, Clone)]
pub struct ShadowRootData {
    /// Host element
    pub host: NodeId,
    /// Mode (open/closed)
    pub mode: ShadowRootMode,
    /// Whether this came from declarative shadow DOM (pre-rendered)
    pub declarative: bool,
    /// Adopted constructable stylesheets, in adoption order
    pub adopted_style_sheets: Vec<Rc<StyleSheet>>,
}

impl ShadowRootData {
    pub fn new(host: NodeId, mode: ShadowRootMode) -> Self {
        Self {
            host,
            mode,
            declarative: false,
            adopted_style_sheets: Vec::new(),
        }
    }

    /// Adopt a sheet unless the same object is already adopted
    pub fn adopt(&mut self, sheet: Rc<StyleSheet>) -> bool {
        if self.adopted_style_sheets.iter().any(|s| Rc::ptr_eq(s, &sheet)) {
            return false;
        }
        self.adopted_style_sheets.push(sheet);
        true
    }
}

/// A compiled, shareable stylesheet (`CSSStyleSheet` after `replaceSync`)
#[derive(Debug, PartialEq, Eq)]
pub struct StyleSheet {
    id: u64,
    css_text: String,
}

impl StyleSheet {
    pub fn new(css_text: impl Into<String>) -> Self {
        Self {
            id: NEXT_SHEET_ID.fetch_add(1, Ordering::Relaxed),
            css_text: css_text.into(),
        }
    }

    /// Process-unique sheet id
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn css_text(&self) -> &str {
        &self.css_text
    }
}

/// Shadow DOM errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ShadowError {
    /// Element already has a shadow root
    #[error("Element already has a shadow root")]
    AlreadyAttached,
    /// Node cannot host a shadow root
    #[error("Element does not support shadow root")]
    NotSupported,
}
