//! Custom Elements
//!
//! Custom element name registry, the reaction queue that drives upgrade and
//! connection callbacks, and `ElementInternals` for form participation.

use std::collections::HashSet;

use crate::NodeId;

/// Defined custom element names
#[derive(Debug, Default)]
pub(crate) struct CustomElementRegistry {
    defined: HashSet<String>,
}

impl CustomElementRegistry {
    /// Register a name. Each name can be defined once.
    pub(crate) fn define(&mut self, name: &str) -> Result<(), CustomElementError> {
        if !is_valid_name(name) {
            return Err(CustomElementError::InvalidName(name.to_string()));
        }
        if !self.defined.insert(name.to_string()) {
            return Err(CustomElementError::AlreadyDefined(name.to_string()));
        }
        Ok(())
    }

    pub(crate) fn is_defined(&self, name: &str) -> bool {
        self.defined.contains(name)
    }

    pub(crate) fn clear(&mut self) {
        self.defined.clear();
    }
}

/// Validate a custom element name
pub(crate) fn is_valid_name(name: &str) -> bool {
    // Must contain hyphen
    if !name.contains('-') {
        return false;
    }

    // Must start with lowercase letter
    if !name.chars().next().map(|c| c.is_ascii_lowercase()).unwrap_or(false) {
        return false;
    }

    const RESERVED: &[&str] = &[
        "annotation-xml", "color-profile", "font-face",
        "font-face-src", "font-face-uri", "font-face-format",
        "font-face-name", "missing-glyph",
    ];
    if RESERVED.contains(&name) {
        return false;
    }

    name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_' || c == '.')
}

/// Custom element reaction, queued by the document and drained by the loader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    /// A connected element's name was just defined
    Upgrade(NodeId),
    /// An element with a defined name became connected
    Connected(NodeId),
    /// An element with a defined name was disconnected
    Disconnected(NodeId),
    /// An element with a defined name was adopted into a new document context
    Adopted(NodeId),
}

impl Reaction {
    pub fn node(&self) -> NodeId {
        match *self {
            Self::Upgrade(n) | Self::Connected(n) | Self::Disconnected(n) | Self::Adopted(n) => n,
        }
    }
}

/// Pending reaction queue for batch processing
#[derive(Debug, Default)]
pub struct ReactionQueue {
    reactions: Vec<Reaction>,
}

impl ReactionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, reaction: Reaction) {
        self.reactions.push(reaction);
    }

    pub fn drain(&mut self) -> Vec<Reaction> {
        std::mem::take(&mut self.reactions)
    }

    pub fn is_empty(&self) -> bool {
        self.reactions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.reactions.len()
    }
}

/// Custom element errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CustomElementError {
    #[error("Invalid custom element name: {0}")]
    InvalidName(String),
    #[error("Custom element already defined: {0}")]
    AlreadyDefined(String),
}

/// ElementInternals - form participation for custom elements
#[derive(Debug, Clone)]
pub struct ElementInternals {
    /// Associated element
    pub element: NodeId,
    /// Submitted form value
    value: Option<String>,
}

impl ElementInternals {
    pub fn new(element: NodeId) -> Self {
        Self { element, value: None }
    }

    /// Set form value
    pub fn set_form_value(&mut self, value: impl Into<String>) {
        self.value = Some(value.into());
    }

    /// Get form value
    pub fn form_value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("my-element"));
        assert!(is_valid_name("x-widget"));
        assert!(is_valid_name("x-foo-bar"));
        assert!(!is_valid_name("myelement")); // no hyphen
        assert!(!is_valid_name("My-Element")); // uppercase
        assert!(!is_valid_name("1-element")); // starts with number
        assert!(!is_valid_name("font-face")); // reserved
    }

    #[test]
    fn test_define_once() {
        let mut registry = CustomElementRegistry::default();

        assert!(registry.define("my-element").is_ok());
        assert!(registry.is_defined("my-element"));
        assert_eq!(
            registry.define("my-element"),
            Err(CustomElementError::AlreadyDefined("my-element".into()))
        );
    }

    #[test]
    fn test_reaction_queue() {
        let mut queue = ReactionQueue::new();
        assert!(queue.is_empty());

        queue.enqueue(Reaction::Connected(NodeId(1)));
        queue.enqueue(Reaction::Disconnected(NodeId(1)));
        assert_eq!(queue.len(), 2);

        let drained = queue.drain();
        assert_eq!(drained[0].node(), NodeId(1));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_element_internals() {
        let mut internals = ElementInternals::new(NodeId(1));
        assert_eq!(internals.form_value(), None);

        internals.set_form_value("42");
        assert_eq!(internals.form_value(), Some("42"));
    }
}
