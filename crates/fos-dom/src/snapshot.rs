//! Node snapshots
//!
//! An owned, document-independent copy of a subtree. Definitions keep their
//! template as a snapshot and materialize it into the live document per
//! instance.

use crate::node::{Attribute, NodeData};
use crate::shadow::ShadowRootMode;

/// Owned subtree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeSnapshot {
    Element {
        name: String,
        attrs: Vec<Attribute>,
        children: Vec<NodeSnapshot>,
        /// `<template>` contents
        template_content: Option<Vec<NodeSnapshot>>,
        /// Declarative shadow root: mode and children
        shadow: Option<(ShadowRootMode, Vec<NodeSnapshot>)>,
    },
    Text(String),
    Comment(String),
    Doctype(String),
    Fragment(Vec<NodeSnapshot>),
}

impl NodeSnapshot {
    /// Element snapshot without children
    pub fn element(name: &str, attrs: &[(&str, &str)]) -> Self {
        Self::Element {
            name: name.to_ascii_lowercase(),
            attrs: attrs.iter()
                .map(|(n, v)| Attribute { name: n.to_ascii_lowercase(), value: v.to_string() })
                .collect(),
            children: Vec::new(),
            template_content: None,
            shadow: None,
        }
    }

    /// Local name, for element snapshots
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        match self {
            Self::Element { attrs, .. } => attrs.iter()
                .find(|a| a.name == key)
                .map(|a| a.value.as_str()),
            _ => None,
        }
    }

    pub fn children(&self) -> &[NodeSnapshot] {
        match self {
            Self::Element { children, .. } | Self::Fragment(children) => children,
            _ => &[],
        }
    }

    /// Pre-order walk over this node and its light descendants
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a NodeSnapshot)) {
        f(self);
        for child in self.children() {
            child.walk(f);
        }
    }

    /// Drop every light descendant the predicate matches, returning how
    /// many were removed. Template contents are left alone, like `walk`.
    pub fn prune(&mut self, predicate: &impl Fn(&NodeSnapshot) -> bool) -> usize {
        let children = match self {
            Self::Element { children, .. } | Self::Fragment(children) => children,
            _ => return 0,
        };
        let before = children.len();
        children.retain(|c| !predicate(c));
        let mut removed = before - children.len();
        for child in children.iter_mut() {
            removed += child.prune(predicate);
        }
        removed
    }

    pub(crate) fn from_data(data: &NodeData) -> Option<Self> {
        Some(match data {
            NodeData::Element(e) => Self::Element {
                name: e.name.clone(),
                attrs: e.attrs.clone(),
                children: Vec::new(),
                template_content: None,
                shadow: None,
            },
            NodeData::Text(t) => Self::Text(t.clone()),
            NodeData::Comment(c) => Self::Comment(c.clone()),
            NodeData::Doctype { name } => Self::Doctype(name.clone()),
            NodeData::Fragment => Self::Fragment(Vec::new()),
            NodeData::Document | NodeData::ShadowRoot(_) => return None,
        })
    }
}
