//! Document - arena-backed tree plus the per-document registries
//! (custom elements, mutation observers, event listeners).

use std::rc::Rc;

use crate::custom_elements::{is_valid_name, CustomElementRegistry, Reaction, ReactionQueue};
use crate::events::{Event, ListenerId, ListenerRegistry};
use crate::node::{Attribute, ElementData, Node, NodeData};
use crate::observer::{MutationObserverInit, MutationRecord, ObserverId, ObserverRegistry};
use crate::shadow::{ShadowError, ShadowRootData, ShadowRootMode, StyleSheet};
use crate::snapshot::NodeSnapshot;
use crate::style::InlineStyle;
use crate::{CustomElementError, NodeId};

/// Elements that may host a shadow root besides autonomous custom elements
const SHADOW_HOSTS: &[&str] = &[
    "article", "aside", "blockquote", "body", "div", "footer", "h1", "h2", "h3",
    "h4", "h5", "h6", "header", "main", "nav", "p", "section", "span",
];

/// DOM errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("Node {0} does not exist")]
    InvalidNode(NodeId),
    #[error("Node {0} is not an element")]
    NotAnElement(NodeId),
    #[error("Node {0} is not a shadow root")]
    NotAShadowRoot(NodeId),
    #[error("Cannot insert {child} into {parent}")]
    HierarchyRequest { parent: NodeId, child: NodeId },
    #[error("Node {0} is not a child of the given parent")]
    NotFound(NodeId),
    #[error(transparent)]
    Shadow(#[from] ShadowError),
    #[error(transparent)]
    CustomElement(#[from] CustomElementError),
}

pub type DomResult<T> = Result<T, DomError>;

/// HTML Document
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
    /// Document URL
    url: String,
    html_element: NodeId,
    head_element: NodeId,
    body_element: NodeId,
    custom_elements: CustomElementRegistry,
    reactions: ReactionQueue,
    observers: ObserverRegistry,
    pub(crate) listeners: ListenerRegistry,
}

impl Document {
    /// Create a document with `<html><head></head><body></body></html>`
    pub fn new(url: &str) -> Self {
        let mut doc = Self::empty(url);
        let html = doc.create_element("html");
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        doc.link(NodeId::ROOT, html, NodeId::NONE);
        doc.link(html, head, NodeId::NONE);
        doc.link(html, body, NodeId::NONE);
        doc.refresh_structure();
        doc
    }

    /// Create an empty document (no structure)
    pub fn empty(url: &str) -> Self {
        Self {
            nodes: vec![Node::new(NodeData::Document)],
            url: url.to_string(),
            html_element: NodeId::NONE,
            head_element: NodeId::NONE,
            body_element: NodeId::NONE,
            custom_elements: CustomElementRegistry::default(),
            reactions: ReactionQueue::new(),
            observers: ObserverRegistry::default(),
            listeners: ListenerRegistry::default(),
        }
    }

    /// Re-locate `<html>`, `<head>` and `<body>` after the tree was built
    pub fn refresh_structure(&mut self) {
        self.html_element = self.children(NodeId::ROOT).into_iter()
            .find(|&id| self.tag_name(id) == Some("html"))
            .unwrap_or(NodeId::NONE);
        self.head_element = NodeId::NONE;
        self.body_element = NodeId::NONE;
        for child in self.children(self.html_element) {
            let is_head = self.tag_name(child) == Some("head");
            let is_body = self.tag_name(child) == Some("body");
            if is_head && !self.head_element.is_valid() {
                self.head_element = child;
            } else if is_body && !self.body_element.is_valid() {
                self.body_element = child;
            }
        }
    }

    /// Get document URL
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get <html> element
    pub fn document_element(&self) -> NodeId {
        self.html_element
    }

    /// Get <head> element
    pub fn head(&self) -> NodeId {
        self.head_element
    }

    /// Get <body> element
    pub fn body(&self) -> NodeId {
        self.body_element
    }

    /// Number of nodes ever created
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    // ---- Node access ----

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        if !id.is_valid() {
            return None;
        }
        self.nodes.get(id.0 as usize)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if !id.is_valid() {
            return None;
        }
        self.nodes.get_mut(id.0 as usize)
    }

    fn get(&self, id: NodeId) -> DomResult<&Node> {
        self.node(id).ok_or(DomError::InvalidNode(id))
    }

    fn element_mut(&mut self, id: NodeId) -> DomResult<&mut ElementData> {
        self.node_mut(id)
            .ok_or(DomError::InvalidNode(id))?
            .as_element_mut()
            .ok_or(DomError::NotAnElement(id))
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.node(id)?.as_element()
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    /// Lowercase local name
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.name.as_str())
    }

    // ---- Node creation ----

    fn create_node(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(data));
        id
    }

    /// Create a detached element. `<template>` gets its contents fragment.
    pub fn create_element(&mut self, name: &str) -> NodeId {
        let id = self.create_node(NodeData::Element(ElementData::new(name)));
        if self.tag_name(id) == Some("template") {
            let content = self.create_fragment();
            if let Some(elem) = self.node_mut(id).and_then(Node::as_element_mut) {
                elem.template_content = content;
            }
        }
        id
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.create_node(NodeData::Text(text.to_string()))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.create_node(NodeData::Comment(text.to_string()))
    }

    pub fn create_fragment(&mut self) -> NodeId {
        self.create_node(NodeData::Fragment)
    }

    pub fn create_doctype(&mut self, name: &str) -> NodeId {
        self.create_node(NodeData::Doctype { name: name.to_string() })
    }

    // ---- Traversal ----

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).map(|n| n.parent).filter(|p| p.is_valid())
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut child = self.node(id).map(|n| n.first_child).unwrap_or(NodeId::NONE);
        while let Some(node) = self.node(child) {
            out.push(child);
            child = node.next_sibling;
        }
        out
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id).into_iter().filter(|&c| self.is_element(c)).collect()
    }

    pub fn has_element_children(&self, id: NodeId) -> bool {
        self.children(id).into_iter().any(|c| self.is_element(c))
    }

    /// Light-tree descendants in document order, excluding `id`
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).into_iter().rev());
        }
        out
    }

    pub fn descendant_elements(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id).into_iter().filter(|&d| self.is_element(d)).collect()
    }

    /// Inclusive descendants, entering shadow roots before light children
    fn shadow_including_inclusive(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).into_iter().rev());
            if let Some(shadow) = self.shadow_root(next) {
                stack.push(shadow);
            }
        }
        out
    }

    /// Inclusive ancestors up to the tree root, not leaving shadow trees
    fn tree_path(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut current = id;
        while let Some(node) = self.node(current) {
            path.push(current);
            current = node.parent;
        }
        path
    }

    /// Root of the tree containing `id`: the document, a shadow root, a
    /// fragment or a detached node
    pub fn tree_root(&self, id: NodeId) -> NodeId {
        self.tree_path(id).last().copied().unwrap_or(NodeId::NONE)
    }

    /// Connected to the document, looking through shadow hosts
    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == NodeId::ROOT {
                return true;
            }
            let Some(node) = self.node(current) else {
                return false;
            };
            current = match &node.data {
                NodeData::ShadowRoot(shadow) => shadow.host,
                _ => node.parent,
            };
        }
    }

    /// Concatenated light-tree text
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.node(id).and_then(Node::as_text) {
            return text.to_string();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|d| self.node(d).and_then(Node::as_text))
            .collect()
    }

    /// Replace children with a single text node, or update a text node
    pub fn set_text_content(&mut self, id: NodeId, text: &str) -> DomResult<()> {
        let node = self.node_mut(id).ok_or(DomError::InvalidNode(id))?;
        if let NodeData::Text(current) = &mut node.data {
            let old = std::mem::replace(current, text.to_string());
            self.queue_record(MutationRecord::character_data(id, old));
            return Ok(());
        }
        self.clear_children(id)?;
        if !text.is_empty() {
            let text = self.create_text(text);
            self.append_child(id, text)?;
        }
        Ok(())
    }

    // ---- Attributes ----

    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        let elem = self.element(id)?;
        if name.bytes().any(|b| b.is_ascii_uppercase()) {
            elem.get_attr(&name.to_ascii_lowercase())
        } else {
            elem.get_attr(name)
        }
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.get_attribute(id, name).is_some()
    }

    /// Attributes in insertion order (empty for non-elements)
    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        self.element(id).map(|e| e.attrs.as_slice()).unwrap_or(&[])
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> DomResult<()> {
        let name = name.to_ascii_lowercase();
        let old = self.element_mut(id)?.set_attr(&name, value.to_string());
        self.queue_record(MutationRecord::attribute(id, &name, old));
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> DomResult<Option<String>> {
        let name = name.to_ascii_lowercase();
        let old = self.element_mut(id)?.remove_attr(&name);
        if old.is_some() {
            self.queue_record(MutationRecord::attribute(id, &name, old.clone()));
        }
        Ok(old)
    }

    // ---- Inline style ----

    pub fn inline_style(&self, id: NodeId) -> InlineStyle {
        self.get_attribute(id, "style")
            .map(InlineStyle::parse)
            .unwrap_or_default()
    }

    pub fn style_property(&self, id: NodeId, name: &str) -> Option<String> {
        self.inline_style(id).get_property_value(name).map(str::to_string)
    }

    pub fn set_style_property(&mut self, id: NodeId, name: &str, value: &str) -> DomResult<()> {
        let mut style = self.inline_style(id);
        style.set_property(name, value);
        self.write_style(id, style)
    }

    pub fn remove_style_property(&mut self, id: NodeId, name: &str) -> DomResult<Option<String>> {
        let mut style = self.inline_style(id);
        let removed = style.remove_property(name);
        if removed.is_some() {
            self.write_style(id, style)?;
        }
        Ok(removed)
    }

    fn write_style(&mut self, id: NodeId, style: InlineStyle) -> DomResult<()> {
        if style.is_empty() {
            self.remove_attribute(id, "style")?;
            Ok(())
        } else {
            self.set_attribute(id, "style", &style.to_css_text())
        }
    }

    // ---- Tree mutation ----

    fn link(&mut self, parent: NodeId, child: NodeId, before: NodeId) {
        let prev = if before.is_valid() {
            self.nodes[before.0 as usize].prev_sibling
        } else {
            self.nodes[parent.0 as usize].last_child
        };

        {
            let node = &mut self.nodes[child.0 as usize];
            node.parent = parent;
            node.prev_sibling = prev;
            node.next_sibling = before;
        }
        if prev.is_valid() {
            self.nodes[prev.0 as usize].next_sibling = child;
        } else {
            self.nodes[parent.0 as usize].first_child = child;
        }
        if before.is_valid() {
            self.nodes[before.0 as usize].prev_sibling = child;
        } else {
            self.nodes[parent.0 as usize].last_child = child;
        }
    }

    fn unlink(&mut self, child: NodeId) {
        let (parent, prev, next) = {
            let node = &self.nodes[child.0 as usize];
            (node.parent, node.prev_sibling, node.next_sibling)
        };
        if !parent.is_valid() {
            return;
        }
        if prev.is_valid() {
            self.nodes[prev.0 as usize].next_sibling = next;
        } else {
            self.nodes[parent.0 as usize].first_child = next;
        }
        if next.is_valid() {
            self.nodes[next.0 as usize].prev_sibling = prev;
        } else {
            self.nodes[parent.0 as usize].last_child = prev;
        }
        let node = &mut self.nodes[child.0 as usize];
        node.parent = NodeId::NONE;
        node.prev_sibling = NodeId::NONE;
        node.next_sibling = NodeId::NONE;
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.insert_before(parent, child, NodeId::NONE)
    }

    /// Insert `child` before `reference` (NONE appends). Fragments insert
    /// their children and are left empty.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) -> DomResult<()> {
        let parent_node = self.get(parent)?;
        let child_node = self.get(child)?;
        let can_parent = matches!(
            parent_node.data,
            NodeData::Document | NodeData::Element(_) | NodeData::Fragment | NodeData::ShadowRoot(_)
        );
        let can_child = !matches!(child_node.data, NodeData::Document | NodeData::ShadowRoot(_));
        if !can_parent || !can_child || self.tree_path(parent).contains(&child) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        if reference.is_valid() && self.parent(reference) != Some(parent) {
            return Err(DomError::NotFound(reference));
        }

        let nodes = if matches!(child_node.data, NodeData::Fragment) {
            let moved = self.children(child);
            for &n in &moved {
                self.unlink(n);
            }
            if !moved.is_empty() {
                self.queue_record(MutationRecord::child_list(child, Vec::new(), moved.clone()));
            }
            moved
        } else {
            vec![child]
        };

        let mut reference = reference;
        for &n in &nodes {
            if n == reference {
                reference = self.nodes[n.0 as usize].next_sibling;
            }
            if self.parent(n).is_some() {
                self.remove(n)?;
            }
        }
        for &n in &nodes {
            self.link(parent, n, reference);
        }
        if nodes.is_empty() {
            return Ok(());
        }

        self.queue_record(MutationRecord::child_list(parent, nodes.clone(), Vec::new()));
        if self.is_connected(parent) {
            for &n in &nodes {
                self.enqueue_for_defined(n, Reaction::Connected);
            }
        }
        Ok(())
    }

    /// Detach a node from its parent (no-op when already detached)
    pub fn remove(&mut self, child: NodeId) -> DomResult<()> {
        let parent = self.get(child)?.parent;
        if !parent.is_valid() {
            return Ok(());
        }
        let was_connected = self.is_connected(child);
        self.unlink(child);
        self.queue_record(MutationRecord::child_list(parent, Vec::new(), vec![child]));
        if was_connected {
            self.enqueue_for_defined(child, Reaction::Disconnected);
        }
        Ok(())
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        if self.parent(child) != Some(parent) {
            return Err(DomError::NotFound(child));
        }
        self.remove(child)
    }

    /// Remove every child, returning them
    pub fn clear_children(&mut self, parent: NodeId) -> DomResult<Vec<NodeId>> {
        self.get(parent)?;
        let removed = self.children(parent);
        if removed.is_empty() {
            return Ok(removed);
        }
        let was_connected = self.is_connected(parent);
        for &child in &removed {
            self.unlink(child);
        }
        self.queue_record(MutationRecord::child_list(parent, Vec::new(), removed.clone()));
        if was_connected {
            for &child in &removed {
                self.enqueue_for_defined(child, Reaction::Disconnected);
            }
        }
        Ok(removed)
    }

    // ---- Templates and shadow roots ----

    /// Contents fragment of a `<template>`
    pub fn template_content(&self, id: NodeId) -> Option<NodeId> {
        self.element(id).map(|e| e.template_content).filter(|c| c.is_valid())
    }

    pub fn attach_shadow(&mut self, host: NodeId, mode: ShadowRootMode) -> DomResult<NodeId> {
        self.attach_shadow_inner(host, mode, false)
    }

    /// Attach a pre-rendered (declarative) shadow root
    pub fn attach_declarative_shadow(&mut self, host: NodeId, mode: ShadowRootMode) -> DomResult<NodeId> {
        self.attach_shadow_inner(host, mode, true)
    }

    fn attach_shadow_inner(&mut self, host: NodeId, mode: ShadowRootMode, declarative: bool) -> DomResult<NodeId> {
        let elem = self.get(host)?.as_element().ok_or(DomError::NotAnElement(host))?;
        if elem.shadow_root.is_valid() {
            return Err(ShadowError::AlreadyAttached.into());
        }
        if !is_valid_name(&elem.name) && !SHADOW_HOSTS.contains(&elem.name.as_str()) {
            return Err(ShadowError::NotSupported.into());
        }

        let mut data = ShadowRootData::new(host, mode);
        data.declarative = declarative;
        let root = self.create_node(NodeData::ShadowRoot(data));
        self.element_mut(host)?.shadow_root = root;
        Ok(root)
    }

    pub fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        self.element(host).map(|e| e.shadow_root).filter(|r| r.is_valid())
    }

    pub fn shadow_root_data(&self, root: NodeId) -> Option<&ShadowRootData> {
        self.node(root)?.as_shadow_root()
    }

    pub fn shadow_host(&self, root: NodeId) -> Option<NodeId> {
        self.shadow_root_data(root).map(|s| s.host)
    }

    /// Add a sheet to the root's adopted list. Returns false if that same
    /// sheet object was already adopted.
    pub fn adopt_style_sheet(&mut self, root: NodeId, sheet: Rc<StyleSheet>) -> DomResult<bool> {
        match self.node_mut(root).map(|n| &mut n.data) {
            Some(NodeData::ShadowRoot(shadow)) => Ok(shadow.adopt(sheet)),
            Some(_) => Err(DomError::NotAShadowRoot(root)),
            None => Err(DomError::InvalidNode(root)),
        }
    }

    pub fn adopted_style_sheets(&self, root: NodeId) -> &[Rc<StyleSheet>] {
        self.shadow_root_data(root)
            .map(|s| s.adopted_style_sheets.as_slice())
            .unwrap_or(&[])
    }

    // ---- Custom elements ----

    pub fn is_valid_custom_element_name(name: &str) -> bool {
        is_valid_name(name)
    }

    /// Define a custom element name and queue upgrades for connected
    /// elements that carry it
    pub fn define_custom_element(&mut self, name: &str) -> DomResult<()> {
        self.custom_elements.define(name)?;

        let matches: Vec<NodeId> = self.shadow_including_inclusive(NodeId::ROOT)
            .into_iter()
            .filter(|&id| self.tag_name(id) == Some(name))
            .collect();
        tracing::debug!(name, upgrades = matches.len(), "Custom element defined");
        for id in matches {
            self.reactions.enqueue(Reaction::Upgrade(id));
        }
        Ok(())
    }

    pub fn is_custom_element_defined(&self, name: &str) -> bool {
        self.custom_elements.is_defined(name)
    }

    /// Forget every definition (used when resetting a loader)
    pub fn clear_custom_elements(&mut self) {
        self.custom_elements.clear();
    }

    /// Queue adoption callbacks for defined elements in the subtree. The
    /// node keeps its position.
    pub fn adopt_node(&mut self, id: NodeId) -> DomResult<()> {
        self.get(id)?;
        self.enqueue_for_defined(id, Reaction::Adopted);
        Ok(())
    }

    pub fn take_reactions(&mut self) -> Vec<Reaction> {
        self.reactions.drain()
    }

    pub fn has_pending_reactions(&self) -> bool {
        !self.reactions.is_empty()
    }

    fn enqueue_for_defined(&mut self, id: NodeId, reaction: fn(NodeId) -> Reaction) {
        for n in self.shadow_including_inclusive(id) {
            let defined = self.tag_name(n)
                .map(|name| self.custom_elements.is_defined(name))
                .unwrap_or(false);
            if defined {
                self.reactions.enqueue(reaction(n));
            }
        }
    }

    // ---- Mutation observers ----

    pub fn observe(&mut self, target: NodeId, options: MutationObserverInit) -> ObserverId {
        self.observers.observe(target, options)
    }

    pub fn disconnect_observer(&mut self, id: ObserverId) -> bool {
        self.observers.disconnect(id)
    }

    pub fn take_records(&mut self, id: ObserverId) -> Vec<MutationRecord> {
        self.observers.take_records(id)
    }

    /// Observers with queued records, in registration order
    pub fn pending_observers(&self) -> Vec<ObserverId> {
        self.observers.pending()
    }

    fn queue_record(&mut self, record: MutationRecord) {
        if self.observers.is_empty() {
            return;
        }
        let path = self.tree_path(record.target);
        self.observers.queue(record, &path);
    }

    // ---- Event listeners ----

    pub fn add_event_listener(&mut self, target: NodeId, event_type: &str, listener: Rc<dyn Fn(&Event)>) -> ListenerId {
        self.listeners.add(target, event_type, listener)
    }

    pub fn remove_event_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    // ---- Snapshots ----

    /// Owned deep copy of a subtree. Documents and shadow roots snapshot as
    /// fragments of their children.
    pub fn snapshot(&self, id: NodeId) -> Option<NodeSnapshot> {
        let node = self.node(id)?;
        let children: Vec<NodeSnapshot> = self.children(id)
            .into_iter()
            .filter_map(|c| self.snapshot(c))
            .collect();

        let snapshot = match NodeSnapshot::from_data(&node.data) {
            Some(NodeSnapshot::Element { name, attrs, .. }) => {
                let elem = node.as_element()?;
                let template_content = self.template_content(id).map(|content| {
                    self.children(content).into_iter().filter_map(|c| self.snapshot(c)).collect()
                });
                let shadow = self.shadow_root_data(elem.shadow_root).map(|data| {
                    let kids = self.children(elem.shadow_root)
                        .into_iter()
                        .filter_map(|c| self.snapshot(c))
                        .collect();
                    (data.mode, kids)
                });
                NodeSnapshot::Element { name, attrs, children, template_content, shadow }
            }
            Some(NodeSnapshot::Fragment(_)) | None => NodeSnapshot::Fragment(children),
            Some(leaf) => leaf,
        };
        Some(snapshot)
    }

    /// Materialize a snapshot as a detached subtree
    pub fn instantiate(&mut self, snapshot: &NodeSnapshot) -> NodeId {
        match snapshot {
            NodeSnapshot::Element { name, attrs, children, template_content, shadow } => {
                let id = self.create_element(name);
                if let Some(elem) = self.node_mut(id).and_then(Node::as_element_mut) {
                    elem.attrs = attrs.clone();
                }
                self.instantiate_children(id, children);
                if let (Some(content), Some(fragment)) = (template_content, self.template_content(id)) {
                    self.instantiate_children(fragment, content);
                }
                if let Some((mode, kids)) = shadow {
                    match self.attach_declarative_shadow(id, *mode) {
                        Ok(root) => self.instantiate_children(root, kids),
                        Err(e) => tracing::warn!(element = %name, error = %e, "Dropping snapshot shadow root"),
                    }
                }
                id
            }
            NodeSnapshot::Text(text) => self.create_text(text),
            NodeSnapshot::Comment(text) => self.create_comment(text),
            NodeSnapshot::Doctype(name) => self.create_doctype(name),
            NodeSnapshot::Fragment(children) => {
                let id = self.create_fragment();
                self.instantiate_children(id, children);
                id
            }
        }
    }

    fn instantiate_children(&mut self, parent: NodeId, children: &[NodeSnapshot]) {
        for child in children {
            let id = self.instantiate(child);
            self.link(parent, id, NodeId::NONE);
        }
    }

    /// Deep clone as a detached subtree
    pub fn clone_node(&mut self, id: NodeId) -> Option<NodeId> {
        let snapshot = self.snapshot(id)?;
        Some(self.instantiate(&snapshot))
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new("about:blank")
    }
}
