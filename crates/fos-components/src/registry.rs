//! Definition registry
//!
//! Tracks each tag through `Defining` and `Defined`. Concurrent requests
//! for a tag that is still defining join it as waiters, so one tag is only
//! ever fetched and parsed once at a time. A failed definition forgets the
//! tag so a later scan can retry it.

use std::collections::HashMap;
use std::rc::Rc;

use fos_dom::NodeId;

use crate::ComponentDefinition;

#[derive(Debug)]
pub(crate) enum TagState {
    Defining {
        source: String,
        waiters: Vec<NodeId>,
    },
    Defined(Rc<ComponentDefinition>),
}

/// Outcome of asking for a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Request {
    /// First request: the caller starts the definition
    Start,
    /// Already defining: the element was queued as a waiter
    Joined,
    Defined,
}

#[derive(Debug, Default)]
pub(crate) struct Registry {
    tags: HashMap<String, TagState>,
    /// Parsed definitions by source, shared by every tag using that source
    by_source: HashMap<String, Rc<ComponentDefinition>>,
}

impl Registry {
    pub fn request(&mut self, tag: &str, src: &str, element: NodeId) -> Request {
        match self.tags.get_mut(tag) {
            Some(TagState::Defined(_)) => Request::Defined,
            Some(TagState::Defining { source, waiters }) => {
                if source != src {
                    tracing::warn!(tag, defining = %source, requested = src, "Tag is already defining from another source");
                }
                if !waiters.contains(&element) {
                    waiters.push(element);
                }
                Request::Joined
            }
            None => {
                self.tags.insert(tag.to_string(), TagState::Defining {
                    source: src.to_string(),
                    waiters: vec![element],
                });
                Request::Start
            }
        }
    }

    /// Mark a tag defined, returning the elements that waited for it
    pub fn complete(&mut self, tag: &str, definition: Rc<ComponentDefinition>) -> Vec<NodeId> {
        self.by_source.insert(definition.source.clone(), definition.clone());
        match self.tags.insert(tag.to_string(), TagState::Defined(definition)) {
            Some(TagState::Defining { waiters, .. }) => waiters,
            _ => Vec::new(),
        }
    }

    /// Forget a tag after a failed definition, returning its waiters
    pub fn fail(&mut self, tag: &str) -> Vec<NodeId> {
        match self.tags.remove(tag) {
            Some(TagState::Defining { waiters, .. }) => waiters,
            Some(defined @ TagState::Defined(_)) => {
                self.tags.insert(tag.to_string(), defined);
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    pub fn definition(&self, tag: &str) -> Option<Rc<ComponentDefinition>> {
        match self.tags.get(tag) {
            Some(TagState::Defined(definition)) => Some(definition.clone()),
            _ => None,
        }
    }

    pub fn for_source(&self, src: &str) -> Option<Rc<ComponentDefinition>> {
        self.by_source.get(src).cloned()
    }

    pub fn is_defined(&self, tag: &str) -> bool {
        matches!(self.tags.get(tag), Some(TagState::Defined(_)))
    }

    pub fn is_defining(&self, tag: &str) -> bool {
        matches!(self.tags.get(tag), Some(TagState::Defining { .. }))
    }

    pub fn clear(&mut self) {
        self.tags.clear();
        self.by_source.clear();
    }
}
