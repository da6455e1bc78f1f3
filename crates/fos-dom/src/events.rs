//! DOM Events
//!
//! Custom events with JSON detail, dispatched along the composed path.

use std::rc::Rc;

use serde_json::Value;

use crate::{DocumentHandle, NodeData, NodeId};

/// Listener identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u32);

pub(crate) type Listener = Rc<dyn Fn(&Event)>;

/// Custom event
#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: String,
    pub target: NodeId,
    pub current_target: NodeId,
    pub detail: Value,
    pub bubbles: bool,
    /// Crosses shadow boundaries into the host's tree
    pub composed: bool,
}

impl Event {
    /// Bubbling, composed event
    pub fn new(event_type: &str, detail: Value) -> Self {
        Self {
            event_type: event_type.to_string(),
            target: NodeId::NONE,
            current_target: NodeId::NONE,
            detail,
            bubbles: true,
            composed: true,
        }
    }

    /// Event that only reaches its target
    pub fn non_bubbling(event_type: &str, detail: Value) -> Self {
        Self {
            bubbles: false,
            composed: false,
            ..Self::new(event_type, detail)
        }
    }
}

struct ListenerEntry {
    target: NodeId,
    event_type: String,
    callback: Listener,
}

/// Listeners of one document, in registration order
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    listeners: Vec<Option<ListenerEntry>>,
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("count", &self.listeners.iter().flatten().count())
            .finish()
    }
}

impl ListenerRegistry {
    pub(crate) fn add(&mut self, target: NodeId, event_type: &str, callback: Listener) -> ListenerId {
        let id = ListenerId(self.listeners.len() as u32);
        self.listeners.push(Some(ListenerEntry {
            target,
            event_type: event_type.to_string(),
            callback,
        }));
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        match self.listeners.get_mut(id.0 as usize) {
            Some(slot) => slot.take().is_some(),
            None => false,
        }
    }

    fn for_node(&self, node: NodeId, event_type: &str) -> Vec<Listener> {
        self.listeners.iter()
            .flatten()
            .filter(|l| l.target == node && l.event_type == event_type)
            .map(|l| l.callback.clone())
            .collect()
    }
}

/// Dispatch `event` at `target`.
///
/// Listeners are collected before any of them runs, so they are free to
/// borrow and mutate the document. Returns the number of listeners invoked.
pub fn dispatch_event(document: &DocumentHandle, target: NodeId, mut event: Event) -> usize {
    event.target = target;

    let plan: Vec<(NodeId, Vec<Listener>)> = {
        let doc = document.borrow();
        event_path(&doc, target, event.bubbles, event.composed)
            .into_iter()
            .map(|node| (node, doc.listeners.for_node(node, &event.event_type)))
            .filter(|(_, listeners)| !listeners.is_empty())
            .collect()
    };

    tracing::trace!(event = %event.event_type, %target, "Dispatching event");

    let mut invoked = 0;
    for (node, listeners) in plan {
        event.current_target = node;
        for listener in listeners {
            listener(&event);
            invoked += 1;
        }
    }
    invoked
}

fn event_path(doc: &crate::Document, target: NodeId, bubbles: bool, composed: bool) -> Vec<NodeId> {
    let mut path = vec![target];
    if !bubbles {
        return path;
    }

    let mut current = target;
    loop {
        let Some(node) = doc.node(current) else { break };
        let next = match &node.data {
            NodeData::ShadowRoot(shadow) if composed => shadow.host,
            NodeData::ShadowRoot(_) => NodeId::NONE,
            _ => node.parent,
        };
        if !next.is_valid() {
            break;
        }
        path.push(next);
        current = next;
    }
    path
}
