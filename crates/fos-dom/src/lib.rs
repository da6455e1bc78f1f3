//! fOS DOM - Document Object Model
//!
//! Arena-backed DOM used by the component loader: elements, shadow roots,
//! custom element reactions, mutation observers and composed events.

mod node;
mod document;
mod snapshot;
mod shadow;
mod style;
mod custom_elements;
mod observer;
mod events;

use std::cell::RefCell;
use std::rc::Rc;

pub use node::{Node, NodeData, ElementData, Attribute};
pub use document::{Document, DomError, DomResult};
pub use snapshot::NodeSnapshot;
pub use shadow::{ShadowRootData, ShadowRootMode, ShadowError, StyleSheet};
pub use style::InlineStyle;
pub use custom_elements::{CustomElementError, ElementInternals, Reaction, ReactionQueue};
pub use observer::{MutationObserverInit, MutationRecord, MutationType, ObserverGuard, ObserverId};
pub use events::{dispatch_event, Event, ListenerId};

/// Shared handle to the live document.
///
/// Everything runs on one event-loop thread, so the document sits behind
/// `Rc<RefCell<_>>`. Callers must not hold a borrow across script, hook or
/// listener invocation.
pub type DocumentHandle = Rc<RefCell<Document>>;

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root (document) node ID
    pub const ROOT: NodeId = NodeId(0);
    /// Sentinel for "no node"
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Check if this ID refers to a node
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    /// Raw arena index
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
