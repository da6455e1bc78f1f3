//! Component instances
//!
//! One `ComponentInstance` per upgraded element. It owns the per-instance
//! state the behaviour units see through `ScriptContext`: lifecycle state,
//! registered cleanups, form internals and the props bridge.
//!
//! Teardown bumps the generation. Asynchronous work captures the
//! generation it started under and drops its result when `is_live` no
//! longer holds.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use fos_dom::{Document, ElementInternals, NodeId, ObserverId};
use fos_js::{Cleanup, InstanceHooks, InstanceInfo, Reactivity, ScriptContext};
use serde_json::Value;

use crate::events;
use crate::props::PropsBridge;
use crate::ComponentDefinition;

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

fn next_instance_id() -> u64 {
    NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Instance lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    Constructed,
    RootAttached,
    /// Template content was cloned into the root
    Populated,
    /// Existing root content was kept
    Hydrated,
    StylesApplied,
    ScriptsExecuted,
    ReactivityActive,
    Ready,
    Disconnected,
}

/// A live component element
pub struct ComponentInstance {
    info: InstanceInfo,
    definition: Rc<ComponentDefinition>,
    document: Weak<RefCell<Document>>,
    state: Cell<InstanceState>,
    content_attached: Cell<bool>,
    hydrated: Cell<bool>,
    generation: Cell<u64>,
    cleanups: RefCell<Vec<Cleanup>>,
    props: RefCell<Option<PropsBridge>>,
    internals: Option<Rc<RefCell<ElementInternals>>>,
    value_attribute: String,
}

impl std::fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("info", &self.info)
            .field("state", &self.state.get())
            .field("generation", &self.generation.get())
            .field("cleanups", &self.cleanups.borrow().len())
            .finish()
    }
}

impl ComponentInstance {
    pub(crate) fn new(
        document: Weak<RefCell<Document>>,
        tag: &str,
        host: NodeId,
        root: NodeId,
        definition: Rc<ComponentDefinition>,
        value_attribute: &str,
    ) -> Self {
        let info = InstanceInfo {
            id: next_instance_id(),
            tag: tag.to_string(),
            source: definition.source.clone(),
            host,
            root,
        };
        let internals = definition
            .form_associated
            .then(|| Rc::new(RefCell::new(ElementInternals::new(host))));
        let state = if root == host { InstanceState::Constructed } else { InstanceState::RootAttached };

        Self {
            info,
            definition,
            document,
            state: Cell::new(state),
            content_attached: Cell::new(false),
            hydrated: Cell::new(false),
            generation: Cell::new(0),
            cleanups: RefCell::new(Vec::new()),
            props: RefCell::new(None),
            internals,
            value_attribute: value_attribute.to_string(),
        }
    }

    pub fn id(&self) -> u64 {
        self.info.id
    }

    pub fn tag(&self) -> &str {
        &self.info.tag
    }

    pub fn source(&self) -> &str {
        &self.info.source
    }

    pub fn host(&self) -> NodeId {
        self.info.host
    }

    /// Shadow root when isolated, otherwise the host
    pub fn root(&self) -> NodeId {
        self.info.root
    }

    pub fn info(&self) -> &InstanceInfo {
        &self.info
    }

    pub fn definition(&self) -> &Rc<ComponentDefinition> {
        &self.definition
    }

    pub fn state(&self) -> InstanceState {
        self.state.get()
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated.get()
    }

    pub fn content_attached(&self) -> bool {
        self.content_attached.get()
    }

    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    /// True while no teardown happened since `generation` was read
    pub fn is_live(&self, generation: u64) -> bool {
        self.generation.get() == generation && self.state.get() != InstanceState::Disconnected
    }

    pub fn scoped_id(&self, base: &str) -> String {
        self.info.scoped_id(base)
    }

    pub fn is_form_associated(&self) -> bool {
        self.internals.is_some()
    }

    pub fn internals(&self) -> Option<&Rc<RefCell<ElementInternals>>> {
        self.internals.as_ref()
    }

    pub fn cleanup_count(&self) -> usize {
        self.cleanups.borrow().len()
    }

    /// Keys currently held by the `$props` aggregate
    pub fn prop_keys(&self) -> Vec<String> {
        self.props.borrow().as_ref().map(PropsBridge::keys).unwrap_or_default()
    }

    /// Current form value: the submitted value once set, else the value attribute
    pub fn value(&self) -> String {
        if let Some(value) = self.internals.as_ref().and_then(|i| i.borrow().form_value().map(str::to_string)) {
            if !value.is_empty() {
                return value;
            }
        }
        let Some(document) = self.document.upgrade() else {
            return String::new();
        };
        let doc = document.borrow();
        doc.get_attribute(self.info.host, &self.value_attribute)
            .unwrap_or("")
            .to_string()
    }

    /// Set the submitted form value. No-op for instances without internals.
    pub fn set_value(&self, value: &str) {
        match &self.internals {
            Some(internals) => internals.borrow_mut().set_form_value(value),
            None => tracing::debug!(tag = %self.info.tag, "Ignoring value on a non-form component"),
        }
    }

    /// Dispatch a bubbling, composed event from the root
    pub fn emit(&self, name: &str, detail: Value) {
        if name.is_empty() {
            tracing::error!(tag = %self.info.tag, "Event name is required to emit");
            return;
        }
        let Some(document) = self.document.upgrade() else {
            return;
        };
        events::emit(&document, self.info.root, name, detail);
    }

    pub fn set_css_variable(&self, name: &str, value: &str) {
        let Some(document) = self.document.upgrade() else {
            return;
        };
        if let Err(e) = document.borrow_mut().set_style_property(self.info.host, name, value) {
            tracing::warn!(tag = %self.info.tag, "Cannot set {}: {}", name, e);
        }
    }

    pub fn css_variable(&self, name: &str) -> Option<String> {
        let document = self.document.upgrade()?;
        let doc = document.borrow();
        doc.style_property(self.info.host, name)
    }

    /// Queue a teardown callback. After disconnection it runs immediately.
    pub fn register_cleanup(&self, cleanup: Cleanup) {
        if self.state.get() == InstanceState::Disconnected {
            tracing::warn!(tag = %self.info.tag, "Cleanup registered after disconnect, running now");
            if let Err(e) = cleanup() {
                tracing::error!(tag = %self.info.tag, "Error in cleanup function: {}", e);
            }
            return;
        }
        self.cleanups.borrow_mut().push(cleanup);
    }

    /// Context handed to every behaviour unit of this instance
    pub(crate) fn script_context(self: &Rc<Self>, reactivity: Option<Rc<dyn Reactivity>>) -> ScriptContext {
        ScriptContext {
            instance: self.info.clone(),
            hooks: Rc::new(InstanceHandle(Rc::downgrade(self))),
            reactivity,
            internals: self.internals.clone(),
        }
    }

    pub(crate) fn set_state(&self, state: InstanceState) {
        if self.state.get() != InstanceState::Disconnected {
            self.state.set(state);
        }
    }

    /// Claim first connection. False when content is already attached or
    /// the instance was torn down.
    pub(crate) fn begin_attach(&self) -> bool {
        if self.content_attached.get() || self.state.get() == InstanceState::Disconnected {
            return false;
        }
        self.content_attached.set(true);
        true
    }

    pub(crate) fn mark_hydrated(&self) {
        self.hydrated.set(true);
    }

    pub(crate) fn props(&self) -> std::cell::Ref<'_, Option<PropsBridge>> {
        self.props.borrow()
    }

    /// Swap in a new props bridge, returning the old one
    pub(crate) fn replace_props(&self, bridge: Option<PropsBridge>) -> Option<PropsBridge> {
        std::mem::replace(&mut *self.props.borrow_mut(), bridge)
    }

    pub(crate) fn props_observer(&self) -> Option<ObserverId> {
        self.props.borrow().as_ref().map(PropsBridge::observer)
    }

    /// Tear down: run cleanups in registration order, each isolated from
    /// the others, then drop the props bridge. Returns false when already
    /// torn down.
    pub(crate) fn disconnect(&self) -> bool {
        if self.state.get() == InstanceState::Disconnected {
            return false;
        }
        self.state.set(InstanceState::Disconnected);
        self.generation.set(self.generation.get() + 1);

        let cleanups = std::mem::take(&mut *self.cleanups.borrow_mut());
        let total = cleanups.len();
        for (index, cleanup) in cleanups.into_iter().enumerate() {
            if let Err(e) = cleanup() {
                tracing::error!(tag = %self.info.tag, index, "Error in cleanup function: {}", e);
            }
        }
        let bridge = self.props.borrow_mut().take();
        drop(bridge);

        tracing::debug!(tag = %self.info.tag, id = self.info.id, cleanups = total, "Instance torn down");
        true
    }
}

/// `InstanceHooks` seen by scripts. Weak so a context kept alive by a
/// script engine does not keep its instance alive.
struct InstanceHandle(Weak<ComponentInstance>);

impl InstanceHooks for InstanceHandle {
    fn emit(&self, name: &str, detail: Value) {
        if let Some(instance) = self.0.upgrade() {
            instance.emit(name, detail);
        }
    }

    fn register_cleanup(&self, cleanup: Cleanup) {
        match self.0.upgrade() {
            Some(instance) => instance.register_cleanup(cleanup),
            None => {
                if let Err(e) = cleanup() {
                    tracing::error!("Error in cleanup function: {}", e);
                }
            }
        }
    }

    fn set_css_variable(&self, name: &str, value: &str) {
        if let Some(instance) = self.0.upgrade() {
            instance.set_css_variable(name, value);
        }
    }

    fn css_variable(&self, name: &str) -> Option<String> {
        self.0.upgrade()?.css_variable(name)
    }
}
