//! Execution context
//!
//! Everything a behaviour unit can reach is passed in explicitly: the
//! instance descriptor, lifecycle hooks, the reactivity runtime and form
//! internals. Nothing is read from globals.

use std::cell::RefCell;
use std::rc::Rc;

use fos_dom::{ElementInternals, NodeId};
use serde_json::Value;

use crate::{Reactivity, ScriptError};

/// Teardown callback registered by a unit
pub type Cleanup = Box<dyn FnOnce() -> Result<(), ScriptError>>;

/// Identity of one component instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceInfo {
    /// Process-wide, monotonic
    pub id: u64,
    pub tag: String,
    pub source: String,
    pub host: NodeId,
    /// Shadow root in isolated mode, otherwise the host
    pub root: NodeId,
}

impl InstanceInfo {
    /// Id unique to this instance, e.g. `x-card-3-title`
    pub fn scoped_id(&self, base: &str) -> String {
        format!("{}-{}-{}", self.tag, self.id, base)
    }
}

/// Instance operations implemented by the loader
pub trait InstanceHooks {
    /// Dispatch a bubbling, composed event from the root
    fn emit(&self, name: &str, detail: Value);

    /// Queue a callback for teardown
    fn register_cleanup(&self, cleanup: Cleanup);

    /// Set a custom property on the host's inline style
    fn set_css_variable(&self, name: &str, value: &str);

    /// Read a custom property from the host's inline style
    fn css_variable(&self, name: &str) -> Option<String>;
}

/// Context passed to every unit of one instance
#[derive(Clone)]
pub struct ScriptContext {
    pub instance: InstanceInfo,
    pub hooks: Rc<dyn InstanceHooks>,
    pub reactivity: Option<Rc<dyn Reactivity>>,
    /// Present for form-associated components
    pub internals: Option<Rc<RefCell<ElementInternals>>>,
}

impl std::fmt::Debug for ScriptContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptContext")
            .field("instance", &self.instance)
            .field("reactivity", &self.reactivity.is_some())
            .field("internals", &self.internals.is_some())
            .finish()
    }
}

impl ScriptContext {
    pub fn emit(&self, name: &str, detail: Value) {
        self.hooks.emit(name, detail);
    }

    pub fn register_cleanup(&self, cleanup: impl FnOnce() -> Result<(), ScriptError> + 'static) {
        self.hooks.register_cleanup(Box::new(cleanup));
    }

    pub fn set_css_variable(&self, name: &str, value: &str) {
        self.hooks.set_css_variable(name, value);
    }

    pub fn css_variable(&self, name: &str) -> Option<String> {
        self.hooks.css_variable(name)
    }

    pub fn scoped_id(&self, base: &str) -> String {
        self.instance.scoped_id(base)
    }

    /// Set the form value, if this instance is form-associated
    pub fn set_form_value(&self, value: &str) -> bool {
        match &self.internals {
            Some(internals) => {
                internals.borrow_mut().set_form_value(value);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_id() {
        let info = InstanceInfo {
            id: 7,
            tag: "x-card".into(),
            source: "/c/card.html".into(),
            host: NodeId::ROOT,
            root: NodeId::ROOT,
        };
        assert_eq!(info.scoped_id("title"), "x-card-7-title");
    }
}
