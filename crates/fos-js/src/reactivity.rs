//! Reactivity contract
//!
//! The loader needs a small capability set from the reactive runtime:
//! initialize and scan a subtree, evaluate expressions against a scope,
//! look up an element's scope, make signals and register actions.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use fos_dom::NodeId;
use serde_json::Value;

use crate::Action;

/// Scope name of the aggregate props signal, read as `$props`
pub const PROPS_SIGNAL: &str = "props";

/// Expression evaluation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    #[error("Cannot parse expression: {0}")]
    Syntax(String),
    #[error("Unbound name: {0}")]
    Unbound(String),
    #[error("Not a value: {0}")]
    NotAValue(String),
}

/// Reactive runtime capabilities used by the loader
pub trait Reactivity {
    /// Initialize reactive behaviour on a subtree
    fn init(&self, root: NodeId);

    /// Re-scan a subtree for reactive attributes
    fn scan(&self, root: NodeId);

    /// Evaluate an expression, optionally against a scope
    fn evaluate(&self, expression: &str, scope: Option<&Scope>) -> Result<Value, EvalError>;

    /// The element's reactive scope, created on first use
    fn scope(&self, element: NodeId) -> Scope;

    fn signal(&self, value: Value) -> Signal;

    /// Bind actions into the element's scope
    fn register_actions(&self, actions: &[(String, Action)], element: NodeId);

    /// Forget the element's scope once its component is torn down
    fn release(&self, _element: NodeId) {}
}

/// Shared mutable value
#[derive(Debug, Clone, Default)]
pub struct Signal(Rc<RefCell<Value>>);

impl Signal {
    pub fn new(value: Value) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    pub fn get(&self) -> Value {
        self.0.borrow().clone()
    }

    pub fn set(&self, value: Value) {
        *self.0.borrow_mut() = value;
    }

    pub fn ptr_eq(&self, other: &Signal) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// A name bound in a scope
#[derive(Clone)]
pub enum Binding {
    Signal(Signal),
    Plain(Value),
    Action(Action),
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Signal(s) => f.debug_tuple("Signal").field(&s.get()).finish(),
            Self::Plain(v) => f.debug_tuple("Plain").field(v).finish(),
            Self::Action(_) => f.write_str("Action"),
        }
    }
}

impl Binding {
    /// Current value; actions have none
    pub fn value(&self) -> Option<Value> {
        match self {
            Self::Signal(s) => Some(s.get()),
            Self::Plain(v) => Some(v.clone()),
            Self::Action(_) => None,
        }
    }
}

struct ScopeInner {
    bindings: RefCell<BTreeMap<String, Binding>>,
    parent: Option<Scope>,
}

/// Name table with lexical parent lookup. Clones share bindings.
#[derive(Clone)]
pub struct Scope(Rc<ScopeInner>);

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("bindings", &*self.0.bindings.borrow())
            .field("has_parent", &self.0.parent.is_some())
            .finish()
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Scope {
    pub fn new(parent: Option<Scope>) -> Self {
        Self(Rc::new(ScopeInner {
            bindings: RefCell::new(BTreeMap::new()),
            parent,
        }))
    }

    /// Look up a name here, then in parents
    pub fn get(&self, name: &str) -> Option<Binding> {
        if let Some(binding) = self.0.bindings.borrow().get(name) {
            return Some(binding.clone());
        }
        self.0.parent.as_ref()?.get(name)
    }

    pub fn get_local(&self, name: &str) -> Option<Binding> {
        self.0.bindings.borrow().get(name).cloned()
    }

    pub fn contains_local(&self, name: &str) -> bool {
        self.0.bindings.borrow().contains_key(name)
    }

    pub fn insert(&self, name: &str, binding: Binding) -> Option<Binding> {
        self.0.bindings.borrow_mut().insert(name.to_string(), binding)
    }

    pub fn remove(&self, name: &str) -> Option<Binding> {
        self.0.bindings.borrow_mut().remove(name)
    }

    /// Local names, sorted
    pub fn keys(&self) -> Vec<String> {
        self.0.bindings.borrow().keys().cloned().collect()
    }

    pub fn signal(&self, name: &str) -> Option<Signal> {
        match self.get(name)? {
            Binding::Signal(s) => Some(s),
            _ => None,
        }
    }

    pub fn action(&self, name: &str) -> Option<Action> {
        match self.get(name)? {
            Binding::Action(a) => Some(a),
            _ => None,
        }
    }

    pub fn parent(&self) -> Option<&Scope> {
        self.0.parent.as_ref()
    }

    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// JavaScript truthiness of a JSON value
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
