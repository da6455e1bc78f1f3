//! Default reactivity runtime
//!
//! Scopes hang off elements and link to the nearest ancestor scope that
//! existed when they were created (shadow roots link through their host).
//! Expressions are deliberately small: JSON literals, single-quoted
//! strings, `$name.path` references and `!` negation.
//!
//! Scanning seeds `data-signals-<name>` (kebab-case becomes camelCase) and
//! `data-signals='{...}'` attributes as signals in the element's scope.
//! Existing signals are left alone so re-scans never reset state.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Weak;

use fos_dom::{Document, DocumentHandle, NodeData, NodeId};
use serde_json::Value;

use crate::reactivity::{is_truthy, Binding, EvalError, Reactivity, Scope, Signal};
use crate::Action;

const SIGNALS_ATTR: &str = "data-signals";

/// Signal-based reactivity runtime
#[derive(Debug)]
pub struct SignalRuntime {
    document: Weak<RefCell<Document>>,
    scopes: RefCell<HashMap<NodeId, Scope>>,
    scans: Cell<usize>,
    inits: RefCell<Vec<NodeId>>,
}

impl SignalRuntime {
    pub fn new(document: &DocumentHandle) -> Self {
        Self {
            document: std::rc::Rc::downgrade(document),
            scopes: RefCell::new(HashMap::new()),
            scans: Cell::new(0),
            inits: RefCell::new(Vec::new()),
        }
    }

    /// Total `scan` calls
    pub fn scan_count(&self) -> usize {
        self.scans.get()
    }

    /// How many times `init` ran on `root`
    pub fn init_count(&self, root: NodeId) -> usize {
        self.inits.borrow().iter().filter(|&&r| r == root).count()
    }

    pub fn has_scope(&self, element: NodeId) -> bool {
        self.scopes.borrow().contains_key(&element)
    }

    fn nearest_ancestor_scope(&self, element: NodeId) -> Option<Scope> {
        let document = self.document.upgrade()?;
        let doc = document.try_borrow().ok()?;
        let scopes = self.scopes.borrow();

        let mut current = element;
        loop {
            let node = doc.node(current)?;
            current = match &node.data {
                NodeData::ShadowRoot(shadow) => shadow.host,
                _ => node.parent,
            };
            if let Some(scope) = scopes.get(&current) {
                return Some(scope.clone());
            }
        }
    }

    fn seed(&self, element: NodeId, attrs: Vec<(String, String)>) {
        let scope = self.scope(element);
        for (name, value) in attrs {
            if name == SIGNALS_ATTR {
                match serde_json::from_str::<Value>(&value) {
                    Ok(Value::Object(map)) => {
                        for (key, v) in map {
                            self.seed_signal(&scope, &key, v);
                        }
                    }
                    _ => tracing::warn!(%element, "Ignoring malformed {} object", SIGNALS_ATTR),
                }
                continue;
            }
            let Some(key) = name.strip_prefix("data-signals-") else {
                continue;
            };
            let initial = self.evaluate(&value, Some(&scope)).unwrap_or_else(|e| {
                tracing::debug!(%element, signal = key, error = %e, "Seeding raw string");
                Value::String(value.clone())
            });
            self.seed_signal(&scope, &camel_case(key), initial);
        }
    }

    fn seed_signal(&self, scope: &Scope, name: &str, value: Value) {
        if matches!(scope.get_local(name), Some(Binding::Signal(_))) {
            return;
        }
        scope.insert(name, Binding::Signal(Signal::new(value)));
    }
}

impl Reactivity for SignalRuntime {
    fn init(&self, root: NodeId) {
        tracing::debug!(%root, "Initializing reactivity");
        self.inits.borrow_mut().push(root);
        self.scan(root);
    }

    fn scan(&self, root: NodeId) {
        self.scans.set(self.scans.get() + 1);

        let targets: Vec<(NodeId, Vec<(String, String)>)> = {
            let Some(document) = self.document.upgrade() else {
                return;
            };
            let Ok(doc) = document.try_borrow() else {
                tracing::warn!(%root, "Document busy, scan skipped");
                return;
            };
            std::iter::once(root)
                .chain(doc.descendant_elements(root))
                .filter_map(|id| {
                    let attrs: Vec<_> = doc.attributes(id)
                        .iter()
                        .filter(|a| a.name.starts_with(SIGNALS_ATTR))
                        .map(|a| (a.name.clone(), a.value.clone()))
                        .collect();
                    (!attrs.is_empty()).then_some((id, attrs))
                })
                .collect()
        };

        tracing::trace!(%root, seeded = targets.len(), "Scanned subtree");
        for (element, attrs) in targets {
            self.seed(element, attrs);
        }
    }

    fn evaluate(&self, expression: &str, scope: Option<&Scope>) -> Result<Value, EvalError> {
        evaluate(expression, scope)
    }

    fn scope(&self, element: NodeId) -> Scope {
        if let Some(scope) = self.scopes.borrow().get(&element) {
            return scope.clone();
        }
        let scope = Scope::new(self.nearest_ancestor_scope(element));
        self.scopes.borrow_mut().insert(element, scope.clone());
        scope
    }

    fn signal(&self, value: Value) -> Signal {
        Signal::new(value)
    }

    fn register_actions(&self, actions: &[(String, Action)], element: NodeId) {
        let scope = self.scope(element);
        for (name, action) in actions {
            scope.insert(name, Binding::Action(action.clone()));
        }
    }

    fn release(&self, element: NodeId) {
        if self.scopes.borrow_mut().remove(&element).is_some() {
            tracing::trace!(%element, "Scope released");
        }
    }
}

fn evaluate(expression: &str, scope: Option<&Scope>) -> Result<Value, EvalError> {
    let expr = expression.trim();
    if expr.is_empty() {
        return Err(EvalError::Syntax(expression.to_string()));
    }
    if let Some(rest) = expr.strip_prefix('!') {
        let value = evaluate(rest, scope)?;
        return Ok(Value::Bool(!is_truthy(&value)));
    }
    if let Some(path) = expr.strip_prefix('$') {
        return resolve(path, scope);
    }
    if expr.len() >= 2 && expr.starts_with('\'') && expr.ends_with('\'') {
        return Ok(Value::String(expr[1..expr.len() - 1].to_string()));
    }
    serde_json::from_str(expr).map_err(|_| EvalError::Syntax(expr.to_string()))
}

fn resolve(path: &str, scope: Option<&Scope>) -> Result<Value, EvalError> {
    let mut segments = path.split('.');
    let name = segments.next().unwrap_or_default();
    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return Err(EvalError::Syntax(format!("${}", path)));
    }

    let binding = scope
        .and_then(|s| s.get(name))
        .ok_or_else(|| EvalError::Unbound(name.to_string()))?;
    let mut value = binding.value().ok_or_else(|| EvalError::NotAValue(name.to_string()))?;

    for segment in segments {
        value = match value {
            Value::Object(mut map) => map.remove(segment).unwrap_or(Value::Null),
            Value::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|i| items.into_iter().nth(i))
                .unwrap_or(Value::Null),
            _ => Value::Null,
        };
    }
    Ok(value)
}

fn camel_case(kebab: &str) -> String {
    let mut out = String::with_capacity(kebab.len());
    let mut upper = false;
    for c in kebab.chars() {
        if c == '-' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use serde_json::json;

    use super::*;

    fn runtime() -> (DocumentHandle, SignalRuntime) {
        let doc = Rc::new(RefCell::new(Document::default()));
        let runtime = SignalRuntime::new(&doc);
        (doc, runtime)
    }

    #[test]
    fn test_literals() {
        assert_eq!(evaluate("42", None), Ok(json!(42)));
        assert_eq!(evaluate(" \"hi\" ", None), Ok(json!("hi")));
        assert_eq!(evaluate("'hi'", None), Ok(json!("hi")));
        assert_eq!(evaluate("{\"a\": [1, 2]}", None), Ok(json!({"a": [1, 2]})));
        assert_eq!(evaluate("!0", None), Ok(json!(true)));
        assert_eq!(evaluate("!!'x'", None), Ok(json!(true)));
        assert!(matches!(evaluate("Hello world", None), Err(EvalError::Syntax(_))));
    }

    #[test]
    fn test_references() {
        let scope = Scope::default();
        scope.insert("user", Binding::Signal(Signal::new(json!({"name": "Ada", "tags": ["x"]}))));

        assert_eq!(evaluate("$user.name", Some(&scope)), Ok(json!("Ada")));
        assert_eq!(evaluate("$user.tags.0", Some(&scope)), Ok(json!("x")));
        assert_eq!(evaluate("$user.missing", Some(&scope)), Ok(json!(null)));
        assert_eq!(evaluate("$nobody", Some(&scope)), Err(EvalError::Unbound("nobody".into())));
        assert_eq!(evaluate("!$user", Some(&scope)), Ok(json!(false)));
    }

    #[test]
    fn test_scan_seeds_signals() {
        let (doc, runtime) = runtime();
        let body = doc.borrow().body();
        {
            let mut d = doc.borrow_mut();
            d.set_attribute(body, "data-signals-show-panel", "true").unwrap();
            d.set_attribute(body, "data-signals-title", "Plain text").unwrap();
        }

        runtime.scan(body);
        let scope = runtime.scope(body);
        assert_eq!(scope.signal("showPanel").map(|s| s.get()), Some(json!(true)));
        assert_eq!(scope.signal("title").map(|s| s.get()), Some(json!("Plain text")));

        // Re-scan keeps current values
        scope.signal("showPanel").unwrap().set(json!(false));
        runtime.scan(body);
        assert_eq!(scope.signal("showPanel").map(|s| s.get()), Some(json!(false)));
        assert_eq!(runtime.scan_count(), 2);
    }

    #[test]
    fn test_child_scope_sees_ancestor_signals() {
        let (doc, runtime) = runtime();
        let (body, child) = {
            let mut d = doc.borrow_mut();
            let body = d.body();
            d.set_attribute(body, "data-signals", "{\"ready\": 1}").unwrap();
            let child = d.create_element("x-widget");
            d.append_child(body, child).unwrap();
            (body, child)
        };

        runtime.init(body);
        let scope = runtime.scope(child);
        assert_eq!(runtime.evaluate("$ready", Some(&scope)), Ok(json!(1)));
        assert_eq!(runtime.init_count(body), 1);
    }

    #[test]
    fn test_register_actions() {
        let (doc, runtime) = runtime();
        let body = doc.borrow().body();
        let action: Action = Rc::new(|_| Ok(json!("called")));

        runtime.register_actions(&[("contentReadyCallback".into(), action)], body);
        let found = runtime.scope(body).action("contentReadyCallback").unwrap();
        assert_eq!(found(&[]).unwrap(), json!("called"));
        assert_eq!(
            runtime.evaluate("$contentReadyCallback", Some(&runtime.scope(body))),
            Err(EvalError::NotAValue("contentReadyCallback".into()))
        );
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("show-panel"), "showPanel");
        assert_eq!(camel_case("x"), "x");
    }
}
