//! Props bridge
//!
//! Mirrors the host's prefixed attributes into reactive state. Each
//! attribute value is evaluated as an expression against the host scope,
//! falling back to the raw string. Values land in one aggregate signal
//! bound as `props` and, for names the scope does not already bind, in a
//! convenience signal per key.
//!
//! The observer watches every host attribute and keeps the prefixed ones,
//! since attribute filters match exact names only.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use fos_dom::{DocumentHandle, MutationObserverInit, MutationRecord, MutationType, NodeId, ObserverGuard, ObserverId};
use fos_js::{Binding, Reactivity, Scope, Signal, PROPS_SIGNAL};
use serde_json::{Map, Value};

use crate::Config;

pub(crate) struct PropsBridge {
    guard: ObserverGuard,
    aggregate: Signal,
    /// Convenience bindings this bridge created, and may remove
    owned: RefCell<BTreeSet<String>>,
}

impl PropsBridge {
    /// Seed reactive state from the host's current attributes and start
    /// observing. Ownership carries over from `previous`.
    pub(crate) fn activate(
        document: &DocumentHandle,
        config: &Config,
        reactivity: &dyn Reactivity,
        host: NodeId,
        previous: Option<PropsBridge>,
    ) -> PropsBridge {
        let mut owned = previous.map(|p| p.owned.into_inner()).unwrap_or_default();

        let attributes: Vec<(String, String)> = {
            let doc = document.borrow();
            doc.attributes(host)
                .iter()
                .filter_map(|a| config.prop_key(&a.name).map(|key| (key.to_string(), a.value.clone())))
                .collect()
        };

        let scope = reactivity.scope(host);
        let mut values = Map::new();
        for (key, raw) in &attributes {
            values.insert(key.clone(), evaluate_prop(reactivity, &scope, key, raw));
        }

        let aggregate = match scope.get_local(PROPS_SIGNAL) {
            Some(Binding::Signal(signal)) => {
                signal.set(Value::Object(values.clone()));
                signal
            }
            _ => {
                let signal = reactivity.signal(Value::Object(values.clone()));
                scope.insert(PROPS_SIGNAL, Binding::Signal(signal.clone()));
                signal
            }
        };

        for (key, value) in &values {
            if owned.contains(key) {
                write_binding(&scope, key, value.clone());
            } else if !scope.contains_local(key) {
                scope.insert(key, Binding::Signal(reactivity.signal(value.clone())));
                owned.insert(key.clone());
            }
        }
        owned.retain(|key| {
            let present = values.contains_key(key);
            if !present {
                scope.remove(key);
            }
            present
        });

        let id = document.borrow_mut().observe(host, MutationObserverInit {
            attributes: true,
            ..Default::default()
        });
        tracing::debug!(%host, props = values.len(), "Props bridge active");

        PropsBridge {
            guard: ObserverGuard::new(Rc::downgrade(document), id),
            aggregate,
            owned: RefCell::new(owned),
        }
    }

    pub(crate) fn observer(&self) -> ObserverId {
        self.guard.id()
    }

    /// Keys of the aggregate, sorted
    pub(crate) fn keys(&self) -> Vec<String> {
        match self.aggregate.get() {
            Value::Object(map) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Apply attribute records for the host
    pub(crate) fn apply(
        &self,
        document: &DocumentHandle,
        config: &Config,
        reactivity: &dyn Reactivity,
        host: NodeId,
        records: &[MutationRecord],
    ) {
        let scope = reactivity.scope(host);
        for record in records {
            if record.mutation_type != MutationType::Attributes || record.target != host {
                continue;
            }
            let Some(name) = record.attribute_name.as_deref() else {
                continue;
            };
            let Some(key) = config.prop_key(name) else {
                continue;
            };
            let current = document.borrow().get_attribute(host, name).map(str::to_string);

            let mut values = match self.aggregate.get() {
                Value::Object(map) => map,
                _ => Map::new(),
            };
            match current {
                Some(raw) => {
                    let value = evaluate_prop(reactivity, &scope, key, &raw);
                    values.insert(key.to_string(), value.clone());
                    self.aggregate.set(Value::Object(values));
                    if scope.contains_local(key) {
                        write_binding(&scope, key, value);
                    } else {
                        scope.insert(key, Binding::Signal(reactivity.signal(value)));
                        self.owned.borrow_mut().insert(key.to_string());
                    }
                    tracing::trace!(%host, key, "Prop updated");
                }
                None => {
                    values.remove(key);
                    self.aggregate.set(Value::Object(values));
                    if self.owned.borrow_mut().remove(key) {
                        scope.remove(key);
                    }
                    tracing::trace!(%host, key, "Prop removed");
                }
            }
        }
    }
}

/// Update an existing binding in place. Actions are never overwritten.
fn write_binding(scope: &Scope, key: &str, value: Value) {
    match scope.get_local(key) {
        Some(Binding::Signal(signal)) => signal.set(value),
        Some(Binding::Plain(_)) => {
            scope.insert(key, Binding::Plain(value));
        }
        Some(Binding::Action(_)) => {
            tracing::debug!(key, "Prop shadows an action, leaving it bound");
        }
        None => {
            scope.insert(key, Binding::Plain(value));
        }
    }
}

fn evaluate_prop(reactivity: &dyn Reactivity, scope: &Scope, key: &str, raw: &str) -> Value {
    match reactivity.evaluate(raw, Some(scope)) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key, "Prop is not an expression, using raw string: {}", e);
            Value::String(raw.to_string())
        }
    }
}
