//! Native modules
//!
//! External behaviour units resolve to `ModuleExports`: an optional `init`
//! called with the instance context, and named actions handed to the
//! reactivity runtime.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};
use serde_json::Value;

use crate::{ScriptContext, ScriptError};

/// Module `init` export
pub type InitFn = Rc<dyn Fn(&ScriptContext) -> Result<(), ScriptError>>;

/// Named action callable from reactive expressions
pub type Action = Rc<dyn Fn(&[Value]) -> Result<Value, ScriptError>>;

/// What a module exposes
#[derive(Clone, Default)]
pub struct ModuleExports {
    pub init: Option<InitFn>,
    pub actions: Vec<(String, Action)>,
}

impl std::fmt::Debug for ModuleExports {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleExports")
            .field("init", &self.init.is_some())
            .field("actions", &self.actions.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>())
            .finish()
    }
}

impl ModuleExports {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_init(mut self, init: impl Fn(&ScriptContext) -> Result<(), ScriptError> + 'static) -> Self {
        self.init = Some(Rc::new(init));
        self
    }

    pub fn with_action(mut self, name: &str, action: impl Fn(&[Value]) -> Result<Value, ScriptError> + 'static) -> Self {
        self.actions.push((name.to_string(), Rc::new(action)));
        self
    }

    pub fn action(&self, name: &str) -> Option<&Action> {
        self.actions.iter().find(|(n, _)| n == name).map(|(_, a)| a)
    }
}

/// Specifier to exports table. Clones share the table.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: Rc<RefCell<HashMap<String, Rc<ModuleExports>>>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, specifier: &str, exports: ModuleExports) {
        tracing::debug!("Registered module {}", specifier);
        self.modules.borrow_mut().insert(specifier.to_string(), Rc::new(exports));
    }

    pub fn resolve(&self, specifier: &str) -> Result<Rc<ModuleExports>, ScriptError> {
        self.modules.borrow()
            .get(specifier)
            .cloned()
            .ok_or_else(|| ScriptError::ModuleNotFound(specifier.to_string()))
    }

    /// Asynchronous resolve; completes on a later poll like a real import
    pub fn import(&self, specifier: &str) -> LocalBoxFuture<'static, Result<Rc<ModuleExports>, ScriptError>> {
        let result = self.resolve(specifier);
        async move {
            smol::future::yield_now().await;
            result
        }
        .boxed_local()
    }

    pub fn contains(&self, specifier: &str) -> bool {
        self.modules.borrow().contains_key(specifier)
    }

    pub fn len(&self) -> usize {
        self.modules.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_exports_builder() {
        let exports = ModuleExports::new()
            .with_init(|_| Ok(()))
            .with_action("double", |args| {
                let n = args.first().and_then(Value::as_i64).unwrap_or(0);
                Ok(json!(n * 2))
            });

        assert!(exports.init.is_some());
        let double = exports.action("double").unwrap();
        assert_eq!(double(&[json!(21)]).unwrap(), json!(42));
        assert!(exports.action("missing").is_none());
    }

    #[test]
    fn test_registry_import() {
        let registry = ModuleRegistry::new();
        registry.register("/c/x.js", ModuleExports::new());

        assert!(smol::block_on(registry.import("/c/x.js")).is_ok());
        assert_eq!(
            smol::block_on(registry.import("/c/y.js")).unwrap_err(),
            ScriptError::ModuleNotFound("/c/y.js".into())
        );
    }
}
