//! Script host seam
//!
//! Behaviour units extracted from a component source and the trait that
//! executes them.

use std::rc::Rc;

use futures::future::LocalBoxFuture;

use crate::{ModuleExports, ScriptContext, ScriptError};

/// How a unit is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    /// Classic inline script
    Inline,
    /// `type="module"` with an inline body
    ModuleInline,
    /// Loaded through `ScriptHost::import`
    ModuleExternal,
}

/// One `<script>` from a component source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptUnit {
    pub kind: ScriptKind,
    pub body: String,
    pub src: Option<String>,
    /// Remaining attributes, in source order
    pub attrs: Vec<(String, String)>,
}

impl ScriptUnit {
    pub fn inline(body: &str) -> Self {
        Self {
            kind: ScriptKind::Inline,
            body: body.to_string(),
            src: None,
            attrs: Vec::new(),
        }
    }

    pub fn module_inline(body: &str) -> Self {
        Self {
            kind: ScriptKind::ModuleInline,
            ..Self::inline(body)
        }
    }

    pub fn external(src: &str) -> Self {
        Self {
            kind: ScriptKind::ModuleExternal,
            body: String::new(),
            src: Some(src.to_string()),
            attrs: Vec::new(),
        }
    }

    pub fn is_external(&self) -> bool {
        self.kind == ScriptKind::ModuleExternal
    }

    /// Source label for diagnostics
    pub fn label(&self) -> &str {
        self.src.as_deref().unwrap_or("inline")
    }
}

/// Executes behaviour units for component instances.
///
/// Hosts are driven from the event-loop thread only. `run_inline` must not
/// be re-entered for the same instance.
pub trait ScriptHost {
    /// Run an inline unit synchronously with `this` bound to the instance root
    fn run_inline(&self, unit: &ScriptUnit, context: &ScriptContext) -> Result<(), ScriptError>;

    /// Resolve a module specifier to its exports
    fn import(&self, specifier: &str) -> LocalBoxFuture<'static, Result<Rc<ModuleExports>, ScriptError>>;

    /// Drop any per-instance engine state
    fn release(&self, _instance: u64) {}
}
