//! fOS JavaScript Runtime
//!
//! Script hosting for components:
//! - the `ScriptHost` seam that runs inline units and imports modules
//! - the explicit per-instance `ScriptContext`
//! - native module registry
//! - the `Reactivity` contract and the default `SignalRuntime`
//! - a QuickJS-backed host (feature `quickjs`)

mod host;
mod context;
mod modules;
mod reactivity;
mod signals;
#[cfg(feature = "quickjs")]
mod console;
#[cfg(feature = "quickjs")]
mod quickjs;

pub use context::{Cleanup, InstanceHooks, InstanceInfo, ScriptContext};
pub use host::{ScriptHost, ScriptKind, ScriptUnit};
pub use modules::{Action, InitFn, ModuleExports, ModuleRegistry};
pub use reactivity::{is_truthy, Binding, EvalError, Reactivity, Scope, Signal, PROPS_SIGNAL};
pub use signals::SignalRuntime;
#[cfg(feature = "quickjs")]
pub use quickjs::QuickJsHost;

/// Script errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    #[error("Script execution failed: {0}")]
    Execution(String),

    #[error("Failed to import {specifier}: {message}")]
    Import { specifier: String, message: String },

    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Module init failed: {0}")]
    Init(String),

    #[error("Cleanup failed: {0}")]
    Cleanup(String),
}
