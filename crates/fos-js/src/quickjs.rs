//! QuickJS script host
//!
//! Each component instance gets its own runtime and context, created on the
//! first inline unit and dropped by `release`. A unit body runs as
//! `(function () { body }).call(element)`, where `element` describes the
//! instance root. Callbacks passed to `registerCleanup` stay in the context
//! and are called back by index at teardown.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use futures::future::LocalBoxFuture;
use rquickjs::{Array, CatchResultExt, Context, Ctx, Function, Object, Runtime, Value};

use crate::console::install_console;
use crate::{Binding, ModuleExports, ModuleRegistry, ScriptContext, ScriptError, ScriptHost, ScriptUnit};

const PRELUDE: &str = r#"
globalThis.__cleanups = [];
globalThis.emit = (name, detail) => __emit(String(name), JSON.stringify(detail ?? null));
globalThis.registerCleanup = (fn) => {
    if (typeof fn !== 'function') throw new TypeError('registerCleanup expects a function');
    __registerCleanup(__cleanups.push(fn) - 1);
};
globalThis.setCssVariable = (name, value) => __setCssVariable(String(name), String(value));
globalThis.getCssVariable = (name) => __getCssVariable(String(name));
globalThis.ds = {
    get: (name) => JSON.parse(__dsGet(String(name))),
    set: (name, value) => __dsSet(String(name), JSON.stringify(value ?? null)),
};
Object.defineProperty(globalThis, '$props', { get: () => JSON.parse(__propsGet()) });
globalThis.internals = {
    setFormValue: (value) => __setFormValue(String(value ?? '')),
};
element.scopedId = (base) => `${element.tag}-${element.id}-${base}`;
"#;

type Engines = Rc<RefCell<HashMap<u64, Engine>>>;

#[derive(Clone)]
struct Engine {
    context: Context,
    runtime: Runtime,
}

/// Script host backed by QuickJS
pub struct QuickJsHost {
    engines: Engines,
    modules: ModuleRegistry,
}

impl QuickJsHost {
    pub fn new(modules: ModuleRegistry) -> Self {
        Self {
            engines: Rc::new(RefCell::new(HashMap::new())),
            modules,
        }
    }

    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    /// Instances that currently hold a context
    pub fn active_contexts(&self) -> usize {
        self.engines.borrow().len()
    }

    fn engine(&self, context: &ScriptContext) -> Result<Engine, ScriptError> {
        let id = context.instance.id;
        if let Some(engine) = self.engines.borrow().get(&id) {
            return Ok(engine.clone());
        }

        let runtime = Runtime::new().map_err(|e| ScriptError::Execution(e.to_string()))?;
        let js = Context::full(&runtime).map_err(|e| ScriptError::Execution(e.to_string()))?;
        let weak = Rc::downgrade(&self.engines);

        js.with(|ctx| {
            let installed: rquickjs::Result<()> = (|| {
                install_console(&ctx, &context.instance.tag)?;
                install_instance(&ctx, context, weak)?;
                ctx.eval::<Value, _>(PRELUDE)?;
                Ok(())
            })();
            installed
                .catch(&ctx)
                .map_err(|e| ScriptError::Execution(format!("Cannot set up script context: {}", e)))
        })?;

        tracing::debug!(instance = id, tag = %context.instance.tag, "Created script context");
        let engine = Engine { context: js, runtime };
        self.engines.borrow_mut().insert(id, engine.clone());
        Ok(engine)
    }
}

impl std::fmt::Debug for QuickJsHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuickJsHost")
            .field("contexts", &self.active_contexts())
            .field("modules", &self.modules.len())
            .finish()
    }
}

impl ScriptHost for QuickJsHost {
    fn run_inline(&self, unit: &ScriptUnit, context: &ScriptContext) -> Result<(), ScriptError> {
        let engine = self.engine(context)?;
        let source = format!("(function () {{\n{}\n}}).call(globalThis.element);", unit.body);

        engine.context.with(|ctx| {
            ctx.eval::<Value, _>(source)
                .catch(&ctx)
                .map(|_| ())
                .map_err(|e| ScriptError::Execution(format!("{}: {}", unit.label(), e)))
        })?;

        // Settle promise jobs queued by the unit
        loop {
            match engine.runtime.execute_pending_job() {
                Ok(true) => continue,
                Ok(false) => break,
                Err(_) => {
                    tracing::warn!(instance = context.instance.id, "Pending job raised an exception");
                    break;
                }
            }
        }
        Ok(())
    }

    fn import(&self, specifier: &str) -> LocalBoxFuture<'static, Result<Rc<ModuleExports>, ScriptError>> {
        self.modules.import(specifier)
    }

    fn release(&self, instance: u64) {
        let released = self.engines.borrow_mut().remove(&instance);
        if released.is_some() {
            tracing::debug!(instance, "Released script context");
        }
    }
}

fn install_instance<'js>(
    ctx: &Ctx<'js>,
    context: &ScriptContext,
    engines: Weak<RefCell<HashMap<u64, Engine>>>,
) -> rquickjs::Result<()> {
    let globals = ctx.globals();
    let info = &context.instance;

    let element = Object::new(ctx.clone())?;
    element.set("id", info.id as f64)?;
    element.set("tag", info.tag.as_str())?;
    element.set("source", info.source.as_str())?;
    element.set("host", info.host.index() as f64)?;
    element.set("root", info.root.index() as f64)?;
    globals.set("element", element)?;

    let cx = context.clone();
    globals.set("__emit", Function::new(ctx.clone(), move |name: String, detail: String| {
        let detail = serde_json::from_str(&detail).unwrap_or(serde_json::Value::Null);
        cx.emit(&name, detail);
    })?)?;

    let cx = context.clone();
    let id = info.id;
    globals.set("__registerCleanup", Function::new(ctx.clone(), move |index: u32| {
        let engines = engines.clone();
        cx.register_cleanup(move || run_cleanup(&engines, id, index));
    })?)?;

    let cx = context.clone();
    globals.set("__setCssVariable", Function::new(ctx.clone(), move |name: String, value: String| {
        cx.set_css_variable(&name, &value);
    })?)?;

    let cx = context.clone();
    globals.set("__getCssVariable", Function::new(ctx.clone(), move |name: String| cx.css_variable(&name))?)?;

    let cx = context.clone();
    globals.set("__dsGet", Function::new(ctx.clone(), move |name: String| -> String {
        cx.reactivity
            .as_ref()
            .and_then(|r| r.scope(cx.instance.host).get(&name))
            .and_then(|binding| binding.value())
            .unwrap_or(serde_json::Value::Null)
            .to_string()
    })?)?;

    // Own props only: an enclosing component's aggregate is never visible
    let cx = context.clone();
    globals.set("__propsGet", Function::new(ctx.clone(), move || -> String {
        cx.reactivity
            .as_ref()
            .and_then(|r| r.scope(cx.instance.host).get_local(crate::PROPS_SIGNAL))
            .and_then(|binding| binding.value())
            .unwrap_or(serde_json::Value::Null)
            .to_string()
    })?)?;

    let cx = context.clone();
    globals.set("__dsSet", Function::new(ctx.clone(), move |name: String, value: String| -> bool {
        let Some(reactivity) = &cx.reactivity else {
            return false;
        };
        let value = serde_json::from_str(&value).unwrap_or(serde_json::Value::Null);
        let scope = reactivity.scope(cx.instance.host);
        match scope.get_local(&name) {
            Some(Binding::Signal(signal)) => signal.set(value),
            _ => {
                scope.insert(&name, Binding::Signal(reactivity.signal(value)));
            }
        }
        true
    })?)?;

    let cx = context.clone();
    globals.set("__setFormValue", Function::new(ctx.clone(), move |value: String| cx.set_form_value(&value))?)?;

    Ok(())
}

fn run_cleanup(engines: &Weak<RefCell<HashMap<u64, Engine>>>, id: u64, index: u32) -> Result<(), ScriptError> {
    let context = engines
        .upgrade()
        .and_then(|engines| engines.borrow().get(&id).map(|e| e.context.clone()))
        .ok_or_else(|| ScriptError::Cleanup(format!("script context for instance {} is gone", id)))?;

    context.with(|ctx| {
        let called: rquickjs::Result<()> = (|| {
            let cleanups: Array = ctx.globals().get("__cleanups")?;
            let cleanup: Function = cleanups.get(index as usize)?;
            cleanup.call::<_, Value>(())?;
            Ok(())
        })();
        called.catch(&ctx).map_err(|e| ScriptError::Cleanup(e.to_string()))
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use fos_dom::{Document, ElementInternals, NodeId};
    use serde_json::json;

    use super::*;
    use crate::{Cleanup, InstanceHooks, InstanceInfo, Reactivity, Signal, SignalRuntime};

    #[derive(Default)]
    struct RecordingHooks {
        events: RefCell<Vec<(String, serde_json::Value)>>,
        cleanups: RefCell<Vec<Cleanup>>,
        vars: RefCell<HashMap<String, String>>,
    }

    impl InstanceHooks for RecordingHooks {
        fn emit(&self, name: &str, detail: serde_json::Value) {
            self.events.borrow_mut().push((name.to_string(), detail));
        }

        fn register_cleanup(&self, cleanup: Cleanup) {
            self.cleanups.borrow_mut().push(cleanup);
        }

        fn set_css_variable(&self, name: &str, value: &str) {
            self.vars.borrow_mut().insert(name.to_string(), value.to_string());
        }

        fn css_variable(&self, name: &str) -> Option<String> {
            self.vars.borrow().get(name).cloned()
        }
    }

    fn context(id: u64, hooks: &Rc<RecordingHooks>) -> ScriptContext {
        ScriptContext {
            instance: InstanceInfo {
                id,
                tag: "x-card".into(),
                source: "/c/card.html".into(),
                host: NodeId::ROOT,
                root: NodeId::ROOT,
            },
            hooks: hooks.clone(),
            reactivity: None,
            internals: None,
        }
    }

    #[test]
    fn test_this_is_root_descriptor() {
        let host = QuickJsHost::new(ModuleRegistry::new());
        let hooks = Rc::new(RecordingHooks::default());

        host.run_inline(
            &ScriptUnit::inline("emit('who', { tag: this.tag, id: this.id, scoped: element.scopedId('title') });"),
            &context(3, &hooks),
        )
        .unwrap();

        let events = hooks.events.borrow();
        assert_eq!(events[0].0, "who");
        assert_eq!(events[0].1, json!({"tag": "x-card", "id": 3, "scoped": "x-card-3-title"}));
    }

    #[test]
    fn test_exception_is_execution_error() {
        let host = QuickJsHost::new(ModuleRegistry::new());
        let hooks = Rc::new(RecordingHooks::default());

        let err = host
            .run_inline(&ScriptUnit::inline("throw new Error('boom');"), &context(1, &hooks))
            .unwrap_err();
        match err {
            ScriptError::Execution(message) => assert!(message.contains("boom"), "{}", message),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_state_persists_per_instance() {
        let host = QuickJsHost::new(ModuleRegistry::new());
        let hooks = Rc::new(RecordingHooks::default());
        let cx = context(1, &hooks);

        host.run_inline(&ScriptUnit::inline("globalThis.count = 1;"), &cx).unwrap();
        host.run_inline(&ScriptUnit::inline("emit('count', globalThis.count + 1);"), &cx).unwrap();
        host.run_inline(&ScriptUnit::inline("emit('other', typeof globalThis.count);"), &context(2, &hooks))
            .unwrap();

        let events = hooks.events.borrow();
        assert_eq!(events[0].1, json!(2));
        assert_eq!(events[1].1, json!("undefined"));
        assert_eq!(host.active_contexts(), 2);
    }

    #[test]
    fn test_cleanup_calls_back_into_script() {
        let host = QuickJsHost::new(ModuleRegistry::new());
        let hooks = Rc::new(RecordingHooks::default());

        host.run_inline(
            &ScriptUnit::inline("setCssVariable('--accent', 'red'); registerCleanup(() => setCssVariable('--accent', getCssVariable('--accent') + '-gone'));"),
            &context(5, &hooks),
        )
        .unwrap();

        let cleanups: Vec<Cleanup> = hooks.cleanups.borrow_mut().drain(..).collect();
        assert_eq!(cleanups.len(), 1);
        for cleanup in cleanups {
            cleanup().unwrap();
        }
        assert_eq!(hooks.css_variable("--accent").as_deref(), Some("red-gone"));

        host.release(5);
        assert_eq!(host.active_contexts(), 0);
    }

    #[test]
    fn test_cleanup_after_release_fails() {
        let host = QuickJsHost::new(ModuleRegistry::new());
        let hooks = Rc::new(RecordingHooks::default());

        host.run_inline(&ScriptUnit::inline("registerCleanup(() => {});"), &context(9, &hooks)).unwrap();
        host.release(9);

        let cleanup = hooks.cleanups.borrow_mut().pop().unwrap();
        assert!(matches!(cleanup(), Err(ScriptError::Cleanup(_))));
    }

    #[test]
    fn test_ds_and_props() {
        let doc = Rc::new(RefCell::new(Document::default()));
        let runtime = Rc::new(SignalRuntime::new(&doc));
        let body = doc.borrow().body();
        runtime.scope(body).insert(crate::PROPS_SIGNAL, Binding::Signal(Signal::new(json!({"title": "Hi"}))));

        let host = QuickJsHost::new(ModuleRegistry::new());
        let hooks = Rc::new(RecordingHooks::default());
        let mut cx = context(1, &hooks);
        cx.instance.host = body;
        cx.reactivity = Some(runtime.clone());

        host.run_inline(&ScriptUnit::inline("ds.set('count', 4); emit('props', $props.title); emit('count', ds.get('count'));"), &cx)
            .unwrap();

        assert_eq!(runtime.scope(body).signal("count").map(|s| s.get()), Some(json!(4)));
        let events = hooks.events.borrow();
        assert_eq!(events[0].1, json!("Hi"));
        assert_eq!(events[1].1, json!(4));
    }

    #[test]
    fn test_props_are_not_inherited() {
        let doc = Rc::new(RefCell::new(Document::default()));
        let body = doc.borrow().body();
        let child = {
            let mut d = doc.borrow_mut();
            let child = d.create_element("x-child");
            d.append_child(body, child).unwrap();
            child
        };
        let runtime = Rc::new(SignalRuntime::new(&doc));
        let outer = runtime.scope(body);
        outer.insert(crate::PROPS_SIGNAL, Binding::Signal(Signal::new(json!({"title": "Parent"}))));
        outer.insert("theme", Binding::Signal(Signal::new(json!("dark"))));

        let host = QuickJsHost::new(ModuleRegistry::new());
        let hooks = Rc::new(RecordingHooks::default());
        let mut cx = context(2, &hooks);
        cx.instance.host = child;
        cx.reactivity = Some(runtime.clone());

        host.run_inline(&ScriptUnit::inline("emit('props', $props); emit('theme', ds.get('theme'));"), &cx).unwrap();
        runtime.scope(child).insert(crate::PROPS_SIGNAL, Binding::Signal(Signal::new(json!({"title": "Child"}))));
        host.run_inline(&ScriptUnit::inline("emit('props', $props.title);"), &cx).unwrap();

        let events = hooks.events.borrow();
        assert_eq!(events[0].1, serde_json::Value::Null);
        // Other signals still resolve through enclosing scopes
        assert_eq!(events[1].1, json!("dark"));
        assert_eq!(events[2].1, json!("Child"));
    }

    #[test]
    fn test_set_form_value() {
        let host = QuickJsHost::new(ModuleRegistry::new());
        let hooks = Rc::new(RecordingHooks::default());
        let internals = Rc::new(RefCell::new(ElementInternals::new(NodeId::ROOT)));
        let mut cx = context(1, &hooks);
        cx.internals = Some(internals.clone());

        host.run_inline(&ScriptUnit::inline("internals.setFormValue(42);"), &cx).unwrap();
        assert_eq!(internals.borrow().form_value(), Some("42"));

        host.run_inline(&ScriptUnit::inline("emit('ok', internals.setFormValue('x'));"), &context(2, &hooks))
            .unwrap();
        assert_eq!(hooks.events.borrow()[0].1, json!(false));
    }

    #[test]
    fn test_import_uses_registry() {
        let modules = ModuleRegistry::new();
        modules.register("/c/x.js", ModuleExports::new().with_action("noop", |_| Ok(json!(null))));
        let host = QuickJsHost::new(modules);

        let exports = smol::block_on(host.import("/c/x.js")).unwrap();
        assert!(exports.action("noop").is_some());
        assert!(smol::block_on(host.import("/c/none.js")).is_err());
    }
}
