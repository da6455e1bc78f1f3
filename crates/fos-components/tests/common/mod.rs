//! Shared harness for the loader integration tests
//!
//! An in-memory fetcher, a recording script host and the signal runtime,
//! wired into one `Components` over a parsed page.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use fos_components::events::{COMPONENT_FALLBACK_RENDERED, COMPONENT_LOAD_ERROR, COMPONENT_SCRIPT_ERROR};
use fos_components::{Components, ComponentsBuilder, InstanceState};
use fos_dom::{DocumentHandle, Event, NodeId};
use fos_js::{ModuleExports, ModuleRegistry, ScriptContext, ScriptError, ScriptHost, ScriptUnit, SignalRuntime};
use fos_net::MemoryFetcher;
use futures::future::{FutureExt, LocalBoxFuture};
use serde_json::Value;

type Handler = Rc<dyn Fn(&ScriptContext) -> Result<(), ScriptError>>;

/// Runs inline units by looking their trimmed body up in a handler table
#[derive(Default)]
pub struct FakeHost {
    handlers: RefCell<HashMap<String, Handler>>,
    runs: RefCell<Vec<(u64, String)>>,
    pub released: RefCell<Vec<u64>>,
    pub modules: ModuleRegistry,
}

impl FakeHost {
    pub fn on(&self, body: &str, handler: impl Fn(&ScriptContext) -> Result<(), ScriptError> + 'static) {
        self.handlers.borrow_mut().insert(body.to_string(), Rc::new(handler));
    }

    pub fn bodies(&self) -> Vec<String> {
        self.runs.borrow().iter().map(|(_, body)| body.clone()).collect()
    }
}

impl ScriptHost for FakeHost {
    fn run_inline(&self, unit: &ScriptUnit, context: &ScriptContext) -> Result<(), ScriptError> {
        let body = unit.body.trim().to_string();
        self.runs.borrow_mut().push((context.instance.id, body.clone()));
        let handler = self.handlers.borrow().get(&body).cloned();
        match handler {
            Some(handler) => handler(context),
            None => Ok(()),
        }
    }

    fn import(&self, specifier: &str) -> LocalBoxFuture<'static, Result<Rc<ModuleExports>, ScriptError>> {
        let import = self.modules.import(specifier);
        if specifier.starts_with("/slow/") {
            async move {
                smol::Timer::after(Duration::from_millis(20)).await;
                import.await
            }
            .boxed_local()
        } else {
            import
        }
    }

    fn release(&self, instance: u64) {
        self.released.borrow_mut().push(instance);
    }
}

pub struct Harness {
    pub doc: DocumentHandle,
    pub fetcher: MemoryFetcher,
    pub host: Rc<FakeHost>,
    pub runtime: Rc<SignalRuntime>,
    pub components: Components,
    pub events: Rc<RefCell<Vec<(String, Value)>>>,
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn harness(page: &str) -> Harness {
    harness_with(page, |builder| builder)
}

/// Harness whose builder is adjusted by `configure` before building
pub fn harness_with(page: &str, configure: impl FnOnce(ComponentsBuilder) -> ComponentsBuilder) -> Harness {
    init_tracing();
    let doc: DocumentHandle = Rc::new(RefCell::new(fos_html::parse(page)));
    let fetcher = MemoryFetcher::new();
    let host = Rc::new(FakeHost::default());
    let runtime = Rc::new(SignalRuntime::new(&doc));
    let builder = Components::builder(doc.clone(), Rc::new(fetcher.clone()))
        .script_host(host.clone())
        .reactivity(runtime.clone());
    let components = configure(builder).build();

    let events = Rc::new(RefCell::new(Vec::new()));
    let body = doc.borrow().body();
    for name in [COMPONENT_LOAD_ERROR, COMPONENT_SCRIPT_ERROR, COMPONENT_FALLBACK_RENDERED, "picked"] {
        let sink = events.clone();
        doc.borrow_mut().add_event_listener(body, name, Rc::new(move |e: &Event| {
            sink.borrow_mut().push((e.event_type.clone(), e.detail.clone()));
        }));
    }

    Harness { doc, fetcher, host, runtime, components, events }
}

impl Harness {
    pub fn body(&self) -> NodeId {
        self.doc.borrow().body()
    }

    pub fn all(&self, tag: &str) -> Vec<NodeId> {
        let doc = self.doc.borrow();
        doc.descendant_elements(doc.body())
            .into_iter()
            .filter(|&id| doc.tag_name(id) == Some(tag))
            .collect()
    }

    pub fn first(&self, tag: &str) -> NodeId {
        self.all(tag)[0]
    }

    pub fn html(&self, node: NodeId) -> String {
        fos_html::get_inner_html(&self.doc.borrow(), node)
    }

    pub fn events_named(&self, name: &str) -> Vec<Value> {
        self.events.borrow().iter().filter(|(n, _)| n == name).map(|(_, d)| d.clone()).collect()
    }

    pub fn state(&self, element: NodeId) -> Option<InstanceState> {
        self.components.instance(element).map(|i| i.state())
    }

    /// Insert `html` at the end of the body in one batch
    pub fn insert(&self, html: &str) {
        let mut doc = self.doc.borrow_mut();
        let body = doc.body();
        let fragment = doc.create_fragment();
        for node in fos_html::HtmlParser::new().parse_fragment_into(&mut doc, html) {
            doc.append_child(fragment, node).unwrap();
        }
        doc.append_child(body, fragment).unwrap();
    }
}
