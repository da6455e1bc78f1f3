//! Public loader handle

use std::rc::Rc;
use std::time::Duration;

use fos_dom::{DocumentHandle, NodeId};
use fos_js::{Reactivity, ScriptHost, SignalRuntime};
use fos_net::{Fetcher, SourceCache};

use crate::loader::Loader;
use crate::{discovery, ComponentDefinition, ComponentInstance, Config};

/// Poll interval while waiting on timers and I/O
const SETTLE_INTERVAL: Duration = Duration::from_millis(1);

/// Builder for `Components`
pub struct ComponentsBuilder {
    document: DocumentHandle,
    fetcher: Rc<dyn Fetcher>,
    config: Config,
    host: Option<Rc<dyn ScriptHost>>,
    reactivity: Option<Rc<dyn Reactivity>>,
    default_host: bool,
}

impl ComponentsBuilder {
    pub fn new(document: DocumentHandle, fetcher: Rc<dyn Fetcher>) -> Self {
        Self {
            document,
            fetcher,
            config: Config::default(),
            host: None,
            reactivity: None,
            default_host: true,
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn script_host(mut self, host: Rc<dyn ScriptHost>) -> Self {
        self.host = Some(host);
        self
    }

    /// Run without a script host; every behaviour unit fails
    pub fn without_scripts(mut self) -> Self {
        self.host = None;
        self.default_host = false;
        self
    }

    pub fn reactivity(mut self, reactivity: Rc<dyn Reactivity>) -> Self {
        self.reactivity = Some(reactivity);
        self
    }

    /// Use a `SignalRuntime` over the document
    pub fn signal_runtime(self) -> Self {
        let runtime = Rc::new(SignalRuntime::new(&self.document));
        self.reactivity(runtime)
    }

    pub fn build(self) -> Components {
        let host = match self.host {
            Some(host) => Some(host),
            None if self.default_host => default_host(),
            None => None,
        };
        let loader = Loader::new(
            self.document,
            self.config,
            SourceCache::new("source", self.fetcher.clone()),
            SourceCache::new("fallback", self.fetcher),
            host,
            self.reactivity,
        );
        Components { loader: Rc::new(loader) }
    }
}

#[cfg(feature = "quickjs")]
fn default_host() -> Option<Rc<dyn ScriptHost>> {
    Some(Rc::new(fos_js::QuickJsHost::new(fos_js::ModuleRegistry::new())))
}

#[cfg(not(feature = "quickjs"))]
fn default_host() -> Option<Rc<dyn ScriptHost>> {
    tracing::warn!("Built without a script engine, component scripts will fail");
    None
}

/// Dynamic component loader for one document
pub struct Components {
    loader: Rc<Loader>,
}

impl std::fmt::Debug for Components {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Components")
            .field("instances", &self.loader.instances.borrow().len())
            .field("in_flight", &self.loader.in_flight())
            .finish()
    }
}

impl Components {
    pub fn builder(document: DocumentHandle, fetcher: Rc<dyn Fetcher>) -> ComponentsBuilder {
        ComponentsBuilder::new(document, fetcher)
    }

    /// Scan the body and keep watching it for new placeholders
    pub fn start(&self) {
        tracing::info!("Starting component loader");
        self.loader.start();
    }

    /// Scan a subtree for placeholders without observing it
    pub fn scan(&self, root: NodeId) {
        discovery::scan(&self.loader, root);
    }

    /// Register a ready hook for `tag`. It replaces the
    /// `contentReadyCallback` scope action for that tag.
    pub fn on_ready(&self, tag: &str, hook: impl Fn(&ComponentInstance) + 'static) {
        self.loader.ready_hooks.borrow_mut().insert(tag.to_string(), Rc::new(hook));
    }

    pub fn document(&self) -> &DocumentHandle {
        &self.loader.document
    }

    pub fn config(&self) -> &Config {
        &self.loader.config
    }

    pub fn reactivity(&self) -> Option<&Rc<dyn Reactivity>> {
        self.loader.reactivity.as_ref()
    }

    pub fn sources(&self) -> &SourceCache {
        &self.loader.sources
    }

    pub fn fallbacks(&self) -> &SourceCache {
        &self.loader.fallbacks
    }

    pub fn instance(&self, element: NodeId) -> Option<Rc<ComponentInstance>> {
        self.loader.instances.borrow().get(&element).cloned()
    }

    /// Live instances, oldest first
    pub fn instances(&self) -> Vec<Rc<ComponentInstance>> {
        let mut all: Vec<_> = self.loader.instances.borrow().values().cloned().collect();
        all.sort_by_key(|i| i.id());
        all
    }

    pub fn definition(&self, tag: &str) -> Option<Rc<ComponentDefinition>> {
        self.loader.registry.borrow().definition(tag)
    }

    pub fn is_defined(&self, tag: &str) -> bool {
        self.loader.registry.borrow().is_defined(tag)
    }

    pub fn is_defining(&self, tag: &str) -> bool {
        self.loader.registry.borrow().is_defining(tag)
    }

    /// Tasks spawned and not yet finished
    pub fn in_flight(&self) -> usize {
        self.loader.in_flight()
    }

    /// Process DOM work and every task that can make progress without
    /// waiting on timers or I/O
    pub fn run_until_idle(&self) {
        loop {
            let mut progressed = self.loader.flush_dom();
            while self.loader.executor.try_tick() {
                progressed = true;
                self.loader.flush_dom();
            }
            if !progressed {
                break;
            }
        }
    }

    /// Block until no task is in flight and the document is quiet
    pub fn block_until_settled(&self) {
        let loader = &self.loader;
        smol::block_on(loader.executor.run(async {
            loop {
                loader.flush_dom();
                if loader.in_flight() == 0 && !loader.has_dom_work() {
                    break;
                }
                smol::Timer::after(SETTLE_INTERVAL).await;
            }
        }));
    }

    /// Forget cached sources, definitions and ready hooks
    pub fn reset(&self) {
        self.loader.reset();
    }
}
