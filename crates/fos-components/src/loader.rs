//! Loader core
//!
//! Shared state behind `Components`: caches, the definition registry, live
//! instances and the local executor that drives fetches, imports and
//! fallback renders. Tasks hold `Weak<Loader>` so dropping the loader
//! cancels them.
//!
//! DOM side effects surface as custom element reactions and mutation
//! records. `flush_dom` drains both and routes them to the instance
//! lifecycle, discovery and props bridges. No document borrow is held
//! while any of those run.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::rc::{Rc, Weak};

use fos_dom::{CustomElementError, DocumentHandle, DomError, MutationRecord, NodeId, ObserverGuard, ObserverId, Reaction};
use fos_js::{Reactivity, ScriptHost};
use fos_net::SourceCache;
use futures::future::{FutureExt, LocalBoxFuture, Shared};
use smol::LocalExecutor;

use crate::events::{self, COMPONENT_LOAD_ERROR};
use crate::fallback::{self, FallbackRequest};
use crate::instance::{ComponentInstance, InstanceState};
use crate::props::PropsBridge;
use crate::registry::{Registry, Request};
use crate::{discovery, parser, scripts, styles};
use crate::{ComponentDefinition, ComponentError, Config};

/// Called once an instance is ready, in place of `contentReadyCallback`
pub type ReadyHook = Rc<dyn Fn(&ComponentInstance)>;

/// Scope action run on ready when no hook is registered for the tag
pub const CONTENT_READY_ACTION: &str = "contentReadyCallback";

/// One parse of a source, awaited by every tag defined from it
type DefinitionFuture = Shared<LocalBoxFuture<'static, Result<Rc<ComponentDefinition>, ComponentError>>>;

#[derive(Clone)]
enum ObserverRole {
    Discovery,
    Props(Weak<ComponentInstance>),
}

pub(crate) struct Loader {
    pub(crate) document: DocumentHandle,
    pub(crate) config: Config,
    pub(crate) sources: SourceCache,
    pub(crate) fallbacks: SourceCache,
    pub(crate) host: Option<Rc<dyn ScriptHost>>,
    pub(crate) reactivity: Option<Rc<dyn Reactivity>>,
    pub(crate) registry: RefCell<Registry>,
    parsing: RefCell<HashMap<String, DefinitionFuture>>,
    /// Live instances by host element
    pub(crate) instances: RefCell<HashMap<NodeId, Rc<ComponentInstance>>>,
    /// Hosts whose instance was torn down; they are never attached again
    retired: RefCell<HashSet<NodeId>>,
    pub(crate) ready_hooks: RefCell<HashMap<String, ReadyHook>>,
    observers: RefCell<HashMap<ObserverId, ObserverRole>>,
    discovery: RefCell<Option<ObserverGuard>>,
    pub(crate) executor: LocalExecutor<'static>,
    in_flight: Cell<usize>,
}

impl Loader {
    pub(crate) fn new(
        document: DocumentHandle,
        config: Config,
        sources: SourceCache,
        fallbacks: SourceCache,
        host: Option<Rc<dyn ScriptHost>>,
        reactivity: Option<Rc<dyn Reactivity>>,
    ) -> Self {
        Self {
            document,
            config,
            sources,
            fallbacks,
            host,
            reactivity,
            registry: RefCell::new(Registry::default()),
            parsing: RefCell::new(HashMap::new()),
            instances: RefCell::new(HashMap::new()),
            retired: RefCell::new(HashSet::new()),
            ready_hooks: RefCell::new(HashMap::new()),
            observers: RefCell::new(HashMap::new()),
            discovery: RefCell::new(None),
            executor: LocalExecutor::new(),
            in_flight: Cell::new(0),
        }
    }

    /// Run `task` on the loader's executor
    pub(crate) fn spawn(self: &Rc<Self>, task: impl Future<Output = ()> + 'static) {
        self.in_flight.set(self.in_flight.get() + 1);
        let weak = Rc::downgrade(self);
        self.executor
            .spawn(async move {
                task.await;
                if let Some(loader) = weak.upgrade() {
                    loader.in_flight.set(loader.in_flight.get().saturating_sub(1));
                }
            })
            .detach();
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.get()
    }

    /// Initial scan of the body, then observe it for new placeholders
    pub(crate) fn start(self: &Rc<Self>) {
        let body = self.document.borrow().body();
        if let Some(reactivity) = &self.reactivity {
            reactivity.scan(body);
        }
        discovery::scan(self, body);

        if self.discovery.borrow().is_none() {
            let id = self.document.borrow_mut().observe(body, discovery::observer_options(self));
            self.observers.borrow_mut().insert(id, ObserverRole::Discovery);
            *self.discovery.borrow_mut() = Some(ObserverGuard::new(Rc::downgrade(&self.document), id));
            tracing::debug!("Watching body for new components");
        }
    }

    pub(crate) fn has_dom_work(&self) -> bool {
        let doc = self.document.borrow();
        doc.has_pending_reactions() || !doc.pending_observers().is_empty()
    }

    /// Drain reactions and mutation records until the document is quiet.
    /// Returns whether anything was processed.
    pub(crate) fn flush_dom(self: &Rc<Self>) -> bool {
        let mut progressed = false;
        loop {
            let reactions = self.document.borrow_mut().take_reactions();
            for reaction in &reactions {
                self.handle_reaction(*reaction);
            }

            let pending = self.document.borrow().pending_observers();
            for id in &pending {
                let records = self.document.borrow_mut().take_records(*id);
                if records.is_empty() {
                    continue;
                }
                let role = self.observers.borrow().get(id).cloned();
                match role {
                    Some(ObserverRole::Discovery) => discovery::handle_records(self, &records),
                    Some(ObserverRole::Props(instance)) => {
                        if let Some(instance) = instance.upgrade() {
                            self.apply_props(&instance, &records);
                        }
                    }
                    None => {}
                }
            }

            if reactions.is_empty() && pending.is_empty() {
                return progressed;
            }
            progressed = true;
        }
    }

    // ---- Definitions ----

    /// Start defining `tag` from `src`, or queue `element` behind a
    /// definition already in progress
    pub(crate) fn request_definition(self: &Rc<Self>, element: NodeId, tag: &str, src: &str) {
        match self.registry.borrow_mut().request(tag, src, element) {
            Request::Start => {}
            Request::Joined => {
                tracing::debug!(tag, "Waiting on definition in progress");
                return;
            }
            Request::Defined => return,
        }

        let memo = self.registry.borrow().for_source(src);
        if let Some(definition) = memo {
            self.complete_definition(tag, definition);
            return;
        }

        tracing::info!(tag, src, "Defining component");
        let pending = self.parse_source(tag, src);
        let weak = Rc::downgrade(self);
        let (tag, src) = (tag.to_string(), src.to_string());
        self.spawn(async move {
            let parsed = pending.await;
            let Some(loader) = weak.upgrade() else {
                return;
            };
            match parsed {
                Ok(definition) => loader.complete_definition(&tag, definition),
                Err(e) => loader.fail_definition(&tag, &src, element, e.for_tag(&tag)),
            }
        });
    }

    /// Fetch and parse `src` once, however many tags are defined from it
    /// concurrently. The entry is dropped when the parse settles; success
    /// is memoized by the registry and failure allows a retry.
    fn parse_source(self: &Rc<Self>, tag: &str, src: &str) -> DefinitionFuture {
        if let Some(pending) = self.parsing.borrow().get(src) {
            tracing::debug!(tag, src, "Joining parse in progress");
            return pending.clone();
        }

        let fetch = self.sources.get(src);
        let weak = Rc::downgrade(self);
        let config = self.config.clone();
        let (tag, src) = (tag.to_string(), src.to_string());
        let key = src.clone();
        let pending = async move {
            let parsed = match fetch.await {
                Ok(text) => parser::parse_component(&text, &tag, &src, &config).map(Rc::new),
                Err(e) => Err(ComponentError::from(e)),
            };
            if let Some(loader) = weak.upgrade() {
                // Fetch failures are already evicted by the cache
                if matches!(parsed, Err(ref e) if !matches!(e, ComponentError::Fetch(_))) {
                    loader.sources.invalidate(&src);
                }
                loader.parsing.borrow_mut().remove(&src);
            }
            parsed
        }
        .boxed_local()
        .shared();

        self.parsing.borrow_mut().insert(key, pending.clone());
        pending
    }

    fn complete_definition(&self, tag: &str, definition: Rc<ComponentDefinition>) {
        let waiters = self.registry.borrow_mut().complete(tag, definition);
        let defined = self.document.borrow_mut().define_custom_element(tag);
        match defined {
            Ok(()) => tracing::info!(tag, waiting = waiters.len(), "Component defined"),
            Err(DomError::CustomElement(CustomElementError::AlreadyDefined(_))) => {
                tracing::debug!(tag, "Component already defined");
            }
            Err(e) => tracing::error!(tag, "Cannot define component: {}", e),
        }
    }

    fn fail_definition(self: &Rc<Self>, tag: &str, src: &str, origin: NodeId, error: ComponentError) {
        let waiters = self.registry.borrow_mut().fail(tag);
        tracing::error!(tag, src, "Failed to define component: {}", error);

        events::emit(&self.document, origin, COMPONENT_LOAD_ERROR, events::load_error(tag, src, &error));

        for element in waiters {
            let fallback_src = self
                .document
                .borrow()
                .get_attribute(element, &self.config.fallback_attribute)
                .map(str::to_string);
            fallback::spawn_render(self, FallbackRequest {
                element,
                tag: tag.to_string(),
                src: src.to_string(),
                fallback_src,
                error: error.clone(),
                guard: None,
            });
        }
    }

    // ---- Instance lifecycle ----

    fn handle_reaction(self: &Rc<Self>, reaction: Reaction) {
        match reaction {
            Reaction::Upgrade(element) | Reaction::Connected(element) => {
                if self.retired.borrow().contains(&element) {
                    tracing::trace!(%element, "Torn-down host reinserted, ignoring");
                    return;
                }
                let existing = self.instances.borrow().get(&element).cloned();
                let instance = match existing {
                    Some(instance) => instance,
                    None => match self.construct(element) {
                        Some(instance) => instance,
                        None => return,
                    },
                };
                if self.document.borrow().is_connected(element) {
                    self.connect(&instance);
                }
            }
            Reaction::Disconnected(element) => self.disconnect(element),
            Reaction::Adopted(element) => self.adopt(element),
        }
    }

    /// Create the instance for an upgraded element and attach its root
    fn construct(self: &Rc<Self>, element: NodeId) -> Option<Rc<ComponentInstance>> {
        let tag = self.document.borrow().tag_name(element)?.to_string();
        let definition = self.registry.borrow().definition(&tag)?;
        let source = definition.source.clone();

        let root = match definition.shadow_mode() {
            Some(mode) => {
                let mut doc = self.document.borrow_mut();
                match doc.shadow_root(element) {
                    Some(existing) => Ok(existing),
                    None => doc.attach_shadow(element, mode),
                }
            }
            None => Ok(element),
        };
        let root = match root {
            Ok(root) => root,
            Err(e) => {
                tracing::error!(tag = %tag, "Cannot attach component root: {}", e);
                self.render_fallback_for(element, &tag, &source, ComponentError::from(e));
                return None;
            }
        };

        let instance = Rc::new(ComponentInstance::new(
            Rc::downgrade(&self.document),
            &tag,
            element,
            root,
            definition,
            &self.config.value_attribute,
        ));
        tracing::debug!(tag = %tag, id = instance.id(), "Instance constructed");
        self.instances.borrow_mut().insert(element, instance.clone());
        Some(instance)
    }

    /// First connection: populate or hydrate, style, run behaviour,
    /// activate reactivity and announce readiness
    fn connect(self: &Rc<Self>, instance: &Rc<ComponentInstance>) {
        if !instance.begin_attach() {
            tracing::trace!(tag = instance.tag(), state = ?instance.state(), "Already attached");
            return;
        }
        let definition = instance.definition().clone();
        let root = instance.root();
        let tag = instance.tag().to_string();

        let populated = {
            let mut doc = self.document.borrow_mut();
            if doc.has_element_children(root) {
                Ok(true)
            } else {
                let fragment = doc.instantiate(&definition.template);
                doc.append_child(root, fragment).map(|_| false)
            }
        };
        match populated {
            Ok(true) => {
                instance.mark_hydrated();
                instance.set_state(InstanceState::Hydrated);
                tracing::debug!(tag = %tag, "Hydrating existing content");
            }
            Ok(false) => instance.set_state(InstanceState::Populated),
            Err(e) => {
                tracing::error!(tag = %tag, "Cannot populate component: {}", e);
                self.render_fallback_for(instance.host(), &tag, instance.source(), ComponentError::from(e));
                return;
            }
        }

        let styled = {
            let mut doc = self.document.borrow_mut();
            styles::apply_styles(&mut doc, root, &tag, &definition, &self.config)
        };
        if let Err(e) = styled {
            tracing::warn!(tag = %tag, "Error applying styles: {}", e);
        }
        instance.set_state(InstanceState::StylesApplied);

        discovery::scan(self, root);

        let generation = instance.generation();
        scripts::execute_scripts(self, instance);
        instance.set_state(InstanceState::ScriptsExecuted);
        if !instance.is_live(generation) {
            return;
        }

        if let Some(reactivity) = &self.reactivity {
            reactivity.init(root);
            self.activate_props(instance, reactivity.as_ref());
            instance.set_state(InstanceState::ReactivityActive);
        }

        instance.set_state(InstanceState::Ready);
        self.notify_ready(instance);

        if definition.form_associated {
            let initial = self
                .document
                .borrow()
                .get_attribute(instance.host(), &self.config.value_attribute)
                .map(str::to_string);
            if let Some(value) = initial {
                instance.set_value(&value);
            }
        }
        tracing::info!(tag = %tag, id = instance.id(), hydrated = instance.is_hydrated(), "Component ready");
    }

    fn notify_ready(&self, instance: &ComponentInstance) {
        let hook = self.ready_hooks.borrow().get(instance.tag()).cloned();
        if let Some(hook) = hook {
            hook(instance);
            return;
        }
        let Some(reactivity) = &self.reactivity else {
            return;
        };
        if let Some(action) = reactivity.scope(instance.host()).action(CONTENT_READY_ACTION) {
            if let Err(e) = action(&[]) {
                tracing::warn!(tag = instance.tag(), "Error in {}: {}", CONTENT_READY_ACTION, e);
            }
        }
    }

    fn disconnect(&self, element: NodeId) {
        let Some(instance) = self.instances.borrow_mut().remove(&element) else {
            return;
        };
        self.retired.borrow_mut().insert(element);
        let observer = instance.props_observer();
        if !instance.disconnect() {
            return;
        }
        if let Some(id) = observer {
            self.observers.borrow_mut().remove(&id);
        }
        if let Some(host) = &self.host {
            host.release(instance.id());
        }
        if let Some(reactivity) = &self.reactivity {
            reactivity.release(instance.root());
            reactivity.release(instance.host());
        }
        tracing::info!(tag = instance.tag(), id = instance.id(), "Component disconnected");
    }

    /// Re-initialize reactivity for an instance moved to a new context
    fn adopt(&self, element: NodeId) {
        let Some(instance) = self.instances.borrow().get(&element).cloned() else {
            return;
        };
        if !instance.content_attached() || instance.state() == InstanceState::Disconnected {
            return;
        }
        if let Some(reactivity) = &self.reactivity {
            reactivity.init(instance.root());
            self.activate_props(&instance, reactivity.as_ref());
        }
        tracing::debug!(tag = instance.tag(), "Component adopted");
    }

    fn activate_props(&self, instance: &Rc<ComponentInstance>, reactivity: &dyn Reactivity) {
        let previous = instance.replace_props(None);
        if let Some(previous) = &previous {
            self.observers.borrow_mut().remove(&previous.observer());
        }
        let bridge = PropsBridge::activate(&self.document, &self.config, reactivity, instance.host(), previous);
        self.observers
            .borrow_mut()
            .insert(bridge.observer(), ObserverRole::Props(Rc::downgrade(instance)));
        instance.replace_props(Some(bridge));
    }

    fn apply_props(&self, instance: &ComponentInstance, records: &[MutationRecord]) {
        let Some(reactivity) = &self.reactivity else {
            return;
        };
        if let Some(bridge) = instance.props().as_ref() {
            bridge.apply(&self.document, &self.config, reactivity.as_ref(), instance.host(), records);
        }
    }

    fn render_fallback_for(self: &Rc<Self>, element: NodeId, tag: &str, src: &str, error: ComponentError) {
        let fallback_src = self
            .document
            .borrow()
            .get_attribute(element, &self.config.fallback_attribute)
            .map(str::to_string);
        fallback::spawn_render(self, FallbackRequest {
            element,
            tag: tag.to_string(),
            src: src.to_string(),
            fallback_src,
            error,
            guard: None,
        });
    }

    /// Forget caches and definitions
    pub(crate) fn reset(&self) {
        self.sources.clear();
        self.fallbacks.clear();
        self.registry.borrow_mut().clear();
        self.parsing.borrow_mut().clear();
        self.ready_hooks.borrow_mut().clear();
        self.document.borrow_mut().clear_custom_elements();
        tracing::debug!("Loader reset");
    }
}
