//! Behaviour execution
//!
//! Units run in source order. Inline units run synchronously against the
//! instance context and are followed by a reactive re-scan of the root.
//! External units are imported asynchronously; their `init` runs and their
//! actions are registered only if the instance is still live when the
//! import settles.

use std::rc::Rc;

use fos_js::{ScriptContext, ScriptError, ScriptUnit};
use futures::future::FutureExt;

use crate::events::{self, COMPONENT_SCRIPT_ERROR};
use crate::fallback::{self, FallbackRequest};
use crate::loader::Loader;
use crate::{ComponentError, ComponentInstance};

pub(crate) fn execute_scripts(loader: &Rc<Loader>, instance: &Rc<ComponentInstance>) {
    let definition = instance.definition().clone();
    if definition.scripts.is_empty() {
        return;
    }
    let context = instance.script_context(loader.reactivity.clone());
    for unit in &definition.scripts {
        if unit.is_external() {
            spawn_import(loader, instance, unit, context.clone());
        } else {
            run_inline(loader, instance, unit, &context);
        }
    }
}

fn run_inline(loader: &Rc<Loader>, instance: &Rc<ComponentInstance>, unit: &ScriptUnit, context: &ScriptContext) {
    let result = match &loader.host {
        Some(host) => host.run_inline(unit, context),
        None => Err(ScriptError::Execution("no script host configured".into())),
    };
    match result {
        Ok(()) => {
            if let Some(reactivity) = &loader.reactivity {
                reactivity.scan(instance.root());
            }
        }
        Err(e) => report_failure(loader, instance, None, ComponentError::InlineScript(e)),
    }
}

fn spawn_import(loader: &Rc<Loader>, instance: &Rc<ComponentInstance>, unit: &ScriptUnit, context: ScriptContext) {
    let specifier = unit.src.clone().unwrap_or_default();
    let import = match &loader.host {
        Some(host) => host.import(&specifier),
        None => {
            let error = ScriptError::ModuleNotFound(specifier.clone());
            async move { Err(error) }.boxed_local()
        }
    };
    let generation = instance.generation();
    let weak_loader = Rc::downgrade(loader);
    let weak_instance = Rc::downgrade(instance);

    loader.spawn(async move {
        let result = import.await;
        let (Some(loader), Some(instance)) = (weak_loader.upgrade(), weak_instance.upgrade()) else {
            return;
        };
        if !instance.is_live(generation) {
            tracing::debug!(tag = instance.tag(), specifier = %specifier, "Instance torn down, dropping module");
            return;
        }

        let outcome = result.and_then(|exports| {
            if let Some(init) = &exports.init {
                init(&context)?;
            }
            Ok(exports)
        });
        match outcome {
            Ok(exports) => {
                tracing::debug!(tag = instance.tag(), specifier = %specifier, actions = exports.actions.len(), "Module initialized");
                if let Some(reactivity) = &loader.reactivity {
                    if !exports.actions.is_empty() {
                        reactivity.register_actions(&exports.actions, instance.host());
                    }
                }
            }
            Err(error) => {
                let failure = ComponentError::ModuleImport { specifier: specifier.clone(), error };
                report_failure(&loader, &instance, Some(&specifier), failure);
            }
        }
    });
}

/// Report a behaviour failure from the host, then render the fallback if
/// the host names one
pub(crate) fn report_failure(
    loader: &Rc<Loader>,
    instance: &Rc<ComponentInstance>,
    script_src: Option<&str>,
    error: ComponentError,
) {
    tracing::error!(tag = instance.tag(), src = instance.source(), "{}", error);
    events::emit(
        &loader.document,
        instance.host(),
        COMPONENT_SCRIPT_ERROR,
        events::script_error(instance.tag(), instance.source(), script_src, &error),
    );

    let fallback_src = loader
        .document
        .borrow()
        .get_attribute(instance.host(), &loader.config.fallback_attribute)
        .map(str::to_string);
    if let Some(fallback_src) = fallback_src {
        fallback::spawn_render(loader, FallbackRequest {
            element: instance.host(),
            tag: instance.tag().to_string(),
            src: instance.source().to_string(),
            fallback_src: Some(fallback_src),
            error,
            guard: Some((Rc::downgrade(instance), instance.generation())),
        });
    }
}
