//! Placeholder discovery
//!
//! A placeholder is an element carrying the source attribute whose tag is
//! not defined yet. Scans cover a root and its light descendants; the body
//! observer feeds newly inserted subtrees and load-condition changes back
//! into `scan`.

use std::rc::Rc;

use fos_dom::{Document, MutationObserverInit, MutationRecord, MutationType, NodeId};
use fos_js::is_truthy;

use crate::fallback::{self, FallbackRequest};
use crate::loader::Loader;
use crate::{ComponentError, Config};

struct Candidate {
    element: NodeId,
    tag: String,
    src: String,
    load_if: Option<String>,
}

/// Observer options for the document body
pub(crate) fn observer_options(loader: &Loader) -> MutationObserverInit {
    MutationObserverInit {
        child_list: true,
        subtree: true,
        attributes: true,
        attribute_filter: Some(vec![loader.config.load_if_attribute.clone()]),
        ..Default::default()
    }
}

/// Find and start defining every placeholder under `root`, `root` included
pub(crate) fn scan(loader: &Rc<Loader>, root: NodeId) {
    let candidates = collect(loader, root);
    if candidates.is_empty() {
        return;
    }
    tracing::debug!(%root, found = candidates.len(), "Scanning for components");

    for candidate in candidates {
        if let Err(e) = consider(loader, &candidate) {
            tracing::error!(tag = %candidate.tag, "Error during component definition from scan: {}", e);
            let fallback_src = loader
                .document
                .borrow()
                .get_attribute(candidate.element, &loader.config.fallback_attribute)
                .map(str::to_string);
            fallback::spawn_render(loader, FallbackRequest {
                element: candidate.element,
                tag: candidate.tag,
                src: candidate.src,
                fallback_src,
                error: e,
                guard: None,
            });
        }
    }
}

/// Feed observer records back into `scan`
pub(crate) fn handle_records(loader: &Rc<Loader>, records: &[MutationRecord]) {
    let mut roots: Vec<NodeId> = Vec::new();
    {
        let doc = loader.document.borrow();
        for record in records {
            match record.mutation_type {
                MutationType::ChildList => {
                    for &added in &record.added_nodes {
                        if doc.is_element(added) && doc.is_connected(added) && !roots.contains(&added) {
                            roots.push(added);
                        }
                    }
                }
                MutationType::Attributes => {
                    let load_if = record.attribute_name.as_deref() == Some(loader.config.load_if_attribute.as_str());
                    if load_if && !roots.contains(&record.target) {
                        roots.push(record.target);
                    }
                }
                MutationType::CharacterData => {}
            }
        }
    }
    for root in roots {
        scan(loader, root);
    }
}

fn collect(loader: &Loader, root: NodeId) -> Vec<Candidate> {
    let config = &loader.config;
    let doc = loader.document.borrow();
    std::iter::once(root)
        .chain(doc.descendant_elements(root))
        .filter_map(|element| candidate(&doc, config, element))
        .collect()
}

fn candidate(doc: &Document, config: &Config, element: NodeId) -> Option<Candidate> {
    let src = doc.get_attribute(element, &config.src_attribute)?;
    let tag = doc.tag_name(element)?;
    if doc.is_custom_element_defined(tag) {
        return None;
    }
    Some(Candidate {
        element,
        tag: tag.to_string(),
        src: src.to_string(),
        load_if: doc.get_attribute(element, &config.load_if_attribute).map(str::to_string),
    })
}

fn consider(loader: &Rc<Loader>, candidate: &Candidate) -> Result<(), ComponentError> {
    if !Document::is_valid_custom_element_name(&candidate.tag) {
        return Err(ComponentError::InvalidName(candidate.tag.clone()));
    }
    if let Some(expression) = &candidate.load_if {
        if !should_load(loader, candidate, expression)? {
            return Ok(());
        }
    }
    loader.request_definition(candidate.element, &candidate.tag, &candidate.src);
    Ok(())
}

/// Evaluate the load condition. Falsy hides the element and skips it;
/// truthy clears a hide. Evaluation failures let the load proceed.
fn should_load(loader: &Loader, candidate: &Candidate, expression: &str) -> Result<bool, ComponentError> {
    let Some(reactivity) = &loader.reactivity else {
        return Ok(true);
    };
    let scope = reactivity.scope(candidate.element);
    match reactivity.evaluate(expression, Some(&scope)) {
        Ok(value) if is_truthy(&value) => {
            loader.document.borrow_mut().remove_style_property(candidate.element, "display")?;
            Ok(true)
        }
        Ok(_) => {
            tracing::info!(tag = %candidate.tag, "Skipping component: load condition {:?} is false", expression);
            loader.document.borrow_mut().set_style_property(candidate.element, "display", "none")?;
            Ok(false)
        }
        Err(e) => {
            tracing::warn!(tag = %candidate.tag, "Error evaluating load condition {:?}: {}", expression, e);
            Ok(true)
        }
    }
}
