//! End to end with the QuickJS host, serving components from disk

#![cfg(feature = "quickjs")]

use std::cell::RefCell;
use std::rc::Rc;

use fos_components::events::COMPONENT_SCRIPT_ERROR;
use fos_components::{Components, InstanceState};
use fos_dom::{DocumentHandle, Event, NodeId};
use fos_js::Reactivity;
use fos_net::FileFetcher;
use serde_json::{json, Value};

const CARD: &str = r#"<template>
    <style>:host { display: block; }</style>
    <h2 class="title">Card</h2>
    <script>
        setCssVariable('--accent', 'teal');
        ds.set('count', 1);
        registerCleanup(() => setCssVariable('--accent', 'gone'));
    </script>
    <script>
        emit('picked', { id: this.scopedId('title'), count: ds.get('count') + 1 });
    </script>
</template>"#;

fn listen(doc: &DocumentHandle, name: &str) -> Rc<RefCell<Vec<Value>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let body = doc.borrow().body();
    doc.borrow_mut().add_event_listener(body, name, Rc::new(move |e: &Event| {
        sink.borrow_mut().push(e.detail.clone());
    }));
    seen
}

fn find(doc: &DocumentHandle, tag: &str) -> Option<NodeId> {
    let doc = doc.borrow();
    doc.descendant_elements(doc.body()).into_iter().find(|&id| doc.tag_name(id) == Some(tag))
}

#[test]
fn test_scripts_run_in_quickjs() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::create_dir(dir.path().join("c"))?;
    std::fs::write(dir.path().join("c/card.html"), CARD)?;

    let doc: DocumentHandle = Rc::new(RefCell::new(fos_html::parse(
        r#"<body><x-card data-component-src="/c/card.html"></x-card></body>"#,
    )));
    let picked = listen(&doc, "picked");
    let failures = listen(&doc, COMPONENT_SCRIPT_ERROR);

    let components = Components::builder(doc.clone(), Rc::new(FileFetcher::new(dir.path())))
        .signal_runtime()
        .build();
    components.start();
    components.block_until_settled();

    let card = find(&doc, "x-card").ok_or_else(|| anyhow::anyhow!("card missing"))?;
    let instance = components.instance(card).ok_or_else(|| anyhow::anyhow!("no instance"))?;
    assert_eq!(instance.state(), InstanceState::Ready);
    assert!(failures.borrow().is_empty(), "{:?}", failures.borrow());

    let expected = json!({ "id": format!("x-card-{}-title", instance.id()), "count": 2 });
    assert_eq!(*picked.borrow(), vec![expected]);
    assert_eq!(doc.borrow().style_property(card, "--accent").as_deref(), Some("teal"));

    let reactivity = components.reactivity().ok_or_else(|| anyhow::anyhow!("no reactivity"))?;
    assert_eq!(reactivity.scope(card).signal("count").map(|s| s.get()), Some(json!(1)));

    doc.borrow_mut().remove(card)?;
    components.run_until_idle();
    assert_eq!(instance.state(), InstanceState::Disconnected);
    assert_eq!(doc.borrow().style_property(card, "--accent").as_deref(), Some("gone"));
    Ok(())
}

#[test]
fn test_script_exception_is_reported() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("broken.html"), "<template><p>Broken</p><script>missingFn();</script></template>")?;

    let doc: DocumentHandle = Rc::new(RefCell::new(fos_html::parse(
        r#"<body><x-broken data-component-src="/broken.html"></x-broken></body>"#,
    )));
    let failures = listen(&doc, COMPONENT_SCRIPT_ERROR);

    let components = Components::builder(doc.clone(), Rc::new(FileFetcher::new(dir.path()))).build();
    components.start();
    components.block_until_settled();

    let failures = failures.borrow();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0]["type"], "inline-script-execution");
    let message = failures[0]["originalError"].as_str().unwrap_or_default();
    assert!(message.contains("missingFn"), "{}", message);
    Ok(())
}

#[test]
fn test_nested_component_does_not_see_parent_props() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(
        dir.path().join("outer.html"),
        r#"<template><section><x-inner data-component-src="/inner.html"></x-inner></section></template>"#,
    )?;
    std::fs::write(
        dir.path().join("inner.html"),
        "<template><p>Inner</p><script>emit('seen', { props: $props });</script></template>",
    )?;

    let doc: DocumentHandle = Rc::new(RefCell::new(fos_html::parse(
        r#"<body><x-outer data-component-src="/outer.html" data-prop-title="'Parent'"></x-outer></body>"#,
    )));
    let seen = listen(&doc, "seen");

    let components = Components::builder(doc.clone(), Rc::new(FileFetcher::new(dir.path())))
        .signal_runtime()
        .build();
    components.start();
    components.block_until_settled();

    let outer = find(&doc, "x-outer").ok_or_else(|| anyhow::anyhow!("outer missing"))?;
    let reactivity = components.reactivity().ok_or_else(|| anyhow::anyhow!("no reactivity"))?;
    let outer_props = reactivity.scope(outer).signal(fos_js::PROPS_SIGNAL).map(|s| s.get());
    assert_eq!(outer_props, Some(json!({ "title": "Parent" })));

    let inner = find(&doc, "x-inner").ok_or_else(|| anyhow::anyhow!("inner missing"))?;
    assert_eq!(components.instance(inner).map(|i| i.state()), Some(InstanceState::Ready));
    assert_eq!(*seen.borrow(), vec![json!({ "props": null })]);
    Ok(())
}
