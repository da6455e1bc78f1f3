//! Fallback rendering
//!
//! Replaces an element's content (its shadow root's, when it has one) with
//! markup fetched from its fallback source, or a generic error message when
//! there is no fallback source or it cannot be fetched. The element never
//! ends up empty.

use std::rc::{Rc, Weak};

use fos_dom::NodeId;
use fos_html::HtmlParser;
use fos_net::NetError;

use crate::events::{self, COMPONENT_FALLBACK_RENDERED};
use crate::loader::Loader;
use crate::{ComponentError, ComponentInstance};

pub(crate) struct FallbackRequest {
    pub element: NodeId,
    pub tag: String,
    pub src: String,
    pub fallback_src: Option<String>,
    pub error: ComponentError,
    /// Instance whose teardown cancels the render
    pub guard: Option<(Weak<ComponentInstance>, u64)>,
}

/// Generic error content for `tag`
pub fn generic_content(tag: &str, src: &str) -> String {
    format!(
        r#"<p style="color: red; padding: 10px; border: 1px dashed red;">Error loading {} from {}.</p>"#,
        escape(tag),
        escape(src)
    )
}

pub(crate) fn spawn_render(loader: &Rc<Loader>, request: FallbackRequest) {
    let pending = request.fallback_src.as_deref().map(|src| loader.fallbacks.get(src));
    let weak = Rc::downgrade(loader);
    loader.spawn(async move {
        let fetched = match pending {
            Some(fetch) => Some(fetch.await),
            None => None,
        };
        if let Some(loader) = weak.upgrade() {
            render(&loader, &request, fetched);
        }
    });
}

fn render(loader: &Loader, request: &FallbackRequest, fetched: Option<Result<Rc<str>, NetError>>) {
    if let Some((instance, generation)) = &request.guard {
        if !instance.upgrade().is_some_and(|i| i.is_live(*generation)) {
            tracing::debug!(tag = %request.tag, "Instance torn down, skipping fallback");
            return;
        }
    }
    tracing::warn!(
        tag = %request.tag,
        "Rendering fallback for {} (Original Source: {}): {}",
        request.tag,
        request.src,
        request.error
    );

    let (content, loaded) = match fetched {
        Some(Ok(text)) if !text.is_empty() => (text.to_string(), true),
        Some(Ok(_)) => (generic_content(&request.tag, &request.src), false),
        Some(Err(e)) => {
            tracing::error!(tag = %request.tag, src = ?request.fallback_src, "Failed to fetch fallback content: {}", e);
            (generic_content(&request.tag, &request.src), false)
        }
        None => (generic_content(&request.tag, &request.src), false),
    };

    {
        let mut doc = loader.document.borrow_mut();
        let root = doc.shadow_root(request.element).unwrap_or(request.element);
        if let Err(e) = doc.clear_children(root) {
            tracing::error!(tag = %request.tag, "Cannot render fallback: {}", e);
            return;
        }
        for node in HtmlParser::new().parse_fragment_into(&mut doc, &content) {
            if let Err(e) = doc.append_child(root, node) {
                tracing::warn!(tag = %request.tag, "Dropping fallback node: {}", e);
            }
        }
    }

    events::emit(
        &loader.document,
        request.element,
        COMPONENT_FALLBACK_RENDERED,
        events::fallback_rendered(&request.tag, &request.src, request.fallback_src.as_deref(), &request.error, loaded),
    );
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
