//! Loader events
//!
//! Every event the loader dispatches bubbles and is composed, so a listener
//! on the document sees failures from inside isolated roots too.

use fos_dom::{dispatch_event, DocumentHandle, Event, NodeId};
use serde_json::{json, Value};

use crate::ComponentError;

/// Definition failed: fetch or parse
pub const COMPONENT_LOAD_ERROR: &str = "component-load-error";

/// A behaviour unit of a live instance failed
pub const COMPONENT_SCRIPT_ERROR: &str = "component-script-error";

/// Fallback content replaced an element's children
pub const COMPONENT_FALLBACK_RENDERED: &str = "component-fallback-rendered";

pub(crate) fn emit(document: &DocumentHandle, target: NodeId, name: &str, detail: Value) -> usize {
    tracing::debug!(event = name, %target, "Emitting loader event");
    dispatch_event(document, target, Event::new(name, detail))
}

pub(crate) fn load_error(tag: &str, src: &str, error: &ComponentError) -> Value {
    json!({
        "tagName": tag,
        "src": src,
        "message": error.to_string(),
        "type": error.kind(),
        "originalError": cause(error),
        "statusCode": error.status_code(),
    })
}

pub(crate) fn script_error(tag: &str, src: &str, script_src: Option<&str>, error: &ComponentError) -> Value {
    json!({
        "tagName": tag,
        "src": src,
        "scriptSrc": script_src,
        "message": error.to_string(),
        "type": error.kind(),
        "originalError": cause(error),
    })
}

pub(crate) fn fallback_rendered(
    tag: &str,
    original_src: &str,
    fallback_src: Option<&str>,
    error: &ComponentError,
    loaded: bool,
) -> Value {
    json!({
        "tagName": tag,
        "originalSrc": original_src,
        "fallbackSrc": fallback_src,
        "originalError": error.to_string(),
        "message": format!("Fallback rendered for {}.", tag),
        "fallbackLoaded": loaded,
    })
}

/// Message of the underlying failure, without the pipeline prefix
fn cause(error: &ComponentError) -> String {
    match error {
        ComponentError::Fetch(e) => e.to_string(),
        ComponentError::ModuleImport { error, .. } | ComponentError::InlineScript(error) => error.to_string(),
        ComponentError::Evaluation(e) => e.to_string(),
        ComponentError::Dom(e) => e.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use fos_js::ScriptError;
    use fos_net::NetError;

    use super::*;

    #[test]
    fn test_load_error_detail() {
        let error = ComponentError::from(NetError::Http { status: 404, status_text: "Not Found".into() });
        let detail = load_error("x-card", "/c/card.html", &error);

        assert_eq!(detail["tagName"], "x-card");
        assert_eq!(detail["type"], "network-fetch");
        assert_eq!(detail["statusCode"], 404);
        assert!(detail["message"].as_str().unwrap().starts_with("Failed to fetch component"));
    }

    #[test]
    fn test_script_error_detail() {
        let error = ComponentError::ModuleImport {
            specifier: "/c/card.js".into(),
            error: ScriptError::ModuleNotFound("/c/card.js".into()),
        };
        let detail = script_error("x-card", "/c/card.html", Some("/c/card.js"), &error);

        assert_eq!(detail["type"], "module-import");
        assert_eq!(detail["scriptSrc"], "/c/card.js");
        assert_eq!(detail["originalError"], "Module not found: /c/card.js");
    }

    #[test]
    fn test_fallback_detail_without_source() {
        let error = ComponentError::InvalidName("card".into());
        let detail = fallback_rendered("card", "/c/card.html", None, &error, false);

        assert!(detail["fallbackSrc"].is_null());
        assert_eq!(detail["message"], "Fallback rendered for card.");
        assert_eq!(detail["fallbackLoaded"], false);
    }
}
