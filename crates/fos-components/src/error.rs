//! Component errors

use fos_dom::DomError;
use fos_js::{EvalError, ScriptError};
use fos_net::NetError;

/// Failures anywhere in the component pipeline
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ComponentError {
    #[error("Failed to fetch component: {0}")]
    Fetch(#[from] NetError),

    #[error("Component HTML for {tag} must be wrapped in a <template> tag")]
    MissingTemplate { tag: String, src: String },

    #[error("Error importing module {specifier}: {error}")]
    ModuleImport { specifier: String, error: ScriptError },

    #[error("Error executing inline script: {0}")]
    InlineScript(ScriptError),

    #[error("Cannot evaluate expression: {0}")]
    Evaluation(#[from] EvalError),

    #[error("Invalid custom element name: {0}")]
    InvalidName(String),

    #[error(transparent)]
    Dom(#[from] DomError),
}

impl ComponentError {
    /// Error kind as reported in event details
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "network-fetch",
            Self::MissingTemplate { .. } => "parsing-error",
            Self::ModuleImport { .. } => "module-import",
            Self::InlineScript(_) => "inline-script-execution",
            Self::Evaluation(_) => "evaluation",
            Self::InvalidName(_) | Self::Dom(_) => "definition",
        }
    }

    /// The same failure reported against `tag`. Parse failures name the
    /// tag that started the parse; other tags sharing the source get their own.
    pub(crate) fn for_tag(self, tag: &str) -> Self {
        match self {
            Self::MissingTemplate { src, .. } => Self::MissingTemplate { tag: tag.to_string(), src },
            other => other,
        }
    }

    /// HTTP status of a failed fetch
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Fetch(e) => e.status(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        let fetch = ComponentError::from(NetError::Http { status: 404, status_text: "Not Found".into() });
        assert_eq!(fetch.kind(), "network-fetch");
        assert_eq!(fetch.status_code(), Some(404));

        let parse = ComponentError::MissingTemplate { tag: "x-card".into(), src: "/c/card.html".into() };
        assert_eq!(parse.kind(), "parsing-error");
        assert!(parse.to_string().contains("x-card"));
        assert_eq!(parse.status_code(), None);

        let inline = ComponentError::InlineScript(ScriptError::Execution("boom".into()));
        assert_eq!(inline.kind(), "inline-script-execution");
    }

    #[test]
    fn test_for_tag() {
        let parse = ComponentError::MissingTemplate { tag: "x-alpha".into(), src: "/c/shared.html".into() };
        assert_eq!(
            parse.for_tag("x-beta"),
            ComponentError::MissingTemplate { tag: "x-beta".into(), src: "/c/shared.html".into() }
        );

        let fetch = ComponentError::from(NetError::Network("reset".into()));
        assert_eq!(fetch.clone().for_tag("x-beta"), fetch);
    }
}
