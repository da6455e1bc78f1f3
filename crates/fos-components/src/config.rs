//! Loader configuration

use serde::Deserialize;

/// Loader configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Placeholder attribute naming the component source
    pub src_attribute: String,

    /// Conditional-load expression attribute
    pub load_if_attribute: String,

    /// Fallback markup source attribute
    pub fallback_attribute: String,

    /// Reserved prefix for observed props
    pub prop_prefix: String,

    /// Mode attribute on the source's `<template>`
    pub isolation_attribute: String,

    /// Form-association marker
    pub form_associated_attribute: String,

    /// Initial value attribute for form-associated instances
    pub value_attribute: String,

    /// Compile isolated styles into shared constructable sheets
    pub constructable_stylesheets: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            src_attribute: "data-component-src".into(),
            load_if_attribute: "data-load-if".into(),
            fallback_attribute: "data-component-error-src".into(),
            prop_prefix: "data-prop-".into(),
            isolation_attribute: "shadowroot".into(),
            form_associated_attribute: "data-form-associated".into(),
            value_attribute: "value".into(),
            constructable_stylesheets: true,
        }
    }
}

impl Config {
    /// Load from JSON; missing keys keep their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Prop key for an attribute name under the reserved prefix
    pub fn prop_key<'a>(&self, attribute: &'a str) -> Option<&'a str> {
        attribute.strip_prefix(self.prop_prefix.as_str()).filter(|key| !key.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json() {
        let config = Config::from_json(r#"{ "prop_prefix": "data-p-", "constructable_stylesheets": false }"#).unwrap();
        assert_eq!(config.prop_prefix, "data-p-");
        assert!(!config.constructable_stylesheets);
        assert_eq!(config.src_attribute, "data-component-src");
    }

    #[test]
    fn test_prop_key() {
        let config = Config::default();
        assert_eq!(config.prop_key("data-prop-title"), Some("title"));
        assert_eq!(config.prop_key("data-prop-"), None);
        assert_eq!(config.prop_key("data-title"), None);
    }
}
