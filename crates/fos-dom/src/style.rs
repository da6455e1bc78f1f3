//! Inline style declarations
//!
//! The `style` attribute parsed into ordered declarations, the way
//! `element.style` exposes it.

/// Parsed `style` attribute
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineStyle {
    declarations: Vec<(String, String)>,
}

impl InlineStyle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `a: b; c: d`
    pub fn parse(text: &str) -> Self {
        let declarations = text
            .split(';')
            .filter_map(|decl| {
                let (name, value) = decl.split_once(':')?;
                let name = name.trim();
                if name.is_empty() {
                    return None;
                }
                Some((normalize_name(name), value.trim().to_string()))
            })
            .collect();
        Self { declarations }
    }

    /// Get a property value
    pub fn get_property_value(&self, name: &str) -> Option<&str> {
        let name = normalize_name(name);
        self.declarations.iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set a property; an empty value removes it
    pub fn set_property(&mut self, name: &str, value: &str) {
        let name = normalize_name(name);
        let value = value.trim();
        if value.is_empty() {
            self.remove_property(&name);
            return;
        }
        match self.declarations.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.declarations.push((name, value.to_string())),
        }
    }

    /// Remove a property, returning its value
    pub fn remove_property(&mut self, name: &str) -> Option<String> {
        let name = normalize_name(name);
        let pos = self.declarations.iter().position(|(n, _)| *n == name)?;
        Some(self.declarations.remove(pos).1)
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Serialize back to attribute text
    pub fn to_css_text(&self) -> String {
        self.declarations.iter()
            .map(|(n, v)| format!("{}: {};", n, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// Custom properties are case-sensitive, everything else is not.
fn normalize_name(name: &str) -> String {
    if name.starts_with("--") {
        name.to_string()
    } else {
        name.to_ascii_lowercase()
    }
}
