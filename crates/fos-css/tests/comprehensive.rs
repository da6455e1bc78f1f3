//! Comprehensive tests for fos-css
//!
//! Compilation of component stylesheets and host rewriting.

use fos_css::{compile, rewrite_host_selectors, CssError, CssParser};

#[test]
fn test_compile_empty() {
    let sheet = compile("").unwrap();
    assert!(sheet.css_text().trim().is_empty());
}

#[test]
fn test_compile_host_selectors() {
    let css = r#"
        :host { display: block; }
        :host(.active) p { color: blue; }
        p { margin: 0; }
    "#;
    let sheet = compile(css).unwrap();
    assert!(sheet.css_text().contains(":host"));
    assert!(sheet.css_text().contains("margin"));
}

#[test]
fn test_compile_media_and_custom_properties() {
    let css = r#"
        @media (max-width: 600px) {
            .card { padding: var(--gap, 4px); }
        }
        :host { --gap: 8px; }
    "#;
    let sheet = compile(css).unwrap();
    assert!(sheet.css_text().contains("@media"));
    assert!(sheet.css_text().contains("--gap"));
}

#[test]
fn test_compile_each_call_is_a_new_sheet() {
    let a = compile("p { color: red }").unwrap();
    let b = compile("p { color: red }").unwrap();
    assert_eq!(a.css_text(), b.css_text());
    assert_ne!(a.id(), b.id());
}

#[test]
fn test_compile_error_reports_line() {
    let err = CssParser::new().compile("p { color: red }\n\ndiv[ { margin: 0 }").unwrap_err();
    match err {
        CssError::ParseError { line, .. } => assert_eq!(line, 3),
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_rewrite_full_sheet() {
    let css = ":host { display: block }\n:host(.on) .dot, :host-context(body.dark) .dot { color: lime }";
    let rewritten = rewrite_host_selectors(css, "x-lamp");
    assert_eq!(
        rewritten,
        "x-lamp { display: block }\nx-lamp.on .dot, body.dark x-lamp .dot { color: lime }"
    );
    // Rewritten text still compiles
    assert!(compile(&rewritten).is_ok());
}

#[test]
fn test_rewrite_without_host_is_identity() {
    let css = "p { color: red }";
    assert_eq!(rewrite_host_selectors(css, "x-a"), css);
}
