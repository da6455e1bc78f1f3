//! Comprehensive tests for fos-html
//!
//! Parsing component sources, declarative shadow roots and fragment import.

use fos_html::{get_inner_html, Document, HtmlParser};

fn find(doc: &Document, tag: &str) -> fos_dom::NodeId {
    doc.descendant_elements(doc.root())
        .into_iter()
        .find(|&id| doc.tag_name(id) == Some(tag))
        .unwrap_or_else(|| panic!("no <{}>", tag))
}

#[test]
fn test_parse_empty() {
    let doc = HtmlParser::new().parse("");
    assert!(doc.len() >= 1, "Even empty HTML should have root");
    assert!(doc.body().is_valid());
}

#[test]
fn test_parse_component_source() {
    let html = r#"
        <template shadowroot="open" data-form-associated>
            <style>:host { display: block; }</style>
            <p class="greeting">Hello <b>there</b></p>
            <script type="module" src="/c/greet.js"></script>
            <script>emit('ready', {})</script>
        </template>
    "#;
    let doc = HtmlParser::new().parse_with_url(html, "https://example.com/c/greet.html");
    assert_eq!(doc.url(), "https://example.com/c/greet.html");

    let template = find(&doc, "template");
    assert!(doc.has_attribute(template, "data-form-associated"));

    let content = doc.template_content(template).unwrap();
    let names: Vec<_> = doc.element_children(content)
        .into_iter()
        .filter_map(|id| doc.tag_name(id).map(str::to_string))
        .collect();
    assert_eq!(names, vec!["style", "p", "script", "script"]);
}

#[test]
fn test_declarative_shadow_root() {
    let html = r#"<body><x-card data-component-src="/c/card.html"><template shadowrootmode="open"><span>pre-rendered</span></template></x-card></body>"#;
    let doc = HtmlParser::new().parse(html);

    let host = find(&doc, "x-card");
    let root = doc.shadow_root(host).expect("declarative shadow root");
    let data = doc.shadow_root_data(root).unwrap();
    assert!(data.declarative);
    assert_eq!(doc.text_content(root), "pre-rendered");
    assert!(doc.children(host).is_empty());
}

#[test]
fn test_declarative_shadow_on_unsupported_host_stays_template() {
    let html = r#"<body><table><tr><td><template shadowrootmode="open">x</template></td></tr></table></body>"#;
    let doc = HtmlParser::new().parse(html);

    let td = find(&doc, "td");
    assert!(doc.shadow_root(td).is_none());
    assert_eq!(doc.tag_name(doc.children(td)[0]), Some("template"));
}

#[test]
fn test_parse_fragment_into_document() {
    let mut doc = Document::default();
    let nodes = HtmlParser::new().parse_fragment_into(&mut doc, "<p>Fallback</p><em>!</em>");

    assert_eq!(nodes.len(), 2);
    assert!(nodes.iter().all(|&n| doc.parent(n).is_none()));

    let body = doc.body();
    for node in nodes {
        doc.append_child(body, node).unwrap();
    }
    assert_eq!(get_inner_html(&doc, body), "<p>Fallback</p><em>!</em>");
}

#[test]
fn test_serialize_template_contents() {
    let doc = HtmlParser::new().parse("<body><template><i>x</i></template></body>");
    assert_eq!(get_inner_html(&doc, doc.body()), "<template><i>x</i></template>");
}

#[test]
fn test_attribute_case_and_escaping() {
    let doc = HtmlParser::new().parse(r#"<body><div DATA-Prop-Count="1 &amp; 2"></div></body>"#);
    let div = find(&doc, "div");
    assert_eq!(doc.get_attribute(div, "data-prop-count"), Some("1 & 2"));
    assert_eq!(get_inner_html(&doc, doc.body()), r#"<div data-prop-count="1 &amp; 2"></div>"#);
}
