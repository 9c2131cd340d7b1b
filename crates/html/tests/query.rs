#![cfg(test)]

use std::error::Error;

use html::parse_fragment;

const ARTICLE: &str = "<section id=\"wenyan\">\
    <h1>Title</h1>\
    <p>See <a href=\"https://a.example\">a</a> and <a name=\"anchor\">b</a>.</p>\
    <pre><code class=\"hljs language-rust\">fn main() {}</code></pre>\
    <ul><li>one</li><li class=\"x\">two</li></ul>\
    </section>";

#[test]
fn descendant_queries_from_content_root() -> Result<(), Box<dyn Error>> {
    let _ = env_logger::builder().is_test(true).try_init();
    let dom = parse_fragment(ARTICLE)?;
    let root = dom
        .get_element_by_id(dom.root(), "wenyan")
        .ok_or("missing root")?;

    let headings = dom.query_selector_all(root, "h1")?;
    assert_eq!(headings.len(), 1);

    let links = dom.query_selector_all(root, "a[href]")?;
    assert_eq!(links.len(), 1);
    assert_eq!(dom.text_content(links[0]), "a");

    let code = dom.query_selector_all(root, "#wenyan pre code")?;
    assert_eq!(code.len(), 1);
    assert_eq!(dom.query_selector_all(root, ".hljs")?, code);

    let items = dom.query_selector_all(root, "li + li.x, h1 ~ ul > li")?;
    assert_eq!(items.len(), 2);
    Ok(())
}

#[test]
fn invalid_selector_is_an_error() -> Result<(), Box<dyn Error>> {
    let dom = parse_fragment(ARTICLE)?;
    assert!(dom.query_selector_all(dom.root(), "li:first-child").is_err());
    assert!(dom.query_selector_all(dom.root(), "ul >").is_err());
    Ok(())
}

#[test]
fn query_does_not_return_the_scope_itself() -> Result<(), Box<dyn Error>> {
    let dom = parse_fragment(ARTICLE)?;
    let root = dom.query_selector(dom.root(), "#wenyan")?.ok_or("missing root")?;
    assert!(dom.query_selector_all(root, "section")?.is_empty());
    Ok(())
}

#[test]
fn inner_html_replacement_and_serialization() -> Result<(), Box<dyn Error>> {
    let mut dom = parse_fragment(ARTICLE)?;
    let root = dom.query_selector(dom.root(), "#wenyan")?.ok_or("missing root")?;
    let heading = dom.query_selector(root, "h1")?.ok_or("missing h1")?;
    dom.set_inner_html(heading, "<span>New</span> title")?;
    assert_eq!(dom.outer_html(heading), "<h1><span>New</span> title</h1>");
    Ok(())
}
