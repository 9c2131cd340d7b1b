#![cfg(test)]

use std::error::Error;

use css::{
    CssApplier, CssModifier, UpdateDirective, UpdateTable, apply_pseudo_elements,
    resolve_variables,
};
use html::{DOM, NodeId, parse_fragment};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn content(html: &str) -> Result<(DOM, NodeId), Box<dyn Error>> {
    let dom = parse_fragment(html)?;
    let root = dom
        .get_element_by_id(dom.root(), "wenyan")
        .ok_or("missing content root")?;
    Ok((dom, root))
}

#[test]
fn before_content_becomes_first_child() -> Result<(), Box<dyn Error>> {
    init_logging();
    let (mut dom, root) = content("<section id=\"wenyan\"><h1>Title</h1></section>")?;
    apply_pseudo_elements(&mut dom, root, "h1::before{content:\"X\";}")?;
    let heading = dom.query_selector(root, "h1")?.ok_or("missing h1")?;
    let first = dom.first_child(heading).ok_or("no children")?;
    assert_eq!(dom.tag_name(first), Some("section"));
    assert_eq!(dom.text_content(first), "X");
    assert_eq!(dom.outer_html(heading), "<h1><section>X</section>Title</h1>");
    Ok(())
}

#[test]
fn after_inline_svg_becomes_last_child() -> Result<(), Box<dyn Error>> {
    init_logging();
    let (mut dom, root) = content("<div id=\"wenyan\"><pre><code>x</code></pre></div>")?;
    apply_pseudo_elements(
        &mut dom,
        root,
        "pre::after{background-image:url(\"data:image/svg+xml;utf8,<svg></svg>\");}",
    )?;
    let pre = dom.query_selector(root, "pre")?.ok_or("missing pre")?;
    let last = dom.last_child(pre).ok_or("no children")?;
    assert_eq!(dom.inner_html(last), "<svg></svg>");
    assert_eq!(dom.get_attribute(last, "style"), None);
    Ok(())
}

#[test]
fn every_matching_element_gets_its_own_node() -> Result<(), Box<dyn Error>> {
    let (mut dom, root) =
        content("<div id=\"wenyan\"><blockquote>a</blockquote><blockquote>b</blockquote></div>")?;
    apply_pseudo_elements(&mut dom, root, "blockquote::before{content:'>';color:gray;}")?;
    assert_eq!(
        dom.inner_html(root),
        "<blockquote><section style=\"color: gray;\">&gt;</section>a</blockquote>\
         <blockquote><section style=\"color: gray;\">&gt;</section>b</blockquote>"
    );
    Ok(())
}

#[test]
fn modifier_adds_missing_property_only() -> Result<(), Box<dyn Error>> {
    let mut table = UpdateTable::new();
    table.insert("p", UpdateDirective::insert_if_absent("font-size", "12px"));
    let out = CssModifier::new(table).modify("p { color: blue; }")?;
    assert!(out.contains("color: blue"));
    assert!(out.contains("font-size: 12px"));
    Ok(())
}

#[test]
fn end_to_end_theme_application() -> Result<(), Box<dyn Error>> {
    init_logging();
    let theme = ":root { --main: #112233; }\n\
                 #wenyan { line-height: 1.75; }\n\
                 #wenyan body, #wenyan p { color: var(--main); }\n\
                 #wenyan h1::after { content: \"§\"; }\n\
                 #wenyan a:hover { color: red; }";
    let (mut dom, root) = content(
        "<section id=\"wenyan\"><h1>Heading</h1><p>Body <a href=\"#\">link</a></p></section>",
    )?;

    let resolved = resolve_variables(theme);
    assert!(!resolved.contains("var("));
    let mut table = UpdateTable::new();
    table.insert(
        "#wenyan",
        UpdateDirective::insert_if_absent("font-family", css::SANS_SERIF),
    );
    let modified = CssModifier::new(table).modify(&resolved)?;
    CssApplier::new(&modified)?.apply(&mut dom, root)?;
    apply_pseudo_elements(&mut dom, root, &modified)?;

    let para = dom.query_selector(root, "p")?.ok_or("missing p")?;
    assert_eq!(dom.get_attribute(para, "style"), Some("color: #112233;"));
    let root_style = dom.get_attribute(root, "style").ok_or("root not styled")?;
    assert!(root_style.starts_with("font-family: system-ui"));
    assert!(root_style.ends_with("line-height: 1.75;"));

    let heading = dom.query_selector(root, "h1")?.ok_or("missing h1")?;
    let last = dom.last_child(heading).ok_or("no children")?;
    assert_eq!(dom.text_content(last), "§");
    let link = dom.query_selector(root, "a")?.ok_or("missing a")?;
    assert_eq!(dom.get_attribute(link, "style"), None);
    Ok(())
}
