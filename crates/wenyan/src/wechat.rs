//! WeChat post-render: rewrites the parts of a styled document that the WeChat editor
//! mangles on paste.

use anyhow::Error;
use html::{DOM, NodeId, NodeKind};
use log::{debug, trace};

/// Style given to the wrapper of a display equation.
const BLOCK_EQUATION_STYLE: &str = "text-align: center; margin-bottom: 1rem;";

/// Run every WeChat rewrite on `root`, in order: formulas, code blocks, list items.
///
/// # Errors
/// Returns an error if the DOM rejects an edit.
pub fn wechat_post_render(dom: &mut DOM, root: NodeId) -> Result<(), Error> {
    unwrap_math(dom, root)?;
    preserve_code_whitespace(dom, root)?;
    wrap_list_items(dom, root)?;
    Ok(())
}

/// Replace each `mjx-container` with its first `svg`, moving `width`/`height` into the
/// inline style.
fn unwrap_math(dom: &mut DOM, root: NodeId) -> Result<(), Error> {
    let containers = dom.query_selector_all(root, "mjx-container")?;
    debug!("Unwrapping {} formulas", containers.len());
    for container in containers {
        let Some(svg) = dom.query_selector(container, "svg")? else {
            continue;
        };
        for dimension in ["width", "height"] {
            let value = dom.remove_attribute(svg, dimension).unwrap_or_default();
            dom.set_style_property(svg, dimension, &value, false)?;
        }
        if dom.get_attribute(svg, "style") == Some("") {
            dom.remove_attribute(svg, "style");
        }
        let Some(parent) = dom.parent_element(container) else {
            continue;
        };
        dom.detach(svg);
        dom.remove(container);
        dom.append_child(parent, svg)?;
        if dom.has_class(parent, "block-equation") {
            dom.set_attribute(parent, "style", BLOCK_EQUATION_STYLE)?;
        }
    }
    Ok(())
}

/// Inside `pre code`, newlines become `<br>` and other whitespace becomes U+00A0 so the
/// editor cannot collapse indentation.
fn preserve_code_whitespace(dom: &mut DOM, root: NodeId) -> Result<(), Error> {
    let mut texts: Vec<NodeId> = Vec::new();
    for code in dom.query_selector_all(root, "pre code")? {
        for node in dom.descendants(code) {
            if matches!(dom.node(node).map(|entry| &entry.kind), Some(NodeKind::Text { .. }))
                && !texts.contains(&node)
            {
                texts.push(node);
            }
        }
    }
    trace!("Rewriting {} code text nodes", texts.len());

    for text_node in texts {
        let text = dom.text_content(text_node);
        let mut lines = text.split('\n');
        let first = lines.next().unwrap_or_default();
        dom.set_text_content(text_node, &non_breaking(first))?;
        let mut cursor = text_node;
        for line in lines {
            let br = dom.create_element("br");
            dom.insert_after(cursor, br)?;
            cursor = br;
            if !line.is_empty() {
                let piece = dom.create_text(&non_breaking(line));
                dom.insert_after(cursor, piece)?;
                cursor = piece;
            }
        }
    }
    Ok(())
}

fn non_breaking(text: &str) -> String {
    text.chars()
        .map(|character| if character.is_whitespace() { '\u{a0}' } else { character })
        .collect()
}

/// Move the children of every `<li>` into a single `<section>` child.
fn wrap_list_items(dom: &mut DOM, root: NodeId) -> Result<(), Error> {
    for item in dom.query_selector_all(root, "li")? {
        let section = dom.create_element("section");
        let children: Vec<NodeId> = dom.children(item).collect();
        for child in children {
            dom.append_child(section, child)?;
        }
        dom.append_child(item, section)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context as _;
    use html::parse_fragment;

    fn content(html: &str) -> Result<(DOM, NodeId), Error> {
        let dom = parse_fragment(html)?;
        let root = dom
            .get_element_by_id(dom.root(), "wenyan")
            .context("missing content root")?;
        Ok((dom, root))
    }

    #[test]
    fn block_formula_is_unwrapped_and_centered() -> Result<(), Error> {
        let (mut dom, root) = content(
            "<section id=\"wenyan\"><section class=\"block-equation\">\
             <mjx-container jax=\"SVG\"><svg width=\"10ex\" height=\"2ex\" viewBox=\"0 0 1 1\"></svg></mjx-container>\
             </section></section>",
        )?;
        wechat_post_render(&mut dom, root)?;
        assert_eq!(
            dom.inner_html(root),
            "<section class=\"block-equation\" style=\"text-align: center; margin-bottom: 1rem;\">\
             <svg viewBox=\"0 0 1 1\" style=\"width: 10ex; height: 2ex;\"></svg></section>"
        );
        Ok(())
    }

    #[test]
    fn formula_without_dimensions_gets_no_style() -> Result<(), Error> {
        let (mut dom, root) = content(
            "<p id=\"wenyan\">x <mjx-container><svg></svg></mjx-container> y</p>",
        )?;
        wechat_post_render(&mut dom, root)?;
        assert_eq!(dom.inner_html(root), "x  y<svg></svg>");
        Ok(())
    }

    #[test]
    fn code_whitespace_survives() -> Result<(), Error> {
        let (mut dom, root) = content(
            "<div id=\"wenyan\"><pre><code>fn main() {\n    <span class=\"k\">let</span> x;\n}</code></pre></div>",
        )?;
        wechat_post_render(&mut dom, root)?;
        let code = dom.query_selector(root, "code")?.context("missing code")?;
        assert_eq!(
            dom.inner_html(code),
            "fn&nbsp;main()&nbsp;{<br>&nbsp;&nbsp;&nbsp;&nbsp;<span class=\"k\">let</span>&nbsp;x;<br>}"
        );
        Ok(())
    }

    #[test]
    fn list_items_are_wrapped() -> Result<(), Error> {
        let (mut dom, root) =
            content("<ul id=\"wenyan\"><li>one <b>1</b></li><li><p>two</p></li></ul>")?;
        wechat_post_render(&mut dom, root)?;
        assert_eq!(
            dom.inner_html(root),
            "<li><section>one <b>1</b></section></li><li><section><p>two</p></section></li>"
        );
        Ok(())
    }
}
