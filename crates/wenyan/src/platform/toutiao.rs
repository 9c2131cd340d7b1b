use anyhow::Error;
use html::{DOM, NodeId};
use log::trace;

const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// Toutiao drops inline SVG: each formula's `svg` is re-embedded as a data-URI `<img>`
/// that keeps the SVG's inline style and the container's accessible label.
///
/// # Errors
/// Returns an error if the DOM rejects an edit.
pub fn content_for_toutiao(dom: &mut DOM, root: NodeId) -> Result<String, Error> {
    for container in dom.query_selector_all(root, "mjx-container")? {
        let Some(svg) = dom.query_selector(container, "svg")? else {
            continue;
        };
        if dom.get_attribute(svg, "xmlns").is_none() {
            dom.set_attribute(svg, "xmlns", SVG_NAMESPACE)?;
        }
        let markup = dom.outer_html(svg);
        trace!("Embedding {} bytes of formula SVG", markup.len());

        let img = dom.create_element("img");
        dom.set_attribute(
            img,
            "src",
            &format!("data:image/svg+xml,{}", urlencoding::encode(&markup)),
        )?;
        match dom.get_attribute(svg, "style").map(str::to_owned) {
            Some(style) if !style.is_empty() => dom.set_attribute(img, "style", &style)?,
            _ => dom.set_style_property(img, "vertical-align", "middle", false)?,
        }
        let label = dom
            .get_attribute(container, "aria-label")
            .filter(|label| !label.is_empty())
            .or_else(|| dom.get_attribute(container, "title"))
            .filter(|label| !label.is_empty())
            .map(str::to_owned);
        if let Some(label) = label {
            dom.set_attribute(img, "alt", &label)?;
        }
        dom.replace_with(container, img)?;
    }
    Ok(dom.outer_html(root))
}
