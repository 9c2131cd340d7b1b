use anyhow::Error;
use html::{DOM, NodeId};

const FORMULA_IMAGE_STYLE: &str = "margin: 0 auto; width: auto; max-width: 100%; display: block;";

/// Zhihu renders formulas itself: each `mjx-container` carrying its TeX source in `math`
/// becomes an `<img data-eeimg>` whose `alt` is that source.
///
/// # Errors
/// Returns an error if the DOM rejects an edit.
pub fn content_for_zhihu(dom: &mut DOM, root: NodeId) -> Result<String, Error> {
    for container in dom.query_selector_all(root, "mjx-container")? {
        let Some(math) = dom.get_attribute(container, "math").map(str::to_owned) else {
            continue;
        };
        if math.is_empty() {
            continue;
        }
        let img = dom.create_element("img");
        dom.set_attribute(img, "alt", &math)?;
        dom.set_attribute(img, "data-eeimg", "true")?;
        dom.set_attribute(img, "style", FORMULA_IMAGE_STYLE)?;
        dom.replace_with(container, img)?;
    }
    Ok(dom.outer_html(root))
}
