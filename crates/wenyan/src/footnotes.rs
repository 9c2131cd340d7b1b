//! Link footnotes: every `a[href]` gets a numbered marker and the targets are listed at
//! the end of the content root.

use anyhow::Error;
use html::{DOM, NodeId};
use log::debug;

/// Heading placed above the footnote list.
pub const FOOTNOTES_HEADING: &str = "引用链接";

/// Layout of the appended footnote list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FootnoteStyle {
    /// `<section id="footnotes">` with one `<p>` per link.
    #[default]
    Paragraph,
    /// `<div id="footnotes"><ul>` with one `<li>` per link.
    List,
}

struct Footnote {
    index: usize,
    title: String,
    href: String,
}

/// Number every link under `root` and append the footnote list.
///
/// Nothing is appended when there are no links.
///
/// # Errors
/// Returns an error if the DOM rejects an insertion.
pub fn add_footnotes(dom: &mut DOM, root: NodeId, style: FootnoteStyle) -> Result<(), Error> {
    let links = dom.query_selector_all(root, "a[href]")?;
    let mut footnotes = Vec::with_capacity(links.len());
    for (position, link) in links.into_iter().enumerate() {
        let index = position.saturating_add(1);
        footnotes.push(Footnote {
            index,
            title: dom.text_content(link),
            href: dom.get_attribute(link, "href").unwrap_or_default().to_owned(),
        });
        let marker = dom.create_element("sup");
        dom.set_attribute(marker, "class", "footnote")?;
        dom.set_text_content(marker, &format!("[{index}]"))?;
        dom.insert_after(link, marker)?;
    }
    if footnotes.is_empty() {
        return Ok(());
    }
    debug!("Adding {} footnotes", footnotes.len());

    let heading = element_with_text(dom, "h3", FOOTNOTES_HEADING)?;
    dom.append_child(root, heading)?;
    let list = match style {
        FootnoteStyle::Paragraph => paragraph_list(dom, &footnotes)?,
        FootnoteStyle::List => bullet_list(dom, &footnotes)?,
    };
    dom.append_child(root, list)
}

fn element_with_text(dom: &mut DOM, tag: &str, text: &str) -> Result<NodeId, Error> {
    let element = dom.create_element(tag);
    dom.set_text_content(element, text)?;
    Ok(element)
}

fn append_text(dom: &mut DOM, parent: NodeId, text: &str) -> Result<(), Error> {
    let node = dom.create_text(text);
    dom.append_child(parent, node)
}

fn paragraph_list(dom: &mut DOM, footnotes: &[Footnote]) -> Result<NodeId, Error> {
    let section = dom.create_element("section");
    dom.set_attribute(section, "id", "footnotes")?;
    for Footnote { index, title, href } in footnotes {
        let para = dom.create_element("p");
        let num = element_with_text(dom, "span", &format!("[{index}]"))?;
        dom.set_attribute(num, "class", "footnote-num")?;
        let txt = dom.create_element("span");
        dom.set_attribute(txt, "class", "footnote-txt")?;
        if title != href {
            append_text(dom, txt, &format!("{title}: "))?;
        }
        let target = element_with_text(dom, "i", href)?;
        dom.append_child(txt, target)?;
        dom.append_child(para, num)?;
        dom.append_child(para, txt)?;
        dom.append_child(section, para)?;
    }
    Ok(section)
}

fn bullet_list(dom: &mut DOM, footnotes: &[Footnote]) -> Result<NodeId, Error> {
    let wrapper = dom.create_element("div");
    dom.set_attribute(wrapper, "id", "footnotes")?;
    let list = dom.create_element("ul");
    dom.append_child(wrapper, list)?;
    for Footnote { index, title, href } in footnotes {
        let item = dom.create_element("li");
        dom.set_attribute(item, "id", &format!("footnote-{index}"))?;
        let label = if title == href {
            format!("[{index}]: ")
        } else {
            format!("[{index}] {title}: ")
        };
        append_text(dom, item, &label)?;
        let target = element_with_text(dom, "i", href)?;
        dom.append_child(item, target)?;
        dom.append_child(list, item)?;
    }
    Ok(wrapper)
}
