//! html5ever front end: parse into an `RcDom`, then copy the tree into the arena `DOM`.

use anyhow::{Error, anyhow};
use html5ever::tendril::TendrilSink as _;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::{
    ParseOpts, QualName, local_name, ns, parse_document as parse_html,
    parse_fragment as parse_html_fragment,
};
use indextree::NodeId;
use log::debug;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use smallvec::SmallVec;

use crate::dom::{DOM, DOMNode, NodeKind};

fn parse_opts() -> ParseOpts {
    ParseOpts {
        tree_builder: TreeBuilderOpts {
            exact_errors: false,
            scripting_enabled: false,
            ..TreeBuilderOpts::default()
        },
        ..ParseOpts::default()
    }
}

fn parse_rcdom(html: &str) -> Result<RcDom, Error> {
    let rcdom = parse_html(RcDom::default(), parse_opts())
        .from_utf8()
        .read_from(&mut html.as_bytes())?;
    Ok(rcdom)
}

/// Parse with a `<body>` context element. The parsed nodes end up under a synthetic
/// `html` element.
fn parse_rcdom_fragment(html: &str) -> Result<RcDom, Error> {
    let context = QualName::new(None, ns!(html), local_name!("body"));
    let rcdom = parse_html_fragment(RcDom::default(), parse_opts(), context, Vec::new(), false)
        .from_utf8()
        .read_from(&mut html.as_bytes())?;
    Ok(rcdom)
}

/// Copy `handle` and its subtree under `parent`. Doctypes and processing instructions
/// are dropped.
fn walk_tree(handle: &Handle, dom: &mut DOM, parent: NodeId) -> Result<(), Error> {
    let data = match &handle.data {
        NodeData::Document => {
            return walk_children(handle, dom, parent);
        }
        NodeData::Element { name, attrs, .. } => {
            let attrs: SmallVec<(String, String), 4> = attrs
                .borrow()
                .iter()
                .map(|attr| {
                    let local = attr.name.local.to_string();
                    let key = match &attr.name.prefix {
                        Some(prefix) => format!("{prefix}:{local}"),
                        None => local,
                    };
                    (key, attr.value.to_string())
                })
                .collect();
            DOMNode {
                kind: NodeKind::Element {
                    tag: name.local.to_string(),
                },
                attrs,
            }
        }
        NodeData::Text { contents } => DOMNode::text(&contents.borrow()),
        NodeData::Comment { contents } => {
            let comment = dom.create_comment(contents);
            return dom.append_child(parent, comment);
        }
        NodeData::Doctype { .. } | NodeData::ProcessingInstruction { .. } => return Ok(()),
    };
    let node = dom.create_node(data);
    dom.append_child(parent, node)?;
    walk_children(handle, dom, node)
}

fn walk_children(handle: &Handle, dom: &mut DOM, parent: NodeId) -> Result<(), Error> {
    for child in handle.children.borrow().iter() {
        walk_tree(child, dom, parent)?;
    }
    Ok(())
}

fn find_element(handle: &Handle, tag: &str) -> Option<Handle> {
    if let NodeData::Element { name, .. } = &handle.data
        && &*name.local == tag
    {
        return Some(Handle::clone(handle));
    }
    handle
        .children
        .borrow()
        .iter()
        .find_map(|child| find_element(child, tag))
}

/// Parse a complete HTML document.
///
/// # Errors
/// Returns an error if the input cannot be read by the parser.
pub fn parse_document(html: &str) -> Result<DOM, Error> {
    let rcdom = parse_rcdom(html)?;
    let mut dom = DOM::new();
    let root = dom.root();
    walk_children(&rcdom.document, &mut dom, root)?;
    Ok(dom)
}

/// Parse an HTML fragment in a `<body>` context; the parsed nodes become the children
/// of the returned document node. Comments and head-only elements such as `<style>` are
/// kept where they appear.
///
/// # Errors
/// Returns an error if the input cannot be read by the parser.
pub fn parse_fragment(html: &str) -> Result<DOM, Error> {
    let rcdom = parse_rcdom_fragment(html)?;
    let container = find_element(&rcdom.document, "html")
        .ok_or_else(|| anyhow!("Parsed fragment has no container element"))?;
    let mut dom = DOM::new();
    let root = dom.root();
    walk_children(&container, &mut dom, root)?;
    debug!("Parsed fragment of {} bytes", html.len());
    Ok(dom)
}
