//! HTML serialization (`outerHTML` / `innerHTML`) and a debug tree printer.
//! Spec: <https://html.spec.whatwg.org/multipage/parsing.html#serialising-html-fragments>

use core::fmt;

use indextree::NodeId;

use super::{DOM, DOMNode, NodeKind};

/// Elements serialized without an end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements whose text children are written verbatim.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "style", "script", "xmp", "iframe", "noembed", "noframes", "plaintext",
];

fn escape_into(out: &mut String, text: &str, attribute_mode: bool) {
    for character in text.chars() {
        match character {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' if attribute_mode => out.push_str("&quot;"),
            '<' if !attribute_mode => out.push_str("&lt;"),
            '>' if !attribute_mode => out.push_str("&gt;"),
            _ => out.push(character),
        }
    }
}

impl DOM {
    /// Markup of the node including its own tags.
    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.serialize_node(node, &mut out);
        out
    }

    /// Markup of the node's children.
    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.serialize_children(node, &mut out);
        out
    }

    fn serialize_children(&self, node: NodeId, out: &mut String) {
        for child in self.children(node) {
            self.serialize_node(child, out);
        }
    }

    fn serialize_node(&self, node: NodeId, out: &mut String) {
        let Some(DOMNode { kind, attrs }) = self.node(node) else {
            return;
        };
        match kind {
            NodeKind::Document => self.serialize_children(node, out),
            NodeKind::Element { tag } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    escape_into(out, value, true);
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    return;
                }
                self.serialize_children(node, out);
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            NodeKind::Text { text } => {
                let raw = self
                    .parent(node)
                    .and_then(|parent| self.tag_name(parent))
                    .is_some_and(|parent_tag| RAW_TEXT_ELEMENTS.contains(&parent_tag));
                if raw {
                    out.push_str(text);
                } else {
                    escape_into(out, text, false);
                }
            }
            NodeKind::Comment { text } => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
        }
    }
}

fn write_indent(formatter: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        formatter.write_str("  ")?;
    }
    Ok(())
}

fn escape_debug_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for character in text.chars() {
        match character {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(character),
        }
    }
    out
}

fn fmt_node(
    dom: &DOM,
    node: NodeId,
    formatter: &mut fmt::Formatter<'_>,
    depth: usize,
) -> fmt::Result {
    let Some(DOMNode { kind, attrs }) = dom.node(node) else {
        return Ok(());
    };
    write_indent(formatter, depth)?;
    match kind {
        NodeKind::Document => writeln!(formatter, "#document")?,
        NodeKind::Element { tag } => {
            write!(formatter, "<{tag}")?;
            for (name, value) in attrs {
                write!(formatter, " {name}=\"{}\"", escape_debug_text(value))?;
            }
            writeln!(formatter, ">")?;
        }
        NodeKind::Text { text } => writeln!(formatter, "\"{}\"", escape_debug_text(text))?,
        NodeKind::Comment { text } => writeln!(formatter, "<!-- {} -->", escape_debug_text(text))?,
    }
    for child in dom.children(node) {
        fmt_node(dom, child, formatter, depth.saturating_add(1))?;
    }
    Ok(())
}

impl fmt::Debug for DOM {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(formatter, "DOM")?;
        fmt_node(self, self.root, formatter, 0)
    }
}
