mod printing;
mod query;

use anyhow::{Error, anyhow, bail};
use css_style_attr::StyleDeclarations;
use indextree::{Arena, NodeId};
use smallvec::SmallVec;

use crate::parser::parse_fragment;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NodeKind {
    #[default]
    Document,
    Element { tag: String },
    Text { text: String },
    Comment { text: String },
}

#[derive(Debug, Clone, Default)]
pub struct DOMNode {
    pub kind: NodeKind,
    pub attrs: SmallVec<(String, String), 4>,
}

impl DOMNode {
    /// Element with `tag` kept as given (foreign elements such as SVG are case-sensitive).
    pub fn element(tag: &str) -> Self {
        Self {
            kind: NodeKind::Element {
                tag: tag.to_owned(),
            },
            attrs: SmallVec::new(),
        }
    }

    pub fn text(text: &str) -> Self {
        Self {
            kind: NodeKind::Text {
                text: text.to_owned(),
            },
            attrs: SmallVec::new(),
        }
    }

    /// Tag name for elements.
    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { tag } => Some(tag),
            NodeKind::Document | NodeKind::Text { .. } | NodeKind::Comment { .. } => None,
        }
    }
}

/// A document tree stored in an `indextree` arena.
///
/// Every node handle is a `NodeId` into this arena; handles from another `DOM` are not
/// valid here. Removed nodes stay allocated until the `DOM` is dropped.
pub struct DOM {
    dom: Arena<DOMNode>,
    root: NodeId,
}

impl Default for DOM {
    fn default() -> Self {
        Self::new()
    }
}

impl DOM {
    /// An empty tree holding only a document node.
    pub fn new() -> Self {
        let mut dom = Arena::new();
        Self {
            root: dom.new_node(DOMNode::default()),
            dom,
        }
    }

    /// The document node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, node: NodeId) -> Option<&DOMNode> {
        self.dom
            .get(node)
            .filter(|entry| !entry.is_removed())
            .map(|entry| entry.get())
    }

    fn node_mut(&mut self, node: NodeId) -> Result<&mut DOMNode, Error> {
        self.dom
            .get_mut(node)
            .filter(|entry| !entry.is_removed())
            .map(|entry| entry.get_mut())
            .ok_or_else(|| anyhow!("Node {node:?} does not belong to this document"))
    }

    /// `document.createElement`: HTML tag names are stored lowercase.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.dom
            .new_node(DOMNode::element(&tag.to_ascii_lowercase()))
    }

    /// Allocate an unattached node.
    pub fn create_node(&mut self, data: DOMNode) -> NodeId {
        self.dom.new_node(data)
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.dom.new_node(DOMNode::text(text))
    }

    /// Allocate an unattached comment node.
    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.dom.new_node(DOMNode {
            kind: NodeKind::Comment {
                text: text.to_owned(),
            },
            attrs: SmallVec::new(),
        })
    }

    /// Move `child` (detaching it first) to the end of `parent`'s children.
    ///
    /// # Errors
    /// Returns an error if `child` is `parent` or one of its ancestors, or either node was removed.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), Error> {
        self.ensure_not_ancestor(child, parent)?;
        child.detach(&mut self.dom);
        parent.checked_append(child, &mut self.dom)?;
        Ok(())
    }

    /// Move `child` (detaching it first) to the front of `parent`'s children.
    ///
    /// # Errors
    /// Returns an error if `child` is `parent` or one of its ancestors, or either node was removed.
    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), Error> {
        self.ensure_not_ancestor(child, parent)?;
        child.detach(&mut self.dom);
        parent.checked_prepend(child, &mut self.dom)?;
        Ok(())
    }

    /// Move `node` (detaching it first) to directly after `reference`.
    ///
    /// # Errors
    /// Returns an error if `node` is `reference` or either node was removed.
    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) -> Result<(), Error> {
        self.ensure_not_ancestor(node, reference)?;
        node.detach(&mut self.dom);
        reference.checked_insert_after(node, &mut self.dom)?;
        Ok(())
    }

    /// Refuse to move `node` below itself.
    fn ensure_not_ancestor(&self, node: NodeId, target: NodeId) -> Result<(), Error> {
        if target.ancestors(&self.dom).any(|ancestor| ancestor == node) {
            bail!("Cannot move node {node:?} inside its own subtree");
        }
        Ok(())
    }

    /// Unlink a subtree from its parent; it stays usable for re-insertion.
    pub fn detach(&mut self, node: NodeId) {
        node.detach(&mut self.dom);
    }

    /// Remove a subtree for good.
    pub fn remove(&mut self, node: NodeId) {
        node.remove_subtree(&mut self.dom);
    }

    /// `old.replaceWith(new)`: put `new` where `old` was and drop `old`'s subtree.
    ///
    /// # Errors
    /// Returns an error if `new` is inside `old` or either node was removed.
    pub fn replace_with(&mut self, old: NodeId, new: NodeId) -> Result<(), Error> {
        self.insert_after(old, new)?;
        self.remove(old);
        Ok(())
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.dom.get(node).and_then(|entry| entry.parent())
    }

    /// Parent if it is an element (not the document node).
    pub fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        self.parent(node).filter(|&parent| self.is_element(parent))
    }

    pub fn children(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        node.children(&self.dom)
    }

    pub fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.dom.get(node).and_then(|entry| entry.first_child())
    }

    pub fn last_child(&self, node: NodeId) -> Option<NodeId> {
        self.dom.get(node).and_then(|entry| entry.last_child())
    }

    pub fn previous_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.dom.get(node).and_then(|entry| entry.previous_sibling())
    }

    /// Descendants of `node` in document order, excluding `node` itself.
    pub fn descendants(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        node.descendants(&self.dom).skip(1)
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        self.tag_name(node).is_some()
    }

    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.node(node).and_then(DOMNode::tag)
    }

    pub fn get_attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.node(node)?
            .attrs
            .iter()
            .find(|(attr_name, _)| attr_name == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing the value in place when it already exists.
    ///
    /// # Errors
    /// Returns an error if the node does not belong to this document.
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), Error> {
        let attrs = &mut self.node_mut(node)?.attrs;
        if let Some(existing) = attrs.iter_mut().find(|(attr_name, _)| attr_name == name) {
            value.clone_into(&mut existing.1);
        } else {
            attrs.push((name.to_owned(), value.to_owned()));
        }
        Ok(())
    }

    /// Whether the whitespace separated `class` attribute contains `class`.
    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.get_attribute(node, "class")
            .is_some_and(|classes| classes.split_ascii_whitespace().any(|token| token == class))
    }

    /// Remove an attribute, returning its value.
    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> Option<String> {
        let attrs = &mut self.node_mut(node).ok()?.attrs;
        let position = attrs.iter().position(|(attr_name, _)| attr_name == name)?;
        Some(attrs.remove(position).1)
    }

    /// Concatenated text of all descendant text nodes (the node's own text for text nodes).
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        for descendant in node.descendants(&self.dom) {
            if let Some(NodeKind::Text { text }) = self.node(descendant).map(|entry| &entry.kind) {
                out.push_str(text);
            }
        }
        out
    }

    /// Replace all children with a single text node (no node for empty text).
    ///
    /// # Errors
    /// Returns an error if the node does not belong to this document.
    pub fn set_text_content(&mut self, node: NodeId, text: &str) -> Result<(), Error> {
        if let NodeKind::Text { text: own } | NodeKind::Comment { text: own } =
            &mut self.node_mut(node)?.kind
        {
            text.clone_into(own);
            return Ok(());
        }
        self.clear_children(node);
        if !text.is_empty() {
            let text_node = self.create_text(text);
            self.append_child(node, text_node)?;
        }
        Ok(())
    }

    /// Replace all children with the nodes parsed from `html`.
    ///
    /// # Errors
    /// Returns an error if parsing fails or the node does not belong to this document.
    pub fn set_inner_html(&mut self, node: NodeId, html: &str) -> Result<(), Error> {
        self.node_mut(node)?;
        let fragment = parse_fragment(html)?;
        self.clear_children(node);
        for child in fragment.children(fragment.root()) {
            let imported = self.import(&fragment, child)?;
            self.append_child(node, imported)?;
        }
        Ok(())
    }

    /// Deep-copy a subtree of another document into this arena, unattached.
    ///
    /// # Errors
    /// Returns an error if `node` is not part of `other`.
    pub fn import(&mut self, other: &Self, node: NodeId) -> Result<NodeId, Error> {
        let data = other
            .node(node)
            .ok_or_else(|| anyhow!("Node {node:?} does not belong to the source document"))?
            .clone();
        let copy = self.dom.new_node(data);
        for child in other.children(node) {
            let imported = self.import(other, child)?;
            copy.checked_append(imported, &mut self.dom)?;
        }
        Ok(copy)
    }

    fn clear_children(&mut self, node: NodeId) {
        let children: Vec<NodeId> = node.children(&self.dom).collect();
        for child in children {
            child.remove_subtree(&mut self.dom);
        }
    }

    /// First element under `scope` (inclusive) whose `id` attribute equals `id`.
    pub fn get_element_by_id(&self, scope: NodeId, id: &str) -> Option<NodeId> {
        scope
            .descendants(&self.dom)
            .find(|&node| self.get_attribute(node, "id") == Some(id) && self.is_element(node))
    }

    /// Parsed `style` attribute of an element.
    pub fn style(&self, node: NodeId) -> StyleDeclarations {
        self.get_attribute(node, "style")
            .map(StyleDeclarations::parse)
            .unwrap_or_default()
    }

    /// `element.style.setProperty(property, value, important)`, written back to the attribute.
    ///
    /// # Errors
    /// Returns an error if the node does not belong to this document.
    pub fn set_style_property(
        &mut self,
        node: NodeId,
        property: &str,
        value: &str,
        important: bool,
    ) -> Result<(), Error> {
        let mut style = self.style(node);
        style.set_property(property, value, important);
        self.set_attribute(node, "style", &style.to_css_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_editing() -> Result<(), Error> {
        let mut dom = DOM::new();
        let root = dom.root();
        let list = dom.create_element("UL");
        dom.append_child(root, list)?;
        let second = dom.create_element("li");
        let first = dom.create_element("li");
        dom.append_child(list, second)?;
        dom.prepend_child(list, first)?;
        let third = dom.create_text("tail");
        dom.insert_after(second, third)?;
        assert_eq!(
            dom.children(list).collect::<Vec<_>>(),
            vec![first, second, third]
        );
        assert_eq!(dom.tag_name(list), Some("ul"));
        assert_eq!(dom.parent_element(first), Some(list));
        assert_eq!(dom.parent_element(list), None);
        assert!(dom.append_child(first, list).is_err());
        Ok(())
    }

    #[test]
    fn replace_with_keeps_position() -> Result<(), Error> {
        let mut dom = parse_fragment("<p>a<b class=\"x  y\">b</b>c</p>")?;
        let bold = dom
            .descendants(dom.root())
            .find(|&node| dom.tag_name(node) == Some("b"))
            .ok_or_else(|| anyhow!("missing b"))?;
        assert!(dom.has_class(bold, "y"));
        assert!(!dom.has_class(bold, "x  y"));
        let italic = dom.create_element("i");
        dom.replace_with(bold, italic)?;
        assert_eq!(dom.inner_html(dom.root()), "<p>a<i></i>c</p>");
        assert!(dom.node(bold).is_none());
        Ok(())
    }

    #[test]
    fn attributes_keep_order_and_replace_in_place() -> Result<(), Error> {
        let mut dom = DOM::new();
        let node = dom.create_element("a");
        dom.set_attribute(node, "href", "x")?;
        dom.set_attribute(node, "title", "t")?;
        dom.set_attribute(node, "href", "y")?;
        let attrs: Vec<(String, String)> = dom
            .node(node)
            .map(|entry| entry.attrs.to_vec())
            .unwrap_or_default();
        assert_eq!(
            attrs,
            vec![
                ("href".to_owned(), "y".to_owned()),
                ("title".to_owned(), "t".to_owned())
            ]
        );
        assert_eq!(dom.remove_attribute(node, "href"), Some("y".to_owned()));
        assert_eq!(dom.get_attribute(node, "href"), None);
        Ok(())
    }

    #[test]
    fn comments_keep_their_text_out_of_text_content() -> Result<(), Error> {
        let mut dom = DOM::new();
        let node = dom.create_element("p");
        let note = dom.create_comment("note");
        let word = dom.create_text("x");
        dom.append_child(node, note)?;
        dom.append_child(node, word)?;
        assert_eq!(dom.text_content(node), "x");
        assert_eq!(dom.inner_html(node), "<!--note-->x");
        assert!(!dom.is_element(note));
        Ok(())
    }

    #[test]
    fn text_content_replaces_children() -> Result<(), Error> {
        let mut dom = DOM::new();
        let node = dom.create_element("p");
        dom.set_inner_html(node, "a<b>b</b>c")?;
        assert_eq!(dom.text_content(node), "abc");
        dom.set_text_content(node, "X")?;
        assert_eq!(dom.children(node).count(), 1);
        assert_eq!(dom.text_content(node), "X");
        Ok(())
    }

    #[test]
    fn style_property_round_trips_through_attribute() -> Result<(), Error> {
        let mut dom = DOM::new();
        let node = dom.create_element("p");
        dom.set_attribute(node, "style", "color: red")?;
        dom.set_style_property(node, "margin", "0", true)?;
        dom.set_style_property(node, "color", "blue", false)?;
        assert_eq!(
            dom.get_attribute(node, "style"),
            Some("color: blue; margin: 0 !important;")
        );
        Ok(())
    }
}
