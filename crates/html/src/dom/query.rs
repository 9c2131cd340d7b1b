//! Selector queries over the arena DOM.

use anyhow::{Context as _, Error};
use css_selectors::{ElementAdapter, matches_selector_list, parse_selector_list};
use indextree::NodeId;
use log::trace;

use super::DOM;

/// Read-only view of a `DOM` for the selector matcher.
struct SelectorContext<'dom> {
    dom: &'dom DOM,
}

impl ElementAdapter for SelectorContext<'_> {
    type Handle = NodeId;

    fn parent(&self, element: NodeId) -> Option<NodeId> {
        self.dom.parent_element(element)
    }

    fn previous_sibling_element(&self, element: NodeId) -> Option<NodeId> {
        let mut current = self.dom.previous_sibling(element);
        while let Some(sibling) = current {
            if self.dom.is_element(sibling) {
                return Some(sibling);
            }
            current = self.dom.previous_sibling(sibling);
        }
        None
    }

    fn tag_name(&self, element: NodeId) -> &str {
        self.dom.tag_name(element).unwrap_or_default()
    }

    fn element_id(&self, element: NodeId) -> Option<&str> {
        self.dom.get_attribute(element, "id")
    }

    fn has_class(&self, element: NodeId, class: &str) -> bool {
        self.dom.has_class(element, class)
    }

    fn attr(&self, element: NodeId, name: &str) -> Option<&str> {
        self.dom.get_attribute(element, name)
    }
}

impl DOM {
    /// `scope.querySelectorAll(selector)`: matching element descendants of `scope` in
    /// document order. Ancestors outside `scope` still take part in matching.
    ///
    /// # Errors
    /// Returns an error if the selector is not supported by the selector parser.
    pub fn query_selector_all(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>, Error> {
        let list = parse_selector_list(selector)
            .with_context(|| format!("Invalid selector {selector:?}"))?;
        let context = SelectorContext { dom: self };
        let found: Vec<NodeId> = self
            .descendants(scope)
            .filter(|&node| self.is_element(node) && matches_selector_list(&context, node, &list))
            .collect();
        trace!("{selector:?} matched {} elements", found.len());
        Ok(found)
    }

    /// First match of [`DOM::query_selector_all`].
    ///
    /// # Errors
    /// Returns an error if the selector is not supported by the selector parser.
    pub fn query_selector(&self, scope: NodeId, selector: &str) -> Result<Option<NodeId>, Error> {
        Ok(self.query_selector_all(scope, selector)?.into_iter().next())
    }
}
