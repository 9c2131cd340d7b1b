//! CSS selector matching engine.

use crate::{
    Combinator, ComplexSelector, CompoundSelector, ElementAdapter, SelectorList, SimpleSelector,
};

/// Match a selector list against an element.
pub fn matches_selector_list<A: ElementAdapter>(
    adapter: &A,
    element: A::Handle,
    list: &SelectorList,
) -> bool {
    list.selectors
        .iter()
        .any(|selector_item| matches_complex(adapter, element, selector_item))
}

/// Match a complex selector against an element.
/// Matched right to left: the last compound against `element`, then outward.
pub fn matches_complex<A: ElementAdapter>(
    adapter: &A,
    element: A::Handle,
    sel: &ComplexSelector,
) -> bool {
    matches_at(adapter, element, sel, sel.rest.len())
}

/// Match the compound at `position` against `element`, then relate the compounds to its
/// left through their combinators. Descendant and general-sibling combinators backtrack
/// over every candidate.
fn matches_at<A: ElementAdapter>(
    adapter: &A,
    element: A::Handle,
    sel: &ComplexSelector,
    position: usize,
) -> bool {
    let Some(compound) = sel.compound(position) else {
        return false;
    };
    if !matches_compound(adapter, element, compound) {
        return false;
    }
    let Some(left) = position.checked_sub(1) else {
        return true;
    };
    let Some(&(combinator, _)) = sel.rest.get(left) else {
        return false;
    };
    match combinator {
        Combinator::Descendant => {
            let mut current_parent = adapter.parent(element);
            while let Some(ancestor_element) = current_parent {
                if matches_at(adapter, ancestor_element, sel, left) {
                    return true;
                }
                current_parent = adapter.parent(ancestor_element);
            }
            false
        }
        Combinator::Child => adapter
            .parent(element)
            .is_some_and(|parent_el| matches_at(adapter, parent_el, sel, left)),
        Combinator::AdjacentSibling => adapter
            .previous_sibling_element(element)
            .is_some_and(|prev_el| matches_at(adapter, prev_el, sel, left)),
        Combinator::GeneralSibling => {
            let mut current_sibling = adapter.previous_sibling_element(element);
            while let Some(sibling_element) = current_sibling {
                if matches_at(adapter, sibling_element, sel, left) {
                    return true;
                }
                current_sibling = adapter.previous_sibling_element(sibling_element);
            }
            false
        }
    }
}

/// Match a compound selector against a single element.
pub fn matches_compound<A: ElementAdapter>(
    adapter: &A,
    element: A::Handle,
    compound: &CompoundSelector,
) -> bool {
    compound.simples.iter().all(|simple| match simple {
        SimpleSelector::Universal => true,
        SimpleSelector::Type(type_name) => adapter.tag_name(element) == type_name.as_str(),
        SimpleSelector::Class(class_name) => adapter.has_class(element, class_name),
        SimpleSelector::Id(id_value) => adapter
            .element_id(element)
            .is_some_and(|value| value == id_value.as_str()),
        SimpleSelector::AttrExists(name) => adapter.attr(element, name).is_some(),
        SimpleSelector::AttrValue { name, value } => adapter
            .attr(element, name)
            .is_some_and(|attr_value| attr_value == value.as_str()),
        SimpleSelector::AttrOp {
            name,
            operator,
            value,
        } => adapter
            .attr(element, name)
            .is_some_and(|attr_value| operator.matches(attr_value, value)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AttrOperator, parse_selector_list};
    use anyhow::Error;

    struct Node {
        tag: &'static str,
        id: Option<&'static str>,
        classes: &'static str,
        parent: Option<usize>,
        previous: Option<usize>,
    }

    const fn node(
        tag: &'static str,
        id: Option<&'static str>,
        classes: &'static str,
        parent: Option<usize>,
        previous: Option<usize>,
    ) -> Node {
        Node {
            tag,
            id,
            classes,
            parent,
            previous,
        }
    }

    struct Tree {
        nodes: Vec<Node>,
    }

    impl ElementAdapter for Tree {
        type Handle = usize;

        fn parent(&self, element: usize) -> Option<usize> {
            self.nodes.get(element).and_then(|node| node.parent)
        }

        fn previous_sibling_element(&self, element: usize) -> Option<usize> {
            self.nodes.get(element).and_then(|node| node.previous)
        }

        fn tag_name(&self, element: usize) -> &str {
            self.nodes.get(element).map_or("", |node| node.tag)
        }

        fn element_id(&self, element: usize) -> Option<&str> {
            self.nodes.get(element).and_then(|node| node.id)
        }

        fn has_class(&self, element: usize, class: &str) -> bool {
            self.nodes
                .get(element)
                .is_some_and(|node| node.classes.split_whitespace().any(|token| token == class))
        }

        fn attr(&self, element: usize, name: &str) -> Option<&str> {
            match name {
                "id" => self.element_id(element),
                "class" => self.nodes.get(element).map(|node| node.classes),
                _ => None,
            }
        }
    }

    /// `div#wenyan > (section.a > p, ul > (li, li.x, li))`
    fn sample() -> Tree {
        Tree {
            nodes: vec![
                node("div", Some("wenyan"), "", None, None),
                node("section", None, "a", Some(0), None),
                node("p", None, "", Some(1), None),
                node("ul", None, "", Some(0), Some(1)),
                node("li", None, "", Some(3), None),
                node("li", None, "x", Some(3), Some(4)),
                node("li", None, "", Some(3), Some(5)),
            ],
        }
    }

    #[test]
    fn attribute_operators() -> Result<(), Error> {
        let tree = sample();
        assert_eq!(matching(&tree, "[id^=wen]")?, vec![0]);
        assert_eq!(matching(&tree, "[id$=yan], [class*=x]")?, vec![0, 5]);
        assert_eq!(matching(&tree, "[class~=a]")?, vec![1]);
        assert_eq!(matching(&tree, "[id^='']")?, Vec::<usize>::new());
        Ok(())
    }

    #[test]
    fn operator_edge_cases() {
        assert!(AttrOperator::Includes.matches("note wide", "wide"));
        assert!(!AttrOperator::Includes.matches("note wide", "note wide"));
        assert!(AttrOperator::DashMatch.matches("zh-CN", "zh"));
        assert!(AttrOperator::DashMatch.matches("zh", "zh"));
        assert!(!AttrOperator::DashMatch.matches("zhx", "zh"));
        assert!(!AttrOperator::Suffix.matches("a", ""));
    }

    fn matching(tree: &Tree, selector: &str) -> Result<Vec<usize>, Error> {
        let list = parse_selector_list(selector)?;
        Ok((0..tree.nodes.len())
            .filter(|&handle| matches_selector_list(tree, handle, &list))
            .collect())
    }

    #[test]
    fn descendant_backtracks_past_first_candidate() -> Result<(), Error> {
        let tree = sample();
        assert_eq!(matching(&tree, "#wenyan p")?, vec![2]);
        assert_eq!(matching(&tree, "div section p")?, vec![2]);
        assert_eq!(matching(&tree, "#wenyan > p")?, Vec::<usize>::new());
        Ok(())
    }

    #[test]
    fn sibling_combinators() -> Result<(), Error> {
        let tree = sample();
        assert_eq!(matching(&tree, "li + li")?, vec![5, 6]);
        assert_eq!(matching(&tree, "li.x ~ li")?, vec![6]);
        assert_eq!(matching(&tree, "section ~ ul > li.x")?, vec![5]);
        Ok(())
    }

    #[test]
    fn class_id_and_attribute_simples() -> Result<(), Error> {
        let tree = sample();
        assert_eq!(matching(&tree, ".a, [id=wenyan]")?, vec![0, 1]);
        assert_eq!(matching(&tree, "*[id]")?, vec![0]);
        assert_eq!(matching(&tree, ".A")?, Vec::<usize>::new());
        Ok(())
    }
}
