//! Selector lists as written in theme stylesheets, and a right-to-left matcher.
//! Grammar: <https://www.w3.org/TR/selectors-3/>
//!
//! Type, universal, `#id`, `.class` and attribute simple selectors (`[attr]`, `=`, `^=`,
//! `$=`, `*=`, `~=`, `|=`) parse, with backslash escapes in names, along with the four
//! combinators. Anything with `:` or functional notation is an error.
//! Specificity is not computed; rules apply in source order.

mod matcher;
mod parser;

pub use matcher::{matches_complex, matches_compound, matches_selector_list};
pub use parser::{parse_complex_selector, parse_selector_list};

/// Read access to a document tree, as much as matching needs.
pub trait ElementAdapter {
    type Handle: Copy + Eq;

    /// Parent element. `None` at the top, including when the parent is the document.
    fn parent(&self, element: Self::Handle) -> Option<Self::Handle>;

    /// Nearest preceding sibling that is an element.
    fn previous_sibling_element(&self, element: Self::Handle) -> Option<Self::Handle>;

    /// Lowercase for HTML elements; foreign elements keep their case.
    fn tag_name(&self, element: Self::Handle) -> &str;

    fn element_id(&self, element: Self::Handle) -> Option<&str>;

    fn has_class(&self, element: Self::Handle, class: &str) -> bool;

    fn attr(&self, element: Self::Handle, name: &str) -> Option<&str>;
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SimpleSelector {
    /// `p`, lowercased when parsed.
    Type(String),
    /// `.name`
    Class(String),
    /// `#name`
    Id(String),
    /// `[name]`
    AttrExists(String),
    /// `[name=value]`, quoted or bare value.
    AttrValue { name: String, value: String },
    /// `[name^=value]` and the other operator forms.
    AttrOp {
        name: String,
        operator: AttrOperator,
        value: String,
    },
    /// `*`
    Universal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttrOperator {
    /// `^=`
    Prefix,
    /// `$=`
    Suffix,
    /// `*=`
    Substring,
    /// `~=`, one of the whitespace-separated words.
    Includes,
    /// `|=`, the value itself or the value followed by `-`.
    DashMatch,
}

impl AttrOperator {
    /// Whether an attribute holding `actual` satisfies `[name<op>expected]`.
    ///
    /// Prefix, suffix, substring and word matches never match an empty `expected`.
    pub fn matches(self, actual: &str, expected: &str) -> bool {
        match self {
            Self::Prefix => !expected.is_empty() && actual.starts_with(expected),
            Self::Suffix => !expected.is_empty() && actual.ends_with(expected),
            Self::Substring => !expected.is_empty() && actual.contains(expected),
            Self::Includes => {
                !expected.is_empty()
                    && !expected.contains(char::is_whitespace)
                    && actual.split_whitespace().any(|word| word == expected)
            }
            Self::DashMatch => actual
                .strip_prefix(expected)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('-')),
        }
    }
}

/// Simple selectors that must all match one element.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct CompoundSelector {
    pub simples: Vec<SimpleSelector>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Combinator {
    /// Whitespace.
    Descendant,
    /// `>`
    Child,
    /// `+`
    AdjacentSibling,
    /// `~`
    GeneralSibling,
}

/// Compounds joined by combinators, read left to right.
///
/// Each `rest` entry holds the combinator that joins it to the compound on its left.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ComplexSelector {
    pub first: CompoundSelector,
    pub rest: Vec<(Combinator, CompoundSelector)>,
}

impl ComplexSelector {
    /// The compound at `position`, counting `first` as zero.
    pub fn compound(&self, position: usize) -> Option<&CompoundSelector> {
        match position.checked_sub(1) {
            None => Some(&self.first),
            Some(offset) => self.rest.get(offset).map(|pair| &pair.1),
        }
    }
}

/// Comma-separated selectors; matches if any of them does.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct SelectorList {
    pub selectors: Vec<ComplexSelector>,
}
