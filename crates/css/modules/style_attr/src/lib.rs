//! CSS Style Attributes: style="..." attribute processing.
//! Spec: <https://www.w3.org/TR/css-style-attr/>
//!
//! The model mirrors the parts of `CSSStyleDeclaration` that inlining needs: parse the
//! attribute, `setProperty`, `removeProperty`, and serialize back to attribute text.

#![forbid(unsafe_code)]

use core::slice;

use log::trace;

/// A single CSS declaration parsed from a style attribute.
///
/// Spec: <https://www.w3.org/TR/css-style-attr/#interpreting>
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    /// Property name normalized to ASCII lowercase; custom properties keep their case.
    pub property: String,
    /// Raw value trimmed of surrounding ASCII whitespace, without the `!important` flag.
    pub value: String,
    /// Whether the declaration carried `!important`.
    pub important: bool,
}

/// Ordered declarations of one `style` attribute.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StyleDeclarations {
    declarations: Vec<Declaration>,
}

impl StyleDeclarations {
    /// Parse attribute text. Invalid items (no colon, empty name or value) are skipped;
    /// a repeated property keeps the position of its first occurrence and the last value.
    ///
    /// Spec: <https://www.w3.org/TR/css-style-attr/#interpreting>
    pub fn parse(input: &str) -> Self {
        let mut style = Self::default();
        for decl in parse_style_attribute(input) {
            style.set_property(&decl.property, &decl.value, decl.important);
        }
        style
    }

    /// `CSSStyleDeclaration.setProperty`: replace an existing declaration in place,
    /// otherwise append. An empty value removes the property.
    ///
    /// Spec: <https://www.w3.org/TR/cssom-1/#dom-cssstyledeclaration-setproperty>
    pub fn set_property(&mut self, property: &str, value: &str, important: bool) {
        let name = normalize_property_name(property);
        let trimmed = value.trim_matches(is_ascii_whitespace);
        if trimmed.is_empty() {
            self.remove_property(&name);
            return;
        }
        if let Some(existing) = self.declarations.iter_mut().find(|decl| decl.property == name) {
            trimmed.clone_into(&mut existing.value);
            existing.important = important;
            return;
        }
        trace!("style: append {name}");
        self.declarations.push(Declaration {
            property: name,
            value: trimmed.to_owned(),
            important,
        });
    }

    /// Remove a property, returning its previous value.
    pub fn remove_property(&mut self, property: &str) -> Option<String> {
        let name = normalize_property_name(property);
        let position = self
            .declarations
            .iter()
            .position(|decl| decl.property == name)?;
        Some(self.declarations.remove(position).value)
    }

    /// Value of a property, if set.
    pub fn get_property_value(&self, property: &str) -> Option<&str> {
        let name = normalize_property_name(property);
        self.declarations
            .iter()
            .find(|decl| decl.property == name)
            .map(|decl| decl.value.as_str())
    }

    /// Whether the property is set with `!important`.
    pub fn get_property_priority(&self, property: &str) -> bool {
        let name = normalize_property_name(property);
        self.declarations
            .iter()
            .any(|decl| decl.property == name && decl.important)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations.iter()
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Serialize as `a: b; c: d !important;`, the form browsers produce for `style`.
    ///
    /// Spec: <https://www.w3.org/TR/cssom-1/#serialize-a-css-declaration-block>
    pub fn to_css_text(&self) -> String {
        let mut out = String::new();
        for decl in &self.declarations {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&decl.property);
            out.push_str(": ");
            out.push_str(&decl.value);
            if decl.important {
                out.push_str(" !important");
            }
            out.push(';');
        }
        out
    }
}

impl<'decls> IntoIterator for &'decls StyleDeclarations {
    type Item = &'decls Declaration;
    type IntoIter = slice::Iter<'decls, Declaration>;

    fn into_iter(self) -> Self::IntoIter {
        self.declarations.iter()
    }
}

/// Parse the value of a `style` attribute into a list of declarations, in source order.
///
/// Semicolons and colons inside quotes or parentheses do not split, so `url(data:...;...)`
/// values survive intact. Items without a colon or with an empty name or value are skipped.
///
/// Spec: <https://www.w3.org/TR/css-style-attr/#interpreting>
pub fn parse_style_attribute(input: &str) -> Vec<Declaration> {
    let mut out: Vec<Declaration> = Vec::new();
    for raw_item in split_top_level(input, ';') {
        let item = raw_item.trim_matches(is_ascii_whitespace);
        if item.is_empty() {
            continue;
        }
        let Some((raw_prop, raw_value)) = split_first_top_level(item, ':') else {
            continue;
        };
        let property_text = raw_prop.trim_matches(is_ascii_whitespace);
        let (value_text, important) = split_important(raw_value.trim_matches(is_ascii_whitespace));
        if property_text.is_empty() || value_text.is_empty() {
            continue;
        }
        out.push(Declaration {
            property: normalize_property_name(property_text),
            value: value_text.to_owned(),
            important,
        });
    }
    out
}

/// Split on `separator` outside quotes and parentheses.
fn split_top_level(input: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = input;
    while let Some((head, tail)) = split_first_top_level(rest, separator) {
        parts.push(head);
        rest = tail;
    }
    parts.push(rest);
    parts
}

/// Split at the first `separator` outside quotes and parentheses.
fn split_first_top_level(input: &str, separator: char) -> Option<(&str, &str)> {
    let mut depth = 0_usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (offset, character) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, character) {
            (_, '\\') => escaped = true,
            (Some(open), _) if character == open => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(character),
            (None, '(') => depth = depth.saturating_add(1),
            (None, ')') => depth = depth.saturating_sub(1),
            (None, _) if depth == 0 && character == separator => {
                let tail = input.get(offset.saturating_add(character.len_utf8())..)?;
                return Some((input.get(..offset)?, tail));
            }
            (None, _) => {}
        }
    }
    None
}

/// Strip a trailing `!important` (any ASCII case, optional space after `!`).
fn split_important(value: &str) -> (&str, bool) {
    let Some(bang) = value.rfind('!') else {
        return (value, false);
    };
    let flag = value
        .get(bang.saturating_add(1)..)
        .unwrap_or_default()
        .trim_matches(is_ascii_whitespace);
    if flag.eq_ignore_ascii_case("important") {
        let head = value.get(..bang).unwrap_or_default();
        (head.trim_end_matches(is_ascii_whitespace), true)
    } else {
        (value, false)
    }
}

/// ASCII whitespace per CSS Syntax (TAB, LF, FF, CR, SPACE).
///
/// Spec: <https://www.w3.org/TR/css-syntax-3/#whitespace>
const fn is_ascii_whitespace(character: char) -> bool {
    matches!(
        character,
        '\u{0009}' | '\u{000A}' | '\u{000C}' | '\u{000D}' | '\u{0020}'
    )
}

/// Lowercase a property name; custom properties (`--x`) are case-sensitive and kept.
fn normalize_property_name(text: &str) -> String {
    if text.starts_with("--") {
        text.to_owned()
    } else {
        text.to_ascii_lowercase()
    }
}
