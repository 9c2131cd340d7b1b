//! CSS Custom Properties for Cascading Variables Module Level 1: text-level `var()` inlining.
//! Spec: <https://www.w3.org/TR/css-variables-1/>
//!
//! Publishing targets drop custom properties entirely, so themes are flattened before they
//! are parsed: every `--name: value;` definition found anywhere in the text is collected,
//! `var(--name)` references are substituted, and `:root { ... }` blocks are removed.

#![forbid(unsafe_code)]

use std::collections::{HashMap, HashSet};

use log::debug;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Default sans-serif stack, used for `--sans-serif-font` when the theme does not define it.
pub const SANS_SERIF: &str = "system-ui, 'Apple Color Emoji', 'Segoe UI', 'Segoe UI Symbol', 'Noto Sans', 'Roboto', sans-serif";

/// Default monospace stack, used for `--monospace-font` when the theme does not define it.
pub const MONOSPACE: &str = "Menlo, Monaco, Consolas, 'Liberation Mono', 'Roboto Mono', 'Courier New', 'Microsoft YaHei', monospace";

/// `--name: value;` where the value may contain one level of nested parentheses.
static DEFINITION: Lazy<Regex> = Lazy::new(|| {
    compile(r"--([a-zA-Z0-9\-]+):\s*([^;()]*\((?:[^()]*|\([^()]*\))*\)[^;()]*|[^;]+);")
});

/// A `var(--name)` reference without fallback.
static REFERENCE: Lazy<Regex> = Lazy::new(|| compile(r"var\(--([a-zA-Z0-9\-]+)\)"));

/// A `:root { ... }` block, matched up to the first closing brace.
static ROOT_BLOCK: Lazy<Regex> = Lazy::new(|| compile(r":root\s*\{[^}]*\}"));

#[allow(clippy::expect_used, reason = "Only called with constant patterns")]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("BUG: invalid regex literal")
}

/// Custom property definitions in first-definition order.
/// Keys are property names without the leading `--`; values are raw value text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VariableTable {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl VariableTable {
    /// Collect every custom property definition in `css`, regardless of the rule it
    /// appears in. A later definition of the same name replaces the value but keeps
    /// the position of the first one.
    pub fn collect(css: &str) -> Self {
        let mut table = Self::default();
        for caps in DEFINITION.captures_iter(css) {
            let (Some(name), Some(value)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            let cleaned = value.as_str().trim().replace('\n', "");
            table.insert(name.as_str(), cleaned);
        }
        table
    }

    /// Insert or replace a value.
    pub fn insert(&mut self, name: &str, value: String) {
        if let Some(&position) = self.index.get(name) {
            if let Some(entry) = self.entries.get_mut(position) {
                entry.1 = value;
            }
            return;
        }
        self.index.insert(name.to_owned(), self.entries.len());
        self.entries.push((name.to_owned(), value));
    }

    /// Look up a defined, non-empty value.
    pub fn get(&self, name: &str) -> Option<&str> {
        let position = *self.index.get(name)?;
        self.entries
            .get(position)
            .map(|entry| entry.1.as_str())
            .filter(|value| !value.is_empty())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no variable is defined.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, value)` pairs in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Fill in the font stacks every theme may rely on.
    pub fn with_font_defaults(mut self) -> Self {
        if self.get("sans-serif-font").is_none() {
            self.insert("sans-serif-font", SANS_SERIF.to_owned());
        }
        if self.get("monospace-font").is_none() {
            self.insert("monospace-font", MONOSPACE.to_owned());
        }
        self
    }

    /// Expand nested references inside every stored value, in definition order.
    /// Each expanded value is written back before the next one is resolved, so later
    /// entries see the already-expanded form of earlier ones.
    pub fn resolve_all(&mut self) {
        for position in 0..self.entries.len() {
            let Some(raw) = self.entries.get(position).map(|entry| entry.1.clone()) else {
                continue;
            };
            let resolved = resolve_value(&raw, self, &mut HashSet::new());
            if let Some(entry) = self.entries.get_mut(position) {
                entry.1 = resolved;
            }
        }
    }
}

/// Recursively expand `var()` references in `value`.
///
/// The guard is keyed on the value text: once a value has been seen in this chain it is
/// returned unexpanded. Distinct value strings forming a cycle are only stopped when one
/// of them repeats.
///
/// Spec: <https://www.w3.org/TR/css-variables-1/#cycles>
fn resolve_value(value: &str, table: &VariableTable, visited: &mut HashSet<String>) -> String {
    if !visited.insert(value.to_owned()) {
        return value.to_owned();
    }
    REFERENCE
        .replace_all(value, |caps: &Captures<'_>| {
            let reference = caps.get(0).map_or("", |whole| whole.as_str());
            match caps.get(1).and_then(|name| table.get(name.as_str())) {
                Some(found) => resolve_value(found, table, visited),
                None => reference.to_owned(),
            }
        })
        .into_owned()
}

/// Replace every `var(--name)` in `css` with the table value; unknown names stay literal.
pub fn replace_references(css: &str, table: &VariableTable) -> String {
    REFERENCE
        .replace_all(css, |caps: &Captures<'_>| {
            let reference = caps.get(0).map_or("", |whole| whole.as_str());
            caps.get(1)
                .and_then(|name| table.get(name.as_str()))
                .unwrap_or(reference)
                .to_owned()
        })
        .into_owned()
}

/// Remove `:root { ... }` blocks.
///
/// Matching stops at the first `}`, so a root block holding a nested block or a literal
/// brace in a value is only partially removed.
pub fn strip_root_blocks(css: &str) -> String {
    ROOT_BLOCK.replace_all(css, "").into_owned()
}

/// Inline all resolvable custom properties in `css` and drop the `:root` blocks.
///
/// Never fails: references to unknown variables are passed through unchanged.
pub fn resolve(css: &str) -> String {
    let mut table = VariableTable::collect(css).with_font_defaults();
    table.resolve_all();
    debug!("Resolved {} custom properties", table.len());
    strip_root_blocks(&replace_references(css, &table))
}
