//! Rule update merger: inserts declarations into style rules whose selectors appear in an
//! update table, then regenerates the stylesheet text.

use std::collections::HashMap;

use anyhow::{Context as _, Error};
use css_syntax::{Declaration, StyleRule, Stylesheet, parse_stylesheet};
use log::trace;

/// When a directive's declaration is inserted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AppendPolicy {
    /// Always prepend, even if the rule already declares the property.
    AlwaysInsert,
    /// Prepend only if the rule has no declaration of the property.
    #[default]
    InsertIfAbsent,
}

/// One declaration to insert.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateDirective {
    pub property: String,
    /// Directives without a value are ignored.
    pub value: Option<String>,
    pub policy: AppendPolicy,
}

impl UpdateDirective {
    pub fn insert_if_absent(property: &str, value: &str) -> Self {
        Self {
            property: property.to_owned(),
            value: Some(value.to_owned()),
            policy: AppendPolicy::InsertIfAbsent,
        }
    }

    pub fn always_insert(property: &str, value: &str) -> Self {
        Self {
            property: property.to_owned(),
            value: Some(value.to_owned()),
            policy: AppendPolicy::AlwaysInsert,
        }
    }
}

/// Literal selector text to the directives registered for it.
///
/// Keys are compared with the generated selector text of each rule, so they must use the
/// normalized form: single spaces between compounds, no spaces around `>`, `+` and `~`.
#[derive(Clone, Debug, Default)]
pub struct UpdateTable {
    entries: HashMap<String, Vec<UpdateDirective>>,
}

impl UpdateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a directive under `selector`, after any already registered there.
    pub fn insert(&mut self, selector: &str, directive: UpdateDirective) -> &mut Self {
        self.entries
            .entry(selector.to_owned())
            .or_default()
            .push(directive);
        self
    }

    pub fn get(&self, selector: &str) -> &[UpdateDirective] {
        self.entries.get(selector).map_or(&[], Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Applies an [`UpdateTable`] to stylesheets.
#[derive(Clone, Debug, Default)]
pub struct CssModifier {
    table: UpdateTable,
}

impl CssModifier {
    pub fn new(table: UpdateTable) -> Self {
        Self { table }
    }

    /// Parse `css`, apply the table to every style rule and generate the text back.
    ///
    /// # Errors
    /// Returns an error if the stylesheet cannot be parsed.
    pub fn modify(&self, css: &str) -> Result<String, Error> {
        let mut sheet = parse_stylesheet(css).context("Failed to parse stylesheet for update")?;
        self.apply(&mut sheet);
        Ok(sheet.to_string())
    }

    /// Apply the table to an already parsed stylesheet.
    pub fn apply(&self, sheet: &mut Stylesheet) {
        if self.table.is_empty() {
            return;
        }
        for rule in sheet.style_rules_mut() {
            self.apply_to_rule(rule);
        }
    }

    fn apply_to_rule(&self, rule: &mut StyleRule) {
        // Property-keyed merge: a later selector's directive replaces an earlier one but
        // keeps its position.
        let mut merged: Vec<&UpdateDirective> = Vec::new();
        for selector in &rule.selectors {
            for directive in self.table.get(selector) {
                if let Some(slot) = merged
                    .iter_mut()
                    .find(|existing| existing.property == directive.property)
                {
                    *slot = directive;
                } else {
                    merged.push(directive);
                }
            }
        }

        for directive in merged {
            let Some(value) = directive.value.as_deref().filter(|value| !value.is_empty()) else {
                continue;
            };
            let present = rule
                .declarations
                .iter()
                .any(|decl| decl.property == directive.property);
            if directive.policy == AppendPolicy::InsertIfAbsent && present {
                continue;
            }
            trace!(
                "{}: prepend {}: {value}",
                rule.prelude(),
                directive.property
            );
            rule.declarations
                .insert(0, Declaration::new(&directive.property, value, false));
        }
    }
}
