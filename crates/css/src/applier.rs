//! Inline style applier: pushes every style rule's declarations onto the `style`
//! attribute of the elements its selectors match.

use anyhow::{Context as _, Error};
use css_syntax::{Stylesheet, parse_stylesheet};
use html::{DOM, NodeId};
use log::{debug, trace};

use crate::pseudo::PseudoRuleTable;

/// Selector that designates the content root itself instead of a descendant query.
pub const CONTENT_ROOT_SELECTOR: &str = "#wenyan";

/// A parsed stylesheet ready to be applied to any number of content roots.
#[derive(Clone, Debug)]
pub struct CssApplier {
    sheet: Stylesheet,
}

impl CssApplier {
    /// # Errors
    /// Returns an error if the stylesheet cannot be parsed.
    pub fn new(css: &str) -> Result<Self, Error> {
        let sheet = parse_stylesheet(css).context("Failed to parse stylesheet to apply")?;
        Ok(Self { sheet })
    }

    pub fn from_stylesheet(sheet: Stylesheet) -> Self {
        Self { sheet }
    }

    /// Apply rules in source order. Later rules overwrite earlier ones per property,
    /// regardless of specificity. Selectors containing `:` are skipped.
    ///
    /// # Errors
    /// Returns an error if a selector is rejected by the selector parser or the DOM
    /// refuses an attribute update.
    pub fn apply(&self, dom: &mut DOM, root: NodeId) -> Result<(), Error> {
        let mut applied = 0_usize;
        for rule in self.sheet.style_rules() {
            for selector in &rule.selectors {
                if selector.contains(':') {
                    trace!("Skipping pseudo selector {selector:?}");
                    continue;
                }
                let targets = if selector == CONTENT_ROOT_SELECTOR {
                    vec![root]
                } else {
                    dom.query_selector_all(root, selector)?
                };
                for target in targets {
                    for decl in &rule.declarations {
                        dom.set_style_property(target, &decl.property, &decl.value, decl.important)?;
                    }
                    applied = applied.saturating_add(1);
                }
            }
        }
        debug!("Inlined styles onto {applied} element matches");
        Ok(())
    }
}

/// Parse `css` once, inline its rules under `root`, then synthesize its `::before` /
/// `::after` nodes.
///
/// # Errors
/// Returns an error if the stylesheet cannot be parsed or either pass fails.
pub fn apply_theme(dom: &mut DOM, root: NodeId, css: &str) -> Result<(), Error> {
    let sheet = parse_stylesheet(css).context("Failed to parse theme stylesheet")?;
    let pseudo = PseudoRuleTable::from_stylesheet(&sheet);
    CssApplier::from_stylesheet(sheet).apply(dom, root)?;
    pseudo.apply(dom, root)
}
