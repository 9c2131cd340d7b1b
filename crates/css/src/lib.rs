//! Theme compilation and inlining.
//!
//! A theme stylesheet is flattened ([`css_variables::resolve`]), adjusted by a table of
//! per-selector insertions ([`CssModifier`]), pushed onto elements as inline styles
//! ([`CssApplier`]) and its `::before` / `::after` rules are turned into real nodes
//! ([`apply_pseudo_elements`]). Theme text comes from explicit registries ([`registry`]).

mod applier;
mod modifier;
mod pseudo;
pub mod registry;

pub use applier::{CONTENT_ROOT_SELECTOR, CssApplier, apply_theme};
pub use css_variables::{MONOSPACE, SANS_SERIF, resolve as resolve_variables};
pub use modifier::{AppendPolicy, CssModifier, UpdateDirective, UpdateTable};
pub use pseudo::{
    PropertyMap, PseudoPart, PseudoPosition, PseudoRule, PseudoRuleTable, apply_pseudo_elements,
    build_pseudo_element, classify,
};
pub use registry::{
    CssSource, HlTheme, HlThemeRegistry, InlineCss, LoaderCss, Theme, ThemeMeta, ThemeRegistry,
    resolve_css_content,
};
