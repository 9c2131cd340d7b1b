//! Render options. Every field is optional when loaded with serde; missing fields take
//! the defaults below.

use serde::{Deserialize, Serialize};

/// Options fixed for the lifetime of a [`crate::WenyanCore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WenyanOptions {
    /// Apply the WeChat post-render pass and output rewrites.
    pub is_wechat: bool,
}

impl Default for WenyanOptions {
    fn default() -> Self {
        Self { is_wechat: true }
    }
}

/// Per-render options of [`crate::WenyanCore::apply_styles_with_theme`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ApplyStylesOptions {
    pub theme_id: String,
    pub hl_theme_id: String,
    /// Used instead of the registered theme when non-empty.
    pub theme_css: Option<String>,
    /// Used instead of the registered highlight theme when non-empty.
    pub hl_theme_css: Option<String>,
    pub is_mac_style: bool,
    pub is_add_footnote: bool,
}

impl Default for ApplyStylesOptions {
    fn default() -> Self {
        Self {
            theme_id: "default".to_owned(),
            hl_theme_id: "solarized-light".to_owned(),
            theme_css: None,
            hl_theme_css: None,
            is_mac_style: true,
            is_add_footnote: true,
        }
    }
}

/// Variable-free stylesheets and switches for
/// [`crate::WenyanCore::apply_styles_with_resolved_css`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolvedStyles {
    /// Skipped when empty.
    pub theme_css: String,
    /// Skipped when empty.
    pub hl_theme_css: String,
    pub is_mac_style: bool,
    pub is_add_footnote: bool,
}

impl Default for ResolvedStyles {
    fn default() -> Self {
        Self {
            theme_css: String::new(),
            hl_theme_css: String::new(),
            is_mac_style: true,
            is_add_footnote: true,
        }
    }
}
