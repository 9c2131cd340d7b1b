//! End-to-end styling of rendered Markdown for publishing.
//!
//! [`WenyanCore`] takes an HTML subtree rooted at `#wenyan`, resolves the requested theme and
//! code highlight theme from its registries and inlines them, together with footnotes, the
//! mac-style code block header and the WeChat rewrites.

mod footnotes;
mod options;
pub mod platform;
mod wechat;

use anyhow::{Context as _, Error, bail};
use css::{
    CssApplier, CssModifier, HlTheme, HlThemeRegistry, Theme, ThemeRegistry,
    UpdateDirective, UpdateTable, apply_pseudo_elements, apply_theme, resolve_css_content,
};
use html::{DOM, NodeId, parse_fragment};
use log::{debug, info};

pub use css::{CONTENT_ROOT_SELECTOR, MONOSPACE, SANS_SERIF};
pub use footnotes::{FOOTNOTES_HEADING, FootnoteStyle, add_footnotes};
pub use options::{ApplyStylesOptions, ResolvedStyles, WenyanOptions};
pub use wechat::wechat_post_render;

/// Default serif stack.
pub const SERIF: &str = "Georgia, Cambria, 'Noto Serif', 'Times New Roman', serif";

/// Built-in stylesheet drawing the three window buttons above code blocks.
pub const MAC_STYLE_CSS: &str = include_str!("../assets/mac_style.css");

/// Value of `data-provider` on WeChat output.
const PROVIDER: &str = "WenYan";

/// Declarations every theme gets unless it sets them itself.
fn default_updates() -> UpdateTable {
    let mut table = UpdateTable::new();
    table
        .insert(
            CONTENT_ROOT_SELECTOR,
            UpdateDirective::insert_if_absent("font-family", SANS_SERIF),
        )
        .insert(
            "#wenyan pre code",
            UpdateDirective::insert_if_absent("font-family", MONOSPACE),
        )
        .insert(
            "#wenyan pre",
            UpdateDirective::insert_if_absent("font-size", "12px"),
        );
    table
}

/// Rewrites applied to serialized WeChat output.
fn finish_wechat_markup(html: &str) -> String {
    html.replace("class=\"mjx-solid\"", "fill=\"none\" stroke-width=\"70\"")
        .replace("\n<li", "<li")
        .replace("</li>\n", "</li>")
}

pub struct WenyanCore {
    options: WenyanOptions,
    themes: ThemeRegistry,
    hl_themes: HlThemeRegistry,
    defaults: CssModifier,
}

impl WenyanCore {
    pub fn new(options: WenyanOptions, themes: ThemeRegistry, hl_themes: HlThemeRegistry) -> Self {
        debug!(
            "Wenyan core with {} themes and {} highlight themes",
            themes.all().count(),
            hl_themes.all().count()
        );
        Self {
            options,
            themes,
            hl_themes,
            defaults: CssModifier::new(default_updates()),
        }
    }

    pub const fn options(&self) -> &WenyanOptions {
        &self.options
    }

    pub const fn themes(&self) -> &ThemeRegistry {
        &self.themes
    }

    pub const fn hl_themes(&self) -> &HlThemeRegistry {
        &self.hl_themes
    }

    /// Resolve both themes, add the default fonts and style `root`.
    ///
    /// The theme and highlight theme are fetched concurrently. Returns the serialized
    /// content root.
    ///
    /// # Errors
    /// Returns `theme not found: <id>` / `highlight theme not found: <id>` for unknown ids,
    /// a loader's own error, or any error of [`Self::apply_styles_with_resolved_css`].
    pub async fn apply_styles_with_theme(
        &self,
        dom: &mut DOM,
        root: NodeId,
        options: ApplyStylesOptions,
    ) -> Result<String, Error> {
        let ApplyStylesOptions {
            theme_id,
            hl_theme_id,
            theme_css,
            hl_theme_css,
            is_mac_style,
            is_add_footnote,
        } = options;
        let theme_error = format!("theme not found: {theme_id}");
        let hl_theme_error = format!("highlight theme not found: {hl_theme_id}");

        let (resolved_theme, resolved_hl_theme) = futures::try_join!(
            resolve_css_content(
                theme_css.as_deref(),
                &theme_id,
                |id| self.themes.find(id).map(Theme::source),
                &theme_error,
            ),
            resolve_css_content(
                hl_theme_css.as_deref(),
                &hl_theme_id,
                |id| self.hl_themes.find(id).map(HlTheme::source),
                &hl_theme_error,
            ),
        )?;
        let modified_css = self
            .defaults
            .modify(&resolved_theme)
            .with_context(|| format!("Failed to add defaults to theme {theme_id:?}"))?;

        self.apply_styles_with_resolved_css(
            dom,
            root,
            ResolvedStyles {
                theme_css: modified_css,
                hl_theme_css: resolved_hl_theme,
                is_mac_style,
                is_add_footnote,
            },
        )
    }

    /// Style `root` with stylesheets that are already variable-free and return its markup.
    ///
    /// Passes run in order: footnotes, mac style, theme (inline styles, then pseudo-elements),
    /// highlight theme, WeChat post-render. Empty stylesheets are skipped.
    ///
    /// # Errors
    /// Returns an error if `root` is not an element, a stylesheet fails to parse, a selector
    /// is unsupported or the DOM rejects an edit.
    pub fn apply_styles_with_resolved_css(
        &self,
        dom: &mut DOM,
        root: NodeId,
        styles: ResolvedStyles,
    ) -> Result<String, Error> {
        if !dom.is_element(root) {
            bail!("Content root {root:?} is not an element");
        }
        if styles.is_add_footnote {
            add_footnotes(dom, root, FootnoteStyle::Paragraph)?;
        }
        if styles.is_mac_style {
            apply_pseudo_elements(dom, root, MAC_STYLE_CSS).context("Failed to apply mac style")?;
        }
        if !styles.theme_css.is_empty() {
            apply_theme(dom, root, &styles.theme_css).context("Failed to apply theme")?;
        }
        if !styles.hl_theme_css.is_empty() {
            CssApplier::new(&styles.hl_theme_css)
                .and_then(|applier| applier.apply(dom, root))
                .context("Failed to apply highlight theme")?;
        }
        if !self.options.is_wechat {
            return Ok(dom.outer_html(root));
        }
        wechat_post_render(dom, root)?;
        dom.set_attribute(root, "data-provider", PROVIDER)?;
        Ok(finish_wechat_markup(&dom.outer_html(root)))
    }

    /// Parse an HTML fragment, find its `#wenyan` element and style it.
    ///
    /// # Errors
    /// Returns an error if the fragment has no `#wenyan` element, or any error of
    /// [`Self::apply_styles_with_theme`].
    pub async fn render_fragment(
        &self,
        html: &str,
        options: ApplyStylesOptions,
    ) -> Result<String, Error> {
        let mut dom = parse_fragment(html)?;
        let root = dom
            .get_element_by_id(dom.root(), "wenyan")
            .context("Fragment has no #wenyan element")?;
        info!("Rendering with theme {:?}", options.theme_id);
        self.apply_styles_with_theme(&mut dom, root, options).await
    }
}
