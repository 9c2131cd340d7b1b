//! Theme and highlight-theme registries.
//!
//! Registries are plain values owned by the caller; nothing is registered globally. Each
//! entry wraps a [`CssSource`], which produces the raw stylesheet text on demand.

use std::collections::HashMap;

use anyhow::{Error, anyhow};
use async_trait::async_trait;
use futures::future::BoxFuture;
use log::debug;

/// Something that can produce stylesheet text.
#[async_trait]
pub trait CssSource: Send + Sync {
    /// Fetch the stylesheet text.
    ///
    /// # Errors
    /// Returns whatever error the underlying loader reports.
    async fn get_css(&self) -> Result<String, Error>;
}

/// Stylesheet text held in memory.
#[derive(Clone, Debug)]
pub struct InlineCss {
    css: String,
}

impl InlineCss {
    pub fn new(css: impl Into<String>) -> Self {
        Self { css: css.into() }
    }
}

#[async_trait]
impl CssSource for InlineCss {
    async fn get_css(&self) -> Result<String, Error> {
        Ok(self.css.clone())
    }
}

/// Stylesheet text produced by an async loader, called on every fetch.
pub struct LoaderCss<F>
where
    F: Fn() -> BoxFuture<'static, Result<String, Error>> + Send + Sync,
{
    loader: F,
}

impl<F> LoaderCss<F>
where
    F: Fn() -> BoxFuture<'static, Result<String, Error>> + Send + Sync,
{
    pub fn new(loader: F) -> Self {
        Self { loader }
    }
}

#[async_trait]
impl<F> CssSource for LoaderCss<F>
where
    F: Fn() -> BoxFuture<'static, Result<String, Error>> + Send + Sync,
{
    async fn get_css(&self) -> Result<String, Error> {
        (self.loader)().await
    }
}

/// Descriptive data of a document theme.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ThemeMeta {
    pub id: String,
    pub name: String,
    pub description: String,
    pub app_name: String,
    pub author: String,
}

impl ThemeMeta {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_owned(),
            name: name.to_owned(),
            ..Self::default()
        }
    }
}

/// A document theme.
pub struct Theme {
    pub meta: ThemeMeta,
    source: Box<dyn CssSource>,
}

impl Theme {
    pub fn new(meta: ThemeMeta, source: impl CssSource + 'static) -> Self {
        Self {
            meta,
            source: Box::new(source),
        }
    }

    pub fn source(&self) -> &dyn CssSource {
        self.source.as_ref()
    }
}

/// A code highlighting theme.
pub struct HlTheme {
    pub id: String,
    source: Box<dyn CssSource>,
}

impl HlTheme {
    pub fn new(id: &str, source: impl CssSource + 'static) -> Self {
        Self {
            id: id.to_owned(),
            source: Box::new(source),
        }
    }

    pub fn source(&self) -> &dyn CssSource {
        self.source.as_ref()
    }
}

/// Document themes keyed by id, iterated in registration order.
#[derive(Default)]
pub struct ThemeRegistry {
    themes: Vec<Theme>,
    index: HashMap<String, usize>,
}

impl ThemeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a theme; an existing theme with the same id is replaced in place.
    pub fn register(&mut self, theme: Theme) {
        if let Some(&position) = self.index.get(&theme.meta.id)
            && let Some(slot) = self.themes.get_mut(position)
        {
            *slot = theme;
            return;
        }
        self.index.insert(theme.meta.id.clone(), self.themes.len());
        self.themes.push(theme);
    }

    pub fn get(&self, id: &str) -> Option<&Theme> {
        self.themes.get(*self.index.get(id)?)
    }

    pub fn all(&self) -> impl Iterator<Item = &Theme> {
        self.themes.iter()
    }

    /// Exact id first, then the first theme whose name matches case-insensitively.
    pub fn find(&self, id: &str) -> Option<&Theme> {
        self.get(id).or_else(|| {
            self.themes
                .iter()
                .find(|theme| theme.meta.name.eq_ignore_ascii_case(id))
        })
    }
}

/// Highlight themes keyed by id, iterated in registration order.
#[derive(Default)]
pub struct HlThemeRegistry {
    themes: Vec<HlTheme>,
    index: HashMap<String, usize>,
}

impl HlThemeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a theme; an existing theme with the same id is replaced in place.
    pub fn register(&mut self, theme: HlTheme) {
        if let Some(&position) = self.index.get(&theme.id)
            && let Some(slot) = self.themes.get_mut(position)
        {
            *slot = theme;
            return;
        }
        self.index.insert(theme.id.clone(), self.themes.len());
        self.themes.push(theme);
    }

    pub fn get(&self, id: &str) -> Option<&HlTheme> {
        self.themes.get(*self.index.get(id)?)
    }

    pub fn all(&self) -> impl Iterator<Item = &HlTheme> {
        self.themes.iter()
    }

    /// Exact id first, then the first theme whose id matches case-insensitively.
    pub fn find(&self, id: &str) -> Option<&HlTheme> {
        self.get(id).or_else(|| {
            self.themes
                .iter()
                .find(|theme| theme.id.eq_ignore_ascii_case(id))
        })
    }
}

/// Produce variable-free stylesheet text.
///
/// Non-empty `direct_css` wins; otherwise `lookup(id)` supplies the source, which is
/// fetched once. Either way the text goes through the variable resolver.
///
/// # Errors
/// Returns an error carrying `error_message` if nothing is found for `id`, or the
/// source's own error if fetching fails.
pub async fn resolve_css_content<'reg, L>(
    direct_css: Option<&str>,
    id: &str,
    lookup: L,
    error_message: &str,
) -> Result<String, Error>
where
    L: FnOnce(&str) -> Option<&'reg dyn CssSource>,
{
    if let Some(css) = direct_css.filter(|css| !css.is_empty()) {
        return Ok(css_variables::resolve(css));
    }
    let source = lookup(id).ok_or_else(|| anyhow!("{error_message}"))?;
    let raw = source.get_css().await?;
    debug!("Fetched {} bytes of CSS for {id:?}", raw.len());
    Ok(css_variables::resolve(&raw))
}
