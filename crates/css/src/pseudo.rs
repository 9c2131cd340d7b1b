//! Pseudo-element synthesis: `::before` / `::after` rules on a fixed set of tags become
//! real `<section>` children, since publishing targets drop pseudo-elements.

use anyhow::{Context as _, Error};
use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use css_syntax::{Stylesheet, parse_stylesheet};
use html::{DOM, NodeId};
use log::{debug, trace};
use once_cell::sync::Lazy;
use regex::Regex;

/// `h1`–`h6`, `blockquote` or `pre` followed by `::before` / `::after`, at the start of a
/// selector or after whitespace.
static PSEUDO_SELECTOR: Lazy<Regex> =
    Lazy::new(|| compile(r"(^|\s)(h[1-6]|blockquote|pre)::(before|after)\b"));

static INLINE_SVG: Lazy<Regex> = Lazy::new(|| compile(r"data:image/svg\+xml;utf8,(.*</svg>)"));

static BASE64_SVG: Lazy<Regex> =
    Lazy::new(|| compile(r#"data:image/svg\+xml;base64,([^"')]*)["']?\)"#));

static IMAGE_URL: Lazy<Regex> = Lazy::new(|| compile(r#"(?:"|')?(https?[^"')]*)(?:"|')?\)"#));

/// Standard alphabet, padding optional on decode.
const BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[allow(clippy::expect_used, reason = "Only called with constant patterns")]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("BUG: invalid regex literal")
}

/// Which side of the element a synthesized node goes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PseudoPosition {
    Before,
    After,
}

/// Insertion-ordered `property → value` map; re-inserting a property replaces the value
/// and keeps the first position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PropertyMap {
    entries: Vec<(String, String)>,
}

impl PropertyMap {
    pub fn insert(&mut self, property: &str, value: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.0 == property) {
            value.clone_into(&mut entry.1);
        } else {
            self.entries.push((property.to_owned(), value.to_owned()));
        }
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.0 == property)
            .map(|entry| entry.1.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(property, value)| (property.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The two pseudo-element maps of one tag.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PseudoRule {
    pub before: PropertyMap,
    pub after: PropertyMap,
}

impl PseudoRule {
    fn side_mut(&mut self, position: PseudoPosition) -> &mut PropertyMap {
        match position {
            PseudoPosition::Before => &mut self.before,
            PseudoPosition::After => &mut self.after,
        }
    }
}

/// Tag to pseudo-element declarations, in order of first appearance in the stylesheet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PseudoRuleTable {
    rules: Vec<(String, PseudoRule)>,
}

impl PseudoRuleTable {
    /// Collect the declarations of every rule whose selector targets a supported
    /// pseudo-element. Later declarations of the same property win.
    pub fn from_stylesheet(sheet: &Stylesheet) -> Self {
        let mut table = Self::default();
        for rule in sheet.style_rules() {
            for selector in &rule.selectors {
                let Some(caps) = PSEUDO_SELECTOR.captures(selector) else {
                    continue;
                };
                let (Some(tag), Some(side)) = (caps.get(2), caps.get(3)) else {
                    continue;
                };
                let position = if side.as_str() == "before" {
                    PseudoPosition::Before
                } else {
                    PseudoPosition::After
                };
                let map = table.entry(tag.as_str()).side_mut(position);
                for decl in &rule.declarations {
                    map.insert(&decl.property, &decl.value);
                }
            }
        }
        table
    }

    /// # Errors
    /// Returns an error if the stylesheet cannot be parsed.
    pub fn from_css(css: &str) -> Result<Self, Error> {
        let sheet = parse_stylesheet(css).context("Failed to parse pseudo-element stylesheet")?;
        Ok(Self::from_stylesheet(&sheet))
    }

    fn entry(&mut self, tag: &str) -> &mut PseudoRule {
        let position = match self.rules.iter().position(|(known, _)| known == tag) {
            Some(position) => position,
            None => {
                self.rules.push((tag.to_owned(), PseudoRule::default()));
                self.rules.len().saturating_sub(1)
            }
        };
        &mut self.rules[position].1
    }

    pub fn get(&self, tag: &str) -> Option<&PseudoRule> {
        self.rules
            .iter()
            .find(|(known, _)| known == tag)
            .map(|(_, rule)| rule)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Insert a synthesized node into every element under `root` whose tag has rules:
    /// `before` as the new first child, `after` as the new last child.
    ///
    /// # Errors
    /// Returns an error if a payload cannot be decoded or parsed, or the DOM rejects an edit.
    pub fn apply(&self, dom: &mut DOM, root: NodeId) -> Result<(), Error> {
        for (tag, rule) in &self.rules {
            let elements = dom.query_selector_all(root, tag)?;
            trace!("{tag}: {} elements", elements.len());
            for element in elements {
                if !rule.before.is_empty() {
                    let node = build_pseudo_element(dom, &rule.before)?;
                    dom.prepend_child(element, node)?;
                }
                if !rule.after.is_empty() {
                    let node = build_pseudo_element(dom, &rule.after)?;
                    dom.append_child(element, node)?;
                }
            }
        }
        Ok(())
    }
}

/// One declaration of a pseudo-element, classified by how it is materialized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PseudoPart {
    /// `content`, surrounding quotes removed.
    Content(String),
    /// Decoded markup of a `data:image/svg+xml;utf8,` URL.
    InlineSvg(String),
    /// Decoded markup of a `data:image/svg+xml;base64,` URL.
    Base64Svg(String),
    /// An `http(s)` image URL.
    ImageUrl(String),
    /// Anything else, written to the `style` attribute.
    RawStyle { property: String, value: String },
}

/// Classify one declaration.
///
/// # Errors
/// Returns an error if a base64 payload is not valid base64 or does not decode to UTF-8.
pub fn classify(property: &str, value: &str) -> Result<PseudoPart, Error> {
    if property == "content" {
        return Ok(PseudoPart::Content(strip_quotes(value).to_owned()));
    }
    if value.contains("url(") {
        if let Some(payload) = INLINE_SVG.captures(value).and_then(|caps| caps.get(1)) {
            let markup = urlencoding::decode(payload.as_str())
                .context("Inline SVG payload is not valid percent-encoded UTF-8")?;
            return Ok(PseudoPart::InlineSvg(markup.into_owned()));
        }
        if let Some(payload) = BASE64_SVG.captures(value).and_then(|caps| caps.get(1)) {
            let compact: String = payload
                .as_str()
                .chars()
                .filter(|character| !character.is_ascii_whitespace())
                .collect();
            let bytes = BASE64
                .decode(compact)
                .context("SVG payload is not valid base64")?;
            let markup = String::from_utf8(bytes).context("Decoded SVG payload is not UTF-8")?;
            return Ok(PseudoPart::Base64Svg(markup));
        }
        if let Some(url) = IMAGE_URL.captures(value).and_then(|caps| caps.get(1)) {
            return Ok(PseudoPart::ImageUrl(url.as_str().to_owned()));
        }
    }
    Ok(PseudoPart::RawStyle {
        property: property.to_owned(),
        value: value.to_owned(),
    })
}

fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

/// Build the unattached `<section>` for one pseudo-element from its own copy of `map`.
///
/// Text content is set first; SVG markup then replaces the children, image URLs append
/// an `<img>`, and the remaining declarations form the `style` attribute.
///
/// # Errors
/// Returns an error if a payload cannot be decoded or parsed as HTML.
pub fn build_pseudo_element(dom: &mut DOM, map: &PropertyMap) -> Result<NodeId, Error> {
    let parts = map
        .iter()
        .map(|(property, value)| classify(property, value))
        .collect::<Result<Vec<_>, _>>()?;
    let section = dom.create_element("section");
    for part in &parts {
        if let PseudoPart::Content(text) = part {
            dom.set_text_content(section, text)?;
        }
    }
    for part in parts {
        match part {
            PseudoPart::Content(_) => {}
            PseudoPart::InlineSvg(markup) | PseudoPart::Base64Svg(markup) => {
                dom.set_inner_html(section, &markup)?;
            }
            PseudoPart::ImageUrl(url) => {
                let img = dom.create_element("img");
                dom.set_attribute(img, "src", &url)?;
                dom.set_attribute(img, "style", "vertical-align: top;")?;
                dom.append_child(section, img)?;
            }
            PseudoPart::RawStyle { property, value } => {
                dom.set_style_property(section, &property, &value, false)?;
            }
        }
    }
    Ok(section)
}

/// Parse `css` and synthesize its supported pseudo-elements under `root`.
///
/// # Errors
/// Returns an error if the stylesheet cannot be parsed or a node cannot be built.
pub fn apply_pseudo_elements(dom: &mut DOM, root: NodeId, css: &str) -> Result<(), Error> {
    let table = PseudoRuleTable::from_css(css)?;
    if table.is_empty() {
        return Ok(());
    }
    debug!("Synthesizing pseudo-elements for {} tags", table.rules.len());
    table.apply(dom, root)
}
