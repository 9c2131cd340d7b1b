//! CSS Syntax Module Level 3: Parsing and tokenization.
//! Spec: <https://www.w3.org/TR/css-syntax-3/>
//!
//! Produces a small stylesheet AST (selector lists plus raw declaration values) that
//! can be generated back to text. Values and at-rule bodies are kept as raw text.
use core::mem;

use anyhow::{Error, anyhow};
use cssparser::AtRuleParser as CssAtRuleParser;
use cssparser::BasicParseErrorKind;
use cssparser::CowRcStr;
use cssparser::DeclarationParser as CssDeclarationParser;
use cssparser::ParseError;
use cssparser::Parser;
use cssparser::ParserInput;
use cssparser::ParserState;
use cssparser::QualifiedRuleParser as CssQualifiedRuleParser;
use cssparser::RuleBodyItemParser as CssRuleBodyItemParser;
use cssparser::RuleBodyParser as CssRuleBodyParser;
use cssparser::StyleSheetParser;
use cssparser::Token;
use log::warn;

mod generate;

/// A single CSS declaration (property: value [!important]).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    /// Property name. Lowercased unless it is a custom property.
    pub property: String,
    /// Raw value text (without trailing !important).
    pub value: String,
    /// Whether the declaration was marked as `!important`.
    pub important: bool,
}

impl Declaration {
    /// Build a declaration from borrowed parts.
    pub fn new(property: &str, value: &str, important: bool) -> Self {
        Self {
            property: property.to_owned(),
            value: value.to_owned(),
            important,
        }
    }
}

/// A single style rule with its selector list and parsed declarations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyleRule {
    /// Selectors of the prelude in source order, whitespace-normalized.
    pub selectors: Vec<String>,
    /// Declarations within the rule block.
    pub declarations: Vec<Declaration>,
}

impl StyleRule {
    /// The full prelude text as it is generated back.
    pub fn prelude(&self) -> String {
        self.selectors.join(", ")
    }
}

/// An at-rule kept verbatim; nothing inside it is interpreted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AtRule {
    /// Name without the leading `@`.
    pub name: String,
    /// Raw prelude text.
    pub prelude: String,
    /// Raw block contents, `None` for statement at-rules such as `@import`.
    pub block: Option<String>,
}

/// A top-level item of a stylesheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rule {
    Style(StyleRule),
    At(AtRule),
}

/// A parsed stylesheet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stylesheet {
    /// Top-level rules in source order.
    pub rules: Vec<Rule>,
}

impl Stylesheet {
    /// Iterate over the style rules, skipping at-rules.
    pub fn style_rules(&self) -> impl Iterator<Item = &StyleRule> {
        self.rules.iter().filter_map(|rule| match rule {
            Rule::Style(style) => Some(style),
            Rule::At(_) => None,
        })
    }

    /// Mutable variant of [`Stylesheet::style_rules`].
    pub fn style_rules_mut(&mut self) -> impl Iterator<Item = &mut StyleRule> {
        self.rules.iter_mut().filter_map(|rule| match rule {
            Rule::Style(style) => Some(style),
            Rule::At(_) => None,
        })
    }
}

/// Parse `!important` at the end of a value, returning (`value_without_important`, `important_flag`).
fn split_important_tail(value: &str) -> (String, bool) {
    let trimmed = value.trim();
    if let Some(pos) = trimmed.rfind("!important")
        && trimmed.len() == pos + "!important".len()
        && let Some(prefix) = trimmed.get(..pos)
    {
        let head = prefix.trim_end();
        return (head.to_owned(), true);
    }
    (trimmed.to_owned(), false)
}

/// Custom property names are case-sensitive; everything else is ASCII case-insensitive.
fn normalize_property_name(name: &str) -> String {
    if name.starts_with("--") {
        name.to_owned()
    } else {
        name.to_ascii_lowercase()
    }
}

/// Consume every remaining token of `input`, including nested blocks.
fn consume_all(input: &mut Parser<'_, '_>) {
    while input.next_including_whitespace_and_comments().is_ok() {}
}

/// A declaration parser that records property name and its raw value.
struct BodyDeclParser;

impl<'input> CssDeclarationParser<'input> for BodyDeclParser {
    type Declaration = Declaration;
    type Error = ();

    fn parse_value<'tokens>(
        &mut self,
        name: CowRcStr<'input>,
        input: &mut Parser<'input, 'tokens>,
        _decl_start: &ParserState,
    ) -> Result<Self::Declaration, ParseError<'input, Self::Error>> {
        let start = input.position();
        // Consume until end of the declaration item.
        consume_all(input);
        let raw = input.slice_from(start);
        let (value, important) = split_important_tail(raw);
        Ok(Declaration {
            property: normalize_property_name(&name),
            value,
            important,
        })
    }
}

impl<'input> CssAtRuleParser<'input> for BodyDeclParser {
    type Prelude = ();
    type AtRule = Declaration; // Not produced
    type Error = ();

    #[inline]
    fn parse_prelude<'tokens>(
        &mut self,
        _name: CowRcStr<'input>,
        _input: &mut Parser<'input, 'tokens>,
    ) -> Result<Self::Prelude, ParseError<'input, Self::Error>> {
        Ok(())
    }

    #[inline]
    fn parse_block<'tokens>(
        &mut self,
        _prelude: Self::Prelude,
        _state: &ParserState,
        input: &mut Parser<'input, 'tokens>,
    ) -> Result<Self::AtRule, ParseError<'input, Self::Error>> {
        Err(input.new_error(BasicParseErrorKind::AtRuleBodyInvalid))
    }

    #[inline]
    fn rule_without_block(
        &mut self,
        _prelude: Self::Prelude,
        _state: &ParserState,
    ) -> Result<Self::AtRule, Self::Error> {
        Err(())
    }
}

impl<'input> CssQualifiedRuleParser<'input> for BodyDeclParser {
    type Prelude = ();
    type QualifiedRule = Declaration; // Not produced
    type Error = ();

    #[inline]
    fn parse_prelude<'tokens>(
        &mut self,
        input: &mut Parser<'input, 'tokens>,
    ) -> Result<Self::Prelude, ParseError<'input, Self::Error>> {
        Err(input.new_error(BasicParseErrorKind::QualifiedRuleInvalid))
    }

    #[inline]
    fn parse_block<'tokens>(
        &mut self,
        _prelude: Self::Prelude,
        _state: &ParserState,
        input: &mut Parser<'input, 'tokens>,
    ) -> Result<Self::QualifiedRule, ParseError<'input, Self::Error>> {
        Err(input.new_error(BasicParseErrorKind::QualifiedRuleInvalid))
    }
}

impl CssRuleBodyItemParser<'_, Declaration, ()> for BodyDeclParser {
    fn parse_declarations(&self) -> bool {
        true
    }
    fn parse_qualified(&self) -> bool {
        false
    }
}

/// Top-level parser that builds [`Rule`] items.
struct TopLevelParser;

impl<'input> CssAtRuleParser<'input> for TopLevelParser {
    type Prelude = (String, String);
    type AtRule = Rule;
    type Error = ();

    #[inline]
    fn parse_prelude<'tokens>(
        &mut self,
        name: CowRcStr<'input>,
        input: &mut Parser<'input, 'tokens>,
    ) -> Result<Self::Prelude, ParseError<'input, Self::Error>> {
        let start = input.position();
        consume_all(input);
        Ok((name.to_string(), input.slice_from(start).trim().to_owned()))
    }

    #[inline]
    fn parse_block<'tokens>(
        &mut self,
        prelude: Self::Prelude,
        _state: &ParserState,
        input: &mut Parser<'input, 'tokens>,
    ) -> Result<Self::AtRule, ParseError<'input, Self::Error>> {
        let start = input.position();
        consume_all(input);
        let (name, prelude_text) = prelude;
        Ok(Rule::At(AtRule {
            name,
            prelude: prelude_text,
            block: Some(input.slice_from(start).trim().to_owned()),
        }))
    }

    #[inline]
    fn rule_without_block(
        &mut self,
        prelude: Self::Prelude,
        _state: &ParserState,
    ) -> Result<Self::AtRule, Self::Error> {
        let (name, prelude_text) = prelude;
        Ok(Rule::At(AtRule {
            name,
            prelude: prelude_text,
            block: None,
        }))
    }
}

impl<'input> CssQualifiedRuleParser<'input> for TopLevelParser {
    type Prelude = Vec<String>;
    type QualifiedRule = Rule;
    type Error = ();

    #[inline]
    fn parse_prelude<'tokens>(
        &mut self,
        input: &mut Parser<'input, 'tokens>,
    ) -> Result<Self::Prelude, ParseError<'input, Self::Error>> {
        let selectors = parse_selector_texts(input)?;
        if selectors.is_empty() {
            return Err(input.new_error(BasicParseErrorKind::QualifiedRuleInvalid));
        }
        Ok(selectors)
    }

    #[inline]
    fn parse_block<'tokens>(
        &mut self,
        prelude: Self::Prelude,
        _state: &ParserState,
        input: &mut Parser<'input, 'tokens>,
    ) -> Result<Self::QualifiedRule, ParseError<'input, Self::Error>> {
        let declarations = parse_declarations_from_block(input);
        Ok(Rule::Style(StyleRule {
            selectors: prelude,
            declarations,
        }))
    }
}

/// Split a prelude into its comma-separated selectors and normalize each one:
/// comments dropped, whitespace runs collapsed and spaces around `>`, `+`, `~` removed.
/// Commas inside functional notation or attribute brackets do not split.
fn parse_selector_texts<'input>(
    input: &mut Parser<'input, '_>,
) -> Result<Vec<String>, ParseError<'input, ()>> {
    let mut selectors = Vec::new();
    let mut current = String::new();
    let mut pending_space = false;
    let mut after_combinator = false;
    loop {
        let start = input.position();
        let Ok(token) = input.next_including_whitespace_and_comments().cloned() else {
            break;
        };
        match token {
            Token::WhiteSpace(_) => {
                pending_space = !current.is_empty() && !after_combinator;
            }
            Token::Comment(_) => {}
            Token::Comma => {
                if !current.is_empty() {
                    selectors.push(mem::take(&mut current));
                }
                pending_space = false;
                after_combinator = false;
            }
            Token::Delim(combinator @ ('>' | '+' | '~')) => {
                current.push(combinator);
                pending_space = false;
                after_combinator = true;
            }
            Token::Function(_)
            | Token::ParenthesisBlock
            | Token::SquareBracketBlock
            | Token::CurlyBracketBlock => {
                input.parse_nested_block(|nested| {
                    consume_all(nested);
                    Ok::<(), ParseError<'input, ()>>(())
                })?;
                push_selector_piece(&mut current, &mut pending_space, input.slice_from(start));
                after_combinator = false;
            }
            _ => {
                push_selector_piece(&mut current, &mut pending_space, input.slice_from(start));
                after_combinator = false;
            }
        }
    }
    if !current.is_empty() {
        selectors.push(current);
    }
    Ok(selectors)
}

fn push_selector_piece(current: &mut String, pending_space: &mut bool, piece: &str) {
    if *pending_space {
        current.push(' ');
        *pending_space = false;
    }
    current.push_str(piece);
}

/// Parse declarations from a rule block using `cssparser` body parser.
/// Invalid items are skipped with a warning, matching CSS error recovery.
fn parse_declarations_from_block(block: &mut Parser) -> Vec<Declaration> {
    let mut out: Vec<Declaration> = Vec::new();
    let mut body = BodyDeclParser;
    for item in CssRuleBodyParser::new(block, &mut body) {
        match item {
            Ok(decl) => out.push(decl),
            Err((error, slice)) => {
                warn!(
                    "Skipping invalid declaration `{}` at {}:{}",
                    slice.trim(),
                    error.location.line + 1,
                    error.location.column
                );
            }
        }
    }
    out
}

/// Parse a full stylesheet into a `Stylesheet` using cssparser.
///
/// # Errors
/// Returns an error for the first top-level item that cannot be parsed as a rule,
/// e.g. a selector list with no block or an empty prelude.
pub fn parse_stylesheet(css: &str) -> Result<Stylesheet, Error> {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut top = TopLevelParser;
    let mut sheet = Stylesheet::default();
    for item in StyleSheetParser::new(&mut parser, &mut top) {
        match item {
            Ok(rule) => sheet.rules.push(rule),
            Err((error, slice)) => {
                return Err(anyhow!(
                    "Invalid CSS at line {}, column {}: {:?} in `{}`",
                    error.location.line + 1,
                    error.location.column,
                    error.kind,
                    slice.trim()
                ));
            }
        }
    }
    Ok(sheet)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn only_style_rule(sheet: &Stylesheet) -> Option<&StyleRule> {
        sheet.style_rules().next()
    }

    #[test]
    fn parses_selectors_and_declarations() -> Result<(), Error> {
        let sheet = parse_stylesheet("#wenyan  h1 ,\n p > code { color: red; margin: 0 !important }")?;
        let rule = only_style_rule(&sheet).ok_or_else(|| anyhow!("missing rule"))?;
        assert_eq!(rule.selectors, vec!["#wenyan h1", "p>code"]);
        assert_eq!(
            rule.declarations,
            vec![
                Declaration::new("color", "red", false),
                Declaration::new("margin", "0", true),
            ]
        );
        Ok(())
    }

    #[test]
    fn commas_inside_functions_do_not_split() -> Result<(), Error> {
        let sheet = parse_stylesheet("li:is(.a, .b), [title=\"x,y\"] { color: red; }")?;
        let rule = only_style_rule(&sheet).ok_or_else(|| anyhow!("missing rule"))?;
        assert_eq!(rule.selectors, vec!["li:is(.a, .b)", "[title=\"x,y\"]"]);
        Ok(())
    }

    #[test]
    fn keeps_data_uri_values_verbatim() -> Result<(), Error> {
        let css = "pre::before { background: url(\"data:image/svg+xml;utf8,<svg></svg>\") no-repeat; }";
        let sheet = parse_stylesheet(css)?;
        let rule = only_style_rule(&sheet).ok_or_else(|| anyhow!("missing rule"))?;
        assert_eq!(
            rule.declarations.first().map(|decl| decl.value.as_str()),
            Some("url(\"data:image/svg+xml;utf8,<svg></svg>\") no-repeat")
        );
        Ok(())
    }

    #[test]
    fn custom_property_names_keep_case() -> Result<(), Error> {
        let sheet = parse_stylesheet("p { --Main-Color: red; COLOR: var(--Main-Color); }")?;
        let rule = only_style_rule(&sheet).ok_or_else(|| anyhow!("missing rule"))?;
        let names: Vec<&str> = rule
            .declarations
            .iter()
            .map(|decl| decl.property.as_str())
            .collect();
        assert_eq!(names, vec!["--Main-Color", "color"]);
        Ok(())
    }

    #[test]
    fn at_rules_are_preserved_verbatim() -> Result<(), Error> {
        let sheet = parse_stylesheet(
            "@import url(a.css);\n@media (max-width: 600px) { p { color: red; } }\np { margin: 0; }",
        )?;
        assert_eq!(sheet.rules.len(), 3);
        assert_eq!(sheet.style_rules().count(), 1);
        let Some(Rule::At(media)) = sheet.rules.get(1) else {
            return Err(anyhow!("expected an at-rule"));
        };
        assert_eq!(media.name, "media");
        assert_eq!(media.prelude, "(max-width: 600px)");
        assert_eq!(media.block.as_deref(), Some("p { color: red; }"));
        Ok(())
    }

    #[test]
    fn invalid_declarations_are_skipped() -> Result<(), Error> {
        let sheet = parse_stylesheet("p { *zoom: 1; color: blue; }")?;
        let rule = only_style_rule(&sheet).ok_or_else(|| anyhow!("missing rule"))?;
        assert_eq!(rule.declarations, vec![Declaration::new("color", "blue", false)]);
        Ok(())
    }

    #[test]
    fn rule_without_block_is_an_error() {
        let result = parse_stylesheet("p { color: red; } h1");
        assert!(result.is_err(), "dangling selector should fail to parse");
    }

    #[test]
    fn important_only_counts_at_the_tail() {
        assert_eq!(split_important_tail("red !important"), ("red".to_owned(), true));
        assert_eq!(split_important_tail(" 1px solid "), ("1px solid".to_owned(), false));
        assert_eq!(
            split_important_tail("\"!important\" x"),
            ("\"!important\" x".to_owned(), false)
        );
    }
}
