//! CSS selector parsing.

use crate::{
    AttrOperator, Combinator, ComplexSelector, CompoundSelector, SelectorList, SimpleSelector,
};
use anyhow::{Error, anyhow, bail};
use core::mem::take;

/// Internal tokenizer token kinds.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Tok {
    /// A combinator token like child/adjacent/general sibling.
    Combinator(Combinator),
    /// Whitespace that implies a descendant combinator.
    DescendantWS,
    /// A simple selector token (type, class, id, attribute, universal).
    Simple(SimpleSelector),
}

/// Tokenizer over a single complex selector.
struct SelectorTokenizer<'input> {
    input_bytes: &'input [u8],
    /// Current cursor index into `input_bytes`.
    index: usize,
}

impl<'input> SelectorTokenizer<'input> {
    fn new(input: &'input str) -> Self {
        Self {
            input_bytes: input.as_bytes(),
            index: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input_bytes.get(self.index).copied()
    }

    fn bump(&mut self) {
        self.index = self.index.saturating_add(1);
    }

    /// Return the next selector token, if any.
    ///
    /// # Errors
    /// Returns an error on characters outside the supported grammar.
    fn next_token(&mut self) -> Result<Option<Tok>, Error> {
        let start = self.index;
        self.skip_spaces();
        if self.index > start {
            return Ok(Some(Tok::DescendantWS));
        }
        let Some(current) = self.peek() else {
            return Ok(None);
        };
        let token = match current {
            b'*' => {
                self.bump();
                Tok::Simple(SimpleSelector::Universal)
            }
            b'.' => {
                self.bump();
                Tok::Simple(SimpleSelector::Class(self.consume_name("class")?))
            }
            b'#' => {
                self.bump();
                Tok::Simple(SimpleSelector::Id(self.consume_name("id")?))
            }
            b'[' => Tok::Simple(self.consume_attr()?),
            b'>' => {
                self.bump();
                Tok::Combinator(Combinator::Child)
            }
            b'+' => {
                self.bump();
                Tok::Combinator(Combinator::AdjacentSibling)
            }
            b'~' => {
                self.bump();
                Tok::Combinator(Combinator::GeneralSibling)
            }
            byte if is_ident_byte(byte) || byte == b'\\' => {
                Tok::Simple(SimpleSelector::Type(self.consume_ident().to_ascii_lowercase()))
            }
            other => bail!(
                "Unsupported selector syntax {:?} at offset {}",
                char::from(other),
                self.index
            ),
        };
        Ok(Some(token))
    }

    /// Consume an identifier: ASCII alphanumerics, '-', '_', any non-ASCII character and
    /// backslash escapes.
    fn consume_ident(&mut self) -> String {
        let mut out = Vec::new();
        while let Some(byte) = self.peek() {
            if byte == b'\\' {
                self.bump();
                self.consume_escape(&mut out);
            } else if is_ident_byte(byte) {
                out.push(byte);
                self.bump();
            } else {
                break;
            }
        }
        String::from_utf8_lossy(&out).into_owned()
    }

    /// Decode the escape after a backslash into `out`.
    ///
    /// Up to six hex digits name a code point and swallow one trailing whitespace; any other
    /// character stands for itself. Invalid code points become U+FFFD.
    fn consume_escape(&mut self, out: &mut Vec<u8>) {
        let mut code: Option<u32> = None;
        for _ in 0..6 {
            let Some(digit) = self.peek().and_then(|byte| char::from(byte).to_digit(16)) else {
                break;
            };
            code = Some(code.unwrap_or(0).saturating_mul(16).saturating_add(digit));
            self.bump();
        }
        let decoded = match code {
            Some(value) => {
                if self.peek().is_some_and(|byte| byte.is_ascii_whitespace()) {
                    self.bump();
                }
                char::from_u32(value)
                    .filter(|&character| character != '\0')
                    .unwrap_or(char::REPLACEMENT_CHARACTER)
            }
            None => match self.peek() {
                Some(byte) if byte.is_ascii() => {
                    self.bump();
                    char::from(byte)
                }
                // Multi-byte characters stand for themselves; the caller copies their bytes.
                Some(_) => return,
                None => char::REPLACEMENT_CHARACTER,
            },
        };
        let mut buffer = [0; 4];
        out.extend_from_slice(decoded.encode_utf8(&mut buffer).as_bytes());
    }

    /// Identifier that must not be empty, case preserved.
    fn consume_name(&mut self, what: &str) -> Result<String, Error> {
        let ident = self.consume_ident();
        if ident.is_empty() {
            bail!("Expected {what} name at offset {}", self.index);
        }
        Ok(ident)
    }

    /// Parse `[name]` or `[name<op>value]` with the value quoted or bare.
    fn consume_attr(&mut self) -> Result<SimpleSelector, Error> {
        // skip '['
        self.bump();
        self.skip_spaces();
        let name = self.consume_name("attribute")?.to_ascii_lowercase();
        self.skip_spaces();
        let operator = match self.peek() {
            Some(b']') => {
                self.bump();
                return Ok(SimpleSelector::AttrExists(name));
            }
            Some(b'=') => None,
            Some(b'^') => Some(AttrOperator::Prefix),
            Some(b'$') => Some(AttrOperator::Suffix),
            Some(b'*') => Some(AttrOperator::Substring),
            Some(b'~') => Some(AttrOperator::Includes),
            Some(b'|') => Some(AttrOperator::DashMatch),
            _ => bail!("Unsupported attribute matcher at offset {}", self.index),
        };
        if operator.is_some() {
            self.bump();
        }
        if self.peek() != Some(b'=') {
            bail!("Unsupported attribute matcher at offset {}", self.index);
        }
        self.bump();
        self.skip_spaces();
        let value = match self.peek() {
            Some(quote @ (b'"' | b'\'')) => {
                self.bump();
                self.consume_quoted_attr_value(quote)?
            }
            _ => self.consume_unquoted_attr_value(),
        };
        self.skip_spaces();
        if self.peek() != Some(b']') {
            bail!("Unterminated attribute selector");
        }
        self.bump();
        Ok(match operator {
            None => SimpleSelector::AttrValue { name, value },
            Some(kind) => SimpleSelector::AttrOp {
                name,
                operator: kind,
                value,
            },
        })
    }

    /// Consume an unquoted attribute value until whitespace or a closing bracket.
    fn consume_unquoted_attr_value(&mut self) -> String {
        let mut out = Vec::new();
        while let Some(byte) = self.peek() {
            if byte.is_ascii_whitespace() || byte == b']' {
                break;
            }
            self.bump();
            if byte == b'\\' {
                self.consume_escape(&mut out);
            } else {
                out.push(byte);
            }
        }
        String::from_utf8_lossy(&out).into_owned()
    }

    /// Consume a quoted attribute value and its closing quote.
    fn consume_quoted_attr_value(&mut self, quote: u8) -> Result<String, Error> {
        let mut out = Vec::new();
        loop {
            let Some(byte) = self.peek() else {
                bail!("Unterminated string in attribute selector");
            };
            self.bump();
            if byte == quote {
                break;
            }
            if byte == b'\\' {
                self.consume_escape(&mut out);
            } else {
                out.push(byte);
            }
        }
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    fn skip_spaces(&mut self) {
        while self.peek().is_some_and(|byte| byte.is_ascii_whitespace()) {
            self.bump();
        }
    }
}

const fn is_ident_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' || byte >= 0x80
}

/// Parse a selector list from CSS text.
///
/// # Errors
/// Returns an error if any selector in the list is empty or uses unsupported syntax.
pub fn parse_selector_list(input: &str) -> Result<SelectorList, Error> {
    let mut list = SelectorList::default();
    for part in split_top_level_commas(input) {
        list.selectors.push(parse_complex_selector(part)?);
    }
    Ok(list)
}

/// Split at commas outside brackets, parentheses, quotes and escapes.
fn split_top_level_commas(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0_usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;
    for (offset, character) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (character, quote) {
            ('\\', _) => escaped = true,
            (_, Some(open)) if character == open => quote = None,
            (_, Some(_)) => {}
            ('"' | '\'', None) => quote = Some(character),
            ('[' | '(', None) => depth = depth.saturating_add(1),
            (']' | ')', None) => depth = depth.saturating_sub(1),
            (',', None) if depth == 0 => {
                parts.push(input.get(start..offset).unwrap_or_default());
                start = offset.saturating_add(1);
            }
            _ => {}
        }
    }
    parts.push(input.get(start..).unwrap_or_default());
    parts
}

/// Parse one complex selector.
///
/// # Errors
/// Returns an error if the selector is empty, starts or ends with a combinator, or uses
/// unsupported syntax such as pseudo-classes.
pub fn parse_complex_selector(input: &str) -> Result<ComplexSelector, Error> {
    let trimmed = input.trim();
    let mut tokens = SelectorTokenizer::new(trimmed);
    let mut current = CompoundSelector::default();
    let mut compounds: Vec<CompoundSelector> = Vec::new();
    let mut combinators: Vec<Combinator> = Vec::new();
    let mut pending_combinator: Option<Combinator> = None;

    while let Some(token) = tokens.next_token()? {
        match token {
            Tok::Combinator(comb) => {
                if current.simples.is_empty() {
                    if compounds.is_empty()
                        || !matches!(pending_combinator, Some(Combinator::Descendant))
                    {
                        bail!("Dangling combinator in selector {trimmed:?}");
                    }
                } else {
                    compounds.push(take(&mut current));
                }
                pending_combinator = Some(comb);
            }
            Tok::DescendantWS => {
                if !current.simples.is_empty() {
                    compounds.push(take(&mut current));
                    pending_combinator = Some(Combinator::Descendant);
                }
            }
            Tok::Simple(simple) => {
                if current.simples.is_empty()
                    && let Some(comb) = pending_combinator.take()
                {
                    combinators.push(comb);
                }
                current.simples.push(simple);
            }
        }
    }

    if current.simples.is_empty() {
        if compounds.is_empty() {
            bail!("Empty selector");
        }
        if !matches!(pending_combinator, Some(Combinator::Descendant)) {
            bail!("Dangling combinator in selector {trimmed:?}");
        }
    } else {
        compounds.push(current);
    }

    let mut compounds_iter = compounds.into_iter();
    let first = compounds_iter
        .next()
        .ok_or_else(|| anyhow!("Empty selector"))?;
    Ok(ComplexSelector {
        first,
        rest: combinators.into_iter().zip(compounds_iter).collect(),
    })
}
