//! Serialization of the stylesheet AST back to CSS text.

use core::fmt;

use crate::{AtRule, Declaration, Rule, StyleRule, Stylesheet};

impl fmt::Display for Declaration {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}: {}", self.property, self.value)?;
        if self.important {
            formatter.write_str(" !important")?;
        }
        Ok(())
    }
}

impl fmt::Display for StyleRule {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} {{", self.prelude())?;
        for decl in &self.declarations {
            write!(formatter, " {decl};")?;
        }
        formatter.write_str(" }")
    }
}

impl fmt::Display for AtRule {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "@{}", self.name)?;
        if !self.prelude.is_empty() {
            write!(formatter, " {}", self.prelude)?;
        }
        match &self.block {
            Some(block) => write!(formatter, " {{ {block} }}"),
            None => formatter.write_str(";"),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Style(style) => fmt::Display::fmt(style, formatter),
            Self::At(at_rule) => fmt::Display::fmt(at_rule, formatter),
        }
    }
}

impl fmt::Display for Stylesheet {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, rule) in self.rules.iter().enumerate() {
            if index > 0 {
                formatter.write_str("\n")?;
            }
            fmt::Display::fmt(rule, formatter)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::parse_stylesheet;
    use anyhow::Error;

    #[test]
    fn generates_rules_on_one_line_each() -> Result<(), Error> {
        let sheet = parse_stylesheet("h1,h2{color:red;margin:0!important}\n@import url(x.css);")?;
        assert_eq!(
            sheet.to_string(),
            "h1, h2 { color: red; margin: 0 !important; }\n@import url(x.css);"
        );
        Ok(())
    }

    #[test]
    fn generated_text_parses_to_the_same_sheet() -> Result<(), Error> {
        let source = "#wenyan pre code { font-family: Menlo, monospace; }\n@media print { p { color: black; } }";
        let sheet = parse_stylesheet(source)?;
        assert_eq!(parse_stylesheet(&sheet.to_string())?, sheet);
        Ok(())
    }
}
