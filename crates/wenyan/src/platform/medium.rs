use anyhow::Error;
use html::{DOM, NodeId};
use log::debug;

/// Medium's importer understands a narrow subset of HTML: quotes become plain spans,
/// code blocks lose their highlighting, tables become ASCII art, nested lists become
/// dashed lines and formulas fall back to their TeX source.
///
/// # Errors
/// Returns an error if the DOM rejects an edit.
pub fn content_for_medium(dom: &mut DOM, root: NodeId) -> Result<String, Error> {
    flatten_blockquotes(dom, root)?;
    flatten_code_blocks(dom, root)?;
    tables_to_ascii(dom, root)?;
    flatten_nested_lists(dom, root)?;
    math_to_source(dom, root)?;
    Ok(dom.outer_html(root))
}

fn flatten_blockquotes(dom: &mut DOM, root: NodeId) -> Result<(), Error> {
    for para in dom.query_selector_all(root, "blockquote p")? {
        let span = dom.create_element("span");
        let text = format!("{}\n\n", dom.text_content(para));
        dom.set_text_content(span, &text)?;
        dom.replace_with(para, span)?;
    }
    Ok(())
}

fn mark_code_block(dom: &mut DOM, pre: NodeId, language: &str) -> Result<(), Error> {
    dom.set_attribute(pre, "data-code-block-lang", language)?;
    dom.set_attribute(pre, "data-code-block-mode", "2")
}

fn flatten_code_blocks(dom: &mut DOM, root: NodeId) -> Result<(), Error> {
    for pre in dom.query_selector_all(root, "pre")? {
        mark_code_block(dom, pre, "none")?;
        let Some(code) = dom.query_selector(pre, "code")? else {
            continue;
        };
        let language = dom.get_attribute(code, "class").and_then(|classes| {
            classes
                .split_ascii_whitespace()
                .filter_map(|class| class.strip_prefix("language-"))
                .next_back()
                .map(str::to_owned)
        });
        if let Some(language) = language.filter(|language| !language.is_empty()) {
            dom.set_attribute(pre, "data-code-block-lang", &language)?;
        }
        let source = dom.text_content(code);
        dom.set_text_content(code, source.trim())?;
    }
    Ok(())
}

fn tables_to_ascii(dom: &mut DOM, root: NodeId) -> Result<(), Error> {
    let tables = dom.query_selector_all(root, "table")?;
    debug!("Converting {} tables to ASCII", tables.len());
    for table in tables {
        let mut rows = Vec::new();
        for row in dom.query_selector_all(table, "tr")? {
            let cells = dom
                .query_selector_all(row, "th, td")?
                .into_iter()
                .map(|cell| dom.text_content(cell).trim().to_owned())
                .collect::<Vec<_>>();
            rows.push(cells);
        }
        let pre = dom.create_element("pre");
        let code = dom.create_element("code");
        dom.set_text_content(code, &ascii_table(&rows))?;
        dom.append_child(pre, code)?;
        mark_code_block(dom, pre, "none")?;
        dom.replace_with(table, pre)?;
    }
    Ok(())
}

/// Display width of a cell: characters outside Latin-1 count double.
fn display_width(text: &str) -> usize {
    text.chars()
        .map(|character| if u32::from(character) > 255 { 2 } else { 1 })
        .sum()
}

/// Render rows as a boxed table. Columns are taken from the first row; the first row is
/// set apart as the header.
fn ascii_table(rows: &[Vec<String>]) -> String {
    let Some(header) = rows.first() else {
        return String::new();
    };
    let widths: Vec<usize> = (0..header.len())
        .map(|column| {
            rows.iter()
                .map(|row| row.get(column).map_or(0, |cell| display_width(cell)))
                .max()
                .unwrap_or_default()
        })
        .collect();

    let mut rule = String::from("+");
    for width in &widths {
        rule.push_str(&"-".repeat(width.saturating_add(2)));
        rule.push('+');
    }
    rule.push('\n');

    let format_row = |row: &[String]| {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(column, cell)| {
                let width = widths.get(column).copied().unwrap_or_default();
                let padding = width.saturating_sub(display_width(cell));
                format!("{cell}{}", " ".repeat(padding))
            })
            .collect();
        format!("| {} |\n", cells.join(" | "))
    };

    let mut out = rule.clone();
    out.push_str(&format_row(header.as_slice()));
    out.push_str(&rule);
    if rows.len() > 1 {
        for row in rows.iter().skip(1) {
            out.push_str(&format_row(row.as_slice()));
        }
        out.push_str(&rule);
    }
    out
}

/// Replace each nested `<ul>` with its items as `<br>` separated `- item` lines.
fn flatten_nested_lists(dom: &mut DOM, root: NodeId) -> Result<(), Error> {
    // Reverse document order handles inner lists before the lists containing them.
    let mut nested = dom.query_selector_all(root, "ul ul")?;
    nested.reverse();
    for list in nested {
        let items: Vec<NodeId> = dom
            .children(list)
            .filter(|&child| dom.is_element(child))
            .collect();
        let mut cursor = list;
        for (position, item) in items.into_iter().enumerate() {
            if position > 0 {
                let gap = dom.create_text(" ");
                dom.insert_after(cursor, gap)?;
                cursor = gap;
            }
            let br = dom.create_element("br");
            dom.insert_after(cursor, br)?;
            let dash = dom.create_text("\n- ");
            dom.insert_after(br, dash)?;
            cursor = dash;
            let children: Vec<NodeId> = dom.children(item).collect();
            for child in children {
                dom.insert_after(cursor, child)?;
                cursor = child;
            }
        }
        dom.remove(list);
    }
    Ok(())
}

/// Replace each formula carrying a `math` attribute with a span of its TeX source,
/// appended to the formula's parent.
fn math_to_source(dom: &mut DOM, root: NodeId) -> Result<(), Error> {
    for container in dom.query_selector_all(root, "mjx-container")? {
        let Some(math) = dom
            .get_attribute(container, "math")
            .filter(|math| !math.is_empty())
            .map(str::to_owned)
        else {
            continue;
        };
        let Some(parent) = dom.parent_element(container) else {
            continue;
        };
        dom.remove(container);
        let span = dom.create_element("span");
        dom.set_text_content(span, &math)?;
        dom.append_child(parent, span)?;
    }
    Ok(())
}
