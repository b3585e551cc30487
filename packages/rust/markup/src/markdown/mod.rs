//! Markdown export of the document markup.
//!
//! Converts the transduced HTML with the `htmd` crate, after rewriting tables
//! into Markdown table syntax, then runs the cleanup passes in [`cleanup`].

mod cleanup;

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};

use manualkit_shared::{ManualKitError, Result};

static TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("valid selector"));
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("valid selector"));
static CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("th, td").expect("valid selector"));

/// Convert document markup to cleaned Markdown.
#[instrument(skip_all, fields(bytes = markup.len()))]
pub fn to_markdown(markup: &str) -> Result<String> {
    let html = preprocess_tables(markup);

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style"])
        .build();
    let raw_markdown = converter
        .convert(&html)
        .map_err(|e| ManualKitError::Conversion(format!("htmd conversion failed: {e}")))?;

    debug!(raw_len = raw_markdown.len(), "htmd conversion complete");
    Ok(cleanup::run_pipeline(&raw_markdown))
}

// ---------------------------------------------------------------------------
// Table pre-processing
// ---------------------------------------------------------------------------

/// Replace every `<table>` with Markdown table syntax before conversion;
/// `htmd` 0.1 does not convert tables itself.
fn preprocess_tables(html: &str) -> String {
    let doc = Html::parse_fragment(html);
    if doc.select(&TABLE).next().is_none() {
        return html.to_string();
    }

    // Replace within scraper's own serialization so the table HTML matches.
    let mut result = doc.root_element().inner_html();
    for table in doc.select(&TABLE) {
        let md_table = html_table_to_markdown(&table);
        result = result.replacen(&table.html(), &md_table, 1);
    }
    result
}

/// Convert one table. Column spans repeat as empty cells; the first row is
/// the header row.
fn html_table_to_markdown(table: &ElementRef) -> String {
    let mut rows: Vec<Vec<String>> = Vec::new();
    for tr in table.select(&ROW) {
        let mut cells = Vec::new();
        for cell in tr.select(&CELL) {
            let text = cell.text().collect::<Vec<_>>().join(" ");
            cells.push(markdown_cell(&text));
            let span = cell
                .value()
                .attr("colspan")
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(1);
            cells.extend(std::iter::repeat_n(String::new(), span.saturating_sub(1)));
        }
        if !cells.is_empty() {
            rows.push(cells);
        }
    }

    let col_count = rows.iter().map(Vec::len).max().unwrap_or(0);
    if col_count == 0 {
        return String::new();
    }
    for row in &mut rows {
        row.resize(col_count, String::new());
    }

    let mut md = String::from("\n\n");
    md.push_str(&format!("| {} |\n", rows[0].join(" | ")));
    md.push_str(&format!("| {} |\n", vec!["---"; col_count].join(" | ")));
    for row in &rows[1..] {
        md.push_str(&format!("| {} |\n", row.join(" | ")));
    }
    md.push('\n');
    md
}

fn markdown_cell(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('|', "\\|")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_section_markup() {
        let markup = concat!(
            r#"<!-- Start of section about Filter --><section class="section" id="section1">"#,
            "<h3>Filter</h3><p>Open the <b>lid</b>.</p><h4>Check</h4><ul><li>Seal</li></ul></section>"
        );
        let md = to_markdown(markup).unwrap();
        assert!(md.contains("### Filter"), "{md}");
        assert!(md.contains("Open the **lid**."));
        assert!(md.contains("#### Check"));
        assert!(md.contains("<!-- This section is part of the parent section: Filter -->"));
        assert!(md.contains("Seal"));
        assert!(!md.contains("<section"));
        assert!(!md.contains("<p>"));
        assert!(md.ends_with('\n'));
    }

    #[test]
    fn tables_become_markdown_tables() {
        let markup = r#"<p>Torques</p><table class="xml-table"><thead><tr><th>Part</th><th>Nm</th></tr></thead><tbody><tr><td>Bolt | M8</td><td>25</td></tr><tr><td colspan="2">All oiled</td></tr></tbody></table>"#;
        let md = to_markdown(markup).unwrap();
        assert!(md.contains("| Part | Nm |"), "{md}");
        assert!(md.contains("M8 | 25 |"));
        assert!(md.contains("| All oiled |"));
        assert!(!md.contains("<table"));
    }

    #[test]
    fn markup_without_tables_passes_through_preprocessing() {
        let html = "<p>No tables here</p>";
        assert_eq!(preprocess_tables(html), html);
    }
}
