//! Table renderer with row and column spanning.
//!
//! Column spans are given as named start/end columns resolved against the
//! group's column specs. Row spans (`morerows`) occupy the same column in the
//! following rows; those positions are skipped when the next rows are laid
//! out, and any declared column still uncovered at the end of a row is padded
//! with an empty cell.

use manualkit_fragments::Element;

use super::{Flow, MarkupTransducer, text_escape};

/// Column layout of one `tgroup`.
struct Columns {
    names: Vec<String>,
    count: usize,
}

impl Columns {
    fn of(tgroup: &Element) -> Self {
        let names: Vec<String> = tgroup
            .children_named("colspec")
            .enumerate()
            .map(|(i, spec)| {
                spec.attr("colname")
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("col{}", i + 1))
            })
            .collect();
        let declared = tgroup
            .attr("cols")
            .and_then(|c| c.trim().parse::<usize>().ok())
            .unwrap_or(0);
        let count = declared.max(names.len());
        Self { names, count }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

/// Rows still covered by a row span, per column index.
#[derive(Default)]
struct Occupancy(Vec<usize>);

impl Occupancy {
    /// Consume one row of coverage at `col`. Returns whether it was covered.
    fn take(&mut self, col: usize) -> bool {
        match self.0.get_mut(col) {
            Some(rows) if *rows > 0 => {
                *rows -= 1;
                true
            }
            _ => false,
        }
    }

    fn cover(&mut self, cols: std::ops::Range<usize>, rows: usize) {
        if self.0.len() < cols.end {
            self.0.resize(cols.end, 0);
        }
        for col in cols {
            self.0[col] = rows;
        }
    }
}

impl MarkupTransducer<'_> {
    pub(super) fn render_table(&mut self, el: &Element, out: &mut String) {
        out.push_str(r#"<table class="xml-table">"#);
        if let Some(title) = el.child("title") {
            out.push_str(&format!(
                "<caption>{}</caption>",
                text_escape(&title.normalized_text())
            ));
        }

        let mut has_group = false;
        for tgroup in el.children_named("tgroup") {
            has_group = true;
            let columns = Columns::of(tgroup);
            if let Some(head) = tgroup.child("thead") {
                out.push_str("<thead>");
                self.render_rows(head, &columns, "th", out);
                out.push_str("</thead>");
            }
            match tgroup.child("tbody") {
                Some(body) => {
                    out.push_str("<tbody>");
                    self.render_rows(body, &columns, "td", out);
                    out.push_str("</tbody>");
                }
                None => self.missing(tgroup, "tbody"),
            }
        }
        if !has_group {
            self.missing(el, "tgroup");
        }

        out.push_str("</table>");
    }

    fn render_rows(&mut self, part: &Element, columns: &Columns, cell: &str, out: &mut String) {
        let mut occupied = Occupancy::default();

        for row in part.children_named("row") {
            out.push_str("<tr>");
            let mut cursor = 0;

            for entry in row.children_named("entry") {
                while occupied.take(cursor) {
                    cursor += 1;
                }

                let start = entry
                    .attr("namest")
                    .or_else(|| entry.attr("colname"))
                    .and_then(|name| columns.position(name));
                if let Some(start) = start {
                    while cursor < start {
                        if !occupied.take(cursor) {
                            out.push_str(&format!("<{cell}></{cell}>"));
                        }
                        cursor += 1;
                    }
                }

                let colspan = colspan(entry, columns);
                let rowspan = entry
                    .attr("morerows")
                    .and_then(|m| m.trim().parse::<usize>().ok())
                    .map_or(1, |m| m + 1);

                let mut attrs = String::new();
                if rowspan > 1 {
                    attrs.push_str(&format!(r#" rowspan="{rowspan}""#));
                    occupied.cover(cursor..cursor + colspan, rowspan - 1);
                }
                if colspan > 1 {
                    attrs.push_str(&format!(r#" colspan="{colspan}""#));
                }

                let mut body = String::new();
                self.render_children(entry, Flow::Block, &mut body);
                out.push_str(&format!("<{cell}{attrs}>{}</{cell}>", body.trim()));
                cursor += colspan;
            }

            finish_row(cursor, columns, &mut occupied, cell, out);
            out.push_str("</tr>");
        }
    }
}

/// Pad the declared columns right of `cursor` and use up one row of every
/// span still pending there, including spans past the declared columns.
fn finish_row(
    mut cursor: usize,
    columns: &Columns,
    occupied: &mut Occupancy,
    cell: &str,
    out: &mut String,
) {
    let width = columns.count.max(occupied.0.len());
    while cursor < width {
        if !occupied.take(cursor) && cursor < columns.count {
            out.push_str(&format!("<{cell}></{cell}>"));
        }
        cursor += 1;
    }
}

/// Columns spanned by `namest`..`nameend`; 1 when either name is unknown.
fn colspan(entry: &Element, columns: &Columns) -> usize {
    let (Some(start), Some(end)) = (entry.attr("namest"), entry.attr("nameend")) else {
        return 1;
    };
    match (columns.position(start), columns.position(end)) {
        (Some(s), Some(e)) if e >= s => e - s + 1,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::render;
    use super::{Columns, Occupancy, finish_row};

    fn table(head: &str, rows: &str) -> String {
        format!(
            r#"<task><title>T</title><body><table><title>Torques</title><tgroup cols="3">
            <colspec colname="c1"/><colspec colname="c2"/><colspec colname="c3"/>
            {head}<tbody>{rows}</tbody></tgroup></table></body></task>"#
        )
    }

    #[test]
    fn header_and_body_cells() {
        let (html, _) = render(&table(
            "<thead><row><entry>Part</entry><entry>Nm</entry><entry>Note</entry></row></thead>",
            "<row><entry>Bolt</entry><entry>25</entry><entry><p>Oil</p></entry></row>",
        ));
        assert!(html.contains(concat!(
            r#"<table class="xml-table"><caption>Torques</caption>"#,
            "<thead><tr><th>Part</th><th>Nm</th><th>Note</th></tr></thead>",
            "<tbody><tr><td>Bolt</td><td>25</td><td><p>Oil</p></td></tr></tbody></table>"
        )), "{html}");
    }

    #[test]
    fn row_span_skips_the_cell_below_and_keeps_alignment() {
        let (html, _) = render(&table(
            "",
            r#"<row><entry morerows="1">A</entry><entry>B</entry><entry>C</entry></row>
               <row><entry>E</entry><entry>F</entry></row>
               <row><entry>G</entry><entry>H</entry><entry>I</entry></row>"#,
        ));
        assert!(html.contains(concat!(
            r#"<tr><td rowspan="2">A</td><td>B</td><td>C</td></tr>"#,
            "<tr><td>E</td><td>F</td></tr>",
            "<tr><td>G</td><td>H</td><td>I</td></tr>"
        )), "{html}");
    }

    #[test]
    fn row_span_in_middle_column() {
        let (html, _) = render(&table(
            "",
            r#"<row><entry>A</entry><entry morerows="2">B</entry><entry>C</entry></row>
               <row><entry>D</entry><entry>E</entry></row>
               <row><entry colname="c3">F</entry></row>"#,
        ));
        assert!(html.contains("<tr><td>D</td><td>E</td></tr>"), "{html}");
        // Column 1 is padded, column 2 is still covered, F lands in column 3.
        assert!(html.contains("<tr><td></td><td>F</td></tr>"), "{html}");
    }

    #[test]
    fn named_column_span() {
        let (html, _) = render(&table(
            "",
            r#"<row><entry namest="c1" nameend="c2">Wide</entry><entry>X</entry></row>
               <row><entry namest="c2" nameend="c3">Right</entry></row>"#,
        ));
        assert!(html.contains(r#"<tr><td colspan="2">Wide</td><td>X</td></tr>"#));
        assert!(html.contains(r#"<tr><td></td><td colspan="2">Right</td></tr>"#), "{html}");
    }

    #[test]
    fn unknown_column_names_fall_back_to_single_column() {
        let (html, _) = render(&table(
            "",
            r#"<row><entry namest="x1" nameend="x9">Odd</entry><entry>Y</entry></row>"#,
        ));
        assert!(html.contains("<tr><td>Odd</td><td>Y</td><td></td></tr>"), "{html}");
    }

    #[test]
    fn short_rows_are_padded() {
        let (html, _) = render(&table("", "<row><entry>Only</entry></row>"));
        assert!(html.contains("<tr><td>Only</td><td></td><td></td></tr>"));
    }

    #[test]
    fn row_end_uses_up_spans_past_declared_columns() {
        let columns = Columns { names: vec![], count: 0 };
        let mut occupied = Occupancy::default();
        occupied.cover(1..2, 2);

        let mut out = String::new();
        finish_row(1, &columns, &mut occupied, "td", &mut out);
        assert!(out.is_empty());
        assert_eq!(occupied.0, vec![0, 1]);

        finish_row(1, &columns, &mut occupied, "td", &mut out);
        assert_eq!(occupied.0, vec![0, 0]);
    }

    #[test]
    fn row_end_pads_only_uncovered_declared_columns() {
        let columns = Columns { names: vec![], count: 3 };
        let mut occupied = Occupancy::default();
        occupied.cover(2..3, 1);

        let mut out = String::new();
        finish_row(1, &columns, &mut occupied, "td", &mut out);
        assert_eq!(out, "<td></td>");
        assert_eq!(occupied.0, vec![0, 0, 0]);
    }

    #[test]
    fn undeclared_columns_keep_later_rows_aligned() {
        let (html, _) = render(
            r#"<task><title>T</title><body><table><tgroup>
            <tbody><row><entry>A</entry><entry morerows="1">B</entry></row>
            <row><entry>C</entry></row>
            <row><entry>D</entry><entry>E</entry></row></tbody>
            </tgroup></table></body></task>"#,
        );
        assert!(html.contains(concat!(
            r#"<tr><td>A</td><td rowspan="2">B</td></tr>"#,
            "<tr><td>C</td></tr>",
            "<tr><td>D</td><td>E</td></tr>"
        )), "{html}");
    }

    #[test]
    fn table_without_group_is_audited() {
        let (html, audit) = render("<task><title>T</title><body><table/></body></task>");
        assert!(html.contains(r#"<table class="xml-table"></table>"#));
        assert_eq!(audit.missing_count(), 1);
    }
}
