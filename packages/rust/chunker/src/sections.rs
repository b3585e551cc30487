//! Per-section bounded chunking.
//!
//! Every top-level `<section>` (together with anything between it and the
//! previous one, such as its heading comment) is one unit. A unit no longer
//! than the section maximum is emitted whole; a larger one is sliced into
//! fixed-size pieces at char boundaries without regard for structure.

use std::ops::Range;

use tracing::debug;

use manualkit_shared::{Chunk, ChunkingConfig};

use crate::section_number;
use crate::tokens::{TokenKind, char_slices, tokenize};

/// Split `markup` into per-section units with their section numbers.
fn section_units(markup: &str) -> Vec<(Range<usize>, usize)> {
    let tokens = tokenize(markup, markup.len().max(1));
    let mut units = Vec::new();
    let mut unit_start = 0;
    let mut depth = 0usize;
    let mut number = 0;

    for token in &tokens {
        match &token.kind {
            TokenKind::Open(name) if name == "section" => {
                if depth == 0 {
                    number = section_number(&markup[token.range.clone()])
                        .unwrap_or(units.len() + 1);
                }
                depth += 1;
            }
            TokenKind::Close(name) if name == "section" && depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    units.push((unit_start..token.range.end, number));
                    unit_start = token.range.end;
                }
            }
            _ => {}
        }
    }

    if unit_start < markup.len() {
        if depth > 0 || units.is_empty() {
            units.push((unit_start..markup.len(), number));
        } else if let Some((last, _)) = units.last_mut() {
            last.end = markup.len();
        }
    }

    units
}

/// Lazy sequence of per-section chunks over one markup string.
#[derive(Debug, Clone)]
pub struct SectionChunks<'a> {
    markup: &'a str,
    units: std::vec::IntoIter<(Range<usize>, usize)>,
    pieces: std::vec::IntoIter<Range<usize>>,
    section: usize,
    section_max: usize,
}

impl<'a> SectionChunks<'a> {
    pub fn new(markup: &'a str, config: &ChunkingConfig) -> Self {
        Self {
            markup,
            units: section_units(markup).into_iter(),
            pieces: Vec::new().into_iter(),
            section: 0,
            section_max: config.section_max.max(1),
        }
    }
}

impl Iterator for SectionChunks<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        loop {
            if let Some(piece) = self.pieces.next() {
                return Some(Chunk {
                    section: self.section,
                    text: self.markup[piece].to_string(),
                    overlap: 0,
                });
            }

            let (range, section) = self.units.next()?;
            self.section = section;
            self.pieces = if range.len() <= self.section_max {
                vec![range].into_iter()
            } else {
                debug!(
                    section,
                    len = range.len(),
                    max = self.section_max,
                    "section exceeds maximum, slicing"
                );
                char_slices(self.markup, range, self.section_max).into_iter()
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(n: usize, body: &str) -> String {
        format!(
            r#"<!-- Start of section about Part {n} --><section class="section" id="section{n}"><h3>Part {n}</h3>{body}</section>"#
        )
    }

    fn chunks(markup: &str, section_max: usize) -> Vec<Chunk> {
        let config = ChunkingConfig {
            section_max,
            ..ChunkingConfig::default()
        };
        SectionChunks::new(markup, &config).collect()
    }

    #[test]
    fn each_section_is_one_chunk() {
        let markup = format!(
            "{}{}{}",
            section(1, "<p>a</p>"),
            section(2, "<p>b</p>"),
            section(3, "<p>c</p>")
        );
        let chunks = chunks(&markup, 10_000);
        assert_eq!(chunks.len(), 3);
        assert_eq!(
            chunks.iter().map(|c| c.section).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(chunks[1].text.starts_with("<!-- Start of section about Part 2 -->"));
        assert!(chunks[1].text.ends_with("</section>"));
        assert_eq!(chunks.iter().map(|c| c.text.as_str()).collect::<String>(), markup);
    }

    #[test]
    fn nested_sections_stay_with_their_parent() {
        let markup = section(1, r#"<section id="inner"><p>x</p></section>"#) + &section(2, "");
        let chunks = chunks(&markup, 10_000);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].text.contains("inner"));
    }

    #[test]
    fn oversized_section_is_sliced() {
        let big = section(2, &"<p>ü long text</p>".repeat(40));
        let markup = section(1, "<p>a</p>") + &big;
        let chunks = chunks(&markup, 150);
        assert!(chunks.len() > 3);
        assert!(chunks.iter().all(|c| c.len() <= 150));
        assert!(chunks[1..].iter().all(|c| c.section == 2));
        assert_eq!(chunks.iter().map(|c| c.text.as_str()).collect::<String>(), markup);
    }

    #[test]
    fn sections_without_numbered_ids_use_position() {
        let markup = "<section><p>a</p></section><section id=\"intro\"><p>b</p></section>";
        let chunks = chunks(markup, 10_000);
        assert_eq!(
            chunks.iter().map(|c| c.section).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[test]
    fn trailing_text_joins_the_last_section() {
        let markup = section(1, "<p>a</p>") + "\n";
        let chunks = chunks(&markup, 10_000);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.ends_with("</section>\n"));
    }

    #[test]
    fn markup_without_sections_is_one_unit() {
        let chunks = chunks("<p>loose</p>", 10_000);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].section, 0);
    }
}
