//! Tag-balance-aware chunking.
//!
//! Tokens accumulate into a segment while a stack of open structural tags is
//! tracked. A segment may end after a token when it is longer than the
//! preferred length and either the stack is empty there, or the segment is
//! past the soft ceiling and that token closed the tag on top of the stack.
//! A segment that would grow past the hard ceiling is cut at the last
//! boundary that does not split a table short enough to fit in one chunk.
//!
//! Each chunk after the first is prefixed with whole tokens from the end of
//! the previous segment. The prefix never exceeds the configured overlap and
//! never pushes the chunk past the hard ceiling.

use tracing::trace;

use manualkit_shared::{Chunk, ChunkingConfig};

use crate::section_number;
use crate::tokens::{Token, TokenKind, tokenize};

/// Per-token facts about the document structure, computed once.
#[derive(Debug, Clone)]
struct Layout {
    /// Cutting after token `i` does not split a table of at most hard length.
    safe: Vec<bool>,
    /// No structural tag is open after token `i`.
    balanced: Vec<bool>,
    /// Token `i` closed the structural tag on top of the stack.
    closed_top: Vec<bool>,
    /// Section in effect once token `i` has been read.
    section: Vec<usize>,
}

impl Layout {
    fn analyze(markup: &str, tokens: &[Token], structural: &[String], hard: usize) -> Self {
        let n = tokens.len();
        let mut layout = Self {
            safe: vec![true; n],
            balanced: vec![true; n],
            closed_top: vec![false; n],
            section: vec![0; n],
        };

        let is_structural = |name: &str| structural.iter().any(|s| s.eq_ignore_ascii_case(name));
        let mut stack: Vec<&str> = Vec::new();
        let mut tables: Vec<usize> = Vec::new();
        let mut section = 0;

        for (i, token) in tokens.iter().enumerate() {
            match &token.kind {
                TokenKind::Open(name) => {
                    if is_structural(name) {
                        stack.push(name);
                    }
                    if name == "table" {
                        tables.push(i);
                    }
                    if name == "section" {
                        if let Some(number) = section_number(&markup[token.range.clone()]) {
                            section = number;
                        }
                    }
                }
                TokenKind::Close(name) => {
                    if is_structural(name) {
                        if stack.last() == Some(&name.as_str()) {
                            stack.pop();
                            layout.closed_top[i] = true;
                        } else if let Some(at) = stack.iter().rposition(|open| *open == name.as_str()) {
                            stack.truncate(at);
                        }
                    }
                    if name == "table" {
                        if let Some(open) = tables.pop() {
                            let span = token.range.end - tokens[open].range.start;
                            if span <= hard {
                                layout.safe[open..i].iter_mut().for_each(|s| *s = false);
                            }
                        }
                    }
                }
                TokenKind::Void | TokenKind::Text => {}
            }
            layout.balanced[i] = stack.is_empty();
            layout.section[i] = section;
        }

        layout
    }
}

/// Lazy sequence of balanced chunks over one markup string.
#[derive(Debug, Clone)]
pub struct BalancedChunks<'a> {
    markup: &'a str,
    tokens: Vec<Token>,
    layout: Layout,
    preferred: usize,
    soft: usize,
    hard: usize,
    overlap: usize,
    /// First token of the next segment.
    next: usize,
    /// First token of the previous segment.
    prev: usize,
}

impl<'a> BalancedChunks<'a> {
    pub fn new(markup: &'a str, config: &ChunkingConfig) -> Self {
        let hard = config.hard_ceiling.max(1);
        let tokens = tokenize(markup, hard);
        let layout = Layout::analyze(markup, &tokens, &config.structural_tags, hard);
        Self {
            markup,
            tokens,
            layout,
            preferred: config.preferred_len,
            soft: config.soft_ceiling,
            hard,
            overlap: config.overlap.min(hard.saturating_sub(1)),
            next: 0,
            prev: 0,
        }
    }

    /// Exclusive end token of the segment starting at token `start`.
    fn segment_end(&self, start: usize) -> usize {
        let origin = self.tokens[start].range.start;
        let budget = self.hard - self.overlap;
        let mut within_budget = None;
        let mut beyond_budget = None;

        for i in start..self.tokens.len() {
            let len = self.tokens[i].range.end - origin;
            if len > self.hard {
                return within_budget.or(beyond_budget).map_or(i, |k: usize| k + 1);
            }
            if !self.layout.safe[i] {
                continue;
            }
            if len > self.preferred
                && (self.layout.balanced[i] || (len > self.soft && self.layout.closed_top[i]))
            {
                return i + 1;
            }
            if len <= budget {
                within_budget = Some(i);
            } else {
                beyond_budget = Some(i);
            }
        }

        self.tokens.len()
    }

    /// First token of the overlap prefix for a segment starting at `start`
    /// that is `segment_len` bytes long.
    fn overlap_start(&self, start: usize, segment_len: usize) -> usize {
        let bound = self.overlap.min(self.hard.saturating_sub(segment_len));
        let mut first = start;
        let mut taken = 0;
        while first > self.prev {
            let len = self.tokens[first - 1].len();
            if taken + len > bound {
                break;
            }
            taken += len;
            first -= 1;
        }
        first
    }

    fn section_of(&self, start: usize, end: usize) -> usize {
        let first_text = (start..end).find(|&i| self.tokens[i].kind == TokenKind::Text);
        self.layout.section[first_text.unwrap_or(end - 1)]
    }
}

impl Iterator for BalancedChunks<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.next >= self.tokens.len() {
            return None;
        }

        let start = self.next;
        let end = self.segment_end(start);
        let origin = self.tokens[start].range.start;
        let finish = self.tokens[end - 1].range.end;

        let first = if start == 0 {
            start
        } else {
            self.overlap_start(start, finish - origin)
        };
        let from = self.tokens[first].range.start;

        let chunk = Chunk {
            section: self.section_of(start, end),
            text: self.markup[from..finish].to_string(),
            overlap: origin - from,
        };
        trace!(
            section = chunk.section,
            len = chunk.len(),
            overlap = chunk.overlap,
            "chunk cut"
        );

        self.prev = start;
        self.next = end;
        Some(chunk)
    }
}
