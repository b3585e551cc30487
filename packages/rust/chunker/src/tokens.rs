//! Markup tokenizer.
//!
//! Splits markup into tag tokens and text tokens. Text is split further into
//! words (each word keeps its trailing whitespace) so that a chunk boundary
//! can fall between any two words. Every token is a byte range of the input;
//! the ranges tile the input exactly.

use std::ops::Range;

/// What a token is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// `<name ...>`
    Open(String),
    /// `</name>`
    Close(String),
    /// Self-closing tags, comments, declarations.
    Void,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub range: Range<usize>,
    pub kind: TokenKind,
}

impl Token {
    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Tokenize `markup`. No token is longer than `max_len` bytes: longer runs
/// are sliced at char boundaries into plain text tokens.
pub fn tokenize(markup: &str, max_len: usize) -> Vec<Token> {
    let max_len = max_len.max(4);
    let bytes = markup.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < markup.len() {
        if bytes[pos] == b'<' {
            if let Some((end, kind)) = scan_tag(markup, pos) {
                push_bounded(markup, pos..end, kind, max_len, &mut tokens);
                pos = end;
                continue;
            }
        }
        let end = next_tag_start(markup, pos + 1);
        push_words(markup, pos..end, max_len, &mut tokens);
        pos = end;
    }

    tokens
}

/// Position of the next `<` that opens a real tag, or the end of input.
fn next_tag_start(markup: &str, from: usize) -> usize {
    let bytes = markup.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        if bytes[i] == b'<' && scan_tag(markup, i).is_some() {
            return i;
        }
        i += 1;
    }
    bytes.len()
}

/// Recognize a tag starting at `start`. Returns its end and kind, or `None`
/// when the `<` is just text.
fn scan_tag(markup: &str, start: usize) -> Option<(usize, TokenKind)> {
    let rest = &markup[start..];
    if rest.starts_with("<!--") {
        let end = rest[4..].find("-->")? + 4 + 3;
        return Some((start + end, TokenKind::Void));
    }

    let after = rest.as_bytes().get(1)?;
    let (closing, name_start) = match after {
        b'/' => (true, 2),
        b'!' | b'?' => {
            let end = rest.find('>')? + 1;
            return Some((start + end, TokenKind::Void));
        }
        c if c.is_ascii_alphabetic() => (false, 1),
        _ => return None,
    };

    let end = rest.find('>')? + 1;
    let inner = &rest[name_start..end - 1];
    let name: String = inner
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == ':')
        .collect::<String>()
        .to_ascii_lowercase();
    if name.is_empty() {
        return None;
    }

    let kind = if closing {
        TokenKind::Close(name)
    } else if inner.trim_end().ends_with('/') || is_void_element(&name) {
        TokenKind::Void
    } else {
        TokenKind::Open(name)
    };
    Some((start + end, kind))
}

fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link" | "meta" | "source" | "wbr"
    )
}

/// Split a text run into words carrying their trailing whitespace. Leading
/// whitespace of the run becomes its own token.
fn push_words(markup: &str, range: Range<usize>, max_len: usize, out: &mut Vec<Token>) {
    let text = &markup[range.clone()];
    let mut word_start = range.start;
    let mut prev_ws = false;

    for (offset, c) in text.char_indices() {
        let at = range.start + offset;
        let ws = c.is_whitespace();
        if prev_ws && !ws && at > word_start {
            push_bounded(markup, word_start..at, TokenKind::Text, max_len, out);
            word_start = at;
        }
        prev_ws = ws;
    }
    if word_start < range.end {
        push_bounded(markup, word_start..range.end, TokenKind::Text, max_len, out);
    }
}

fn push_bounded(
    markup: &str,
    range: Range<usize>,
    kind: TokenKind,
    max_len: usize,
    out: &mut Vec<Token>,
) {
    if range.len() <= max_len {
        out.push(Token { range, kind });
        return;
    }
    for piece in char_slices(markup, range, max_len) {
        out.push(Token {
            range: piece,
            kind: TokenKind::Text,
        });
    }
}

/// Cut `range` into consecutive pieces of at most `max_len` bytes, moving
/// each cut back to the nearest char boundary.
pub fn char_slices(text: &str, range: Range<usize>, max_len: usize) -> Vec<Range<usize>> {
    let mut pieces = Vec::new();
    let mut start = range.start;
    while start < range.end {
        let mut end = (start + max_len).min(range.end);
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        if end == start {
            // max_len is smaller than one char; take the whole char.
            end = start + 1;
            while end < range.end && !text.is_char_boundary(end) {
                end += 1;
            }
        }
        pieces.push(start..end);
        start = end;
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts<'a>(markup: &'a str, tokens: &[Token]) -> Vec<&'a str> {
        tokens.iter().map(|t| &markup[t.range.clone()]).collect()
    }

    #[test]
    fn tags_and_words() {
        let markup = r#"<p class="x">Open the lid.</p><br>"#;
        let tokens = tokenize(markup, 100);
        assert_eq!(
            texts(markup, &tokens),
            vec![r#"<p class="x">"#, "Open ", "the ", "lid.", "</p>", "<br>"]
        );
        assert_eq!(tokens[0].kind, TokenKind::Open("p".into()));
        assert_eq!(tokens[4].kind, TokenKind::Close("p".into()));
        assert_eq!(tokens[5].kind, TokenKind::Void);
    }

    #[test]
    fn tokens_tile_the_input() {
        let markup = "  lead <!-- a > b --><ol start=\"4\"><li>x &lt; y</li></ol> tail ";
        let tokens = tokenize(markup, 100);
        let joined: String = texts(markup, &tokens).concat();
        assert_eq!(joined, markup);
        assert!(tokens.iter().any(|t| &markup[t.range.clone()] == "<!-- a > b -->"));
    }

    #[test]
    fn stray_angle_bracket_is_text() {
        let markup = "a < b <p>c</p>";
        let tokens = tokenize(markup, 100);
        assert_eq!(tokens[0].kind, TokenKind::Text);
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Open("p".into())));
    }

    #[test]
    fn long_tokens_are_sliced_at_char_boundaries() {
        let markup = "ééééééééé";
        let tokens = tokenize(markup, 5);
        assert!(tokens.iter().all(|t| t.len() <= 5));
        assert_eq!(texts(markup, &tokens).concat(), markup);
    }

    #[test]
    fn self_closing_and_img_are_void() {
        let markup = r#"<img src="a.png"><graphic/><td/>"#;
        let tokens = tokenize(markup, 100);
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Void));
    }
}
