//! Tidy-up of the Markdown produced from document markup.
//!
//! htmd leaves behind the wrapper elements it has no Markdown form for
//! (section and safety-message wrappers, table captions) and the blank lines
//! those wrappers occupied. The passes below remove that residue, annotate
//! subsections with their parent, and settle the line layout.

use std::sync::LazyLock;

use regex::Regex;

/// At most this many blank lines in a row survive.
const MAX_BLANK_RUN: usize = 2;

const PASSES: &[fn(&str) -> String] = &[unwrap_residue, annotate_subsections, settle_lines];

pub(crate) fn run_pipeline(md: &str) -> String {
    PASSES.iter().fold(md.to_string(), |text, pass| pass(&text))
}

/// Drop wrapper tags left over from the markup while keeping what they
/// enclose. Lines inside fenced code are copied as they are.
fn unwrap_residue(md: &str) -> String {
    static WRAPPER: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"</?(?:div|span|section|strong|code|caption|thead|tbody)(?:\s[^>]*)?>")
            .expect("valid regex")
    });

    let mut fenced = false;
    md.lines()
        .map(|line| {
            if line.trim_start().starts_with("```") {
                fenced = !fenced;
                return line.to_string();
            }
            if fenced {
                line.to_string()
            } else {
                WRAPPER.replace_all(line, "").into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Follow every `####` heading with a comment naming the `###` section it
/// belongs to, so a chunk that starts at the subsection keeps its context.
fn annotate_subsections(md: &str) -> String {
    let mut parent: Option<&str> = None;
    let mut lines: Vec<String> = Vec::new();

    for line in md.lines() {
        lines.push(line.to_string());
        if let Some(title) = line.strip_prefix("### ") {
            parent = Some(title.trim());
        } else if line.starts_with("#### ") {
            if let Some(parent) = parent {
                lines.push(String::new());
                lines.push(format!(
                    "<!-- This section is part of the parent section: {parent} -->"
                ));
            }
        } else if line.starts_with("## ") {
            parent = None;
        }
    }

    lines.join("\n")
}

/// Trim line ends, cap blank runs at [`MAX_BLANK_RUN`], drop leading and
/// trailing blank lines and end the text with a single newline.
fn settle_lines(md: &str) -> String {
    let mut out = String::with_capacity(md.len() + 1);
    let mut blanks = 0;

    for line in md.lines().map(str::trim_end) {
        if line.is_empty() {
            blanks += 1;
            continue;
        }
        if !out.is_empty() {
            out.push_str(&"\n".repeat(blanks.min(MAX_BLANK_RUN) + 1));
        }
        blanks = 0;
        out.push_str(line);
    }

    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrappers_are_removed_but_their_text_stays() {
        let md = "### Title\n\n<div class=\"safetymessage\">Hot surface</div>\n\n<section class=\"section\" id=\"section2\">";
        let out = unwrap_residue(md);
        assert_eq!(out, "### Title\n\nHot surface\n\n");
    }

    #[test]
    fn fenced_code_is_left_alone() {
        let md = "Text\n\n```html\n<div>Preserved</div>\n```\n\n<span>gone</span>";
        let out = unwrap_residue(md);
        assert!(out.contains("<div>Preserved</div>"));
        assert!(out.ends_with("\ngone"));
    }

    #[test]
    fn subsections_name_their_parent() {
        let md = "### Filter\n\n#### Remove cover\n\ntext\n\n#### Clean\n\n## Intro\n\n#### Orphan";
        let out = annotate_subsections(md);
        assert_eq!(
            out.matches("<!-- This section is part of the parent section: Filter -->").count(),
            2
        );
        assert!(out.contains(
            "#### Remove cover\n\n<!-- This section is part of the parent section: Filter -->"
        ));
        assert!(out.ends_with("#### Orphan"));
    }

    #[test]
    fn blank_runs_are_capped() {
        assert_eq!(settle_lines("a\n\n\n\n\n\nb"), "a\n\n\nb\n");
        assert_eq!(settle_lines("a\n\nb"), "a\n\nb\n");
        assert_eq!(settle_lines("a\n  \t\n\n\n\nb"), "a\n\n\nb\n");
    }

    #[test]
    fn line_ends_and_edges_are_trimmed() {
        assert_eq!(settle_lines("\n\nLine 1   \nLine 2\t\n\n\n"), "Line 1\nLine 2\n");
        assert_eq!(settle_lines(""), "\n");
    }

    #[test]
    fn passes_run_in_order() {
        let md = "### Pump\n\n\n\n\n\n#### Start\n\n<div>Some content</div>   \n\n<section id=\"x\">\n\n\n\nEnd";
        let out = run_pipeline(md);

        assert!(!out.contains("\n\n\n\n"));
        assert!(!out.contains("<div>"));
        assert!(out.contains("Some content\n\n\nEnd"), "{out}");
        assert!(out.contains("parent section: Pump"));
        assert!(out.ends_with("End\n"));
    }
}
