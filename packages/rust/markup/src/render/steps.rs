//! Procedure step renderers.
//!
//! In an ordered step sequence every step-group continues the numbering of
//! the groups before it, so each group's start is the number of steps that
//! precede it. Callout numbering runs independently through the same walk.

use manualkit_fragments::{Element, Node};

use super::{Flow, MarkupTransducer, render_text};

impl MarkupTransducer<'_> {
    pub(super) fn render_steps_ordered(&mut self, el: &Element, out: &mut String) {
        out.push_str("<!-- The list below contains the different steps in order -->");

        let mut start = 0;
        let mut loose_run = false;
        for node in &el.children {
            let child = match node {
                Node::Element(child) => child,
                Node::Text(text) => {
                    if !text.trim().is_empty() {
                        close_loose_run(&mut loose_run, out);
                        render_text(text, Flow::Block, out);
                    }
                    continue;
                }
            };

            match child.name.as_str() {
                "step" => {
                    if !loose_run {
                        out.push_str(&format!(r#"<ol class="steps" start="{}">"#, start + 1));
                        loose_run = true;
                    }
                    self.render_step(child, out);
                    start += 1;
                }
                "step-group" => {
                    close_loose_run(&mut loose_run, out);
                    self.render_step_list(child, true, start, out);
                    start += count_steps(child);
                }
                _ => {
                    close_loose_run(&mut loose_run, out);
                    self.render_element(child, Flow::Block, el.attr("id"), out);
                }
            }
        }
        close_loose_run(&mut loose_run, out);
    }

    /// One step-group. Nested groups are rendered unnumbered and keep the
    /// enclosing start.
    pub(super) fn render_step_list(
        &mut self,
        el: &Element,
        ordered: bool,
        start: usize,
        out: &mut String,
    ) {
        if ordered {
            out.push_str(&format!(r#"<ol class="steps" start="{}">"#, start + 1));
        } else {
            out.push_str(r#"<ul class="steps">"#);
        }

        for node in &el.children {
            match node {
                Node::Element(child) if child.name == "step" => self.render_step(child, out),
                Node::Element(child) if child.name == "step-group" => {
                    self.render_step_list(child, false, start, out)
                }
                _ => self.render_node(node, Flow::Block, el.attr("id"), out),
            }
        }

        out.push_str(if ordered { "</ol>" } else { "</ul>" });
    }

    pub(super) fn render_steps_unordered(&mut self, el: &Element, out: &mut String) {
        out.push_str(r#"<ul class="steps">"#);
        for node in &el.children {
            match node {
                Node::Element(child) if child.name == "step" => self.render_step(child, out),
                _ => self.render_node(node, Flow::Block, el.attr("id"), out),
            }
        }
        out.push_str("</ul>");
    }

    fn render_step(&mut self, step: &Element, out: &mut String) {
        out.push_str("<li>");
        self.render_children(step, Flow::Block, out);
        out.push_str("</li>");
    }

    pub(super) fn render_substeps(&mut self, el: &Element, out: &mut String) {
        out.push_str(r#"<ul class="substeps">"#);
        for node in &el.children {
            match node {
                Node::Element(child) if child.name == "substep" => {
                    out.push_str("<li>");
                    self.render_children(child, Flow::Block, out);
                    out.push_str("</li>");
                }
                _ => self.render_node(node, Flow::Block, el.attr("id"), out),
            }
        }
        out.push_str("</ul>");
    }
}

fn close_loose_run(open: &mut bool, out: &mut String) {
    if *open {
        out.push_str("</ol>");
        *open = false;
    }
}

/// Steps anywhere below `el`.
fn count_steps(el: &Element) -> usize {
    el.descendants().filter(|d| d.name == "step").count()
}

#[cfg(test)]
mod tests {
    use super::super::tests::render;
    use super::*;

    fn steps(n: usize) -> String {
        (1..=n).map(|i| format!("<step><p>Step {i}</p></step>")).collect()
    }

    #[test]
    fn second_group_starts_after_first_group_steps() {
        let xml = format!(
            "<task><title>T</title><body><steps-ordered><step-group>{}</step-group><step-group>{}</step-group></steps-ordered></body></task>",
            steps(3),
            steps(4)
        );
        let (html, _) = render(&xml);
        assert!(html.contains("<!-- The list below contains the different steps in order -->"));
        assert!(html.contains(r#"<ol class="steps" start="1"><li><p>Step 1</p></li>"#));
        assert!(html.contains(r#"<ol class="steps" start="4"><li><p>Step 1</p></li>"#), "{html}");
        assert_eq!(html.matches("<li>").count(), 7);
    }

    #[test]
    fn nested_groups_are_counted_and_rendered_unnumbered() {
        let xml = format!(
            "<task><title>T</title><body><steps-ordered>\
             <step-group>{}<step-group>{}</step-group></step-group>\
             <step-group>{}</step-group></steps-ordered></body></task>",
            steps(1),
            steps(2),
            steps(1)
        );
        let (html, _) = render(&xml);
        assert!(html.contains(r#"<ul class="steps"><li><p>Step 1</p></li><li><p>Step 2</p></li></ul></ol>"#));
        assert!(html.contains(r#"<ol class="steps" start="4">"#), "{html}");
    }

    #[test]
    fn loose_steps_share_one_list_and_advance_the_start() {
        let xml = format!(
            "<task><title>T</title><body><steps-ordered>{}<note>Check</note><step-group>{}</step-group></steps-ordered></body></task>",
            steps(2),
            steps(1)
        );
        let (html, _) = render(&xml);
        assert!(html.contains(
            r#"<ol class="steps" start="1"><li><p>Step 1</p></li><li><p>Step 2</p></li></ol><p class="note">"#
        ), "{html}");
        assert!(html.contains(r#"<ol class="steps" start="3">"#));
    }

    #[test]
    fn interleaved_blocks_stay_in_place() {
        let xml = "<task><title>T</title><body><steps-ordered><step-group>\
                   <step><p>A</p></step><p>Between</p><step><p>B</p></step>\
                   </step-group></steps-ordered></body></task>";
        let (html, _) = render(xml);
        assert!(html.contains("<li><p>A</p></li><p>Between</p><li><p>B</p></li>"));
    }

    #[test]
    fn unordered_steps_and_substeps() {
        let xml = "<task><title>T</title><body><steps-unordered><step><p>Open</p>\
                   <substeps><substep><p>Left</p></substep><substep><p>Right</p></substep></substeps>\
                   </step></steps-unordered></body></task>";
        let (html, _) = render(xml);
        assert!(html.contains(
            r#"<ul class="steps"><li><p>Open</p><ul class="substeps"><li><p>Left</p></li><li><p>Right</p></li></ul></li></ul>"#
        ), "{html}");
    }

    #[test]
    fn count_steps_sees_nested_steps() {
        let group = manualkit_fragments::xml::parse(
            "<step-group><step/><step-group><step/><step/></step-group></step-group>",
        )
        .unwrap();
        assert_eq!(count_steps(&group), 3);
    }
}
