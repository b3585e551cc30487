//! Illustrations and their numbered callouts.
//!
//! A callout item (`pli`) is numbered when it is defined; every later
//! reference to its id, as a reference item in another list or as an inline
//! `pos`, shows that same number. References met before the definition get a
//! placeholder that is filled in once the whole document has been rendered.

use manualkit_fragments::{Element, GENERIC_LABEL, Node};

use super::{Flow, MarkupTransducer, attr_escape, text_escape};
use crate::audit::ReferenceKind;

/// Whether a callout list continues the numbering of the previous one.
pub(super) fn is_continued(el: &Element) -> bool {
    el.attr("continue").is_some_and(|value| {
        matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "yes" | "true" | "1" | "continue"
        )
    })
}

/// Strip the `#` (and any `file#topic/` path) from a callout target.
fn callout_target(raw: &str) -> &str {
    let fragment = raw.rsplit('#').next().unwrap_or(raw);
    fragment.rsplit('/').next().unwrap_or(fragment)
}

fn placeholder(kind: char, id: &str) -> String {
    format!("\u{E000}{kind}:{id}\u{E001}")
}

impl MarkupTransducer<'_> {
    pub(super) fn render_illustration(&mut self, el: &Element, out: &mut String) {
        out.push_str("<!-- Illustration -->");
        out.push_str(r#"<div class="illustration">"#);
        let mut continued = is_continued(el);
        let has_graphic = self.render_illustration_body(el, &mut continued, out);
        if !has_graphic {
            self.missing(el, "graphic");
        }
        out.push_str("</div>");
    }

    pub(super) fn render_illustration_table(&mut self, el: &Element, out: &mut String) {
        out.push_str("<!-- Illustration table -->");
        out.push_str(r#"<div class="illustration-table">"#);
        let mut continued = is_continued(el);
        for node in &el.children {
            match node {
                Node::Element(col) if col.name == "illustrationcol" => {
                    out.push_str(r#"<div class="illustration-col">"#);
                    self.render_illustration_body(col, &mut continued, out);
                    out.push_str("</div>");
                }
                Node::Element(list) if list.name == "poslist" => {
                    let cont = continued || is_continued(list);
                    self.render_callout_list(list, cont, out);
                    continued = true;
                }
                _ => self.render_node(node, Flow::Block, el.attr("id"), out),
            }
        }
        out.push_str("</div>");
    }

    /// Graphic, measurements, callout lists and text of an illustration, in
    /// document order. Lists after the first one continue its numbering.
    /// Returns whether a graphic was present.
    fn render_illustration_body(
        &mut self,
        el: &Element,
        continued: &mut bool,
        out: &mut String,
    ) -> bool {
        let mut has_graphic = false;
        for node in &el.children {
            let Node::Element(child) = node else {
                continue;
            };
            match child.name.as_str() {
                "graphic" => {
                    has_graphic = true;
                    self.render_graphic(child, out);
                }
                "measurement" => {
                    let body = self.inline_children(child);
                    out.push_str(&format!(r#"<div class="measurement">{body}</div>"#));
                }
                "poslist" => {
                    let cont = *continued || is_continued(child);
                    self.render_callout_list(child, cont, out);
                    *continued = true;
                }
                "title" => {
                    let body = text_escape(&child.normalized_text());
                    out.push_str(&format!(r#"<p class="caption">{body}</p>"#));
                }
                _ => self.render_element(child, Flow::Block, el.attr("id"), out),
            }
        }
        has_graphic
    }

    pub(super) fn render_graphic(&mut self, el: &Element, out: &mut String) {
        match el.attr("href") {
            Some(href) => out.push_str(&format!(
                r#"<img src="{}" alt="Illustration" class="illustration" loading="lazy">"#,
                attr_escape(&self.assets.rewrite(href))
            )),
            None => self.missing(el, "href"),
        }
    }

    // -----------------------------------------------------------------------
    // Callout lists
    // -----------------------------------------------------------------------

    pub(super) fn render_callout_list(&mut self, el: &Element, continued: bool, out: &mut String) {
        if !continued {
            self.state.reset();
        }
        out.push_str(&format!(
            r#"<ol class="poslist" start="{}">"#,
            self.state.counter() + 1
        ));
        self.render_callout_items(el, out);
        out.push_str("</ol>");
    }

    fn render_callout_items(&mut self, el: &Element, out: &mut String) {
        for node in &el.children {
            match node {
                Node::Element(child) if child.name == "poscol" => {
                    self.render_callout_items(child, out)
                }
                Node::Element(child) if child.name == "pli" => self.render_callout_item(child, out),
                _ => self.render_node(node, Flow::Block, el.attr("id"), out),
            }
        }
    }

    pub(super) fn render_callout_item(&mut self, el: &Element, out: &mut String) {
        let description = match el.child("postxt") {
            Some(postxt) => self.inline_children(postxt),
            None => String::new(),
        };

        let defining_id = match (el.attr("prev"), el.attr("id")) {
            (Some("pliref"), _) => None,
            (_, Some(id)) if self.state.ordinal(id).is_none() => Some(id),
            (_, None) => {
                if description.is_empty() {
                    self.missing(el, "postxt");
                }
                let ordinal = self.state.next_anonymous();
                out.push_str(&format!(r#"<li value="{ordinal}">{description}</li>"#));
                return;
            }
            // An id that is already numbered is a reference to that item.
            (_, Some(_)) => None,
        };

        if let Some(id) = defining_id {
            if description.is_empty() {
                self.missing(el, "postxt");
            }
            let ordinal = self.state.define(id);
            out.push_str(&format!(
                r#"<li id="{}" value="{ordinal}">{description}</li>"#,
                attr_escape(id)
            ));
            return;
        }

        let target = el
            .attr("ref")
            .map(callout_target)
            .filter(|t| !t.is_empty())
            .or_else(|| el.attr("id"));
        let Some(target) = target else {
            self.unresolved(ReferenceKind::Callout, "");
            out.push_str(&format!(r#"<li class="callout-ref">{description}</li>"#));
            return;
        };

        let value = match self.state.ordinal(target) {
            Some(n) => n.to_string(),
            None => {
                self.state.defer(self.section, target);
                placeholder('n', target)
            }
        };
        let label = match self.index.callout_description(target) {
            Some(text) => text_escape(text),
            None if !description.is_empty() => description,
            None => GENERIC_LABEL.to_string(),
        };
        out.push_str(&format!(
            r##"<li class="callout-ref" value="{value}"><a href="#{}">{label}</a></li>"##,
            attr_escape(target)
        ));
    }

    /// Inline reference to a callout: `(n) description`.
    pub(super) fn render_callout_ref(&mut self, el: &Element, out: &mut String) {
        let own = self.inline_children(el);
        let target = el
            .attr("editref")
            .or_else(|| el.attr("href"))
            .map(callout_target)
            .filter(|t| !t.is_empty());
        let Some(target) = target else {
            self.unresolved(ReferenceKind::Callout, "");
            out.push_str(&own);
            return;
        };

        let prefix = match self.state.ordinal(target) {
            Some(n) => format!("({n}) "),
            None => {
                self.state.defer(self.section, target);
                placeholder('p', target)
            }
        };
        let label = match self.index.callout_description(target) {
            Some(text) => text_escape(text),
            None if !own.is_empty() => own,
            None => GENERIC_LABEL.to_string(),
        };
        out.push_str(&format!(
            r##"<a class="callout-ref" href="#{}">{prefix}{label}</a>"##,
            attr_escape(target)
        ));
    }
}
