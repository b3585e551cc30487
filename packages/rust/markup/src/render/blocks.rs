//! Paragraph-level and phrasing renderers.

use manualkit_fragments::Element;

use super::{Flow, MarkupTransducer, attr_escape, text_escape};
use crate::audit::ReferenceKind;
use crate::kind::{Emphasis, NodeKind};

impl MarkupTransducer<'_> {
    pub(super) fn render_title(&mut self, el: &Element, anchor: Option<&str>, out: &mut String) {
        let text = text_escape(&el.normalized_text());
        match anchor {
            Some(id) => out.push_str(&format!(r#"<h4 id="{}">{text}</h4>"#, attr_escape(id))),
            None => out.push_str(&format!("<h4>{text}</h4>")),
        }
    }

    pub(super) fn render_shortdesc(&mut self, el: &Element, out: &mut String) {
        let body = self.inline_children(el);
        if !body.is_empty() {
            out.push_str(&format!(r#"<p class="shortdesc">{body}</p>"#));
        }
    }

    pub(super) fn render_paragraph(&mut self, el: &Element, flow: Flow, out: &mut String) {
        let body = self.inline_children(el);
        if body.is_empty() {
            return;
        }
        match flow {
            Flow::Block => out.push_str(&format!("<p>{body}</p>")),
            Flow::Inline => out.push_str(&body),
        }
    }

    pub(super) fn render_note(&mut self, el: &Element, out: &mut String) {
        let body = self.inline_children(el);
        out.push_str(&format!(
            r#"<p class="note"><strong>Note:</strong> {body}</p>"#
        ));
    }

    pub(super) fn render_validity(
        &mut self,
        el: &Element,
        class: &str,
        label: &str,
        out: &mut String,
    ) {
        let body = self.inline_children(el);
        out.push_str(&format!(
            r#"<p class="{class}"><strong>{label}</strong> {body}</p>"#
        ));
    }

    pub(super) fn render_list(&mut self, el: &Element, tag: &str, out: &mut String) {
        out.push_str(&format!("<{tag}>"));
        self.render_children(el, Flow::Block, out);
        out.push_str(&format!("</{tag}>"));
    }

    pub(super) fn render_list_item(&mut self, el: &Element, out: &mut String) {
        out.push_str("<li>");
        self.render_children(el, Flow::Block, out);
        out.push_str("</li>");
    }

    // -----------------------------------------------------------------------
    // Safety messages and prerequisites
    // -----------------------------------------------------------------------

    pub(super) fn render_safety(&mut self, el: &Element, out: &mut String) {
        out.push_str(r#"<div class="safetymessage">"#);
        match el.find("hazardidentification") {
            Some(hazard) => self.render_safety_part(hazard, "hazard", out),
            None => self.missing(el, "hazardidentification"),
        }
        match el.find("precautions") {
            Some(precautions) => self.render_safety_part(precautions, "precautions", out),
            None => self.missing(el, "precautions"),
        }
        if let Some(consequence) = el.find("consequence") {
            self.render_safety_part(consequence, "consequence", out);
        }
        out.push_str("</div>");
    }

    fn render_safety_part(&mut self, el: &Element, class: &str, out: &mut String) {
        let body = self.inline_children(el);
        if !body.is_empty() {
            out.push_str(&format!(r#"<p class="{class}">{body}</p>"#));
        }
    }

    pub(super) fn render_prereq(&mut self, el: &Element, out: &mut String) {
        out.push_str(r#"<div class="prerequisite"><strong>Prerequisite:</strong><ul>"#);
        for child in el.elements() {
            if NodeKind::from_tag(&child.name) != NodeKind::Unknown {
                let body = self.inline_children(child);
                if !body.is_empty() {
                    out.push_str(&format!("<li>{body}</li>"));
                }
                continue;
            }

            // Requirement entries: labelled by their own title or their name.
            let label = child
                .child("title")
                .map(Element::normalized_text)
                .unwrap_or_else(|| humanize(&child.name));
            let mut value = String::new();
            for node in &child.children {
                if matches!(node, manualkit_fragments::Node::Element(e) if e.name == "title") {
                    continue;
                }
                self.render_node(node, Flow::Inline, child.attr("id"), &mut value);
            }
            out.push_str(&format!(
                r#"<li><span class="prereq-item">{}:</span> <span class="prereq-value">{}</span></li>"#,
                text_escape(&label),
                value.trim()
            ));
        }
        out.push_str("</ul></div>");
    }

    // -----------------------------------------------------------------------
    // Phrasing
    // -----------------------------------------------------------------------

    pub(super) fn render_emphasis(&mut self, el: &Element, kind: Emphasis, out: &mut String) {
        let body = self.inline_children(el);
        match kind {
            Emphasis::Italic => out.push_str(&format!("<i>{body}</i>")),
            Emphasis::Bold => out.push_str(&format!("<b>{body}</b>")),
            Emphasis::UiControl => out.push_str(&format!("<code>{body}</code>")),
            Emphasis::Abbreviation => match el.attr("title").or_else(|| el.attr("expansion")) {
                Some(title) => {
                    out.push_str(&format!(r#"<b title="{}">{body}</b>"#, attr_escape(title)))
                }
                None => out.push_str(&format!("<b>{body}</b>")),
            },
        }
    }

    pub(super) fn render_inline_graphic(&mut self, el: &Element, out: &mut String) {
        match el.attr("href") {
            Some(href) => out.push_str(&format!(
                r#"<img class="inline-graphic" src="{}" alt="">"#,
                attr_escape(&self.assets.rewrite(href))
            )),
            None => self.missing(el, "href"),
        }
    }

    /// Links to another fragment, to a titled element, or, failing both, to
    /// the original target under the generic label.
    pub(super) fn render_xref(&mut self, el: &Element, out: &mut String) {
        let own = self.inline_children(el);
        let Some(href) = el.attr("href") else {
            out.push_str(&own);
            return;
        };

        let file_name = href.split('#').next().unwrap_or_default();
        let known = !file_name.is_empty() && self.index.xrefs().contains(file_name);
        let fragment = href.rsplit('#').next().unwrap_or(href);
        let local = fragment.rsplit('/').next().unwrap_or(fragment);

        let (link, label) = match self.index.title_of(local) {
            Some(title) if !known => (format!("#{local}"), title.to_string()),
            _ => {
                if !known {
                    self.unresolved(ReferenceKind::Xref, href);
                }
                let entry = self.index.xrefs().lookup_or_fallback(file_name, href);
                (entry.anchor, entry.title)
            }
        };

        let text = if own.is_empty() {
            text_escape(&label)
        } else {
            own
        };
        out.push_str(&format!(
            r#"<a class="xref" href="{}">{text}</a>"#,
            attr_escape(&link)
        ));
    }
}

/// `required-tools` -> `Required tools`.
fn humanize(name: &str) -> String {
    let spaced = name.replace(['-', '_'], " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
