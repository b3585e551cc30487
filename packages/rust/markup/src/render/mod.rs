//! The markup transducer.
//!
//! Walks the assembled document depth-first and writes HTML. Every element is
//! dispatched through [`NodeKind`]; the renderers for each kind family live in
//! the sibling modules and share the per-run [`EnumerationState`].

mod blocks;
mod callouts;
mod steps;
mod table;

use std::sync::LazyLock;

use quick_xml::escape::{escape, partial_escape};
use regex::{Captures, Regex};
use tracing::{info, instrument};

use manualkit_fragments::{Document, Element, Node, Section};

use crate::assets::AssetRewriter;
use crate::audit::{AuditEvent, AuditSink, ReferenceKind};
use crate::index::CrossReferenceIndex;
use crate::kind::NodeKind;
use crate::state::EnumerationState;

/// Callout numbers that are not known yet when their reference is written.
/// `n:` stands for a bare number, `p:` for the `(n) ` label prefix.
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("\u{E000}([np]):([^\u{E001}]*)\u{E001}").expect("valid regex")
});

/// Whether running text is being written inside a block or inside a phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    /// Whitespace-only text between blocks is dropped.
    Block,
    /// All text is kept, with whitespace runs collapsed.
    Inline,
}

/// Stateful document-to-HTML converter. One instance per conversion run.
pub struct MarkupTransducer<'a> {
    index: &'a CrossReferenceIndex,
    assets: &'a AssetRewriter,
    audit: &'a mut dyn AuditSink,
    state: EnumerationState,
    /// Number of the section being rendered, for audit events.
    section: usize,
}

impl<'a> MarkupTransducer<'a> {
    pub fn new(
        index: &'a CrossReferenceIndex,
        assets: &'a AssetRewriter,
        audit: &'a mut dyn AuditSink,
    ) -> Self {
        Self {
            index,
            assets,
            audit,
            state: EnumerationState::new(),
            section: 0,
        }
    }

    pub fn state(&self) -> &EnumerationState {
        &self.state
    }

    /// Render every section in order and resolve deferred callout numbers.
    #[instrument(skip_all, fields(sections = document.len()))]
    pub fn render_document(&mut self, document: &Document) -> String {
        let mut out = String::new();
        for section in &document.sections {
            self.render_section(section, &mut out);
        }
        let markup = self.finish(out);
        info!(bytes = markup.len(), "transduction complete");
        markup
    }

    fn render_section(&mut self, section: &Section, out: &mut String) {
        self.section = section.number;
        self.state.reset();

        let root = &section.root;
        let has_body = root
            .elements()
            .any(|el| el.name != "title" && el.name != "shortdesc" && has_content(el));
        let heading = if has_body { "h3" } else { "h2" };

        out.push_str(&format!(
            "<!-- Start of section about {} -->",
            comment_safe(&section.title)
        ));
        out.push_str(&format!(
            r#"<section class="section" id="{}">"#,
            escape(section.id.as_str())
        ));
        out.push_str(&format!(
            "<{heading}>{}</{heading}>",
            partial_escape(section.title.as_str())
        ));

        if let Some(shortdesc) = root.child("shortdesc") {
            self.render_shortdesc(shortdesc, out);
        }
        for node in &root.children {
            if let Node::Element(el) = node {
                if el.name == "title" || el.name == "shortdesc" {
                    continue;
                }
            }
            self.render_node(node, Flow::Block, root.attr("id"), out);
        }

        out.push_str("</section>");
    }

    /// Substitute deferred callout numbers; unknown targets become empty.
    fn finish(&mut self, markup: String) -> String {
        let unresolved: Vec<_> = self.state.unresolved().cloned().collect();
        for pending in unresolved {
            self.audit.record(AuditEvent::UnresolvedReference {
                section: pending.section,
                kind: ReferenceKind::Callout,
                target: pending.id,
            });
        }

        if !markup.contains('\u{E000}') {
            return markup;
        }
        let state = &self.state;
        PLACEHOLDER
            .replace_all(&markup, |caps: &Captures| {
                match (&caps[1], state.ordinal(&caps[2])) {
                    ("n", Some(n)) => n.to_string(),
                    ("p", Some(n)) => format!("({n}) "),
                    _ => String::new(),
                }
            })
            .into_owned()
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    pub(crate) fn render_node(
        &mut self,
        node: &Node,
        flow: Flow,
        parent_id: Option<&str>,
        out: &mut String,
    ) {
        match node {
            Node::Text(text) => render_text(text, flow, out),
            Node::Element(el) => self.render_element(el, flow, parent_id, out),
        }
    }

    pub(crate) fn render_element(
        &mut self,
        el: &Element,
        flow: Flow,
        parent_id: Option<&str>,
        out: &mut String,
    ) {
        match NodeKind::from_tag(&el.name) {
            NodeKind::Container | NodeKind::Step => self.render_children(el, flow, out),
            NodeKind::Title => self.render_title(el, parent_id, out),
            NodeKind::ShortDesc => self.render_shortdesc(el, out),
            NodeKind::Paragraph => self.render_paragraph(el, flow, out),
            NodeKind::Note => self.render_note(el, out),
            NodeKind::Valid => self.render_validity(el, "valid", "Valid for:", out),
            NodeKind::NotValid => self.render_validity(el, "notvalid", "Not valid for:", out),
            NodeKind::OrderedList => self.render_list(el, "ol", out),
            NodeKind::UnorderedList => self.render_list(el, "ul", out),
            NodeKind::ListItem => self.render_list_item(el, out),
            NodeKind::StepsOrdered => self.render_steps_ordered(el, out),
            NodeKind::StepsUnordered => self.render_steps_unordered(el, out),
            NodeKind::StepGroup => self.render_step_list(el, true, 0, out),
            NodeKind::Substeps => self.render_substeps(el, out),
            NodeKind::Table => self.render_table(el, out),
            NodeKind::SafetyMessage => self.render_safety(el, out),
            NodeKind::Prereq => self.render_prereq(el, out),
            NodeKind::Illustration => self.render_illustration(el, out),
            NodeKind::IllustrationTable => self.render_illustration_table(el, out),
            NodeKind::Graphic => self.render_graphic(el, out),
            NodeKind::CalloutList => {
                let continued = callouts::is_continued(el);
                self.render_callout_list(el, continued, out);
            }
            NodeKind::CalloutItem => {
                out.push_str(&format!(
                    r#"<ol class="poslist" start="{}">"#,
                    self.state.counter() + 1
                ));
                self.render_callout_item(el, out);
                out.push_str("</ol>");
            }
            NodeKind::CalloutRef => self.render_callout_ref(el, out),
            NodeKind::Xref => self.render_xref(el, out),
            NodeKind::Emphasis(kind) => self.render_emphasis(el, kind, out),
            NodeKind::InlineGraphic => self.render_inline_graphic(el, out),
            NodeKind::Unknown => {
                self.audit.record(AuditEvent::UnknownTag {
                    section: self.section,
                    tag: el.name.clone(),
                });
                if flow == Flow::Inline {
                    render_text(&el.text_content(), Flow::Inline, out);
                }
            }
        }
    }

    pub(crate) fn render_children(&mut self, el: &Element, flow: Flow, out: &mut String) {
        let id = el.attr("id");
        for node in &el.children {
            self.render_node(node, flow, id, out);
        }
    }

    /// Render the children as phrasing content and return it trimmed.
    pub(crate) fn inline_children(&mut self, el: &Element) -> String {
        let mut out = String::new();
        self.render_children(el, Flow::Inline, &mut out);
        out.trim().to_string()
    }

    pub(crate) fn missing(&mut self, parent: &Element, child: &'static str) {
        self.audit.record(AuditEvent::MissingChild {
            section: self.section,
            parent: parent.name.clone(),
            child,
        });
    }

    pub(crate) fn unresolved(&mut self, kind: ReferenceKind, target: &str) {
        self.audit.record(AuditEvent::UnresolvedReference {
            section: self.section,
            kind,
            target: target.to_string(),
        });
    }
}

// ---------------------------------------------------------------------------
// Text helpers
// ---------------------------------------------------------------------------

fn render_text(text: &str, flow: Flow, out: &mut String) {
    let collapsed = collapse_runs(text);
    if flow == Flow::Block && collapsed.trim().is_empty() {
        return;
    }
    out.push_str(&partial_escape(collapsed.as_str()));
}

/// Replace each whitespace run with one space, keeping a leading or trailing
/// space so adjacent inline elements stay separated.
fn collapse_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

fn has_content(el: &Element) -> bool {
    el.has_element_children() || !el.text_content().trim().is_empty()
}

/// `--` may not appear inside an HTML comment.
fn comment_safe(text: &str) -> String {
    text.replace("--", "- -")
}

pub(crate) fn attr_escape(value: &str) -> String {
    escape(value).into_owned()
}

pub(crate) fn text_escape(value: &str) -> String {
    partial_escape(value).into_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
