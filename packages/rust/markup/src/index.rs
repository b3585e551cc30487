//! Lookup tables built once per document before transduction.

use std::collections::HashMap;

use manualkit_fragments::{CrossReferenceMap, Document, Element};

/// Everything the renderers resolve references against.
#[derive(Debug, Clone, Default)]
pub struct CrossReferenceIndex {
    xrefs: CrossReferenceMap,
    /// Element id to title, for every element that has both.
    titled: HashMap<String, String>,
    /// Callout id to its description text.
    callouts: HashMap<String, String>,
}

impl CrossReferenceIndex {
    /// Index `document`, resolving file references through `xrefs`.
    pub fn build(document: &Document, xrefs: CrossReferenceMap) -> Self {
        let mut index = Self {
            xrefs,
            ..Self::default()
        };
        for section in &document.sections {
            index.titled.insert(section.id.clone(), section.title.clone());
            index.visit(&section.root);
            for el in section.root.descendants() {
                index.visit(el);
            }
        }
        tracing::debug!(
            titled = index.titled.len(),
            callouts = index.callouts.len(),
            "built cross-reference index"
        );
        index
    }

    fn visit(&mut self, el: &Element) {
        let Some(id) = el.attr("id") else {
            return;
        };
        if let Some(title) = el.child("title") {
            self.titled
                .entry(id.to_string())
                .or_insert_with(|| title.normalized_text());
        }
        if el.name == "pli" && el.attr("prev") != Some("pliref") {
            let description = el
                .child("postxt")
                .map(Element::normalized_text)
                .unwrap_or_default();
            self.callouts.entry(id.to_string()).or_insert(description);
        }
    }

    pub fn xrefs(&self) -> &CrossReferenceMap {
        &self.xrefs
    }

    /// Title of the element with this id.
    pub fn title_of(&self, id: &str) -> Option<&str> {
        self.titled.get(id).map(String::as_str)
    }

    /// Description of the callout with this id, when it has one.
    pub fn callout_description(&self, id: &str) -> Option<&str> {
        self.callouts
            .get(id)
            .map(String::as_str)
            .filter(|d| !d.is_empty())
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use manualkit_fragments::{FragmentAssembler, MemorySource, parse_order_list};

    fn document() -> Document {
        let xml = r##"<task id="t1"><title>Filter</title><body>
            <group id="g1"><title>Remove the   cover</title></group>
            <illustration><graphic href="f.eps"/><poslist><poscol>
              <pli id="p1"><postxt>Cover
                 screw</postxt></pli>
              <pli id="p2"/>
              <pli id="p3" prev="pliref" ref="#p1"><postxt>Again</postxt></pli>
            </poscol></poslist></illustration>
        </body></task>"##;
        let source = MemorySource::new().with("a.xml", xml);
        FragmentAssembler::new(source)
            .assemble(&parse_order_list("a"))
            .document
    }

    #[test]
    fn indexes_titles_and_callouts() {
        let index = CrossReferenceIndex::build(&document(), CrossReferenceMap::new());
        assert_eq!(index.title_of("t1"), Some("Filter"));
        assert_eq!(index.title_of("section1"), Some("Filter"));
        assert_eq!(index.title_of("g1"), Some("Remove the cover"));
        assert_eq!(index.callout_description("p1"), Some("Cover screw"));
        assert_eq!(index.callout_description("p2"), None);
        assert_eq!(index.callout_description("p3"), None);
    }
}
