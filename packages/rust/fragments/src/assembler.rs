//! Fragment assembly.
//!
//! Takes the ordered fragment references, parses every fragment and wraps it
//! as a numbered [`Section`] of one [`Document`], recording where each
//! fragment landed in a [`CrossReferenceMap`]. A fragment that cannot be read
//! or parsed is reported in [`AssembleResult::errors`] and skipped; assembly
//! itself never fails.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use manualkit_shared::{ManualKitError, Result};

use crate::order::FragmentRef;
use crate::xml::{self, Element, Node};
use crate::xref::{CrossRefEntry, CrossReferenceMap};

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Where raw fragment bytes come from.
pub trait FragmentSource {
    /// Read the raw bytes of one fragment.
    fn read(&self, file_name: &str) -> Result<Vec<u8>>;
}

/// Fragments stored as files below a root directory.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    /// Open a source root. A missing root directory is fatal.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(ManualKitError::validation(format!(
                "fragment directory {} does not exist",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FragmentSource for DirSource {
    fn read(&self, file_name: &str) -> Result<Vec<u8>> {
        let path = self.root.join(file_name);
        std::fs::read(&path).map_err(|e| ManualKitError::io(path, e))
    }
}

/// In-memory fragments, keyed by file name.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a fragment.
    pub fn with(mut self, file_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(file_name, content);
        self
    }

    pub fn insert(&mut self, file_name: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.files.insert(file_name.into(), content.into());
    }
}

impl FragmentSource for MemorySource {
    fn read(&self, file_name: &str) -> Result<Vec<u8>> {
        self.files.get(file_name).cloned().ok_or_else(|| {
            ManualKitError::io(
                file_name,
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such fragment"),
            )
        })
    }
}

// ---------------------------------------------------------------------------
// Document model
// ---------------------------------------------------------------------------

/// One fragment wrapped as a numbered section.
#[derive(Debug, Clone)]
pub struct Section {
    /// Section number (the fragment's position in the order list).
    pub number: usize,
    /// Anchor id, `section{number}`.
    pub id: String,
    /// `id` attribute of the fragment root, empty when absent.
    pub topic_id: String,
    /// Fragment file name.
    pub file_name: String,
    /// Normalized title text.
    pub title: String,
    /// The parsed fragment root.
    pub root: Element,
}

impl Section {
    /// `#section{n}`.
    pub fn anchor(&self) -> String {
        format!("#{}", self.id)
    }
}

/// The assembled manual: sections in input order.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub sections: Vec<Section>,
}

impl Document {
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// The merged tree: `<topic>` holding one `<section>` per fragment with
    /// the fragment root's children moved inside.
    pub fn to_element(&self) -> Element {
        let mut topic = Element::new("topic");
        for section in &self.sections {
            let mut wrapper = Element::new("section")
                .with_attr("id", section.id.as_str())
                .with_attr("topic", section.topic_id.as_str());
            wrapper.children = section.root.children.clone();
            topic.children.push(Node::Element(wrapper));
        }
        topic
    }

    /// Serialize the merged tree, with an XML declaration.
    pub fn to_xml(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
        xml::write_element(&mut out, &self.to_element());
        out.push('\n');
        out
    }
}

/// A fragment that was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentError {
    pub position: usize,
    pub file_name: String,
    pub message: String,
}

impl std::fmt::Display for FragmentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (#{}): {}", self.file_name, self.position, self.message)
    }
}

/// Output of [`FragmentAssembler::assemble`].
#[derive(Debug, Clone, Default)]
pub struct AssembleResult {
    pub document: Document,
    pub xrefs: CrossReferenceMap,
    pub errors: Vec<FragmentError>,
}

// ---------------------------------------------------------------------------
// Assembler
// ---------------------------------------------------------------------------

/// Builds a [`Document`] from ordered fragments of a [`FragmentSource`].
pub struct FragmentAssembler<S> {
    source: S,
}

impl<S: FragmentSource> FragmentAssembler<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Assemble the fragments in order. Per-fragment failures are collected,
    /// never propagated.
    #[instrument(skip_all, fields(fragments = refs.len()))]
    pub fn assemble(&self, refs: &[FragmentRef]) -> AssembleResult {
        let mut result = AssembleResult::default();

        for fragment in refs {
            match self.load(fragment) {
                Ok(section) => {
                    debug!(
                        file = %section.file_name,
                        section = section.number,
                        title = %section.title,
                        "assembled fragment"
                    );
                    result.xrefs.insert(
                        section.file_name.clone(),
                        CrossRefEntry::new(section.anchor(), section.title.clone()),
                    );
                    result.document.sections.push(section);
                }
                Err(e) => {
                    warn!(file = %fragment.file_name, position = fragment.position, error = %e, "skipping fragment");
                    result.errors.push(FragmentError {
                        position: fragment.position,
                        file_name: fragment.file_name.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            sections = result.document.len(),
            errors = result.errors.len(),
            "assembly complete"
        );
        result
    }

    fn load(&self, fragment: &FragmentRef) -> Result<Section> {
        let bytes = self.source.read(&fragment.file_name)?;
        let mut root = xml::parse_bytes(&bytes)?;

        let topic_id = root.attr("id").unwrap_or_default().to_string();
        let title = normalize_title(&mut root);

        Ok(Section {
            number: fragment.position,
            id: format!("section{}", fragment.position),
            topic_id,
            file_name: fragment.file_name.clone(),
            title,
            root,
        })
    }
}

/// Collapse the first `title` below `root` to its plain text, in place, and
/// return that text.
fn normalize_title(root: &mut Element) -> String {
    match root.find_mut("title") {
        Some(title) => {
            let text = title.normalized_text();
            title.set_text(text.as_str());
            text
        }
        None => String::new(),
    }
}
