//! Document-to-markup conversion for manualkit.
//!
//! The [`MarkupTransducer`] renders an assembled [`Document`] to HTML, keeping
//! callout and step numbering consistent across the whole manual. The
//! resulting markup can be wrapped as a standalone page ([`page`]) or exported
//! to Markdown ([`markdown`]).

pub mod assets;
pub mod audit;
pub mod index;
pub mod kind;
pub mod markdown;
pub mod page;
mod render;
pub mod state;

use tracing::instrument;

use manualkit_fragments::{CrossReferenceMap, Document};
use manualkit_shared::RenderConfig;

pub use assets::AssetRewriter;
pub use audit::{AuditEvent, AuditLog, AuditSink, ReferenceKind};
pub use index::CrossReferenceIndex;
pub use kind::{Emphasis, NodeKind};
pub use markdown::to_markdown;
pub use page::render_page;
pub use render::MarkupTransducer;
pub use state::EnumerationState;

/// Markup of a whole document plus what was audited while producing it.
#[derive(Debug)]
pub struct Transduced {
    pub markup: String,
    pub audit: AuditLog,
}

/// Index `document`, then render it with a fresh enumeration state.
#[instrument(skip_all, fields(sections = document.len(), xrefs = xrefs.len()))]
pub fn transduce(document: &Document, xrefs: CrossReferenceMap, config: &RenderConfig) -> Transduced {
    let index = CrossReferenceIndex::build(document, xrefs);
    let assets = AssetRewriter::from_config(config);
    let mut audit = AuditLog::new();
    let markup = MarkupTransducer::new(&index, &assets, &mut audit).render_document(document);
    audit.warn_summary();
    Transduced { markup, audit }
}
