//! Structure-aware chunking of document markup.
//!
//! The [`StructuralChunker`] turns the final markup into a lazy sequence of
//! [`Chunk`]s, left to right, under one of two policies:
//! - [`ChunkPolicy::Balanced`]: cuts at tag-balanced boundaries with tiered
//!   length ceilings and a trailing overlap ([`balanced`])
//! - [`ChunkPolicy::PerSection`]: one chunk per top-level section, sliced
//!   when a section exceeds the maximum ([`sections`])

pub mod balanced;
pub mod sections;
pub mod stats;
pub mod tokens;

use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, instrument};

use manualkit_shared::{Chunk, ChunkPolicy, ChunkingConfig, Result};

pub use balanced::BalancedChunks;
pub use sections::SectionChunks;
pub use stats::ChunkStats;

/// Chunker bound to one validated configuration.
#[derive(Debug, Clone)]
pub struct StructuralChunker {
    config: ChunkingConfig,
}

impl StructuralChunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Lazy chunk sequence over `markup`. Calling this again recomputes the
    /// same sequence from the start.
    pub fn chunks<'a>(&self, markup: &'a str) -> Chunks<'a> {
        match self.config.policy {
            ChunkPolicy::Balanced => Chunks::Balanced(BalancedChunks::new(markup, &self.config)),
            ChunkPolicy::PerSection => {
                Chunks::PerSection(SectionChunks::new(markup, &self.config))
            }
        }
    }

    /// Collect every chunk of `markup`.
    #[instrument(skip_all, fields(policy = %self.config.policy, bytes = markup.len()))]
    pub fn chunk_all(&self, markup: &str) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = self.chunks(markup).collect();
        info!(count = chunks.len(), "chunking complete");
        chunks
    }
}

/// Chunk sequence of either policy.
#[derive(Debug, Clone)]
pub enum Chunks<'a> {
    Balanced(BalancedChunks<'a>),
    PerSection(SectionChunks<'a>),
}

impl Iterator for Chunks<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        match self {
            Chunks::Balanced(inner) => inner.next(),
            Chunks::PerSection(inner) => inner.next(),
        }
    }
}

/// Section number carried by an opening `<section ... id="sectionN">` tag.
pub(crate) fn section_number(tag: &str) -> Option<usize> {
    static SECTION_ID: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"\sid\s*=\s*"section(\d+)""#).expect("valid regex")
    });

    SECTION_ID
        .captures(tag)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
