//! Interchange records shared across manualkit crates.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current schema version for the run manifest format.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one pipeline run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// CrossRefRecord
// ---------------------------------------------------------------------------

/// One row of the cross-reference table (`FileName,Link,Title`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossRefRecord {
    /// Fragment file name as referenced by `xref` targets.
    #[serde(rename = "FileName")]
    pub file_name: String,
    /// Anchor of the section the fragment became (`#section{n}`).
    #[serde(rename = "Link")]
    pub link: String,
    /// Normalized fragment title.
    #[serde(rename = "Title")]
    pub title: String,
}

// ---------------------------------------------------------------------------
// Chunk
// ---------------------------------------------------------------------------

/// A contiguous slice of final markup, ready for an embedding consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Number of the section the chunk starts in (0 for leading preamble).
    pub section: usize,
    /// Chunk text, including the carried-over overlap prefix.
    pub text: String,
    /// Byte length of the overlap prefix repeated from the previous chunk.
    #[serde(default)]
    pub overlap: usize,
}

impl Chunk {
    /// The part of the chunk that is not repeated from its predecessor.
    pub fn fresh_text(&self) -> &str {
        &self.text[self.overlap..]
    }

    /// Length of the chunk in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Whether the chunk carries no text at all.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

// ---------------------------------------------------------------------------
// RunManifest
// ---------------------------------------------------------------------------

/// Metadata for a single artifact file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactMeta {
    pub filename: String,
    pub sha256: String,
    pub size_bytes: usize,
}

/// The `manifest.json` structure written at the root of each output directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    /// Schema version for forward compatibility.
    pub schema_version: u32,
    /// Unique identifier for this run.
    pub id: RunId,
    /// Tool version that produced the artifacts.
    pub tool_version: String,
    /// When the run finished.
    pub created_at: DateTime<Utc>,
    /// Directory the fragments were read from.
    pub source_dir: String,
    /// Number of fragment references in the order list.
    pub fragment_count: usize,
    /// Number of sections that made it into the document.
    pub section_count: usize,
    /// Fragment files that could not be read or parsed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fragment_errors: Vec<String>,
    /// Chunking policy used.
    pub chunk_policy: String,
    /// Number of chunks emitted.
    pub chunk_count: usize,
    /// Element names without a renderer, with occurrence counts.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub skipped_tags: BTreeMap<String, usize>,
    /// Written artifacts with checksums.
    #[serde(default)]
    pub artifacts: Vec<ArtifactMeta>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_roundtrip() {
        let id = RunId::new();
        let s = id.to_string();
        let parsed: RunId = s.parse().expect("parse RunId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn cross_ref_record_uses_table_headers() {
        let record = CrossRefRecord {
            file_name: "0000136007.xml".into(),
            link: "#section4".into(),
            title: "Replace the filter".into(),
        };
        let json = serde_json::to_string(&record).expect("serialize");
        assert!(json.contains("\"FileName\":\"0000136007.xml\""));
        assert!(json.contains("\"Link\":\"#section4\""));
        assert!(json.contains("\"Title\""));
    }

    #[test]
    fn chunk_fresh_text_skips_overlap() {
        let chunk = Chunk {
            section: 2,
            text: "tail of before<p>new text</p>".into(),
            overlap: "tail of before".len(),
        };
        assert_eq!(chunk.fresh_text(), "<p>new text</p>");
        assert_eq!(chunk.len(), 29);
        assert!(!chunk.is_empty());
    }

    #[test]
    fn chunk_deserializes_without_overlap_field() {
        let chunk: Chunk =
            serde_json::from_str(r#"{"section":1,"text":"<p>x</p>"}"#).expect("deserialize");
        assert_eq!(chunk.overlap, 0);
        assert_eq!(chunk.fresh_text(), "<p>x</p>");
    }

    #[test]
    fn manifest_serialization() {
        let manifest = RunManifest {
            schema_version: CURRENT_SCHEMA_VERSION,
            id: RunId::new(),
            tool_version: "0.1.0".into(),
            created_at: Utc::now(),
            source_dir: "/data/xml".into(),
            fragment_count: 3,
            section_count: 2,
            fragment_errors: vec!["bad.xml: unexpected end of file".into()],
            chunk_policy: "balanced".into(),
            chunk_count: 7,
            skipped_tags: BTreeMap::from([("fig".to_string(), 2)]),
            artifacts: vec![],
        };

        let json = serde_json::to_string_pretty(&manifest).expect("serialize");
        let parsed: RunManifest = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(parsed.section_count, 2);
        assert_eq!(parsed.skipped_tags.get("fig"), Some(&2));
    }
}
