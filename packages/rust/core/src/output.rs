//! Output directory writer.
//!
//! Writes the artifacts of one build run and the `manifest.json` that lists
//! them with their checksums.
//!
//! ```text
//! <output>/
//! ├── manifest.json
//! ├── merged.xml
//! ├── mapping.csv
//! ├── document.html
//! ├── document.md
//! └── chunks.jsonl
//! ```

use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use manualkit_shared::{
    ArtifactMeta, CURRENT_SCHEMA_VERSION, Chunk, ManualKitError, Result, RunManifest,
};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const MERGED_XML_FILE: &str = "merged.xml";
pub const MAPPING_FILE: &str = "mapping.csv";
pub const HTML_FILE: &str = "document.html";
pub const MARKDOWN_FILE: &str = "document.md";
pub const CHUNKS_FILE: &str = "chunks.jsonl";

/// Write artifact files into `dir`, creating it when needed.
///
/// Each entry in `artifacts` is a `(filename, content)` pair. Every file is
/// written to a temp name first and then renamed into place.
#[instrument(skip_all, fields(dir = %dir.display(), artifact_count = artifacts.len()))]
pub fn write_artifacts(dir: &Path, artifacts: &[(&str, &str)]) -> Result<Vec<ArtifactMeta>> {
    std::fs::create_dir_all(dir).map_err(|e| ManualKitError::io(dir, e))?;

    let mut metas = Vec::with_capacity(artifacts.len());

    for (filename, content) in artifacts {
        let target = dir.join(filename);
        let temp = dir.join(format!(".{filename}.tmp"));

        std::fs::write(&temp, content).map_err(|e| ManualKitError::io(&temp, e))?;
        std::fs::rename(&temp, &target).map_err(|e| ManualKitError::io(&target, e))?;

        debug!(file = %filename, size = content.len(), "wrote artifact");

        metas.push(ArtifactMeta {
            filename: (*filename).to_string(),
            sha256: sha256_hex(content.as_bytes()),
            size_bytes: content.len(),
        });
    }

    info!(count = metas.len(), "artifacts written");
    Ok(metas)
}

/// Write `manifest.json` into `dir`.
pub fn write_manifest(dir: &Path, manifest: &RunManifest) -> Result<()> {
    write_json(&dir.join(MANIFEST_FILE), manifest)
}

/// Read back the manifest of an output directory and check its schema.
pub fn read_manifest(dir: &Path) -> Result<RunManifest> {
    let path = dir.join(MANIFEST_FILE);
    if !path.exists() {
        return Err(ManualKitError::validation(format!(
            "missing {MANIFEST_FILE} in {}",
            dir.display()
        )));
    }

    let content = std::fs::read_to_string(&path).map_err(|e| ManualKitError::io(&path, e))?;
    let manifest: RunManifest = serde_json::from_str(&content)
        .map_err(|e| ManualKitError::validation(format!("invalid {MANIFEST_FILE}: {e}")))?;

    if manifest.schema_version != CURRENT_SCHEMA_VERSION {
        return Err(ManualKitError::validation(format!(
            "unsupported schema_version: {} (expected {})",
            manifest.schema_version, CURRENT_SCHEMA_VERSION
        )));
    }
    Ok(manifest)
}

/// One JSON object per line: `{"section":N,"text":…,"overlap":K}`.
pub fn chunks_to_jsonl(chunks: &[Chunk]) -> Result<String> {
    let mut out = String::new();
    for chunk in chunks {
        let line = serde_json::to_string(chunk)
            .map_err(|e| ManualKitError::validation(format!("chunk serialization failed: {e}")))?;
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Write a JSON file (pretty-printed).
fn write_json<T: serde::Serialize>(path: &Path, data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| ManualKitError::validation(format!("JSON serialization failed: {e}")))?;
    std::fs::write(path, json).map_err(|e| ManualKitError::io(path, e))?;
    debug!(path = %path.display(), "wrote JSON file");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    use manualkit_shared::RunId;

    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("mk-output-test-{}", uuid::Uuid::now_v7()))
    }

    fn manifest(artifacts: Vec<ArtifactMeta>) -> RunManifest {
        RunManifest {
            schema_version: CURRENT_SCHEMA_VERSION,
            id: RunId::new(),
            tool_version: "0.1.0-test".into(),
            created_at: chrono::Utc::now(),
            source_dir: "fixtures/xml".into(),
            fragment_count: 3,
            section_count: 2,
            fragment_errors: vec![],
            chunk_policy: "balanced".into(),
            chunk_count: 4,
            skipped_tags: BTreeMap::new(),
            artifacts,
        }
    }

    #[test]
    fn write_artifacts_creates_dir_and_checksums() {
        let tmp = temp_dir();
        let metas = write_artifacts(
            &tmp,
            &[("merged.xml", "<topic/>"), ("mapping.csv", "FileName,Link,Title\n")],
        )
        .unwrap();

        assert_eq!(metas.len(), 2);
        assert_eq!(metas[0].filename, "merged.xml");
        assert_eq!(metas[0].sha256.len(), 64);
        assert_eq!(metas[0].sha256, sha256_hex(b"<topic/>"));
        assert_eq!(metas[1].size_bytes, 20);
        assert_eq!(
            std::fs::read_to_string(tmp.join("merged.xml")).unwrap(),
            "<topic/>"
        );

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn write_artifacts_leaves_no_temp_files() {
        let tmp = temp_dir();
        write_artifacts(&tmp, &[("document.md", "# Pump\n")]).unwrap();

        for entry in std::fs::read_dir(&tmp).unwrap() {
            let name = entry.unwrap().file_name().to_string_lossy().to_string();
            assert!(!name.starts_with('.'), "temp file left behind: {name}");
        }

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn manifest_roundtrip_through_directory() {
        let tmp = temp_dir();
        let metas = write_artifacts(&tmp, &[("chunks.jsonl", "")]).unwrap();
        write_manifest(&tmp, &manifest(metas)).unwrap();

        let read = read_manifest(&tmp).unwrap();
        assert_eq!(read.section_count, 2);
        assert_eq!(read.artifacts.len(), 1);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn read_manifest_rejects_missing_and_unknown_schema() {
        let tmp = temp_dir();
        std::fs::create_dir_all(&tmp).unwrap();
        let err = read_manifest(&tmp).unwrap_err();
        assert!(err.to_string().contains("missing manifest.json"));

        let mut future = manifest(vec![]);
        future.schema_version = CURRENT_SCHEMA_VERSION + 1;
        write_manifest(&tmp, &future).unwrap();
        let err = read_manifest(&tmp).unwrap_err();
        assert!(err.to_string().contains("unsupported schema_version"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn chunks_serialize_one_per_line() {
        let chunks = vec![
            Chunk {
                section: 1,
                text: "<p>a</p>".into(),
                overlap: 0,
            },
            Chunk {
                section: 3,
                text: "a</p><p>b</p>".into(),
                overlap: 5,
            },
        ];
        let jsonl = chunks_to_jsonl(&chunks).unwrap();
        let lines: Vec<&str> = jsonl.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"section":1,"text":"<p>a</p>","overlap":0}"#);
        let back: Chunk = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(back.fresh_text(), "<p>b</p>");
    }
}
