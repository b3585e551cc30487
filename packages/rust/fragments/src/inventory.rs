//! Element name inventory over a fragment directory.
//!
//! Used to check a new corpus against the renderer vocabulary before a build.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{instrument, warn};

use manualkit_shared::{ManualKitError, Result};

use crate::xml;

/// Package manifests that sit next to the fragments but are not topics.
const SKIPPED_FILES: &[&str] = &["manifest.xml"];

/// Distinct element names with occurrence counts.
#[derive(Debug, Clone, Default)]
pub struct TagInventory {
    pub counts: BTreeMap<String, usize>,
    /// Number of fragments that parsed.
    pub files: usize,
    /// `file: error` for fragments that did not.
    pub failures: Vec<String>,
}

impl TagInventory {
    fn record(&mut self, root: &xml::Element) {
        *self.counts.entry(root.name.clone()).or_default() += 1;
        for el in root.descendants() {
            *self.counts.entry(el.name.clone()).or_default() += 1;
        }
    }
}

/// Scan every `*.xml` file directly inside `dir`.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub fn tag_inventory(dir: &Path) -> Result<TagInventory> {
    let entries = std::fs::read_dir(dir).map_err(|e| ManualKitError::io(dir, e))?;

    let mut paths: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "xml"))
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| !SKIPPED_FILES.contains(&n))
        })
        .collect();
    paths.sort();

    let mut inventory = TagInventory::default();
    for path in paths {
        let parsed = std::fs::read(&path)
            .map_err(|e| ManualKitError::io(&path, e))
            .and_then(|bytes| xml::parse_bytes(&bytes));
        match parsed {
            Ok(root) => {
                inventory.record(&root);
                inventory.files += 1;
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "could not inventory fragment");
                inventory.failures.push(format!("{}: {e}", path.display()));
            }
        }
    }
    Ok(inventory)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_elements_and_skips_manifest() {
        let dir = std::env::temp_dir().join(format!("mk-tags-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("a.xml"), "<task><title>A</title><p>x</p><p>y</p></task>").unwrap();
        std::fs::write(dir.join("b.xml"), "<task><p>z</p></task>").unwrap();
        std::fs::write(dir.join("manifest.xml"), "<manifest><entry/></manifest>").unwrap();
        std::fs::write(dir.join("broken.xml"), "<task>").unwrap();
        std::fs::write(dir.join("notes.txt"), "<ignored/>").unwrap();

        let inv = tag_inventory(&dir).unwrap();
        assert_eq!(inv.files, 2);
        assert_eq!(inv.counts.get("task"), Some(&2));
        assert_eq!(inv.counts.get("p"), Some(&3));
        assert_eq!(inv.counts.get("title"), Some(&1));
        assert!(!inv.counts.contains_key("manifest"));
        assert_eq!(inv.failures.len(), 1);
        assert!(inv.failures[0].contains("broken.xml"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_directory_is_an_error() {
        assert!(tag_inventory(Path::new("/definitely/not/here")).is_err());
    }
}
