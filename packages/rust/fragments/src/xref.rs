//! Cross-reference map: fragment file name to section anchor and title.
//!
//! Persisted as a `FileName,Link,Title` table so that a later run (a second
//! manual that links into this one) can resolve references without
//! re-assembling.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;

use manualkit_shared::{CrossRefRecord, ManualKitError, Result};

/// Label used when a reference target cannot be resolved.
pub const GENERIC_LABEL: &str = "Reference";

/// Where a fragment ended up in the assembled document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossRefEntry {
    /// Section anchor, e.g. `#section4`.
    pub anchor: String,
    /// Normalized fragment title.
    pub title: String,
}

impl CrossRefEntry {
    pub fn new(anchor: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            anchor: anchor.into(),
            title: title.into(),
        }
    }
}

/// File name keyed map that remembers insertion (document) order.
#[derive(Debug, Clone, Default)]
pub struct CrossReferenceMap {
    entries: Vec<(String, CrossRefEntry)>,
    index: HashMap<String, usize>,
}

impl CrossReferenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `file_name`.
    pub fn insert(&mut self, file_name: impl Into<String>, entry: CrossRefEntry) {
        let file_name = file_name.into();
        match self.index.get(&file_name) {
            Some(&slot) => self.entries[slot].1 = entry,
            None => {
                self.index.insert(file_name.clone(), self.entries.len());
                self.entries.push((file_name, entry));
            }
        }
    }

    pub fn get(&self, file_name: &str) -> Option<&CrossRefEntry> {
        self.index.get(file_name).map(|&slot| &self.entries[slot].1)
    }

    pub fn contains(&self, file_name: &str) -> bool {
        self.index.contains_key(file_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CrossRefEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    /// Resolve `file_name`, or fall back to the original reference text as
    /// the anchor with the generic label as title. Never fails.
    pub fn lookup_or_fallback(&self, file_name: &str, original: &str) -> CrossRefEntry {
        self.get(file_name)
            .cloned()
            .unwrap_or_else(|| CrossRefEntry::new(original, GENERIC_LABEL))
    }

    /// Add the entries of `other` that this map does not already have.
    /// Existing entries win.
    pub fn merge(&mut self, other: &CrossReferenceMap) {
        for (name, entry) in other.iter() {
            if !self.contains(name) {
                self.insert(name, entry.clone());
            }
        }
    }

    // -----------------------------------------------------------------------
    // Table I/O
    // -----------------------------------------------------------------------

    pub fn records(&self) -> Vec<CrossRefRecord> {
        self.iter()
            .map(|(name, entry)| CrossRefRecord {
                file_name: name.to_string(),
                link: entry.anchor.clone(),
                title: entry.title.clone(),
            })
            .collect()
    }

    pub fn from_records(records: impl IntoIterator<Item = CrossRefRecord>) -> Self {
        let mut map = Self::new();
        for record in records {
            map.insert(record.file_name, CrossRefEntry::new(record.link, record.title));
        }
        map
    }

    /// Read a `FileName,Link,Title` table.
    pub fn read_from(reader: impl Read) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let mut records = Vec::new();
        for row in rdr.deserialize::<CrossRefRecord>() {
            records.push(row.map_err(|e| ManualKitError::Table(e.to_string()))?);
        }
        Ok(Self::from_records(records))
    }

    /// Write the map as a `FileName,Link,Title` table.
    pub fn write_to(&self, writer: impl Write) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        for record in self.records() {
            wtr.serialize(&record)
                .map_err(|e| ManualKitError::Table(e.to_string()))?;
        }
        wtr.flush()
            .map_err(|e| ManualKitError::Table(e.to_string()))?;
        Ok(())
    }

    /// Load a pre-built table from disk. A missing table is fatal.
    pub fn read_table(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| ManualKitError::io(path, e))?;
        let map = Self::read_from(file)?;
        tracing::debug!(path = %path.display(), entries = map.len(), "loaded cross-reference table");
        Ok(map)
    }

    /// Render the table to a string.
    pub fn to_table_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        String::from_utf8(buf).map_err(|e| ManualKitError::Table(e.to_string()))
    }
}
