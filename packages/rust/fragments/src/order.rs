//! Fragment order list reading.
//!
//! The order list is a plain text file with one fragment identifier per line.
//! Lines may also carry a markup link (`<a href="0000136007.xml#x">`), as
//! exported from the spreadsheet the manual structure is maintained in.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use manualkit_shared::{ManualKitError, Result};

/// `href` targets that point at an XML fragment.
static XML_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"href="([^"]+\.xml)[^"]*""#).expect("valid regex")
});

/// One entry of the fragment order list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentRef {
    /// 1-based position in the list; becomes the section number.
    pub position: usize,
    /// Fragment file name relative to the source root.
    pub file_name: String,
}

impl FragmentRef {
    pub fn new(position: usize, file_name: impl Into<String>) -> Self {
        Self {
            position,
            file_name: file_name.into(),
        }
    }
}

/// Parse an order list. Blank lines and `#` comments are skipped and do not
/// consume a position.
pub fn parse_order_list(text: &str) -> Vec<FragmentRef> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| extract_xml_link(line).unwrap_or_else(|| line.to_string()))
        .map(|name| {
            if name.ends_with(".xml") {
                name
            } else {
                format!("{name}.xml")
            }
        })
        .enumerate()
        .map(|(i, name)| FragmentRef::new(i + 1, name))
        .collect()
}

/// Read and parse an order list file. A missing or unreadable list is fatal.
pub fn read_order_list(path: &Path) -> Result<Vec<FragmentRef>> {
    let text = std::fs::read_to_string(path).map_err(|e| ManualKitError::io(path, e))?;
    let refs = parse_order_list(&text);
    if refs.is_empty() {
        return Err(ManualKitError::validation(format!(
            "order list {} names no fragments",
            path.display()
        )));
    }
    tracing::debug!(path = %path.display(), count = refs.len(), "read order list");
    Ok(refs)
}

/// Extract the first `href="….xml"` target from a line of markup.
pub fn extract_xml_link(content: &str) -> Option<String> {
    XML_LINK
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
