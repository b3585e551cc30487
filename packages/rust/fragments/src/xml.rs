//! Owned XML element tree and its `quick-xml` based parser.
//!
//! Fragments carry mixed content (`<p>Turn <b>off</b> the pump.</p>`), so
//! text is kept as sibling [`Node::Text`] entries rather than the text/tail
//! split of other tree models.

use quick_xml::Reader;
use quick_xml::escape::{escape, partial_escape, unescape};
use quick_xml::events::{BytesStart, Event};
use tracing::trace;

use manualkit_shared::{ManualKitError, Result};

/// A child of an element: either a nested element or a run of text.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// A parsed XML element with its attributes and children in document order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    /// Create an empty element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder: add an attribute.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Builder: append a child element.
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// Builder: append a text run.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Attribute value by name.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set or replace an attribute.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((key, value)),
        }
    }

    /// Direct element children.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        })
    }

    /// Direct element children with the given name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.elements().filter(move |el| el.name == name)
    }

    /// First direct child with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|el| el.name == name)
    }

    /// First descendant (depth-first, excluding `self`) with the given name.
    pub fn find(&self, name: &str) -> Option<&Element> {
        self.descendants().find(|el| el.name == name)
    }

    /// Mutable variant of [`Element::find`].
    pub fn find_mut(&mut self, name: &str) -> Option<&mut Element> {
        for node in &mut self.children {
            if let Node::Element(el) = node {
                if el.name == name {
                    return Some(el);
                }
                if let Some(found) = el.find_mut(name) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// All descendant elements in document order, excluding `self`.
    pub fn descendants(&self) -> Descendants<'_> {
        let mut stack: Vec<&Element> = self.elements().collect();
        stack.reverse();
        Descendants { stack }
    }

    /// Whether any direct child is an element.
    pub fn has_element_children(&self) -> bool {
        self.elements().next().is_some()
    }

    /// All text below this element, concatenated depth-first.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// Text content with every whitespace run collapsed to one space, trimmed.
    pub fn normalized_text(&self) -> String {
        collapse_whitespace(&self.text_content())
    }

    /// Replace all children with a single text run.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children = vec![Node::Text(text.into())];
    }

    /// Serialize back to XML.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        write_element(&mut out, self);
        out
    }
}

/// Depth-first pre-order iterator over descendant elements.
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let el = self.stack.pop()?;
        let start = self.stack.len();
        self.stack.extend(el.elements());
        self.stack[start..].reverse();
        Some(el)
    }
}

fn collect_text(el: &Element, out: &mut String) {
    for node in &el.children {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Element(child) => collect_text(child, out),
        }
    }
}

/// Collapse whitespace runs (including newlines) to single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse raw fragment bytes (UTF-8, optional BOM).
pub fn parse_bytes(bytes: &[u8]) -> Result<Element> {
    let content = std::str::from_utf8(strip_bom(bytes))
        .map_err(|e| ManualKitError::parse(format!("fragment is not UTF-8: {e}")))?;
    parse(content)
}

/// Parse an XML document into its root element.
pub fn parse(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(start_element(&e)?),
            Ok(Event::Empty(e)) => {
                let el = start_element(&e)?;
                attach(&mut stack, &mut root, el)?;
            }
            Ok(Event::End(_)) => {
                let el = stack
                    .pop()
                    .ok_or_else(|| ManualKitError::parse("closing tag without an open element"))?;
                attach(&mut stack, &mut root, el)?;
            }
            Ok(Event::Text(e)) => push_text(&mut stack, &String::from_utf8_lossy(e.as_ref())),
            Ok(Event::CData(e)) => {
                push_text(&mut stack, &String::from_utf8_lossy(&e.into_inner()));
            }
            Ok(Event::GeneralRef(e)) => {
                let name = String::from_utf8_lossy(e.as_ref()).into_owned();
                match resolve_entity(&name) {
                    Some(resolved) => push_text(&mut stack, &resolved),
                    None => {
                        // DTD-defined entities are not expanded; keep them visible.
                        trace!(entity = %name, "unresolved entity kept verbatim");
                        push_text(&mut stack, &format!("&{name};"));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ManualKitError::parse(format!(
                    "at byte {}: {e}",
                    reader.error_position()
                )));
            }
            // Declarations, comments, processing instructions, doctype.
            Ok(_) => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(ManualKitError::parse(format!(
            "unexpected end of document: <{}> is not closed",
            open.name
        )));
    }

    root.ok_or_else(|| ManualKitError::parse("document has no root element"))
}

fn start_element(e: &BytesStart<'_>) -> Result<Element> {
    let mut el = Element::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
    for attr in e.attributes() {
        let attr = attr.map_err(|err| {
            ManualKitError::parse(format!("malformed attribute on <{}>: {err}", el.name))
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attr.value).into_owned();
        let value = unescape(&raw).map(|v| v.into_owned()).unwrap_or(raw);
        el.attrs.push((key, value));
    }
    Ok(el)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, el: Element) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(el));
        return Ok(());
    }
    if root.is_some() {
        return Err(ManualKitError::parse(format!(
            "second root element <{}> after the document element",
            el.name
        )));
    }
    *root = Some(el);
    Ok(())
}

fn push_text(stack: &mut [Element], text: &str) {
    // Text outside the document element (whitespace around the root) is dropped.
    let Some(parent) = stack.last_mut() else {
        return;
    };
    if let Some(Node::Text(last)) = parent.children.last_mut() {
        last.push_str(text);
    } else {
        parent.children.push(Node::Text(text.to_string()));
    }
}

fn strip_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data)
}

/// Resolve the predefined XML entities and numeric character references.
fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        _ => {}
    }

    let code = if let Some(hex) = entity.strip_prefix("#x") {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        entity.strip_prefix('#')?.parse::<u32>().ok()?
    };
    char::from_u32(code).map(String::from)
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

/// Append the XML serialization of `el` to `out`.
pub fn write_element(out: &mut String, el: &Element) {
    out.push('<');
    out.push_str(&el.name);
    for (key, value) in &el.attrs {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape(value.as_str()));
        out.push('"');
    }
    if el.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for node in &el.children {
        match node {
            Node::Text(text) => out.push_str(&partial_escape(text.as_str())),
            Node::Element(child) => write_element(out, child),
        }
    }
    out.push_str("</");
    out.push_str(&el.name);
    out.push('>');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_content_in_order() {
        let root = parse("<p>Turn <b>off</b> the pump.</p>").unwrap();
        assert_eq!(root.name, "p");
        assert_eq!(root.children.len(), 3);
        assert_eq!(root.children[0], Node::Text("Turn ".into()));
        assert_eq!(root.text_content(), "Turn off the pump.");
    }

    #[test]
    fn parses_attributes_and_entities() {
        let root = parse(
            r#"<?xml version="1.0"?><topic id="t&amp;1"><title>A &lt;B&gt; &#x41;&#66;</title><graphic href="x.eps"/></topic>"#,
        )
        .unwrap();
        assert_eq!(root.attr("id"), Some("t&1"));
        assert_eq!(root.child("title").unwrap().text_content(), "A <B> AB");
        assert_eq!(root.find("graphic").unwrap().attr("href"), Some("x.eps"));
    }

    #[test]
    fn unknown_entities_are_kept_verbatim() {
        let root = parse("<p>a&nbsp;b</p>").unwrap();
        assert_eq!(root.text_content(), "a&nbsp;b");
    }

    #[test]
    fn rejects_mismatched_tags() {
        let err = parse("<topic><title>x</body></topic>").unwrap_err();
        assert!(err.to_string().starts_with("parse error"));
    }

    #[test]
    fn rejects_unclosed_document() {
        assert!(parse("<topic><title>x</title>").is_err());
    }

    #[test]
    fn rejects_empty_document() {
        assert!(parse("   ").is_err());
        assert!(parse_bytes(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn strips_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"<topic/>");
        assert_eq!(parse_bytes(&bytes).unwrap().name, "topic");
    }

    #[test]
    fn find_is_depth_first() {
        let root = parse(
            "<topic><body><group><title>Inner</title></group></body><title>Outer</title></topic>",
        )
        .unwrap();
        assert_eq!(root.find("title").unwrap().text_content(), "Inner");
        let names: Vec<&str> = root.descendants().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["body", "group", "title", "title"]);
    }

    #[test]
    fn normalized_text_collapses_newlines() {
        let root = parse("<title>\n  Replace\n  the <i>filter</i>\n</title>").unwrap();
        assert_eq!(root.normalized_text(), "Replace the filter");
    }

    #[test]
    fn serializes_with_escaping() {
        let el = Element::new("section")
            .with_attr("id", "section1")
            .with_attr("topic", "a\"b")
            .with_child(Element::new("title").with_text("Pumps & <valves>"))
            .with_child(Element::new("graphic"));
        assert_eq!(
            el.to_xml(),
            r#"<section id="section1" topic="a&quot;b"><title>Pumps &amp; &lt;valves&gt;</title><graphic/></section>"#
        );
        assert_eq!(parse(&el.to_xml()).unwrap(), el);
    }

    #[test]
    fn find_mut_allows_title_rewrite() {
        let mut root = parse("<topic><title>a<b>b</b></title></topic>").unwrap();
        root.find_mut("title").unwrap().set_text("ab");
        assert_eq!(root.to_xml(), "<topic><title>ab</title></topic>");
    }
}
