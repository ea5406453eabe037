//! HTML5 serializer for the arena DOM.
//!
//! Follows HTML5 serialization rules:
//!
//! - Void elements never get end tags
//! - Text content is escaped
//! - Attribute values are escaped and double-quoted
//! - Raw text elements (script, style) are not escaped
//! - RCDATA elements (title, textarea) escape only `&` and `<`
//! - Foreign content (SVG/MathML) uses self-closing syntax when empty

use crate::dom::{Document, ElementData, Namespace, NodeKind};
use indextree::NodeId;
use std::fmt::Write;

/// Options for HTML serialization.
#[derive(Clone, Debug)]
pub struct SerializeOptions {
    /// Sort attributes alphabetically instead of keeping source order (default: false).
    pub sort_attributes: bool,
    /// Escape `</script` sequences in script content (default: true)
    pub escape_script_end_tags: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            sort_attributes: false,
            escape_script_end_tags: true,
        }
    }
}

impl SerializeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable sorting attributes alphabetically for deterministic output.
    pub fn sort_attributes(mut self) -> Self {
        self.sort_attributes = true;
        self
    }

    /// Disable escaping `</script` in script content.
    pub fn no_escape_script_end_tags(mut self) -> Self {
        self.escape_script_end_tags = false;
        self
    }
}

/// Serialize a full document: `<!DOCTYPE …>`, a newline, then every top-level node.
pub fn serialize_document(doc: &Document, opts: &SerializeOptions) -> String {
    let mut out = String::new();
    let mut ser = Serializer::new(&mut out, doc, opts);
    ser.write_document();
    out
}

/// Serialize a single node and its subtree.
pub fn serialize_node(doc: &Document, node: NodeId, opts: &SerializeOptions) -> String {
    let mut out = String::new();
    let mut ser = Serializer::new(&mut out, doc, opts);
    ser.write_node(node);
    out
}

/// HTML5 void elements - these never have end tags.
pub(crate) const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Raw text elements - content is not escaped.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// RCDATA elements - only `&` and `<` are escaped.
const RCDATA_ELEMENTS: &[&str] = &["title", "textarea"];

pub(crate) fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag.to_ascii_lowercase().as_str())
}

fn is_raw_text_element(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&tag.to_ascii_lowercase().as_str())
}

fn is_rcdata_element(tag: &str) -> bool {
    RCDATA_ELEMENTS.contains(&tag.to_ascii_lowercase().as_str())
}

struct Serializer<'a, W: Write> {
    out: &'a mut W,
    doc: &'a Document,
    options: &'a SerializeOptions,
}

impl<'a, W: Write> Serializer<'a, W> {
    fn new(out: &'a mut W, doc: &'a Document, options: &'a SerializeOptions) -> Self {
        Self { out, doc, options }
    }

    fn write_text_escaped(&mut self, text: &str) {
        for c in text.chars() {
            let _ = match c {
                '&' => self.out.write_str("&amp;"),
                '<' => self.out.write_str("&lt;"),
                '>' => self.out.write_str("&gt;"),
                '\u{a0}' => self.out.write_str("&nbsp;"),
                _ => self.out.write_char(c),
            };
        }
    }

    fn write_rcdata_escaped(&mut self, text: &str) {
        for c in text.chars() {
            let _ = match c {
                '&' => self.out.write_str("&amp;"),
                '<' => self.out.write_str("&lt;"),
                _ => self.out.write_char(c),
            };
        }
    }

    fn write_raw_text(&mut self, text: &str, tag: &str) {
        if self.options.escape_script_end_tags && tag.eq_ignore_ascii_case("script") {
            // byte-level ASCII match so indices stay aligned with `text`
            const PATTERN: &[u8] = b"</script";
            let bytes = text.as_bytes();
            let mut last_end = 0;
            let mut i = 0;
            while i + PATTERN.len() <= bytes.len() {
                if bytes[i..i + PATTERN.len()].eq_ignore_ascii_case(PATTERN) {
                    let _ = self.out.write_str(&text[last_end..i]);
                    let _ = self.out.write_str("<\\/script");
                    last_end = i + PATTERN.len();
                    i = last_end;
                } else {
                    i += 1;
                }
            }
            let _ = self.out.write_str(&text[last_end..]);
        } else {
            let _ = self.out.write_str(text);
        }
    }

    fn write_attr_value_escaped(&mut self, text: &str) {
        for c in text.chars() {
            let _ = match c {
                '&' => self.out.write_str("&amp;"),
                '"' => self.out.write_str("&quot;"),
                '\u{a0}' => self.out.write_str("&nbsp;"),
                _ => self.out.write_char(c),
            };
        }
    }

    fn write_attr(&mut self, name: &str, value: &str) {
        let _ = write!(self.out, " {}=\"", name);
        self.write_attr_value_escaped(value);
        let _ = self.out.write_char('"');
    }

    fn write_document(&mut self) {
        let doc = self.doc;
        if let Some(doctype) = &doc.doctype {
            let _ = writeln!(self.out, "<!DOCTYPE {}>", doctype);
        }
        for child in doc.children(doc.document) {
            self.write_node(child);
        }
    }

    fn write_node(&mut self, node: NodeId) {
        let doc = self.doc;
        match &doc.get(node).kind {
            NodeKind::Document => {
                for child in doc.children(node) {
                    self.write_node(child);
                }
            }
            NodeKind::Element(elem) => self.write_element(node, elem),
            NodeKind::Text(text) => self.write_text_escaped(text),
            NodeKind::Comment(text) => {
                let safe_text = text.replace("--", "- -");
                let _ = write!(self.out, "<!--{}-->", safe_text);
            }
        }
    }

    fn write_element(&mut self, node: NodeId, elem: &ElementData) {
        let doc = self.doc;
        let tag = elem.tag.as_ref();
        let is_foreign = doc.get(node).ns != Namespace::Html;

        let _ = write!(self.out, "<{}", tag);

        if self.options.sort_attributes {
            let mut attrs: Vec<_> = elem.attrs.iter().collect();
            attrs.sort_by_key(|(k, _)| *k);
            for (name, value) in attrs {
                self.write_attr(name, value);
            }
        } else {
            for (name, value) in &elem.attrs {
                self.write_attr(name, value);
            }
        }

        if is_void_element(tag) && !is_foreign {
            let _ = self.out.write_char('>');
            return;
        }

        if is_foreign && doc.children(node).next().is_none() {
            let _ = self.out.write_str("/>");
            return;
        }

        let _ = self.out.write_char('>');

        let raw = is_raw_text_element(tag);
        let rcdata = is_rcdata_element(tag);
        for child in doc.children(node) {
            match &doc.get(child).kind {
                NodeKind::Text(text) if raw => self.write_raw_text(text, tag),
                NodeKind::Text(text) if rcdata => self.write_rcdata_escaped(text),
                _ => self.write_node(child),
            }
        }

        let _ = write!(self.out, "</{}>", tag);
    }
}

impl Document {
    /// Serialize with default options.
    pub fn to_html(&self) -> String {
        serialize_document(self, &SerializeOptions::default())
    }

    pub fn to_html_with_options(&self, opts: &SerializeOptions) -> String {
        serialize_document(self, opts)
    }
}
