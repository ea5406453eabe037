//! Arena-based DOM used by the structural action executor and validator.
//!
//! Documents are built by an html5ever [`TreeSink`] straight into an
//! [`indextree::Arena`], queried by id and class, mutated in place, and then
//! written back out with [`crate::serialize`].

use html5ever::tree_builder::{ElemName, ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{Attribute, LocalName, QualName, parse_document};
use indexmap::IndexMap;
use indextree::{Arena, NodeId};
use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use tendril::{StrTendril, TendrilSink};

use crate::trace;

/// Parsed HTML document.
#[derive(Debug, Clone)]
pub struct Document {
    /// All nodes live here
    pub arena: Arena<NodeData>,

    /// Invisible document node (parent of `<html>` and any top-level comments)
    pub document: NodeId,

    /// Root element (usually `<html>`)
    pub root: NodeId,

    /// DOCTYPE name if present (usually "html")
    pub doctype: Option<StrTendril>,

    /// Number of recoverable parse errors html5ever reported
    pub parse_errors: usize,
}

/// What goes in each arena slot
#[derive(Debug, Clone)]
pub struct NodeData {
    pub kind: NodeKind,
    pub ns: Namespace,
}

/// Node types
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Document root (invisible, parent of `<html>`)
    Document,
    /// Element with tag and attributes
    Element(ElementData),
    /// Text content
    Text(StrTendril),
    /// HTML comment
    Comment(StrTendril),
}

/// Element data (tag + attributes)
#[derive(Debug, Clone)]
pub struct ElementData {
    pub tag: StrTendril,

    /// Keys are String to avoid clippy's mutable_key_type; IndexMap keeps source order
    pub attrs: IndexMap<String, StrTendril>,
}

impl ElementData {
    /// Whether the whitespace-separated `class` attribute contains `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.attrs
            .get("class")
            .is_some_and(|v| v.split_ascii_whitespace().any(|c| c == class))
    }
}

/// XML namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Html,
    Svg,
    MathMl,
}

impl Namespace {
    pub fn from_url(url: &str) -> Self {
        match url {
            "http://www.w3.org/2000/svg" => Namespace::Svg,
            "http://www.w3.org/1998/Math/MathML" => Namespace::MathMl,
            _ => Namespace::Html,
        }
    }

    pub fn url(&self) -> &'static str {
        match self {
            Namespace::Html => "http://www.w3.org/1999/xhtml",
            Namespace::Svg => "http://www.w3.org/2000/svg",
            Namespace::MathMl => "http://www.w3.org/1998/Math/MathML",
        }
    }
}

impl Document {
    pub fn get(&self, id: NodeId) -> &NodeData {
        self.arena[id].get()
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut NodeData {
        self.arena[id].get_mut()
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.arena)
    }

    /// Element data for `id`, or `None` for text, comments and the document node.
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.get(id).kind {
            NodeKind::Element(elem) => Some(elem),
            _ => None,
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_ref())
    }

    /// Get the `<body>` element if present
    pub fn body(&self) -> Option<NodeId> {
        self.child_with_tag(self.root, "body")
    }

    /// Get the `<head>` element if present
    pub fn head(&self) -> Option<NodeId> {
        self.child_with_tag(self.root, "head")
    }

    fn child_with_tag(&self, parent: NodeId, tag: &str) -> Option<NodeId> {
        parent
            .children(&self.arena)
            .find(|&id| self.tag(id) == Some(tag))
    }

    /// All elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.document
            .descendants(&self.arena)
            .filter(|&id| self.element(id).is_some())
    }

    /// First element whose `id` attribute equals `id`.
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.elements().find(|&node| {
            self.element(node)
                .and_then(|e| e.attrs.get("id"))
                .is_some_and(|v| v.as_ref() == id)
        })
    }

    /// Every element carrying `class`, in document order.
    pub fn elements_with_class(&self, class: &str) -> Vec<NodeId> {
        self.elements()
            .filter(|&node| self.element(node).is_some_and(|e| e.has_class(class)))
            .collect()
    }

    /// First descendant of `scope` (excluding `scope` itself) carrying `class`.
    pub fn first_with_class(&self, scope: NodeId, class: &str) -> Option<NodeId> {
        scope
            .descendants(&self.arena)
            .skip(1)
            .find(|&node| self.element(node).is_some_and(|e| e.has_class(class)))
    }

    /// First descendant of `scope` with the given tag name.
    pub fn first_with_tag(&self, scope: NodeId, tag: &str) -> Option<NodeId> {
        scope
            .descendants(&self.arena)
            .skip(1)
            .find(|&node| self.tag(node) == Some(tag))
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node in id.descendants(&self.arena) {
            if let NodeKind::Text(text) = &self.get(node).kind {
                out.push_str(text);
            }
        }
        out
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)
            .and_then(|e| e.attrs.get(name))
            .map(|v| v.as_ref())
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeKind::Element(elem) = &mut self.get_mut(id).kind {
            elem.attrs
                .insert(name.to_string(), StrTendril::from_slice(value));
        }
    }

    /// Add `class` to the element's class list unless already present.
    pub fn add_class(&mut self, id: NodeId, class: &str) {
        let Some(elem) = self.element(id) else {
            return;
        };
        if elem.has_class(class) {
            return;
        }
        let merged = match elem.attrs.get("class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim(), class),
            _ => class.to_string(),
        };
        self.set_attr(id, "class", &merged);
    }

    /// Create a detached HTML element.
    pub fn new_element(&mut self, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let attrs = attrs
            .iter()
            .map(|(k, v)| (k.to_string(), StrTendril::from_slice(v)))
            .collect();
        self.arena.new_node(NodeData {
            kind: NodeKind::Element(ElementData {
                tag: StrTendril::from_slice(tag),
                attrs,
            }),
            ns: Namespace::Html,
        })
    }

    /// Create a detached text node. The text is stored raw and escaped on output.
    pub fn new_text(&mut self, text: &str) -> NodeId {
        self.arena.new_node(NodeData {
            kind: NodeKind::Text(StrTendril::from_slice(text)),
            ns: Namespace::Html,
        })
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        parent.append(child, &mut self.arena);
    }

    /// Create an element with a single text child and append it to `parent`.
    pub fn append_text_element(
        &mut self,
        parent: NodeId,
        tag: &str,
        attrs: &[(&str, &str)],
        text: &str,
    ) -> NodeId {
        let elem = self.new_element(tag, attrs);
        let text = self.new_text(text);
        self.append_child(elem, text);
        self.append_child(parent, elem);
        elem
    }

    /// Unlink a node (and its subtree) from its parent, keeping it in the arena.
    pub fn detach(&mut self, id: NodeId) {
        id.detach(&mut self.arena);
    }

    /// Remove a node and its whole subtree.
    pub fn remove(&mut self, id: NodeId) {
        id.remove_subtree(&mut self.arena);
    }

    pub fn clear_children(&mut self, id: NodeId) {
        let children: Vec<NodeId> = id.children(&self.arena).collect();
        for child in children {
            child.remove_subtree(&mut self.arena);
        }
    }

    /// Replace all children of `id` with a single text node.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        self.clear_children(id);
        let text = self.new_text(text);
        self.append_child(id, text);
    }
}

/// Parse an HTML document into the arena.
pub fn parse(html: &str) -> Document {
    let sink = ArenaSink::new();
    parse_document(sink, Default::default()).one(StrTendril::from(html))
}

/// Owned element name wrapper
#[derive(Debug, Clone)]
pub struct OwnedElemName(QualName);

impl ElemName for OwnedElemName {
    fn ns(&self) -> &html5ever::Namespace {
        &self.0.ns
    }

    fn local_name(&self) -> &LocalName {
        &self.0.local
    }
}

/// TreeSink implementation for building the arena DOM
struct ArenaSink {
    arena: RefCell<Arena<NodeData>>,
    document: NodeId,
    doctype: RefCell<Option<StrTendril>>,
    errors: Cell<usize>,
}

impl ArenaSink {
    fn new() -> Self {
        let mut arena = Arena::new();
        let document = arena.new_node(NodeData {
            kind: NodeKind::Document,
            ns: Namespace::Html,
        });

        ArenaSink {
            arena: RefCell::new(arena),
            document,
            doctype: RefCell::new(None),
            errors: Cell::new(0),
        }
    }

    fn text_node(arena: &mut Arena<NodeData>, text: StrTendril) -> NodeId {
        arena.new_node(NodeData {
            kind: NodeKind::Text(text),
            ns: Namespace::Html,
        })
    }
}

impl TreeSink for ArenaSink {
    type Handle = NodeId;
    type Output = Document;
    type ElemName<'a>
        = OwnedElemName
    where
        Self: 'a;

    fn finish(self) -> Self::Output {
        let arena = self.arena.into_inner();

        let root = self
            .document
            .children(&arena)
            .find(|&id| matches!(arena[id].get().kind, NodeKind::Element(_)))
            .unwrap_or(self.document);

        Document {
            arena,
            document: self.document,
            root,
            doctype: self.doctype.into_inner(),
            parse_errors: self.errors.get(),
        }
    }

    fn parse_error(&self, msg: Cow<'static, str>) {
        trace!(%msg, "html5ever recovered from parse error");
        self.errors.set(self.errors.get() + 1);
    }

    fn get_document(&self) -> Self::Handle {
        self.document
    }

    fn set_quirks_mode(&self, _mode: QuirksMode) {}

    fn same_node(&self, a: &Self::Handle, b: &Self::Handle) -> bool {
        a == b
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> OwnedElemName {
        let arena = self.arena.borrow();
        let node = arena[*target].get();
        let local = match &node.kind {
            NodeKind::Element(elem) => LocalName::from(elem.tag.as_ref()),
            _ => LocalName::from(""),
        };
        OwnedElemName(QualName::new(
            None,
            html5ever::Namespace::from(node.ns.url()),
            local,
        ))
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Attribute>,
        _flags: ElementFlags,
    ) -> Self::Handle {
        let attrs = attrs
            .into_iter()
            .map(|attr| (attr.name.local.to_string(), attr.value))
            .collect();

        self.arena.borrow_mut().new_node(NodeData {
            kind: NodeKind::Element(ElementData {
                tag: StrTendril::from(name.local.as_ref()),
                attrs,
            }),
            ns: Namespace::from_url(name.ns.as_ref()),
        })
    }

    fn create_comment(&self, text: StrTendril) -> Self::Handle {
        self.arena.borrow_mut().new_node(NodeData {
            kind: NodeKind::Comment(text),
            ns: Namespace::Html,
        })
    }

    fn create_pi(&self, _target: StrTendril, _data: StrTendril) -> Self::Handle {
        self.arena.borrow_mut().new_node(NodeData {
            kind: NodeKind::Comment(StrTendril::new()),
            ns: Namespace::Html,
        })
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        let mut arena = self.arena.borrow_mut();
        match child {
            NodeOrText::AppendNode(node) => {
                parent.append(node, &mut arena);
            }
            NodeOrText::AppendText(text) => {
                // html5ever expects adjacent text to merge
                if let Some(last) = parent.children(&arena).next_back()
                    && let NodeKind::Text(existing) = &mut arena[last].get_mut().kind
                {
                    existing.push_tendril(&text);
                    return;
                }
                let node = Self::text_node(&mut arena, text);
                parent.append(node, &mut arena);
            }
        }
    }

    fn append_before_sibling(&self, sibling: &Self::Handle, new_node: NodeOrText<Self::Handle>) {
        let mut arena = self.arena.borrow_mut();
        match new_node {
            NodeOrText::AppendNode(node) => {
                sibling.insert_before(node, &mut arena);
            }
            NodeOrText::AppendText(text) => {
                let node = Self::text_node(&mut arena, text);
                sibling.insert_before(node, &mut arena);
            }
        }
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        let has_parent = self.arena.borrow()[*element].parent().is_some();
        if has_parent {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(
        &self,
        name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
        *self.doctype.borrow_mut() = Some(name);
    }

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        // template contents stay inline; no separate fragment
        *target
    }

    fn add_attrs_if_missing(&self, target: &Self::Handle, attrs: Vec<Attribute>) {
        let mut arena = self.arena.borrow_mut();
        if let NodeKind::Element(elem) = &mut arena[*target].get_mut().kind {
            for attr in attrs {
                elem.attrs
                    .entry(attr.name.local.to_string())
                    .or_insert(attr.value);
            }
        }
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        target.detach(&mut self.arena.borrow_mut());
    }

    fn reparent_children(&self, node: &Self::Handle, new_parent: &Self::Handle) {
        let mut arena = self.arena.borrow_mut();
        let children: Vec<NodeId> = node.children(&arena).collect();
        for child in children {
            child.detach(&mut arena);
            new_parent.append(child, &mut arena);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARDS: &str = r#"<!DOCTYPE html>
<html><head><title>Sale</title></head><body>
<div id="pricing-cards">
  <div class="pricing-card"><h3 class="plan-name">Basic</h3><div class="plan-price">$9</div></div>
  <div class="pricing-card recommended"><h3 class="plan-name">Pro</h3><div class="plan-price">$29</div></div>
</div>
</body></html>"#;

    #[test]
    fn parses_document_structure() {
        let doc = parse(CARDS);
        assert_eq!(doc.tag(doc.root), Some("html"));
        assert_eq!(doc.doctype.as_deref(), Some("html"));
        assert!(doc.head().is_some());
        assert!(doc.body().is_some());
    }

    #[test]
    fn finds_elements_by_id_and_class() {
        let doc = parse(CARDS);
        let container = doc.element_by_id("pricing-cards").expect("container");
        assert_eq!(doc.tag(container), Some("div"));

        let cards = doc.elements_with_class("pricing-card");
        assert_eq!(cards.len(), 2);
        let names: Vec<String> = cards
            .iter()
            .filter_map(|&c| doc.first_with_class(c, "plan-name"))
            .map(|n| doc.text_content(n))
            .collect();
        assert_eq!(names, ["Basic", "Pro"]);

        // whole-token match only
        assert!(doc.elements_with_class("pricing").is_empty());
    }

    #[test]
    fn set_text_content_replaces_children() {
        let mut doc = parse(CARDS);
        let card = doc.elements_with_class("pricing-card")[0];
        let price = doc.first_with_class(card, "plan-price").expect("price");
        doc.set_text_content(price, "FREE");
        assert_eq!(doc.text_content(price), "FREE");
        assert_eq!(doc.children(price).count(), 1);
    }

    #[test]
    fn add_class_is_idempotent() {
        let mut doc = parse(CARDS);
        let card = doc.elements_with_class("pricing-card")[0];
        doc.add_class(card, "selected");
        doc.add_class(card, "selected");
        assert_eq!(doc.attr(card, "class"), Some("pricing-card selected"));
    }

    #[test]
    fn counts_parse_errors() {
        let clean = parse("<!DOCTYPE html><html><head></head><body><p>ok</p></body></html>");
        assert_eq!(clean.parse_errors, 0);

        let messy = parse("<html><body><div></span></div></body></html>");
        assert!(messy.parse_errors > 0);
    }
}
