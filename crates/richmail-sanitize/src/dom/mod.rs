//! Arena-backed HTML document.
//!
//! Nodes live in a single `Vec` and are addressed by [`NodeId`]. Detaching a
//! node never frees its slot, so an id stays a stable identity for the
//! lifetime of the document even after the node leaves the tree. This is
//! what lets the safe-region tracker and the editor's selection model key
//! their bookkeeping on plain indices.

mod parse;
mod serialize;

pub use serialize::{VOID_ELEMENTS, escape_attr, escape_text};

/// Identity of a node inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Returns the arena index of this node.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A single element attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name (lowercase, prefixed as `prefix:local` when namespaced).
    pub name: String,
    /// Attribute value.
    pub value: String,
}

/// Element payload: tag name and attributes in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Lowercase local tag name.
    pub name: String,
    /// Attributes in source order.
    pub attrs: Vec<Attribute>,
}

impl Element {
    /// Creates an element with no attributes.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_lowercase(),
            attrs: Vec::new(),
        }
    }

    /// Returns the value of an attribute.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.value.as_str())
    }

    /// Returns `true` if the attribute is present.
    #[must_use]
    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// Sets an attribute, replacing any existing value.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(existing) = self
            .attrs
            .iter_mut()
            .find(|a| a.name.eq_ignore_ascii_case(name))
        {
            existing.value = value;
        } else {
            self.attrs.push(Attribute {
                name: name.to_ascii_lowercase(),
                value,
            });
        }
    }

    /// Removes an attribute, returning its previous value.
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let pos = self
            .attrs
            .iter()
            .position(|a| a.name.eq_ignore_ascii_case(name))?;
        Some(self.attrs.remove(pos).value)
    }
}

/// The payload of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    /// The document root.
    Document,
    /// A `<!DOCTYPE>` declaration.
    Doctype(String),
    /// An element.
    Element(Element),
    /// A text node.
    Text(String),
    /// A comment.
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An HTML document stored as an arena of nodes.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates a document containing only the root node.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                data: NodeData::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Creates an empty `<html><head></head><body></body></html>` document.
    #[must_use]
    pub fn skeleton() -> Self {
        let mut doc = Self::new();
        let html = doc.create_element("html");
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        doc.append_child(doc.root(), html);
        doc.append_child(html, head);
        doc.append_child(html, body);
        doc
    }

    /// Parses an HTML string as a full document.
    ///
    /// Parsing never fails: malformed markup is repaired the way a browser
    /// would, and the result always has `html`, `head` and `body` elements.
    #[must_use]
    pub fn parse(html: &str) -> Self {
        parse::parse_document(html)
    }

    /// Returns the document root.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Returns the `<html>` element.
    #[must_use]
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root())
            .iter()
            .copied()
            .find(|&id| self.element(id).is_some())
    }

    /// Returns the `<head>` element.
    #[must_use]
    pub fn head(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.children(html)
            .iter()
            .copied()
            .find(|&id| self.is_element(id, "head"))
    }

    /// Returns the `<body>` element.
    #[must_use]
    pub fn body(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.children(html)
            .iter()
            .copied()
            .find(|&id| self.is_element(id, "body"))
    }

    /// Returns the body, creating the skeleton around it if missing.
    pub fn ensure_body(&mut self) -> NodeId {
        if let Some(body) = self.body() {
            return body;
        }
        let html = if let Some(html) = self.document_element() {
            html
        } else {
            let html = self.create_element("html");
            self.append_child(self.root(), html);
            html
        };
        let body = self.create_element("body");
        self.append_child(html, body);
        body
    }

    /// Returns the node payload.
    #[must_use]
    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0].data
    }

    /// Returns the element payload if the node is an element.
    #[must_use]
    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.0].data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Returns the mutable element payload if the node is an element.
    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[id.0].data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Returns the lowercase tag name of an element node.
    #[must_use]
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.name.as_str())
    }

    /// Returns `true` if the node is an element with the given tag name.
    #[must_use]
    pub fn is_element(&self, id: NodeId, name: &str) -> bool {
        self.tag_name(id)
            .is_some_and(|tag| tag.eq_ignore_ascii_case(name))
    }

    /// Returns the contents of a text node.
    #[must_use]
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Replaces the contents of a text node. No-op on other node kinds.
    pub fn set_text(&mut self, id: NodeId, value: impl Into<String>) {
        if let NodeData::Text(text) = &mut self.nodes[id.0].data {
            *text = value.into();
        }
    }

    /// Returns an attribute value of an element node.
    #[must_use]
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|el| el.attr(name))
    }

    /// Returns `true` if the element node carries the attribute.
    #[must_use]
    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.element(id).is_some_and(|el| el.has_attr(name))
    }

    /// Sets an attribute on an element node. No-op on other node kinds.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(el) = self.element_mut(id) {
            el.set_attr(name, value);
        }
    }

    /// Removes an attribute from an element node.
    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.element_mut(id).and_then(|el| el.remove_attr(name))
    }

    /// Returns the parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Returns the children of a node.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Returns the first child of a node.
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    /// Returns the last child of a node.
    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    /// Returns the position of a node among its parent's children.
    #[must_use]
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Returns the previous sibling of a node.
    #[must_use]
    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        index
            .checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    /// Returns the next sibling of a node.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    /// Iterates over the ancestors of a node, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    /// Returns `true` if `node` is `ancestor` or lies inside it.
    #[must_use]
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Returns `true` if the node is reachable from the document root.
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.contains(self.root(), id)
    }

    /// Returns all descendants of a node in document (pre-)order.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Returns all descendant elements with the given tag name.
    #[must_use]
    pub fn elements_by_tag(&self, id: NodeId, name: &str) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&n| self.is_element(n, name))
            .collect()
    }

    /// Finds an element by id.
    ///
    /// Matches either a live `id` attribute or the `data-safe-id` attribute
    /// that sanitization renames ids to.
    #[must_use]
    pub fn find_by_id(&self, value: &str) -> Option<NodeId> {
        self.descendants(self.root()).into_iter().find(|&n| {
            self.attr(n, "id") == Some(value) || self.attr(n, "data-safe-id") == Some(value)
        })
    }

    /// Concatenates the text of all descendant text nodes.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|n| self.text(n))
            .collect()
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Creates a detached element.
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(NodeData::Element(Element::new(name)))
    }

    /// Creates a detached element with attributes.
    pub fn create_element_with(&mut self, element: Element) -> NodeId {
        self.push(NodeData::Element(element))
    }

    /// Creates a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Text(text.into()))
    }

    /// Creates a detached comment node.
    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Comment(text.into()))
    }

    /// Removes a node from its parent. The node keeps its id and subtree.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
    }

    /// Appends `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Inserts `child` at `index` among `parent`'s children.
    ///
    /// An index past the end appends.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Inserts `child` immediately before `reference`.
    pub fn insert_before(&mut self, reference: NodeId, child: NodeId) {
        if let Some(parent) = self.parent(reference) {
            self.detach(child);
            let index = self.index_in_parent(reference).unwrap_or(0);
            self.insert_child(parent, index, child);
        }
    }

    /// Inserts `child` immediately after `reference`.
    pub fn insert_after(&mut self, reference: NodeId, child: NodeId) {
        if let Some(parent) = self.parent(reference) {
            self.detach(child);
            let index = self.index_in_parent(reference).map_or(0, |i| i + 1);
            self.insert_child(parent, index, child);
        }
    }

    /// Replaces `old` with `new` in the tree.
    pub fn replace_with(&mut self, old: NodeId, new: NodeId) {
        self.insert_before(old, new);
        self.detach(old);
    }

    /// Replaces an element with its own children.
    pub fn unwrap(&mut self, id: NodeId) {
        for child in self.children(id).to_vec() {
            self.insert_before(id, child);
        }
        self.detach(id);
    }

    /// Detaches and returns every child of a node.
    pub fn take_children(&mut self, id: NodeId) -> Vec<NodeId> {
        let children = std::mem::take(&mut self.nodes[id.0].children);
        for &child in &children {
            self.nodes[child.0].parent = None;
        }
        children
    }

    /// Deep-copies `node` from another document into this one, detached.
    pub fn import(&mut self, other: &Self, node: NodeId) -> NodeId {
        let copy = self.push(other.data(node).clone());
        let mut stack = vec![(copy, node)];
        while let Some((target, source)) = stack.pop() {
            for &child in other.children(source) {
                let child_copy = self.push(other.data(child).clone());
                self.append_child(target, child_copy);
                stack.push((child_copy, child));
            }
        }
        copy
    }

    /// Deep-copies every child of `source` in `other` and appends the
    /// copies to `parent`.
    pub fn import_children(&mut self, parent: NodeId, other: &Self, source: NodeId) -> Vec<NodeId> {
        let mut imported = Vec::with_capacity(other.children(source).len());
        for &child in other.children(source) {
            let copy = self.import(other, child);
            self.append_child(parent, copy);
            imported.push(copy);
        }
        imported
    }

    /// Parses `html` as body content and returns the detached top-level nodes.
    pub fn parse_fragment_nodes(&mut self, html: &str) -> Vec<NodeId> {
        let parsed = Self::parse(html);
        let mut nodes = Vec::new();
        if let Some(head) = parsed.head() {
            for &child in parsed.children(head) {
                nodes.push(self.import(&parsed, child));
            }
        }
        if let Some(body) = parsed.body() {
            for &child in parsed.children(body) {
                nodes.push(self.import(&parsed, child));
            }
        }
        nodes
    }

    /// Replaces the children of a node with parsed `html`.
    pub fn set_inner_html(&mut self, id: NodeId, html: &str) {
        self.take_children(id);
        for node in self.parse_fragment_nodes(html) {
            self.append_child(id, node);
        }
    }

    /// Serializes the children of a node.
    #[must_use]
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(id) {
            serialize::serialize_node(self, child, &mut out);
        }
        out
    }

    /// Serializes a node including itself.
    #[must_use]
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        serialize::serialize_node(self, id, &mut out);
        out
    }

    /// Serializes the whole document.
    #[must_use]
    pub fn to_html(&self) -> String {
        self.inner_html(self.root())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_has_skeleton() {
        let doc = Document::parse("<p>hello</p>");
        assert!(doc.head().is_some());
        let body = doc.body().unwrap();
        assert_eq!(doc.inner_html(body), "<p>hello</p>");
    }

    #[test]
    fn test_detached_node_keeps_identity() {
        let mut doc = Document::parse("<p>a</p><p>b</p>");
        let body = doc.body().unwrap();
        let first = doc.first_child(body).unwrap();
        doc.detach(first);
        assert!(!doc.is_attached(first));
        assert_eq!(doc.text_content(first), "a");
        assert_eq!(doc.inner_html(body), "<p>b</p>");
    }

    #[test]
    fn test_insert_and_unwrap() {
        let mut doc = Document::parse("<div id=\"wrap\"><b>x</b><i>y</i></div>");
        let wrap = doc.find_by_id("wrap").unwrap();
        doc.unwrap(wrap);
        let body = doc.body().unwrap();
        assert_eq!(doc.inner_html(body), "<b>x</b><i>y</i>");

        let span = doc.create_element("span");
        let first = doc.first_child(body).unwrap();
        doc.insert_after(first, span);
        assert_eq!(doc.inner_html(body), "<b>x</b><span></span><i>y</i>");
    }

    #[test]
    fn test_find_by_safe_id() {
        let doc = Document::parse("<div data-safe-id=\"previousMailContainer\">q</div>");
        let found = doc.find_by_id("previousMailContainer").unwrap();
        assert_eq!(doc.text_content(found), "q");
    }

    #[test]
    fn test_import_deep_copies() {
        let source = Document::parse("<ul><li>one</li><li>two</li></ul>");
        let mut target = Document::skeleton();
        let body = target.body().unwrap();
        let src_body = source.body().unwrap();
        target.import_children(body, &source, src_body);
        assert_eq!(target.inner_html(body), "<ul><li>one</li><li>two</li></ul>");
    }

    #[test]
    fn test_set_inner_html() {
        let mut doc = Document::skeleton();
        let body = doc.body().unwrap();
        doc.set_inner_html(body, "<em>new</em> text");
        assert_eq!(doc.inner_html(body), "<em>new</em> text");
    }

    #[test]
    fn test_attribute_helpers() {
        let mut el = Element::new("IMG");
        assert_eq!(el.name, "img");
        el.set_attr("SRC", "a.png");
        assert_eq!(el.attr("src"), Some("a.png"));
        el.set_attr("src", "b.png");
        assert_eq!(el.attrs.len(), 1);
        assert_eq!(el.remove_attr("src"), Some("b.png".to_string()));
        assert!(!el.has_attr("src"));
    }
}
