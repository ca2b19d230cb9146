//! HTML parsing into the arena via `html5ever`.

use html5ever::parse_document as parse_html;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

use super::{Attribute, Document, Element, NodeData, NodeId};

/// Parses `html` with the browser-grade `html5ever` tree builder and copies
/// the result into an arena [`Document`].
pub(super) fn parse_document(html: &str) -> Document {
    let dom = parse_html(RcDom::default(), Default::default()).one(html);

    let mut doc = Document::new();
    let root = doc.root();

    // Iterative copy: hostile input can nest arbitrarily deep.
    let mut stack: Vec<(NodeId, Handle)> = dom
        .document
        .children
        .borrow()
        .iter()
        .rev()
        .map(|child| (root, child.clone()))
        .collect();

    while let Some((parent, handle)) = stack.pop() {
        let Some(data) = convert(&handle) else {
            continue;
        };
        let id = doc.push(data);
        doc.append_child(parent, id);

        let children = match &handle.data {
            RcNodeData::Element {
                template_contents, ..
            } => template_contents
                .borrow()
                .as_ref()
                .map_or_else(|| handle.children.borrow().clone(), |t| t.children.borrow().clone()),
            _ => handle.children.borrow().clone(),
        };
        stack.extend(children.into_iter().rev().map(|child| (id, child)));
    }

    doc.ensure_body();
    doc
}

fn convert(handle: &Handle) -> Option<NodeData> {
    match &handle.data {
        RcNodeData::Doctype { name, .. } => Some(NodeData::Doctype(name.to_string())),
        RcNodeData::Text { contents } => Some(NodeData::Text(contents.borrow().to_string())),
        RcNodeData::Comment { contents } => Some(NodeData::Comment(contents.to_string())),
        RcNodeData::Element { name, attrs, .. } => {
            let attrs = attrs
                .borrow()
                .iter()
                .map(|a| Attribute {
                    name: a.name.prefix.as_ref().map_or_else(
                        || a.name.local.to_string(),
                        |prefix| format!("{prefix}:{}", a.name.local),
                    ),
                    value: a.value.to_string(),
                })
                .collect();
            Some(NodeData::Element(Element {
                name: name.local.to_string().to_ascii_lowercase(),
                attrs,
            }))
        }
        RcNodeData::Document | RcNodeData::ProcessingInstruction { .. } => None,
    }
}
