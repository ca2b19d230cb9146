//! HTML serialization for the arena document.

use super::{Document, NodeData, NodeId};

/// Elements that never have children or end tags.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements whose text content is emitted verbatim.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "style", "script", "xmp", "iframe", "noembed", "noframes", "plaintext", "noscript",
];

/// Escapes text for use in element content.
#[must_use]
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escapes text for use inside a double-quoted attribute value.
#[must_use]
pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out
}

enum Op {
    Open(NodeId),
    Close(NodeId),
}

pub(super) fn serialize_node(doc: &Document, node: NodeId, out: &mut String) {
    let mut ops = vec![Op::Open(node)];
    while let Some(op) = ops.pop() {
        match op {
            Op::Open(id) => match doc.data(id) {
                NodeData::Document => {
                    ops.extend(doc.children(id).iter().rev().map(|&c| Op::Open(c)));
                }
                NodeData::Doctype(name) => {
                    out.push_str("<!DOCTYPE ");
                    out.push_str(name);
                    out.push('>');
                }
                NodeData::Comment(text) => {
                    out.push_str("<!--");
                    out.push_str(text);
                    out.push_str("-->");
                }
                NodeData::Text(text) => {
                    let raw = doc
                        .parent(id)
                        .and_then(|p| doc.tag_name(p))
                        .is_some_and(|tag| RAW_TEXT_ELEMENTS.contains(&tag));
                    if raw {
                        out.push_str(text);
                    } else {
                        out.push_str(&escape_text(text));
                    }
                }
                NodeData::Element(el) => {
                    out.push('<');
                    out.push_str(&el.name);
                    for attr in &el.attrs {
                        out.push(' ');
                        out.push_str(&attr.name);
                        out.push_str("=\"");
                        out.push_str(&escape_attr(&attr.value));
                        out.push('"');
                    }
                    out.push('>');
                    if !VOID_ELEMENTS.contains(&el.name.as_str()) {
                        ops.push(Op::Close(id));
                        ops.extend(doc.children(id).iter().rev().map(|&c| Op::Open(c)));
                    }
                }
            },
            Op::Close(id) => {
                if let Some(tag) = doc.tag_name(id) {
                    out.push_str("</");
                    out.push_str(tag);
                    out.push('>');
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("a < b & c"), "a &lt; b &amp; c");
        assert_eq!(escape_text("\u{a0}"), "&nbsp;");
    }

    #[test]
    fn test_escape_attr() {
        assert_eq!(escape_attr("say \"hi\""), "say &quot;hi&quot;");
    }

    #[test]
    fn test_void_and_raw_text() {
        let doc = Document::parse("<p>a<br>b</p><style>p > b { color: red }</style>");
        let out = doc.to_html();
        assert!(out.contains("<p>a<br>b</p>"));
        assert!(out.contains("<style>p > b { color: red }</style>"));
    }

    #[test]
    fn test_attribute_quoting() {
        let doc = Document::parse(r#"<a title='x"y' href="/a?b=1&amp;c=2">t</a>"#);
        let body = doc.body().unwrap();
        assert_eq!(
            doc.inner_html(body),
            r#"<a title="x&quot;y" href="/a?b=1&amp;c=2">t</a>"#
        );
    }
}
