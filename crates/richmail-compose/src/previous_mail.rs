//! Quoted previous-mail handling for replies and forwards.
//!
//! The quoted content lives in a container element so the composer can
//! swap it for another variant, detect hand edits, and unwrap it before
//! sending. Sanitization renames the container's `id` to `data-safe-id`;
//! every lookup here accepts both.

use richmail_sanitize::{Document, NodeData, NodeId, SanitizerSession};
use serde::{Deserialize, Serialize};

/// Id of the element wrapping quoted previous-mail content.
pub const PREVIOUS_MAIL_CONTAINER_ID: &str = "previousMailContainer";

/// Which quoted content a reply or forward carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PreviousMailPolicy {
    /// No quoted content.
    DontShow,
    /// The original body as received.
    #[default]
    ShowOriginal,
    /// The original body without its leading quote separator.
    ShowLast,
}

/// Result of applying a [`PreviousMailPolicy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifiedBody {
    /// The authored content followed by the quoted container.
    pub body: String,
    /// The quoted container alone; empty when nothing is quoted.
    pub modified_body_content: String,
}

/// Applies `policy` to a body.
///
/// Any container already present in `current_body` is replaced. The
/// quoted variant is derived from `original_body`; `separator` is the id of
/// the provider's quote separator element.
#[must_use]
pub fn modify_body(
    policy: PreviousMailPolicy,
    current_body: &str,
    original_body: &str,
    separator: &str,
) -> ModifiedBody {
    let authored = remove_container(current_body);
    let modified_body_content = match policy {
        PreviousMailPolicy::DontShow => String::new(),
        PreviousMailPolicy::ShowOriginal => wrap_container(&body_fragment(original_body)),
        PreviousMailPolicy::ShowLast => {
            wrap_container(&strip_leading_separator(original_body, separator))
        }
    };
    tracing::debug!(?policy, "previous mail policy applied");
    ModifiedBody {
        body: format!("{authored}{modified_body_content}"),
        modified_body_content,
    }
}

/// Returns `true` if the quoted content in `current_body` differs from
/// what `modified_body_content` put there.
///
/// Both sides are compared in sanitized form. A removed container counts
/// as a change when something was quoted.
#[must_use]
pub fn check_previous_mail_changed(
    session: &SanitizerSession,
    current_body: &str,
    modified_body_content: &str,
) -> bool {
    let expected = container_inner_html(modified_body_content).unwrap_or_default();
    let Some(current) = container_inner_html(current_body) else {
        return !expected.trim().is_empty();
    };
    session.sanitize(&current) != session.sanitize(&expected)
}

/// Wraps quoted content in the previous-mail container.
#[must_use]
pub fn wrap_container(quoted: &str) -> String {
    format!("<div id=\"{PREVIOUS_MAIL_CONTAINER_ID}\">{quoted}</div>")
}

/// Returns the inner HTML of the container in `html`, if present.
#[must_use]
pub fn container_inner_html(html: &str) -> Option<String> {
    let doc = Document::parse(html);
    find_container(&doc).map(|container| doc.inner_html(container))
}

/// Returns `html` without the container and its content.
#[must_use]
pub fn remove_container(html: &str) -> String {
    let mut doc = Document::parse(html);
    if let Some(container) = find_container(&doc) {
        doc.detach(container);
    }
    doc.body().map(|body| doc.inner_html(body)).unwrap_or_default()
}

/// Returns `html` with the container replaced by its children.
#[must_use]
pub fn unwrap_container(html: &str) -> String {
    let mut doc = Document::parse(html);
    if let Some(container) = find_container(&doc) {
        doc.unwrap(container);
    }
    doc.body().map(|body| doc.inner_html(body)).unwrap_or_default()
}

pub(crate) fn find_container(doc: &Document) -> Option<NodeId> {
    let body = doc.body()?;
    doc.find_by_id(PREVIOUS_MAIL_CONTAINER_ID)
        .filter(|&node| doc.contains(body, node))
}

fn body_fragment(html: &str) -> String {
    let doc = Document::parse(html);
    doc.body().map(|body| doc.inner_html(body)).unwrap_or_default()
}

fn is_blank(doc: &Document, node: NodeId) -> bool {
    match doc.data(node) {
        NodeData::Text(text) => text.trim().is_empty(),
        NodeData::Comment(_) => true,
        _ => false,
    }
}

fn has_id(doc: &Document, node: NodeId, id: &str) -> bool {
    doc.attr(node, "id") == Some(id) || doc.attr(node, "data-safe-id") == Some(id)
}

/// Removes the separator element if it is the first content of the body,
/// looking through leading wrapper elements.
fn strip_leading_separator(html: &str, separator: &str) -> String {
    let mut doc = Document::parse(html);
    let Some(body) = doc.body() else {
        return String::new();
    };
    let mut node = body;
    loop {
        let Some(first) = doc
            .children(node)
            .iter()
            .copied()
            .find(|&child| !is_blank(&doc, child))
        else {
            break;
        };
        if doc.element(first).is_none() {
            break;
        }
        if has_id(&doc, first, separator) {
            tracing::trace!(separator, "stripping leading quote separator");
            doc.detach(first);
            break;
        }
        node = first;
    }
    doc.inner_html(body)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SEP: &str = "zwchr";

    #[test]
    fn test_show_original_wraps() {
        let out = modify_body(PreviousMailPolicy::ShowOriginal, "<p>hi</p>", "<p>old</p>", SEP);
        assert_eq!(
            out.body,
            "<p>hi</p><div id=\"previousMailContainer\"><p>old</p></div>"
        );
        assert_eq!(
            out.modified_body_content,
            "<div id=\"previousMailContainer\"><p>old</p></div>"
        );
    }

    #[test]
    fn test_dont_show_drops_quote() {
        let current = "<p>hi</p><div data-safe-id=\"previousMailContainer\"><p>old</p></div>";
        let out = modify_body(PreviousMailPolicy::DontShow, current, "<p>old</p>", SEP);
        assert_eq!(out.body, "<p>hi</p>");
        assert!(out.modified_body_content.is_empty());
    }

    #[test]
    fn test_show_last_strips_leading_separator() {
        let original = "<div><hr id=\"zwchr\"><p>last</p></div>";
        let out = modify_body(PreviousMailPolicy::ShowLast, "", original, SEP);
        assert_eq!(
            out.body,
            "<div id=\"previousMailContainer\"><div><p>last</p></div></div>"
        );
    }

    #[test]
    fn test_show_last_keeps_inner_separator() {
        let original = "<p>last</p><hr id=\"zwchr\"><p>older</p>";
        let out = modify_body(PreviousMailPolicy::ShowLast, "", original, SEP);
        assert!(out.body.contains("id=\"zwchr\""));
    }

    #[test]
    fn test_full_document_original_uses_body() {
        let out = modify_body(
            PreviousMailPolicy::ShowOriginal,
            "",
            "<html><head><title>t</title></head><body><p>old</p></body></html>",
            SEP,
        );
        assert_eq!(
            out.modified_body_content,
            "<div id=\"previousMailContainer\"><p>old</p></div>"
        );
    }

    #[test]
    fn test_changed_detection() {
        let session = SanitizerSession::default();
        let quoted = wrap_container("<p>old</p>");
        let shown = session.sanitize(&format!("<p>me</p>{quoted}"));
        assert!(!check_previous_mail_changed(&session, &shown, &quoted));

        let edited = shown.replace("old", "edited");
        assert!(check_previous_mail_changed(&session, &edited, &quoted));

        assert!(check_previous_mail_changed(&session, "<p>me</p>", &quoted));
        assert!(!check_previous_mail_changed(&session, "<p>me</p>", ""));
    }

    #[test]
    fn test_unwrap_container() {
        let html = "<p>a</p><div data-safe-id=\"previousMailContainer\"><p>b</p></div>";
        assert_eq!(unwrap_container(html), "<p>a</p><p>b</p>");
        assert_eq!(remove_container(html), "<p>a</p>");
        assert_eq!(container_inner_html(html).unwrap(), "<p>b</p>");
    }
}
