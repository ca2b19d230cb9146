//! Turns the edited body into transport HTML and plain text.

use richmail_editor::EMPTY_ATTR;
use richmail_sanitize::templates::{
    ACTION_BUTTONS_ATTR, CARD_ID_ATTR, CID_ATTR, IMAGE_OVERLAY_ATTR, REMOVE_CARD_ATTR,
    SIGNATURE_ATTR,
};
use richmail_sanitize::{Document, NodeId, SanitizerSession};

use crate::message::{Attachment, SmimeMode};
use crate::previous_mail::{find_container, unwrap_container};

/// Marker attributes of UI-only elements removed with their subtree.
pub const STRIP_NODES: &[&str] = &[
    ACTION_BUTTONS_ATTR,
    REMOVE_CARD_ATTR,
    IMAGE_OVERLAY_ATTR,
];

/// Editor-only attributes removed from kept elements.
pub const STRIP_ATTRS: &[&str] = &[
    "contenteditable",
    CID_ATTR,
    CARD_ID_ATTR,
    SIGNATURE_ATTR,
    EMPTY_ATTR,
];

const EMOJI_ATTR: &str = "data-emoji";

/// An assembled body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledBody {
    /// Transport HTML.
    pub html: String,
    /// Plain-text projection of `html`.
    pub text: String,
}

/// Settings for [`assemble_body`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AssembleOptions<'a> {
    /// Inline attachments referenced from the body.
    pub inline_attachments: &'a [Attachment],
    /// S/MIME mode of the outgoing message.
    pub smime: SmimeMode,
}

/// Normalizes edited body HTML for saving or sending.
///
/// Emoji images become their characters, inline images point back at
/// their `cid:` parts (or keep their literal payload under S/MIME), UI
/// affordances are dropped and editor-only attributes are removed.
#[must_use]
pub fn assemble_body(
    session: &SanitizerSession,
    body_html: &str,
    options: AssembleOptions<'_>,
) -> AssembledBody {
    let mut doc = Document::skeleton();
    let body = doc.ensure_body();
    doc.set_inner_html(body, body_html);

    let mut assembler = Assembler {
        token_attr: session.safe_attr_name(),
        options,
        removed: 0,
        rewritten: 0,
    };
    assembler.visit(&mut doc, body);
    tracing::debug!(
        removed = assembler.removed,
        rewritten = assembler.rewritten,
        "body assembled"
    );

    let html = doc.inner_html(body);
    let text = plain_text(&html);
    AssembledBody { html, text }
}

/// Unwraps the previous-mail container, which only the editor needs.
#[must_use]
pub fn prepare_for_send(html: &str) -> String {
    unwrap_container(html)
}

/// Returns `true` if `html` still carries the previous-mail container.
#[must_use]
pub fn has_previous_mail(html: &str) -> bool {
    find_container(&Document::parse(html)).is_some()
}

struct Assembler<'a> {
    token_attr: &'a str,
    options: AssembleOptions<'a>,
    removed: usize,
    rewritten: usize,
}

impl Assembler<'_> {
    /// Walks children last-first so removals never shift unvisited siblings.
    fn visit(&mut self, doc: &mut Document, node: NodeId) {
        let children = doc.children(node).to_vec();
        for child in children.into_iter().rev() {
            if doc.element(child).is_none() {
                continue;
            }
            if self.process(doc, child) {
                self.visit(doc, child);
            }
        }
    }

    /// Returns `false` if the element is gone.
    fn process(&mut self, doc: &mut Document, node: NodeId) -> bool {
        if STRIP_NODES.iter().any(|attr| doc.has_attr(node, attr)) {
            doc.detach(node);
            self.removed += 1;
            return false;
        }

        if doc.is_element(node, "img") {
            if let Some(emoji) = doc.attr(node, EMOJI_ATTR).map(str::to_string) {
                let text = doc.create_text(emoji);
                doc.replace_with(node, text);
                return false;
            }
            if let Some(cid) = doc.attr(node, CID_ATTR).map(str::to_string) {
                self.rewrite_inline_image(doc, node, &cid);
            }
        }

        for attr in STRIP_ATTRS.iter().copied().chain(std::iter::once(self.token_attr)) {
            doc.remove_attr(node, attr);
        }
        true
    }

    fn rewrite_inline_image(&mut self, doc: &mut Document, node: NodeId, cid: &str) {
        if self.options.smime.is_active() {
            let payload = self
                .options
                .inline_attachments
                .iter()
                .find(|a| a.has_content_id(cid))
                .and_then(Attachment::data_url);
            if let Some(payload) = payload {
                doc.set_attr(node, "src", payload);
            }
            return;
        }
        doc.set_attr(node, "src", format!("cid:{cid}"));
        self.rewritten += 1;
    }
}

/// Projects HTML to plain text, falling back to the bare text content if
/// conversion fails.
#[must_use]
pub fn plain_text(html: &str) -> String {
    match htmd::convert(html) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(error = %e, "plain-text conversion failed");
            let doc = Document::parse(html);
            doc.body().map(|body| doc.text_content(body)).unwrap_or_default()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::message::Disposition;

    fn session() -> SanitizerSession {
        SanitizerSession::default()
    }

    #[test]
    fn test_cid_restored() {
        let session = session();
        let out = assemble_body(
            &session,
            r#"<p><img src="/service/home/~/?id=1&amp;part=2" data-cid="img1@x"></p>"#,
            AssembleOptions::default(),
        );
        assert_eq!(out.html, r#"<p><img src="cid:img1@x"></p>"#);
    }

    #[test]
    fn test_smime_keeps_payload() {
        let session = session();
        let inline = [Attachment {
            content_id: Some("<img1@x>".into()),
            content_type: "image/png".into(),
            content_disposition: Disposition::Inline,
            base64: Some("iVBORw0=".into()),
            ..Attachment::default()
        }];
        let out = assemble_body(
            &session,
            r#"<img src="/download/1" data-cid="img1@x">"#,
            AssembleOptions {
                inline_attachments: &inline,
                smime: SmimeMode::Sign,
            },
        );
        assert_eq!(out.html, r#"<img src="data:image/png;base64,iVBORw0=">"#);
    }

    #[test]
    fn test_ui_nodes_and_markers_stripped() {
        let session = session();
        let token = session.safe_attr_name().to_string();
        let html = format!(
            "<div {token}=\"1\" data-card-id=\"c1\" class=\"link-card\">\
             <a href=\"https://e.example\">t</a><span data-remove-card=\"\">x</span></div>\
             <p contenteditable=\"true\">a<span data-image-overlay=\"\">\u{2715}</span></p>"
        );
        let out = assemble_body(&session, &html, AssembleOptions::default());
        assert_eq!(
            out.html,
            "<div class=\"link-card\"><a href=\"https://e.example\">t</a></div><p>a</p>"
        );
    }

    #[test]
    fn test_emoji_images_become_text() {
        let session = session();
        let out = assemble_body(
            &session,
            "<p>hi <img class=\"emoji\" data-emoji=\"\u{1f600}\" src=\"/e/1f600.png\"></p>",
            AssembleOptions::default(),
        );
        assert_eq!(out.html, "<p>hi \u{1f600}</p>");
    }

    #[test]
    fn test_plain_text_projection() {
        let session = session();
        let out = assemble_body(
            &session,
            "<p>Hello <b>there</b></p>",
            AssembleOptions::default(),
        );
        assert!(out.text.contains("Hello"));
        assert!(out.text.contains("there"));
        assert!(!out.text.contains('<'));
    }

    #[test]
    fn test_prepare_for_send_unwraps_container() {
        let html = "<p>me</p><div data-safe-id=\"previousMailContainer\"><p>you</p></div>";
        assert!(has_previous_mail(html));
        let sent = prepare_for_send(html);
        assert_eq!(sent, "<p>me</p><p>you</p>");
        assert!(!has_previous_mail(&sent));
    }
}
