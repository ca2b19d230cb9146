//! Trusted markup generated by the application.
//!
//! Every template roots its output in an element stamped with the session
//! token, so the markup passes back through the sanitizer with its classes,
//! ids and URLs intact. Editor-only chrome (overlays, remove buttons) is
//! tagged with marker attributes the body assembler strips before sending.

use serde::{Deserialize, Serialize};

use crate::dom::{Document, NodeId};
use crate::emoji::emoji_element;
use crate::policy::UrlContext;
use crate::session::SanitizerSession;

/// Content-id of an inline image, kept while composing.
pub const CID_ATTR: &str = "data-cid";
/// Hover overlay on inline images.
pub const IMAGE_OVERLAY_ATTR: &str = "data-image-overlay";
/// Toolbar of per-element actions.
pub const ACTION_BUTTONS_ATTR: &str = "data-action-buttons";
/// Close button of a link card.
pub const REMOVE_CARD_ATTR: &str = "data-remove-card";
/// Identity of a link card.
pub const CARD_ID_ATTR: &str = "data-card-id";
/// Signature block root.
pub const SIGNATURE_ATTR: &str = "data-signature";

/// Preview data for a pasted link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCard {
    /// Card identity.
    pub id: String,
    /// Target URL.
    pub url: String,
    /// Page title.
    pub title: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Optional preview image.
    #[serde(default)]
    pub image_url: Option<String>,
}

struct Builder<'a> {
    session: &'a SanitizerSession,
    doc: Document,
}

impl<'a> Builder<'a> {
    fn new(session: &'a SanitizerSession) -> Self {
        Self {
            session,
            doc: Document::new(),
        }
    }

    fn element(&mut self, parent: Option<NodeId>, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let node = self.doc.create_element(tag);
        for (name, value) in attrs {
            self.doc.set_attr(node, name, *value);
        }
        if let Some(parent) = parent {
            self.doc.append_child(parent, node);
        }
        node
    }

    fn text(&mut self, parent: NodeId, text: &str) {
        let node = self.doc.create_text(text);
        self.doc.append_child(parent, node);
    }

    fn url(&self, url: &str) -> String {
        self.session
            .policy()
            .sanitize_url(url, Some("#"), UrlContext::remote())
    }

    fn finish(mut self, root: NodeId) -> String {
        self.session.stamp(&mut self.doc, root);
        self.doc.outer_html(root)
    }
}

/// Markup for an inline image while composing.
///
/// `src` is the display URL (usually a same-origin download path or a
/// `data:` URL); `content_id` is restored as `cid:` when sending.
#[must_use]
pub fn inline_image(session: &SanitizerSession, content_id: &str, src: &str, alt: &str) -> String {
    let mut b = Builder::new(session);
    let wrapper = b.element(None, "span", &[("class", "inline-image")]);
    let src = session.policy().sanitize_url(src, None, UrlContext::remote());
    b.element(
        Some(wrapper),
        "img",
        &[
            ("src", src.as_str()),
            ("alt", alt),
            (CID_ATTR, content_id),
            ("style", "max-width: 100%;"),
        ],
    );
    let overlay = b.element(Some(wrapper), "span", &[(IMAGE_OVERLAY_ATTR, "")]);
    b.text(overlay, "\u{2715}");
    b.finish(wrapper)
}

/// Markup for a link preview card.
#[must_use]
pub fn link_card(session: &SanitizerSession, card: &LinkCard) -> String {
    let mut b = Builder::new(session);
    let root = b.element(None, "div", &[("class", "link-card"), (CARD_ID_ATTR, card.id.as_str())]);
    if let Some(image) = &card.image_url {
        let image = session.policy().sanitize_url(image, None, UrlContext::remote());
        b.element(Some(root), "img", &[("src", image.as_str()), ("alt", "")]);
    }
    let href = b.url(&card.url);
    let link = b.element(Some(root), "a", &[("href", href.as_str()), ("target", "_blank")]);
    b.text(link, &card.title);
    if let Some(description) = &card.description {
        let p = b.element(Some(root), "p", &[]);
        b.text(p, description);
    }
    let close = b.element(Some(root), "span", &[(REMOVE_CARD_ATTR, "")]);
    b.text(close, "\u{2715}");
    b.finish(root)
}

/// Markup for a signature block. The signature itself is untrusted and is
/// sanitized before being wrapped.
#[must_use]
pub fn signature_block(session: &SanitizerSession, signature_html: &str) -> String {
    let clean = session.sanitize(signature_html);
    let mut b = Builder::new(session);
    let root = b.element(None, "div", &[(SIGNATURE_ATTR, "")]);
    b.doc.set_inner_html(root, &clean);
    b.finish(root)
}

/// Markup for a single emoji image.
#[must_use]
pub fn emoji_image(session: &SanitizerSession, emoji: &str) -> String {
    let mut doc = Document::new();
    let img = doc.create_element_with(emoji_element(
        emoji,
        &session.config().emoji_image_base,
        session.token(),
    ));
    doc.outer_html(img)
}
