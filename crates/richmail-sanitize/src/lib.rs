//! # richmail-sanitize
//!
//! Sanitization of untrusted HTML email bodies for display and editing.
//!
//! ## Features
//!
//! - **Purification**: scripts, frames, forms, event handlers and unsafe
//!   URL schemes are removed with `ammonia`
//! - **CSS policy**: property allow-list, `position: fixed` neutralized,
//!   `url(...)` values re-validated
//! - **Style inlining**: `<style>` rules are folded into `style` attributes
//! - **Safe regions**: markup generated by the application, stamped with a
//!   per-session token, keeps its classes, ids and URLs
//! - **Emoji**: Unicode emoji and `:shortcodes:` become trusted images
//! - **Arena DOM**: an index-addressed document for post-processing
//!
//! ## Quick Start
//!
//! ```ignore
//! use richmail_sanitize::{SanitizerConfig, SanitizerSession};
//!
//! let session = SanitizerSession::new(SanitizerConfig::default())?;
//! let html = session.sanitize(r#"<p onclick="steal()">Hello</p><script>x()</script>"#);
//! assert_eq!(&*html, "<p>Hello</p>");
//! ```
//!
//! ### Custom passes
//!
//! ```ignore
//! use richmail_sanitize::{Document, NodeId, SanitizeOptions, SanitizerSession};
//!
//! let session = SanitizerSession::default();
//! let mut strip_images = |doc: &mut Document, body: NodeId| {
//!     for img in doc.elements_by_tag(body, "img") {
//!         doc.detach(img);
//!     }
//! };
//! let html = session.do_sanitize_html(raw, &mut [&mut strip_images], SanitizeOptions::default());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod purify;
mod session;

pub mod dom;
pub mod emoji;
pub mod policy;
pub mod safe_region;
pub mod sanitizer;
pub mod selector;
pub mod templates;

pub use config::{DEFAULT_EMOJI_BASE, SanitizerConfig};
pub use dom::{Document, Element, NodeData, NodeId};
pub use error::{Error, Result};
pub use policy::{
    PLACEHOLDER_IMAGE, SanitizePolicy, UrlContext, UrlPolicy, is_allowed_css_property,
    sanitize_css_property_value, sanitize_url,
};
pub use purify::Purifier;
pub use safe_region::{SafeRegions, SafeToken, is_within_safe_region};
pub use sanitizer::{Pass, SAFE_ID_ATTR, SanitizeOptions, inline_styles};
pub use session::SanitizerSession;
pub use templates::LinkCard;
