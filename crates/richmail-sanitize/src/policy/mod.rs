//! Sanitization policy: which tags, attributes, URLs and CSS survive.
//!
//! The policy is fixed for the lifetime of a [`SanitizerSession`]; only the
//! placeholder image and the same-origin service path are configurable.
//!
//! [`SanitizerSession`]: crate::SanitizerSession

pub mod css;
pub mod url;

pub use css::{
    Declaration, StyleRule, is_allowed_css_property, parse_declarations, parse_stylesheet,
    sanitize_css_property_value, sanitize_style_attribute, serialize_declarations,
};
pub use url::{PLACEHOLDER_IMAGE, UrlContext, UrlPolicy, sanitize_url};

use crate::config::SanitizerConfig;
use crate::error::Result;

/// Tags removed by the purifier. Their text content is kept unless the tag
/// is also listed in [`DROP_CONTENT_TAGS`].
pub const FORBIDDEN_TAGS: &[&str] = &[
    "form",
    "iframe",
    "script",
    "eventsource",
    "svg",
    "use",
    "picture",
];

/// Tags removed together with everything inside them.
pub const DROP_CONTENT_TAGS: &[&str] = &[
    "script", "iframe", "svg", "math", "noscript", "template", "title", "object", "embed",
    "noembed", "noframes", "xmp",
];

/// Attributes removed everywhere by the purifier.
pub const FORBIDDEN_ATTRS: &[&str] = &["tabindex", "srcset", "source", "xlink:href"];

/// URL schemes the purifier lets through for remote content.
pub const URL_SCHEMES: &[&str] = &["http", "https", "mailto", "tel", "cid", "data"];

/// Additional schemes accepted for messages stored in local folders.
pub const LOCAL_FOLDER_SCHEMES: &[&str] =
    &["file", "ftp", "news", "nntp", "sms", "callto", "webcal", "irc", "xmpp"];

/// Attributes allowed on every element, on top of the purifier defaults.
pub const GENERIC_ATTRS: &[&str] = &[
    "style", "class", "id", "dir", "align", "valign", "bgcolor", "color", "face", "size",
    "width", "height", "border", "cellpadding", "cellspacing", "role", "alt", "name",
];

/// Extra tags allowed on top of the purifier defaults.
pub const EXTRA_TAGS: &[&str] = &["style", "font", "center", "caption", "section", "article"];

/// The fixed policy applied by the sanitizer.
#[derive(Debug, Clone, Default)]
pub struct SanitizePolicy {
    urls: UrlPolicy,
}

impl SanitizePolicy {
    /// Builds the policy from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured service path is unusable.
    pub fn from_config(config: &SanitizerConfig) -> Result<Self> {
        Ok(Self {
            urls: UrlPolicy::new(config.placeholder_image_url.clone(), &config.service_path)?,
        })
    }

    /// Returns the URL policy.
    #[must_use]
    pub const fn urls(&self) -> &UrlPolicy {
        &self.urls
    }

    /// Sanitizes a URL in the given context.
    #[must_use]
    pub fn sanitize_url(&self, url: &str, fallback: Option<&str>, ctx: UrlContext) -> String {
        self.urls.sanitize(url, fallback, ctx)
    }

    /// Sanitizes a `style` attribute value; `None` means drop the attribute.
    #[must_use]
    pub fn sanitize_style(&self, style: &str) -> Option<String> {
        sanitize_style_attribute(style, &self.urls)
    }

    /// Sanitizes a single CSS value for `key`.
    #[must_use]
    pub fn sanitize_css_value(&self, value: &str, key: &str) -> Option<String> {
        sanitize_css_property_value(value, key, &self.urls)
    }
}
