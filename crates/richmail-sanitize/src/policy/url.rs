//! URL policy.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::Result;

/// A 1x1 transparent GIF, substituted for any rejected URL.
pub const PLACEHOLDER_IMAGE: &str =
    "data:image/gif;base64,R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7";

/// Path prefix of same-origin attachment and image downloads.
pub const DEFAULT_SERVICE_PATH: &str = "/service/home/~/";

#[allow(clippy::expect_used)]
fn constant_regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("constant regex pattern")
}

static REMOTE_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| constant_regex(r"(?i)^(?:https?|mailto|tel|cid|data):"));

static LOCAL_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| constant_regex(r"(?i)^(?:file:|[a-z][a-z0-9+.\-]*:)"));

static SCRIPT_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| constant_regex(r"(?i)^(?:javascript|vbscript|livescript):"));

/// Where a URL is being rendered, which widens or narrows the scheme set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UrlContext {
    /// Accept same-origin `/service/home/~/?...` paths.
    pub allow_service_path: bool,
    /// The message lives in a local (on-disk) folder.
    pub is_local_folder: bool,
}

impl UrlContext {
    /// Context for remote message bodies with same-origin downloads allowed.
    #[must_use]
    pub const fn remote() -> Self {
        Self {
            allow_service_path: true,
            is_local_folder: false,
        }
    }

    /// Context for messages stored in a local folder.
    #[must_use]
    pub const fn local_folder() -> Self {
        Self {
            allow_service_path: true,
            is_local_folder: true,
        }
    }
}

/// Decides whether a URL may be retained.
#[derive(Debug, Clone)]
pub struct UrlPolicy {
    placeholder: String,
    service_path: Regex,
}

impl UrlPolicy {
    /// Creates a policy with the given placeholder and service path prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the service path cannot be compiled into a pattern.
    pub fn new(placeholder: impl Into<String>, service_path: &str) -> Result<Self> {
        let service_path = Regex::new(&format!(r"^{}\?", regex::escape(service_path)))?;
        Ok(Self {
            placeholder: placeholder.into(),
            service_path,
        })
    }

    /// Returns the placeholder substituted for rejected URLs.
    #[must_use]
    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// Returns `true` if the (already trimmed) URL is acceptable in `ctx`.
    #[must_use]
    pub fn is_allowed(&self, url: &str, ctx: UrlContext) -> bool {
        if SCRIPT_SCHEME.is_match(url) {
            return false;
        }
        if ctx.is_local_folder {
            return LOCAL_SCHEME.is_match(url);
        }
        REMOTE_SCHEME.is_match(url) || (ctx.allow_service_path && self.service_path.is_match(url))
    }

    /// Sanitizes a URL.
    ///
    /// Surrounding quotes and whitespace are trimmed. A rejected URL is
    /// replaced with `fallback`, or the placeholder image when no fallback
    /// is given, so an `<img>` never points at an arbitrary origin.
    #[must_use]
    pub fn sanitize(&self, url: &str, fallback: Option<&str>, ctx: UrlContext) -> String {
        let trimmed = trim_url(url);
        if self.is_allowed(trimmed, ctx) {
            return trimmed.to_string();
        }
        tracing::debug!(url = trimmed, "rejected url");
        fallback.unwrap_or(&self.placeholder).to_string()
    }
}

impl Default for UrlPolicy {
    fn default() -> Self {
        Self {
            placeholder: PLACEHOLDER_IMAGE.to_string(),
            service_path: constant_regex(&format!(r"^{}\?", regex::escape(DEFAULT_SERVICE_PATH))),
        }
    }
}

fn trim_url(url: &str) -> &str {
    url.trim_matches(|c: char| c.is_whitespace() || c == '"' || c == '\'')
}

/// Sanitizes a URL with the default policy.
///
/// See [`UrlPolicy::sanitize`].
#[must_use]
pub fn sanitize_url(
    url: &str,
    fallback: Option<&str>,
    allow_service_path: bool,
    is_local_folder: bool,
) -> String {
    static DEFAULT: LazyLock<UrlPolicy> = LazyLock::new(UrlPolicy::default);
    DEFAULT.sanitize(
        url,
        fallback,
        UrlContext {
            allow_service_path,
            is_local_folder,
        },
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_schemes_allowed() {
        for url in [
            "https://example.com/a.png",
            "http://example.com",
            "mailto:a@example.com",
            "tel:+15551234",
            "cid:part1@example.com",
            "data:image/png;base64,AAAA",
        ] {
            assert_eq!(sanitize_url(url, None, false, false), url);
        }
    }

    #[test]
    fn test_quotes_and_whitespace_trimmed() {
        assert_eq!(
            sanitize_url("  'https://example.com/x'  ", None, false, false),
            "https://example.com/x"
        );
    }

    #[test]
    fn test_rejected_url_uses_placeholder() {
        assert_eq!(
            sanitize_url("javascript:alert(1)", None, false, false),
            PLACEHOLDER_IMAGE
        );
        assert_eq!(sanitize_url("ftp://host/file", None, false, false), PLACEHOLDER_IMAGE);
        assert_eq!(sanitize_url("/relative/path", None, false, false), PLACEHOLDER_IMAGE);
    }

    #[test]
    fn test_rejected_url_uses_fallback() {
        assert_eq!(sanitize_url("vbscript:x", Some("#"), false, false), "#");
    }

    #[test]
    fn test_service_path_requires_flag() {
        let url = "/service/home/~/?auth=co&id=12&part=2";
        assert_eq!(sanitize_url(url, None, true, false), url);
        assert_eq!(sanitize_url(url, None, false, false), PLACEHOLDER_IMAGE);
        assert_eq!(
            sanitize_url("/service/home/other?x", None, true, false),
            PLACEHOLDER_IMAGE
        );
    }

    #[test]
    fn test_local_folder_accepts_any_protocol() {
        assert_eq!(
            sanitize_url("file:///tmp/a.png", None, false, true),
            "file:///tmp/a.png"
        );
        assert_eq!(
            sanitize_url("news:comp.lang.rust", None, false, true),
            "news:comp.lang.rust"
        );
        assert_eq!(sanitize_url("javascript:x", None, false, true), PLACEHOLDER_IMAGE);
        assert_eq!(sanitize_url("no-scheme", None, false, true), PLACEHOLDER_IMAGE);
    }

    #[test]
    fn test_custom_policy() {
        let policy = UrlPolicy::new("about:blank", "/files/").unwrap();
        assert_eq!(
            policy.sanitize("/files/?id=1", None, UrlContext::remote()),
            "/files/?id=1"
        );
        assert_eq!(
            policy.sanitize("jar:x", None, UrlContext::remote()),
            "about:blank"
        );
    }
}
