//! Deferred resolution of externally supplied surface content.

use richmail_sanitize::{SanitizeOptions, SanitizerSession};

const HEAD_CLOSE: &str = "</head>";

/// A pending content replacement. Only the newest ticket may be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveTicket {
    /// Monotonic ticket number.
    pub id: u64,
    /// Incoming HTML.
    pub value: String,
    /// Stylesheet to apply to the incoming HTML.
    pub stylesheet: Option<String>,
}

fn is_full_document(html: &str) -> bool {
    let head: String = html.trim_start().chars().take(9).collect::<String>().to_ascii_lowercase();
    head.starts_with("<!doctype") || head.starts_with("<html")
}

/// Wraps bare HTML in a document skeleton and injects `stylesheet` into
/// its head, or at the end when the document has no `</head>`.
#[must_use]
pub fn wrap_document(value: &str, stylesheet: Option<&str>) -> String {
    let mut html = if is_full_document(value) {
        value.to_string()
    } else {
        format!("<html><head></head><body>{value}</body></html>")
    };
    if let Some(css) = stylesheet.filter(|css| !css.trim().is_empty()) {
        let style = format!("<style>{css}</style>");
        match html.to_ascii_lowercase().find(HEAD_CLOSE) {
            Some(at) => html.insert_str(at, &style),
            None => html.push_str(&style),
        }
    }
    html
}

/// Resolves incoming content into sanitized body HTML.
///
/// The sanitize call is deferred by one scheduler turn so it never runs
/// inside the caller's own mutation of the surface.
pub async fn get_resolved_value(
    session: &SanitizerSession,
    value: &str,
    stylesheet: Option<&str>,
) -> String {
    let document = wrap_document(value, stylesheet);
    tokio::task::yield_now().await;
    session.do_sanitize_html(&document, &mut [], SanitizeOptions::default())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready};

    #[test]
    fn test_wrap_bare_html() {
        assert_eq!(
            wrap_document("<p>x</p>", Some("p{color:red}")),
            "<html><head><style>p{color:red}</style></head><body><p>x</p></body></html>"
        );
    }

    #[test]
    fn test_wrap_full_document_without_head() {
        let html = wrap_document("<!DOCTYPE html><html><body>x</body></html>", Some("b{}"));
        assert!(html.ends_with("</html><style>b{}</style>"));
    }

    #[test]
    fn test_wrap_full_document_with_head() {
        let html = wrap_document("<HTML><HEAD></HEAD><BODY>x</BODY></HTML>", Some("b{}"));
        assert_eq!(html, "<HTML><HEAD><style>b{}</style></HEAD><BODY>x</BODY></HTML>");
    }

    #[test]
    fn test_empty_stylesheet_ignored() {
        assert_eq!(wrap_document("x", Some("  ")), "<html><head></head><body>x</body></html>");
    }

    #[tokio::test]
    async fn test_stylesheet_is_inlined() {
        let session = SanitizerSession::default();
        let html = get_resolved_value(&session, "<p>hi</p>", Some("p { color: navy }")).await;
        assert_eq!(html, "<p style=\"color: navy;\">hi</p>");
    }

    #[test]
    fn test_resolution_is_deferred() {
        let session = SanitizerSession::default();
        let mut task = tokio_test::task::spawn(get_resolved_value(&session, "<b>x</b>", None));
        assert_pending!(task.poll());
        assert!(task.is_woken());
        let html = assert_ready!(task.poll());
        assert_eq!(html, "<b>x</b>");
    }
}
