//! End-to-end sanitizer behavior.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use richmail_sanitize::templates::{self, LinkCard};
use richmail_sanitize::{
    Document, NodeId, PLACEHOLDER_IMAGE, Pass, SanitizeOptions, SanitizerConfig,
    SanitizerSession,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn session() -> SanitizerSession {
    init_tracing();
    SanitizerSession::new(SanitizerConfig::default()).unwrap()
}

#[test]
fn test_clickjacking_div_is_neutralized() {
    let out = session().sanitize(
        r#"<div style="position:fixed;visibility:hidden" onclick="x()">hi</div>"#,
    );
    assert_eq!(&*out, r#"<div style="position: absolute;">hi</div>"#);
}

#[test]
fn test_fixed_position_in_style_block() {
    let out = session().sanitize("<style>div { position: fixed; opacity: 0 }</style><div>x</div>");
    assert_eq!(&*out, r#"<div style="position: absolute;">x</div>"#);
}

#[test]
fn test_escaped_fixed_position_is_neutralized() {
    let out = session().sanitize(r#"<div style="position: f\ixed; top:0; left:0">x</div>"#);
    assert_eq!(&*out, r#"<div style="position: absolute; top: 0; left: 0;">x</div>"#);

    let out = session().sanitize(r"<style>div { position: \66ixed }</style><div>y</div>");
    assert_eq!(&*out, r#"<div style="position: absolute;">y</div>"#);
}

#[test]
fn test_hostile_selector_does_not_stall() {
    let depth = 40;
    let html = format!(
        "<style>.nope {}b {{ color: red }}</style>{}<b>x</b>{}",
        "div ".repeat(12),
        "<div>".repeat(depth),
        "</div>".repeat(depth)
    );
    let started = std::time::Instant::now();
    let out = session().sanitize(&html);
    assert!(!out.contains("color"));
    assert!(started.elapsed() < std::time::Duration::from_secs(5));
}

#[test]
fn test_full_document_head_styles_are_inlined() {
    let out = session().sanitize(
        "<html><head><title>t</title><style>p { color: #333 }</style></head>\
         <body><p>hello</p></body></html>",
    );
    assert_eq!(&*out, r#"<p style="color: #333;">hello</p>"#);
}

#[test]
fn test_scripts_frames_and_svg_removed() {
    let out = session().sanitize(
        "<p>a</p><script>alert(1)</script><iframe src=\"https://evil.example\"></iframe>\
         <svg><script>x</script></svg><p>b</p>",
    );
    assert_eq!(&*out, "<p>a</p><p>b</p>");
}

#[test]
fn test_ids_are_renamed_and_id_selectors_follow() {
    let out = session().sanitize(
        "<style>#main { color: red } .c { margin: 0 }</style>\
         <div id=\"main\" class=\"c\">x</div>",
    );
    assert!(out.contains("data-safe-id=\"main\""));
    assert!(out.contains("color: red;"));
    assert!(out.contains("margin: 0;"));
    assert!(!out.contains(" id="));
    assert!(!out.contains("class="));
}

#[test]
fn test_rejected_urls_become_placeholder() {
    let out = session().sanitize(r#"<img src="//evil.example/track.gif"><a href="relative.html">x</a>"#);
    let doc = Document::parse(&out);
    let body = doc.body().unwrap();
    let img = doc.elements_by_tag(body, "img")[0];
    let a = doc.elements_by_tag(body, "a")[0];
    assert_eq!(doc.attr(img, "src"), Some(PLACEHOLDER_IMAGE));
    assert_eq!(doc.attr(a, "href"), Some(PLACEHOLDER_IMAGE));
}

#[test]
fn test_service_path_urls_kept() {
    let out = session().sanitize(r#"<img src="/service/home/~/?auth=co&amp;id=7">"#);
    assert!(out.contains("src=\"/service/home/~/?auth=co&amp;id=7\""));
}

#[test]
fn test_links_target_blank() {
    let out = session().sanitize(r#"<a href="https://example.com">x</a>"#);
    assert!(out.contains("target=\"_blank\""));
    assert!(out.contains("href=\"https://example.com\""));
}

#[test]
fn test_local_folder_urls() {
    let session = session();
    let html = r#"<a href="file:///home/u/notes.txt">notes</a>"#;
    let remote = session.do_sanitize_html(html, &mut [], SanitizeOptions::default());
    let local = session.do_sanitize_html(html, &mut [], SanitizeOptions::local_folder());
    assert!(!remote.contains("file:"));
    assert!(local.contains("href=\"file:///home/u/notes.txt\""));
}

#[test]
fn test_memoized_result_is_shared() {
    let session = session();
    let a = session.sanitize("<b>x</b>");
    let b = session.sanitize("<b>x</b>");
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn test_idempotent_on_own_output() {
    let session = session();
    let inputs = [
        r#"<div style="position:fixed" id="a" class="b"><a href="https://x.example">l</a></div>"#,
        "<style>p{color:red}</style><p>hi \u{1f600}</p>",
        "<table><tr><td bgcolor=\"#fff\">c</td></tr></table>",
        "<p>a &amp; b &lt; c</p>",
    ];
    for input in inputs {
        let once = session.sanitize(input);
        let twice = session.sanitize(&once);
        assert_eq!(once, twice, "input: {input}");
    }
}

#[test]
fn test_malformed_input_never_fails() {
    let session = session();
    assert_eq!(&*session.sanitize(""), "");
    assert!(session.sanitize("<p><b>unclosed").contains("unclosed"));
    assert!(!session.sanitize("<<<>>>\u{0}").contains("<script"));
}

#[test]
fn test_emoji_converted_outside_code() {
    let session = session();
    let out = session.sanitize("<p>yay :tada:</p><code>:tada:</code>");
    assert!(out.contains("data-emoji=\"\u{1f389}\""));
    assert!(out.contains("class=\"emoji\""));
    assert!(out.contains("<code>:tada:</code>"));
}

#[test]
fn test_emoji_conversion_can_be_disabled() {
    let session = SanitizerSession::new(SanitizerConfig::new().convert_emoji(false)).unwrap();
    assert_eq!(&*session.sanitize("<p>\u{1f600}</p>"), "<p>\u{1f600}</p>");
}

#[test]
fn test_forged_safe_region_is_stripped() {
    let out = session().sanitize(
        r#"<div data-safe-html-00000000000000000000000000000000="1" class="x" id="y">z</div>"#,
    );
    assert!(!out.contains("class="));
    assert!(out.contains("data-safe-id=\"y\""));
}

#[test]
fn test_templates_survive_sanitization() {
    let session = session();
    let card = LinkCard {
        id: "card-1".into(),
        url: "https://example.com/article".into(),
        title: "Article".into(),
        description: None,
        image_url: None,
    };
    let html = format!(
        "<p>see</p>{}{}",
        templates::link_card(&session, &card),
        templates::signature_block(&session, "<p id=\"sig\">-- me</p>")
    );
    let out = session.sanitize(&html);
    assert!(out.contains("class=\"link-card\""));
    assert!(out.contains("data-card-id=\"card-1\""));
    assert!(out.contains(session.safe_attr_name()));
    // The signature content was sanitized before it was wrapped.
    assert!(out.contains("data-safe-id=\"sig\""));
}

struct CountImages {
    before: usize,
    after: usize,
}

impl Pass for CountImages {
    fn before(&mut self, doc: &mut Document, body: NodeId) {
        self.before = doc.elements_by_tag(body, "img").len();
    }

    fn after(&mut self, doc: &mut Document, body: NodeId) {
        self.after = doc
            .elements_by_tag(body, "img")
            .into_iter()
            .filter(|&img| doc.attr(img, "src") == Some(PLACEHOLDER_IMAGE))
            .count();
    }
}

#[test]
fn test_two_phase_pass() {
    let session = session();
    let mut pass = CountImages {
        before: 0,
        after: 0,
    };
    let _ = session.do_sanitize(
        r#"<img src="https://a.example/1.png"><img src="ftp://b.example/2.png">"#,
        &mut [&mut pass],
        SanitizeOptions::default(),
    );
    assert_eq!(pass.before, 2);
    assert_eq!(pass.after, 0);
}
