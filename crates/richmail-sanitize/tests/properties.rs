//! Property tests for the sanitizer's security guarantees.

use proptest::prelude::*;

use richmail_sanitize::{SanitizerSession, sanitize_url};

fn dangerous_snippet() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "<script>alert(1)</script>",
        "<SCRIPT src=\"https://evil.example/x.js\"></SCRIPT>",
        "<iframe src=\"https://evil.example\"></iframe>",
        "<svg onload=\"alert(1)\"><circle r=\"1\"/></svg>",
        "<svg><script>alert(1)</script></svg>",
        "<div><iframe srcdoc=\"<script>x</script>\"></iframe></div>",
    ])
}

fn benign_snippet() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "<p>hello</p>",
        "<b>bold</b>",
        "<a href=\"https://example.com\">link</a>",
        "<img src=\"cid:part1\" alt=\"x\">",
        "<div style=\"color: red\">red</div>",
        "<ul><li>one</li><li>two</li></ul>",
        "<p id=\"q\" class=\"k\">quote</p>",
        "<span style=\"position: fixed; top: 0\">pinned</span>",
        "plain text &amp; more",
    ])
}

fn hidden_css() -> impl Strategy<Value = String> {
    (
        prop::sample::select(vec!["visibility: hidden", "opacity: 0", "z-index: 99"]),
        prop::sample::select(vec!["p", "div", "*", ".c", "#i"]),
        any::<bool>(),
    )
        .prop_map(|(decl, selector, inline)| {
            if inline {
                format!("<div id=\"i\" class=\"c\" style=\"color: red; {decl}\">x</div>")
            } else {
                format!("<style>{selector} {{ {decl}; margin: 0 }}</style><div id=\"i\" class=\"c\"><p>x</p></div>")
            }
        })
}

proptest! {
    #[test]
    fn prop_dangerous_tags_never_survive(
        before in prop::collection::vec(benign_snippet(), 0..4),
        bad in dangerous_snippet(),
        after in prop::collection::vec(benign_snippet(), 0..4),
        text in "[a-zA-Z0-9 <>&/]{0,20}",
    ) {
        let session = SanitizerSession::default();
        let html = format!("{}{text}{bad}{}", before.concat(), after.concat());
        let out = session.sanitize(&html).to_ascii_lowercase();
        prop_assert!(!out.contains("<script"));
        prop_assert!(!out.contains("<iframe"));
        prop_assert!(!out.contains("<svg"));
        prop_assert!(!out.contains("onload"));
    }

    #[test]
    fn prop_hidden_css_never_survives(html in hidden_css()) {
        let session = SanitizerSession::default();
        let out = session.sanitize(&html);
        prop_assert!(!out.contains("visibility"));
        prop_assert!(!out.contains("opacity"));
        prop_assert!(!out.contains("z-index"));
    }

    #[test]
    fn prop_sanitize_is_idempotent(parts in prop::collection::vec(benign_snippet(), 0..6)) {
        let session = SanitizerSession::default();
        let once = session.sanitize(&parts.concat());
        let twice = session.sanitize(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_fixed_position_never_survives(parts in prop::collection::vec(benign_snippet(), 1..6)) {
        let session = SanitizerSession::default();
        let out = session.sanitize(&parts.concat());
        prop_assert!(!out.contains("fixed"));
    }

    #[test]
    fn prop_rejected_urls_use_fallback(
        scheme in "[a-z]{2,10}",
        rest in "[a-z0-9./]{0,16}",
    ) {
        prop_assume!(!matches!(
            scheme.as_str(),
            "http" | "https" | "mailto" | "tel" | "cid" | "data"
        ));
        let url = format!("{scheme}:{rest}");
        prop_assert_eq!(sanitize_url(&url, Some("#fallback"), true, false), "#fallback");
    }

    #[test]
    fn prop_script_urls_rejected_in_local_folders(rest in "[a-z0-9()./]{0,16}") {
        for scheme in ["javascript", "JavaScript", "vbscript", "livescript"] {
            let url = format!("{scheme}:{rest}");
            prop_assert_eq!(sanitize_url(&url, Some("#"), true, true), "#");
        }
    }
}
