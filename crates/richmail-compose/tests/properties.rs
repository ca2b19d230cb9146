//! Property tests for body assembly.

use proptest::prelude::*;

use richmail_compose::{AssembleOptions, STRIP_ATTRS, STRIP_NODES, assemble_body};
use richmail_sanitize::SanitizerSession;
use richmail_sanitize::templates;

fn editor_snippet() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "<p>plain</p>",
        "<span data-image-overlay=\"\">\u{2715}</span>",
        "<p contenteditable=\"true\">a</p>",
        "<div data-remove-card=\"\"><b>x</b></div>",
        "<div data-action-buttons=\"\"><a href=\"#\">edit</a></div>",
        "<img src=\"https://img.example/a.png\" data-cid=\"a@b\">",
        "<div data-signature=\"\"><p>-- me</p></div>",
    ])
}

proptest! {
    #[test]
    fn prop_inline_image_round_trip(
        cid in "[a-z0-9]{1,12}@[a-z]{1,8}",
        alt in "[a-zA-Z ]{0,10}",
    ) {
        let session = SanitizerSession::default();
        let markup = templates::inline_image(&session, &cid, "https://img.example/x.png", &alt);
        let clean = session.sanitize(&markup);
        let body = assemble_body(&session, &clean, AssembleOptions::default());
        let expected = format!("src=\"cid:{cid}\"");
        prop_assert!(body.html.contains(&expected));
    }

    #[test]
    fn prop_editor_markers_never_reach_transport(
        parts in prop::collection::vec(editor_snippet(), 0..8),
    ) {
        let session = SanitizerSession::default();
        let body = assemble_body(&session, &parts.concat(), AssembleOptions::default());
        for marker in STRIP_NODES.iter().chain(STRIP_ATTRS) {
            prop_assert!(!body.html.contains(marker), "{marker} in {}", body.html);
        }
    }
}
