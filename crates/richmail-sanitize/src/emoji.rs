//! Emoji to image conversion.
//!
//! Unicode emoji sequences and `:shortcode:` tokens in text are replaced by
//! `<img>` elements stamped as safe regions, so they render identically
//! across clients. The original character is kept in `data-emoji` so the
//! body assembler can turn the image back into text.

use std::sync::LazyLock;

use regex::Regex;

use crate::dom::{Document, Element, NodeId};
use crate::safe_region::{SafeRegions, SafeToken};

const ZWJ: char = '\u{200d}';
const VS16: char = '\u{fe0f}';
const KEYCAP: char = '\u{20e3}';

/// Elements whose text is never rewritten.
const SKIP_TEXT_IN: &[&str] = &["style", "script", "textarea", "pre", "code", "title"];

const SHORTCODES: &[(&str, &str)] = &[
    ("smile", "\u{1f604}"),
    ("smiley", "\u{1f603}"),
    ("grin", "\u{1f601}"),
    ("joy", "\u{1f602}"),
    ("wink", "\u{1f609}"),
    ("blush", "\u{1f60a}"),
    ("heart_eyes", "\u{1f60d}"),
    ("thinking", "\u{1f914}"),
    ("cry", "\u{1f622}"),
    ("sob", "\u{1f62d}"),
    ("angry", "\u{1f620}"),
    ("sunglasses", "\u{1f60e}"),
    ("heart", "\u{2764}\u{fe0f}"),
    ("thumbsup", "\u{1f44d}"),
    ("+1", "\u{1f44d}"),
    ("thumbsdown", "\u{1f44e}"),
    ("-1", "\u{1f44e}"),
    ("clap", "\u{1f44f}"),
    ("pray", "\u{1f64f}"),
    ("tada", "\u{1f389}"),
    ("fire", "\u{1f525}"),
    ("rocket", "\u{1f680}"),
    ("star", "\u{2b50}"),
    ("check", "\u{2705}"),
    ("warning", "\u{26a0}\u{fe0f}"),
    ("coffee", "\u{2615}"),
];

#[allow(clippy::expect_used)]
static SHORTCODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":([a-z0-9_+\-]+):").expect("constant regex pattern"));

/// A run of text or a single emoji.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Plain text.
    Text(String),
    /// One emoji sequence, as Unicode.
    Emoji(String),
}

const fn is_regional_indicator(c: char) -> bool {
    matches!(c as u32, 0x1f1e6..=0x1f1ff)
}

const fn is_modifier(c: char) -> bool {
    matches!(c as u32, 0x1f3fb..=0x1f3ff)
}

/// Returns `true` for code points that start an emoji presentation.
#[must_use]
pub const fn is_emoji_start(c: char) -> bool {
    matches!(
        c as u32,
        0x1f300..=0x1f5ff
            | 0x1f600..=0x1f64f
            | 0x1f680..=0x1f6ff
            | 0x1f900..=0x1f9ff
            | 0x1fa70..=0x1faff
            | 0x1f1e6..=0x1f1ff
            | 0x2600..=0x26ff
            | 0x2700..=0x27bf
            | 0x2b50
            | 0x2b55
            | 0x1f004
            | 0x1f0cf
    )
}

/// Returns the number of chars in the emoji sequence starting at `i`.
fn sequence_len(chars: &[char], i: usize) -> usize {
    if is_regional_indicator(chars[i]) {
        return if chars.get(i + 1).is_some_and(|&c| is_regional_indicator(c)) {
            2
        } else {
            1
        };
    }
    let mut j = i + 1;
    while let Some(&c) = chars.get(j) {
        if c == VS16 || c == KEYCAP || is_modifier(c) {
            j += 1;
        } else if c == ZWJ && chars.get(j + 1).is_some_and(|&n| is_emoji_start(n)) {
            j += 2;
        } else {
            break;
        }
    }
    j - i
}

fn split_unicode(text: &str, out: &mut Vec<Segment>) {
    let chars: Vec<char> = text.chars().collect();
    let mut plain = String::new();
    let mut i = 0;
    while i < chars.len() {
        if is_emoji_start(chars[i]) {
            let len = sequence_len(&chars, i);
            if !plain.is_empty() {
                out.push(Segment::Text(std::mem::take(&mut plain)));
            }
            out.push(Segment::Emoji(chars[i..i + len].iter().collect()));
            i += len;
        } else {
            plain.push(chars[i]);
            i += 1;
        }
    }
    if !plain.is_empty() {
        out.push(Segment::Text(plain));
    }
}

/// Splits text into plain runs and emoji, resolving known shortcodes.
#[must_use]
pub fn split_emoji(text: &str) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut last = 0;
    for caps in SHORTCODE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let Some(emoji) = caps
            .get(1)
            .and_then(|name| SHORTCODES.iter().find(|(code, _)| *code == name.as_str()))
            .map(|(_, emoji)| *emoji)
        else {
            continue;
        };
        split_unicode(&text[last..whole.start()], &mut out);
        out.push(Segment::Emoji(emoji.to_string()));
        last = whole.end();
    }
    split_unicode(&text[last..], &mut out);

    // Adjacent text runs appear when an unknown shortcode is skipped.
    let mut merged: Vec<Segment> = Vec::with_capacity(out.len());
    for segment in out {
        match (merged.last_mut(), segment) {
            (Some(Segment::Text(prev)), Segment::Text(next)) => prev.push_str(&next),
            (_, segment) => merged.push(segment),
        }
    }
    merged
}

/// Returns the image file stem for an emoji: lowercase hex code points
/// joined by `-`, without variation selectors.
#[must_use]
pub fn emoji_codepoints(emoji: &str) -> String {
    emoji
        .chars()
        .filter(|&c| c != VS16)
        .map(|c| format!("{:x}", c as u32))
        .collect::<Vec<_>>()
        .join("-")
}

/// Builds the trusted `<img>` element for an emoji.
#[must_use]
pub fn emoji_element(emoji: &str, image_base: &str, token: &SafeToken) -> Element {
    let mut el = Element::new("img");
    el.set_attr("class", "emoji");
    el.set_attr("alt", emoji);
    el.set_attr("data-emoji", emoji);
    el.set_attr(
        "src",
        format!("{}/{}.png", image_base.trim_end_matches('/'), emoji_codepoints(emoji)),
    );
    el.set_attr(token.attr_name(), "1");
    el
}

/// Replaces emoji in every text node under `scope` with images.
///
/// Returns the number of emoji converted.
pub fn emoji_to_images(
    doc: &mut Document,
    scope: NodeId,
    image_base: &str,
    token: &SafeToken,
) -> usize {
    let regions = SafeRegions::compute(doc, scope, token);
    let text_nodes: Vec<NodeId> = doc
        .descendants(scope)
        .into_iter()
        .filter(|&n| doc.text(n).is_some() && !regions.contains(n))
        .filter(|&n| {
            !doc.ancestors(n)
                .any(|a| doc.tag_name(a).is_some_and(|t| SKIP_TEXT_IN.contains(&t)))
        })
        .collect();

    let mut converted = 0;
    for node in text_nodes {
        let segments = split_emoji(doc.text(node).unwrap_or_default());
        if !segments.iter().any(|s| matches!(s, Segment::Emoji(_))) {
            continue;
        }
        for segment in segments {
            let replacement = match segment {
                Segment::Text(text) => doc.create_text(text),
                Segment::Emoji(emoji) => {
                    converted += 1;
                    doc.create_element_with(emoji_element(&emoji, image_base, token))
                }
            };
            doc.insert_before(node, replacement);
        }
        doc.detach(node);
    }
    converted
}
