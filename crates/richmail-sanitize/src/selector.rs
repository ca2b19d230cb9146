//! Selector matching for stylesheet inlining.
//!
//! Selectors are parsed and matched by `scraper`. The arena document is
//! mirrored into a `scraper::Html` whose elements carry their arena
//! index, so every match maps back to a [`NodeId`].
//!
//! Selectors containing a pseudo-class or pseudo-element are skipped, not
//! flattened. Id selectors match the `data-safe-id` attribute that
//! sanitization renames ids to, falling back to a live `id`.

use std::collections::BTreeSet;

use cssparser::{Delimiter, Parser, ParserInput, Token};
use scraper::Html;

use crate::dom::{Document, NodeId};
use crate::policy::css::skip_rest;
use crate::sanitizer::SAFE_ID_ATTR;

const NODE_ATTR: &str = "data-richmail-node";

/// A parsed complex selector.
#[derive(Debug, Clone)]
pub struct Selector {
    inner: scraper::Selector,
    source: String,
}

impl Selector {
    /// Parses a selector.
    ///
    /// Returns `None` for syntax `scraper` rejects and for anything with a
    /// pseudo-class or pseudo-element, such as `:hover` or `::before`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() || has_pseudo(text) {
            return None;
        }
        let inner = scraper::Selector::parse(text).ok()?;
        Some(Self {
            inner,
            source: text.to_string(),
        })
    }

    /// Returns the selector text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// Returns `true` if a top-level `:` appears outside attribute brackets.
fn has_pseudo(text: &str) -> bool {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    while let Ok(token) = parser.next_including_whitespace() {
        if matches!(token, Token::Colon) {
            return true;
        }
    }
    false
}

/// Splits a selector list on top-level commas and parses each entry,
/// dropping the ones that cannot be represented.
#[must_use]
pub fn parse_selector_list(text: &str) -> Vec<Selector> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    let mut selectors = Vec::new();
    while !parser.is_exhausted() {
        let start = parser.position();
        let _ = parser.parse_until_before(Delimiter::Comma, skip_rest);
        let part = parser.slice_from(start);
        match Selector::parse(part) {
            Some(selector) => selectors.push(selector),
            None => tracing::trace!(selector = part.trim(), "skipping selector"),
        }
        let _ = parser.next();
    }
    selectors
}

/// A `scraper` mirror of a document subtree.
///
/// Build it once and run every rule of a stylesheet against it; the
/// mirror does not follow later edits to the arena document.
#[derive(Debug)]
pub struct MatchTree {
    html: Html,
    nodes: Vec<NodeId>,
}

impl MatchTree {
    /// Mirrors the elements below `scope`.
    #[must_use]
    pub fn build(doc: &Document, scope: NodeId) -> Self {
        let mut mirror = doc.clone();
        let nodes: Vec<NodeId> = mirror
            .descendants(scope)
            .into_iter()
            .filter(|&n| mirror.element(n).is_some())
            .collect();
        for (index, &node) in nodes.iter().enumerate() {
            mirror.set_attr(node, NODE_ATTR, index.to_string());
            if !mirror.has_attr(node, "id") {
                if let Some(id) = mirror.attr(node, SAFE_ID_ATTR).map(str::to_string) {
                    mirror.set_attr(node, "id", id);
                }
            }
        }
        // The doctype keeps matching in no-quirks mode: ids and classes
        // compare case-sensitively.
        let markup = format!("<!DOCTYPE html>{}", mirror.outer_html(scope));
        Self {
            html: Html::parse_document(&markup),
            nodes,
        }
    }

    /// Returns every mirrored element matched by any of `selectors`, in
    /// document order and without duplicates.
    #[must_use]
    pub fn select(&self, selectors: &[Selector]) -> Vec<NodeId> {
        let mut matched = BTreeSet::new();
        for selector in selectors {
            for element in self.html.select(&selector.inner) {
                if let Some(index) = element
                    .value()
                    .attr(NODE_ATTR)
                    .and_then(|v| v.parse::<usize>().ok())
                {
                    matched.insert(index);
                }
            }
        }
        matched
            .into_iter()
            .filter_map(|index| self.nodes.get(index).copied())
            .collect()
    }
}

/// Returns every element under `scope` matched by any of `selectors`, in
/// document order.
#[must_use]
pub fn select_all(doc: &Document, scope: NodeId, selectors: &[Selector]) -> Vec<NodeId> {
    if selectors.is_empty() {
        return Vec::new();
    }
    MatchTree::build(doc, scope).select(selectors)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::parse(
            r#"<div class="wrap main" data-safe-id="intro">
                 <p lang="en-US">one <a href="https://x.example/path">link</a></p>
                 <p class="note">two</p>
                 <span>three</span>
               </div>"#,
        )
    }

    fn count(doc: &Document, selector: &str) -> usize {
        let body = doc.body().unwrap();
        select_all(doc, body, &parse_selector_list(selector)).len()
    }

    #[test]
    fn test_type_class_and_id() {
        let doc = doc();
        assert_eq!(count(&doc, "p"), 2);
        assert_eq!(count(&doc, ".note"), 1);
        assert_eq!(count(&doc, "div.wrap.main"), 1);
        assert_eq!(count(&doc, "#intro"), 1);
        assert_eq!(count(&doc, "#INTRO"), 0);
        assert_eq!(count(&doc, "*"), 5);
    }

    #[test]
    fn test_combinators() {
        let doc = doc();
        assert_eq!(count(&doc, "#intro a"), 1);
        assert_eq!(count(&doc, "div > a"), 0);
        assert_eq!(count(&doc, "div > p"), 2);
        assert_eq!(count(&doc, "p + p"), 1);
        assert_eq!(count(&doc, "p ~ span"), 1);
        assert_eq!(count(&doc, "p+span"), 1);
        assert_eq!(count(&doc, "span + p"), 0);
    }

    #[test]
    fn test_attribute_operators() {
        let doc = doc();
        assert_eq!(count(&doc, "[lang]"), 1);
        assert_eq!(count(&doc, "[lang|=en]"), 1);
        assert_eq!(count(&doc, "a[href^='https:']"), 1);
        assert_eq!(count(&doc, "a[href$=\"path\"]"), 1);
        assert_eq!(count(&doc, "a[href*=x]"), 1);
        assert_eq!(count(&doc, "[class~=main]"), 1);
    }

    #[test]
    fn test_pseudo_selectors_are_skipped() {
        assert!(Selector::parse("a:hover").is_none());
        assert!(Selector::parse("p::before").is_none());
        assert!(Selector::parse("p:not(.x)").is_none());
        assert!(Selector::parse("a[href='x:y']").is_some());
        let doc = doc();
        assert_eq!(count(&doc, "a:hover, span"), 1);
    }

    #[test]
    fn test_invalid_selectors() {
        assert!(Selector::parse("").is_none());
        assert!(Selector::parse("div >").is_none());
        assert!(Selector::parse("p[").is_none());
        assert!(Selector::parse("#").is_none());
    }

    #[test]
    fn test_live_id_matches() {
        let doc = Document::parse(r#"<p id="lead">a</p><p>b</p>"#);
        assert_eq!(count(&doc, "#lead"), 1);
    }

    #[test]
    fn test_deep_descendant_chain_is_fast() {
        let depth = 40;
        let html = format!("{}<b>x</b>{}", "<div>".repeat(depth), "</div>".repeat(depth));
        let doc = Document::parse(&html);
        let selector = format!(".nope {}b", "div ".repeat(16));
        let started = std::time::Instant::now();
        assert_eq!(count(&doc, &selector), 0);
        assert!(started.elapsed() < std::time::Duration::from_secs(2));
    }
}
