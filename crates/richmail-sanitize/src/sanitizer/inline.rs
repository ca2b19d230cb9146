//! Stylesheet inlining.
//!
//! Message bodies are rendered inside the host page, so `<style>` blocks
//! cannot be kept: they would restyle the application. Their rules are
//! instead copied onto the matching elements' `style` attributes and the
//! blocks removed.

use std::collections::{HashMap, HashSet};

use crate::dom::{Document, NodeId};
use crate::policy::css::filter_declarations;
use crate::policy::{Declaration, SanitizePolicy, parse_declarations, parse_stylesheet, serialize_declarations};
use crate::safe_region::SafeRegions;
use crate::selector::{MatchTree, parse_selector_list};

/// Filters `style` attributes and folds `<style>` rules into them.
///
/// Declarations from a `style` attribute always win over stylesheet rules;
/// among stylesheet rules the later one wins. Elements inside safe regions
/// keep their `style` attribute verbatim. Every `<style>` element is
/// removed afterwards, and so is `<head>`.
///
/// Returns the number of stylesheet declarations applied.
pub fn inline_styles(doc: &mut Document, policy: &SanitizePolicy, regions: &SafeRegions) -> usize {
    let root = doc.root();
    let mut inline_props: HashMap<NodeId, HashSet<String>> = HashMap::new();

    for node in doc.descendants(root) {
        let Some(style) = doc.attr(node, "style") else {
            continue;
        };
        if !regions.contains(node) {
            match policy.sanitize_style(style) {
                Some(clean) => doc.set_attr(node, "style", clean),
                None => {
                    doc.remove_attr(node, "style");
                    continue;
                }
            }
        }
        let props = parse_declarations(doc.attr(node, "style").unwrap_or_default())
            .into_iter()
            .map(|d| d.property)
            .collect();
        inline_props.insert(node, props);
    }

    let blocks = doc.elements_by_tag(root, "style");
    let css: Vec<String> = blocks.iter().map(|&b| doc.text_content(b)).collect();
    for &block in &blocks {
        doc.detach(block);
    }
    if let Some(head) = doc.head() {
        doc.detach(head);
    }

    let Some(body) = doc.body() else {
        return 0;
    };
    let mut applied = 0;
    let mut tree: Option<MatchTree> = None;
    for sheet in css {
        for rule in parse_stylesheet(&sheet) {
            let selectors = parse_selector_list(&rule.selectors);
            if selectors.is_empty() {
                continue;
            }
            let declarations = filter_declarations(rule.declarations, policy.urls());
            if declarations.is_empty() {
                continue;
            }
            let matcher = tree.get_or_insert_with(|| MatchTree::build(doc, body));
            for target in matcher.select(&selectors) {
                applied += merge_declarations(doc, target, &declarations, inline_props.get(&target));
            }
        }
    }
    applied
}

fn merge_declarations(
    doc: &mut Document,
    node: NodeId,
    declarations: &[Declaration],
    inline_props: Option<&HashSet<String>>,
) -> usize {
    let mut current = parse_declarations(doc.attr(node, "style").unwrap_or_default());
    let mut applied = 0;
    for decl in declarations {
        if inline_props.is_some_and(|props| props.contains(&decl.property)) {
            continue;
        }
        if let Some(existing) = current.iter_mut().find(|d| d.property == decl.property) {
            existing.value.clone_from(&decl.value);
        } else {
            current.push(decl.clone());
        }
        applied += 1;
    }
    if applied > 0 {
        doc.set_attr(node, "style", serialize_declarations(&current));
    }
    applied
}
