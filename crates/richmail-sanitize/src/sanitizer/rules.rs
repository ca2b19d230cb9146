//! Post-purification rules applied to every element of the body.

use crate::dom::{Document, NodeId};
use crate::policy::{SanitizePolicy, UrlContext};
use crate::safe_region::SafeRegions;

/// Everything a rule needs to decide about one element.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    /// Nodes generated by trusted templates.
    pub regions: &'a SafeRegions,
    /// The active policy.
    pub policy: &'a SanitizePolicy,
    /// Where the URLs will be rendered.
    pub urls: UrlContext,
}

/// A rewrite applied to matching elements.
pub trait Rule: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Returns `true` if the rule applies to `node`.
    fn matches(&self, doc: &Document, node: NodeId, ctx: &RuleContext<'_>) -> bool;

    /// Rewrites `node`.
    fn apply(&self, doc: &mut Document, node: NodeId, ctx: &RuleContext<'_>);
}

/// Re-validates `src` and `href` outside safe regions.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlRule;

const URL_ATTRS: &[&str] = &["src", "href"];

impl Rule for UrlRule {
    fn name(&self) -> &'static str {
        "url"
    }

    fn matches(&self, doc: &Document, node: NodeId, ctx: &RuleContext<'_>) -> bool {
        !ctx.regions.contains(node) && URL_ATTRS.iter().any(|a| doc.has_attr(node, a))
    }

    fn apply(&self, doc: &mut Document, node: NodeId, ctx: &RuleContext<'_>) {
        for attr in URL_ATTRS {
            let Some(value) = doc.attr(node, attr) else {
                continue;
            };
            let sanitized = ctx.policy.sanitize_url(value, None, ctx.urls);
            doc.set_attr(node, attr, sanitized);
        }
    }
}

/// Removes attributes that would bind untrusted content to host styling
/// or custom-element behavior.
#[derive(Debug, Clone, Copy)]
pub struct StripAttributesRule {
    attrs: &'static [&'static str],
}

impl StripAttributesRule {
    /// Creates a rule removing `attrs`.
    #[must_use]
    pub const fn new(attrs: &'static [&'static str]) -> Self {
        Self { attrs }
    }
}

impl Default for StripAttributesRule {
    fn default() -> Self {
        Self::new(&["class", "is"])
    }
}

impl Rule for StripAttributesRule {
    fn name(&self) -> &'static str {
        "strip-attributes"
    }

    fn matches(&self, doc: &Document, node: NodeId, ctx: &RuleContext<'_>) -> bool {
        !ctx.regions.contains(node) && self.attrs.iter().any(|a| doc.has_attr(node, a))
    }

    fn apply(&self, doc: &mut Document, node: NodeId, _ctx: &RuleContext<'_>) {
        for attr in self.attrs {
            doc.remove_attr(node, attr);
        }
    }
}

/// Renames `id` to `data-safe-id` so message content cannot collide with
/// or target host element ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct SafeIdRule;

/// Attribute that sanitized ids are moved to.
pub const SAFE_ID_ATTR: &str = "data-safe-id";

impl Rule for SafeIdRule {
    fn name(&self) -> &'static str {
        "safe-id"
    }

    fn matches(&self, doc: &Document, node: NodeId, ctx: &RuleContext<'_>) -> bool {
        !ctx.regions.contains(node) && doc.has_attr(node, "id")
    }

    fn apply(&self, doc: &mut Document, node: NodeId, _ctx: &RuleContext<'_>) {
        if let Some(id) = doc.remove_attr(node, "id") {
            doc.set_attr(node, SAFE_ID_ATTR, id);
        }
    }
}

/// The built-in rule set, in application order.
#[must_use]
pub fn default_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(UrlRule),
        Box::new(StripAttributesRule::default()),
        Box::new(SafeIdRule),
    ]
}

/// Applies `rules` to every element under `scope` in one traversal.
///
/// Returns the number of rewrites performed.
pub fn apply_rules(
    doc: &mut Document,
    scope: NodeId,
    rules: &[Box<dyn Rule>],
    ctx: &RuleContext<'_>,
) -> usize {
    let mut applied = 0;
    for node in doc.descendants(scope) {
        if doc.element(node).is_none() {
            continue;
        }
        for rule in rules {
            if rule.matches(doc, node, ctx) {
                tracing::trace!(rule = rule.name(), node = node.index(), "applying rule");
                rule.apply(doc, node, ctx);
                applied += 1;
            }
        }
    }
    applied
}
