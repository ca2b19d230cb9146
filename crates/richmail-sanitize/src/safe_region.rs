//! Safe regions: subtrees generated by the application itself.
//!
//! Trusted templates stamp their root element with an attribute whose name
//! embeds a random per-session token. Untrusted HTML cannot guess the name,
//! so it cannot claim membership. Nodes inside a safe region keep their
//! `class`, `id` and URLs untouched by the post-purification rules.

use std::collections::HashSet;

use uuid::Uuid;

use crate::dom::{Document, NodeId};

/// Prefix of the safe-region marker attribute.
pub const SAFE_ATTR_PREFIX: &str = "data-safe-html-";

/// The per-session marker attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeToken {
    attr: String,
}

impl SafeToken {
    /// Generates a fresh random token.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            attr: format!("{SAFE_ATTR_PREFIX}{}", Uuid::new_v4().simple()),
        }
    }

    /// Returns the marker attribute name.
    #[must_use]
    pub fn attr_name(&self) -> &str {
        &self.attr
    }

    /// Marks `node` as the root of a safe region.
    pub fn stamp(&self, doc: &mut Document, node: NodeId) {
        doc.set_attr(node, &self.attr, "1");
    }

    /// Returns `true` if `node` itself carries the marker.
    #[must_use]
    pub fn is_stamped(&self, doc: &Document, node: NodeId) -> bool {
        doc.has_attr(node, &self.attr)
    }
}

/// The set of nodes that lie inside a safe region, computed in one pass.
#[derive(Debug, Clone, Default)]
pub struct SafeRegions {
    members: HashSet<NodeId>,
}

impl SafeRegions {
    /// Walks `scope` top-down once and records every node at or below a
    /// stamped element.
    #[must_use]
    pub fn compute(doc: &Document, scope: NodeId, token: &SafeToken) -> Self {
        let mut members = HashSet::new();
        let inherited = is_within_safe_region(doc, scope, token);
        let mut stack = vec![(scope, inherited)];
        while let Some((node, inside)) = stack.pop() {
            let inside = inside || token.is_stamped(doc, node);
            if inside {
                members.insert(node);
            }
            stack.extend(doc.children(node).iter().map(|&c| (c, inside)));
        }
        Self { members }
    }

    /// Returns `true` if the node lies inside a safe region.
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.members.contains(&node)
    }

    /// Returns the number of nodes inside safe regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if no node is inside a safe region.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Returns `true` if `node` or one of its ancestors carries the marker.
#[must_use]
pub fn is_within_safe_region(doc: &Document, node: NodeId, token: &SafeToken) -> bool {
    token.is_stamped(doc, node) || doc.ancestors(node).any(|a| token.is_stamped(doc, a))
}
