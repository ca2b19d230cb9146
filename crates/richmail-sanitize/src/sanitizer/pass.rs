//! Caller-supplied DOM passes.

use crate::dom::{Document, NodeId};

/// A processor run on the scratch document during sanitization.
///
/// `before` runs after purification and emoji conversion, ahead of style
/// inlining and the built-in rules. `after` runs once every built-in rule
/// has been applied. Passes see the whole document but should restrict
/// themselves to `body`.
pub trait Pass {
    /// Processes the purified document.
    fn before(&mut self, doc: &mut Document, body: NodeId);

    /// Follow-up processing after the built-in rules.
    fn after(&mut self, _doc: &mut Document, _body: NodeId) {}
}

impl<F> Pass for F
where
    F: FnMut(&mut Document, NodeId),
{
    fn before(&mut self, doc: &mut Document, body: NodeId) {
        self(doc, body);
    }
}
