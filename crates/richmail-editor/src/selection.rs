//! Selection model and saved-range memory.
//!
//! Boundaries follow DOM range semantics: in a text node the offset counts
//! characters, in an element it counts children.

use richmail_sanitize::{Document, NodeData, NodeId};

use crate::error::{Error, Result};

/// One end of a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    /// Container node.
    pub node: NodeId,
    /// Character offset (text) or child index (element).
    pub offset: usize,
}

impl Boundary {
    /// Creates a boundary.
    #[must_use]
    pub const fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// A selection inside the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    /// Start boundary.
    pub start: Boundary,
    /// End boundary.
    pub end: Boundary,
}

impl Range {
    /// Creates a range.
    #[must_use]
    pub const fn new(start: Boundary, end: Boundary) -> Self {
        Self { start, end }
    }

    /// Creates a collapsed range (a caret).
    #[must_use]
    pub const fn caret(at: Boundary) -> Self {
        Self { start: at, end: at }
    }

    /// Returns `true` if start and end coincide.
    #[must_use]
    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// Returns the maximum offset valid inside `node`.
#[must_use]
pub fn node_length(doc: &Document, node: NodeId) -> usize {
    match doc.data(node) {
        NodeData::Text(text) | NodeData::Comment(text) => text.chars().count(),
        _ => doc.children(node).len(),
    }
}

/// Checks that a boundary lies inside `root` and its offset is in range.
///
/// # Errors
///
/// Returns [`Error::DetachedNode`] or [`Error::OffsetOutOfRange`].
pub fn validate_boundary(doc: &Document, root: NodeId, boundary: Boundary) -> Result<()> {
    if boundary.node != root && !doc.contains(root, boundary.node) {
        return Err(Error::DetachedNode(boundary.node));
    }
    if boundary.offset > node_length(doc, boundary.node) {
        return Err(Error::OffsetOutOfRange {
            node: boundary.node,
            offset: boundary.offset,
        });
    }
    Ok(())
}

/// Checks both ends of a range.
///
/// # Errors
///
/// See [`validate_boundary`].
pub fn validate_range(doc: &Document, root: NodeId, range: &Range) -> Result<()> {
    validate_boundary(doc, root, range.start)?;
    validate_boundary(doc, root, range.end)
}

/// The boundary at the very end of `root`'s deepest last descendant.
#[must_use]
pub fn end_of(doc: &Document, root: NodeId) -> Boundary {
    let mut node = root;
    while let Some(last) = doc.last_child(node) {
        if matches!(doc.data(last), NodeData::Comment(_)) {
            break;
        }
        node = last;
    }
    Boundary::new(node, node_length(doc, node))
}

/// The most recently saved selection, reusable a bounded number of times.
#[derive(Debug, Clone)]
pub struct SelectionMemory {
    saved: Option<Range>,
    reuses: usize,
    max_reuses: usize,
}

impl SelectionMemory {
    /// Creates an empty memory.
    #[must_use]
    pub const fn new(max_reuses: usize) -> Self {
        Self {
            saved: None,
            reuses: 0,
            max_reuses,
        }
    }

    /// Saves `range`, resetting the reuse count.
    pub const fn save(&mut self, range: Range) {
        self.saved = Some(range);
        self.reuses = 0;
    }

    /// Returns the saved range if it has not been reused too often.
    ///
    /// Once the cap is reached the range is discarded as stale.
    pub fn take(&mut self) -> Option<Range> {
        let range = self.saved?;
        if self.reuses >= self.max_reuses {
            tracing::debug!(reuses = self.reuses, "discarding stale saved range");
            self.clear();
            return None;
        }
        self.reuses += 1;
        Some(range)
    }

    /// Forgets the saved range.
    pub const fn clear(&mut self) {
        self.saved = None;
        self.reuses = 0;
    }

    /// Returns the saved range without counting a reuse.
    #[must_use]
    pub const fn peek(&self) -> Option<&Range> {
        self.saved.as_ref()
    }

    /// Returns how many times the saved range has been reused.
    #[must_use]
    pub const fn reuses(&self) -> usize {
        self.reuses
    }
}
