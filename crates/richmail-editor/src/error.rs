//! Error types for editable surfaces.

use richmail_sanitize::NodeId;

/// Result type alias for editor operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Editor error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The surface has been unmounted.
    #[error("Surface is not mounted")]
    NotMounted,

    /// A selection boundary refers to a node outside the surface.
    #[error("Node {0:?} is not inside the editable surface")]
    DetachedNode(NodeId),

    /// A selection offset is past the end of its node.
    #[error("Offset {offset} is out of range for node {node:?}")]
    OffsetOutOfRange {
        /// The boundary node.
        node: NodeId,
        /// The rejected offset.
        offset: usize,
    },

    /// Configuration could not be deserialized.
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}
