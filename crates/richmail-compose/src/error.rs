//! Error types for message composition.

/// Result type alias for composer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Composer error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading an attachment failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be deserialized.
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// The composer's editing surface is gone.
    #[error("Composer has no editing surface")]
    NoSurface,

    /// The addressing fields do not form a sendable message.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// A previous-mail policy change is waiting for the user to confirm.
    #[error("Previous mail policy change awaiting confirmation")]
    PolicyConfirmationPending,

    /// An inline attachment is not an image.
    #[error("Not an inline image: {0}")]
    NotAnImage(String),

    /// The editing surface rejected an operation.
    #[error("Editor error: {0}")]
    Editor(#[from] richmail_editor::Error),
}
