//! Error types for sanitizer setup.
//!
//! Sanitizing HTML never fails; these errors only arise while building a
//! session from configuration.

/// Result type alias for sanitizer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Sanitizer error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration could not be deserialized.
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// A configured pattern could not be compiled.
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}
